//! Colour sensor calibration data
//!
//! Calibration records one reference HSV triple per palette colour in a
//! plain-text file, one line per colour in the fixed order red, blue, white,
//! green, black, yellow. The file is produced by the calibration mode of the
//! executable and read back at every startup.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::info;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use thiserror::Error;

// Internal
use super::{rgb_to_hsv, Colour, Hsv};
use crate::eqpt::{Brick, BrickError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The order in which colours appear in the calibration file.
pub const CALIB_COLOUR_ORDER: [Colour; 6] = [
    Colour::Red,
    Colour::Blue,
    Colour::White,
    Colour::Green,
    Colour::Black,
    Colour::Yellow,
];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Calibrated reference HSV triples for each palette colour.
#[derive(Debug, Clone)]
pub struct CalibrationData {
    pub red: Hsv,
    pub blue: Hsv,
    pub white: Hsv,
    pub green: Hsv,
    pub black: Hsv,
    pub yellow: Hsv,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors when handling calibration data.
#[derive(Debug, Error)]
pub enum CalibError {
    #[error("Cannot access the calibration file: {0}")]
    Io(#[from] io::Error),

    #[error("Expected 6 lines in the calibration file, found {0}")]
    WrongLineCount(usize),

    #[error("Line {0} of the calibration file is not a `<hue> <sat> <val>` triple")]
    MalformedLine(usize),

    #[error("Equipment error during calibration: {0}")]
    Brick(#[from] BrickError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CalibrationData {
    /// Load calibration data from the given file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CalibError> {
        let contents = fs::read_to_string(path)?;

        let lines: Vec<&str> = contents
            .lines()
            .filter(|l| !l.trim().is_empty())
            .collect();

        if lines.len() != CALIB_COLOUR_ORDER.len() {
            return Err(CalibError::WrongLineCount(lines.len()));
        }

        let mut triples = [Hsv {
            hue: 0.0,
            sat: 0.0,
            val: 0.0,
        }; 6];

        for (i, line) in lines.iter().enumerate() {
            let fields: Vec<f64> = line
                .split_whitespace()
                .filter_map(|t| t.parse().ok())
                .collect();

            if fields.len() != 3 {
                return Err(CalibError::MalformedLine(i + 1));
            }

            triples[i] = Hsv {
                hue: fields[0],
                sat: fields[1],
                val: fields[2],
            };
        }

        Ok(Self {
            red: triples[0],
            blue: triples[1],
            white: triples[2],
            green: triples[3],
            black: triples[4],
            yellow: triples[5],
        })
    }

    /// Save calibration data to the given file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CalibError> {
        let mut out = String::new();

        for colour in CALIB_COLOUR_ORDER.iter() {
            let hsv = self.get(*colour);
            out.push_str(&format!("{:.0} {:.0} {:.0}\n", hsv.hue, hsv.sat, hsv.val));
        }

        fs::write(path, out)?;

        Ok(())
    }

    /// Get the reference triple for the given colour.
    pub fn get(&self, colour: Colour) -> Hsv {
        match colour {
            Colour::Red => self.red,
            Colour::Blue => self.blue,
            Colour::White => self.white,
            Colour::Green => self.green,
            Colour::Black => self.black,
            Colour::Yellow => self.yellow,
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Run the operator-driven calibration routine.
///
/// For each palette colour in the file order the operator is prompted to
/// place the sensor over a patch of that colour; `samples` readings are then
/// taken, averaged in HSV space and recorded. The result is written to
/// `path`.
pub fn run_calibration<P: AsRef<Path>>(
    brick: &mut dyn Brick,
    path: P,
    samples: u32,
) -> Result<(), CalibError> {
    let stdin = io::stdin();
    let mut triples = Vec::with_capacity(CALIB_COLOUR_ORDER.len());

    for colour in CALIB_COLOUR_ORDER.iter() {
        print!("Place the sensor over {} and press enter: ", colour);
        io::stdout().flush()?;

        let mut line = String::new();
        stdin.lock().read_line(&mut line)?;

        let mut avg = Hsv {
            hue: 0.0,
            sat: 0.0,
            val: 0.0,
        };

        for _ in 0..samples {
            let hsv = rgb_to_hsv(brick.read_colour_rgb()?);
            avg.hue += hsv.hue;
            avg.sat += hsv.sat;
            avg.val += hsv.val;
        }

        avg.hue /= samples as f64;
        avg.sat /= samples as f64;
        avg.val /= samples as f64;

        info!(
            "Calibrated {}: hue {:.0}, sat {:.0}, val {:.0}",
            colour, avg.hue, avg.sat, avg.val
        );

        triples.push(avg);
    }

    let data = CalibrationData {
        red: triples[0],
        blue: triples[1],
        white: triples[2],
        green: triples[3],
        black: triples[4],
        yellow: triples[5],
    };

    data.save(path)?;

    brick.stop_all()?;

    Ok(())
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load_save_round_trip() {
        let data = CalibrationData {
            red: Hsv {
                hue: 4.0,
                sat: 85.0,
                val: 82.0,
            },
            blue: Hsv {
                hue: 237.0,
                sat: 90.0,
                val: 80.0,
            },
            white: Hsv {
                hue: 0.0,
                sat: 2.0,
                val: 95.0,
            },
            green: Hsv {
                hue: 123.0,
                sat: 85.0,
                val: 75.0,
            },
            black: Hsv {
                hue: 0.0,
                sat: 5.0,
                val: 6.0,
            },
            yellow: Hsv {
                hue: 57.0,
                sat: 87.0,
                val: 90.0,
            },
        };

        let dir = std::env::temp_dir().join("hermes_calib_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("hsv_calib.txt");

        data.save(&path).unwrap();
        let loaded = CalibrationData::load(&path).unwrap();

        assert_eq!(loaded.red.hue, 4.0);
        assert_eq!(loaded.yellow.val, 90.0);
        assert_eq!(loaded.green.sat, 85.0);
    }

    #[test]
    fn test_load_rejects_short_file() {
        let dir = std::env::temp_dir().join("hermes_calib_test_short");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("hsv_calib.txt");
        std::fs::write(&path, "10 20 30\n40 50 60\n").unwrap();

        assert!(matches!(
            CalibrationData::load(&path),
            Err(CalibError::WrongLineCount(2))
        ));
    }

    #[test]
    fn test_load_rejects_malformed_line() {
        let dir = std::env::temp_dir().join("hermes_calib_test_malformed");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("hsv_calib.txt");
        std::fs::write(
            &path,
            "10 20 30\n40 50 60\nnot numbers\n1 2 3\n4 5 6\n7 8 9\n",
        )
        .unwrap();

        assert!(matches!(
            CalibrationData::load(&path),
            Err(CalibError::MalformedLine(3))
        ));
    }
}
