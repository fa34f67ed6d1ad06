//! # Colour classification module
//!
//! Converts the raw RGB triples returned by the colour sensor into one of the
//! six palette colours used by the street map. The classifier is
//! parameterised by the calibration data gathered with the calibration mode
//! of the executable, which records reference hue/saturation/value triples
//! for each palette colour under the current lighting conditions.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod calib;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
pub use calib::{run_calibration, CalibError, CalibrationData, CALIB_COLOUR_ORDER};
use crate::eqpt::{Brick, BrickError};
use util::maths::ang_dist_deg;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// One of the six palette colours on the map.
///
/// The discriminants match the indexed-colour palette of the EV3 colour
/// sensor, so values parsed from the map image and values read from the
/// sensor agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Colour {
    Black = 1,
    Blue = 2,
    Green = 3,
    Yellow = 4,
    Red = 5,
    White = 6,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A hue/saturation/value triple.
///
/// Hue is in degrees `[0, 360)`, saturation and value are percentages
/// `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsv {
    pub hue: f64,
    pub sat: f64,
    pub val: f64,
}

/// Parameters for colour classification.
#[derive(Debug, Clone, Deserialize)]
pub struct ColourParams {
    /// Saturation (percent) below which a reading is treated as achromatic
    /// (white or black).
    pub sat_threshold: f64,

    /// Value (percent) separating white from black for achromatic readings.
    pub val_threshold: f64,

    /// Number of consecutive agreeing classifications required before a
    /// changed colour reading is accepted.
    pub confirm_count: u32,
}

/// A calibrated colour classifier.
#[derive(Debug, Clone)]
pub struct Classifier {
    calib: CalibrationData,
    params: ColourParams,
}

/// A debounced colour reader.
///
/// The colour sensor flickers at colour edges, so a changed reading is only
/// accepted once it has been confirmed by `confirm_count` consecutive
/// re-reads. Until then the previous stable colour is reported.
#[derive(Debug, Default)]
pub struct DebouncedReader {
    current: Option<Colour>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Colour {
    /// Return the palette index of this colour (1 to 6).
    pub fn index(self) -> u8 {
        self as u8
    }

    /// True for the colours found on streets and intersections.
    pub fn is_street(self) -> bool {
        matches!(self, Colour::Black | Colour::Yellow)
    }

    /// True for the colours a building may take.
    pub fn is_building(self) -> bool {
        matches!(self, Colour::Green | Colour::Blue | Colour::White)
    }
}

impl std::fmt::Display for Colour {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Colour::Black => "black",
            Colour::Blue => "blue",
            Colour::Green => "green",
            Colour::Yellow => "yellow",
            Colour::Red => "red",
            Colour::White => "white",
        };
        write!(f, "{}", s)
    }
}

impl Classifier {
    pub fn new(calib: CalibrationData, params: ColourParams) -> Self {
        Self { calib, params }
    }

    /// Classify a raw RGB triple into a palette colour.
    pub fn classify_rgb(&self, rgb: [i32; 3]) -> Colour {
        self.classify_hsv(&rgb_to_hsv(rgb))
    }

    /// Classify an HSV reading into a palette colour.
    ///
    /// Low-saturation readings split into white/black on the value
    /// threshold. Chromatic readings take the calibrated reference colour
    /// whose hue is closest on the hue circle, which buckets the circle into
    /// the midpoint-bounded ranges between adjacent references.
    pub fn classify_hsv(&self, hsv: &Hsv) -> Colour {
        if hsv.sat < self.params.sat_threshold {
            if hsv.val > self.params.val_threshold {
                return Colour::White;
            } else {
                return Colour::Black;
            }
        }

        let chromatic = [
            (self.calib.red.hue, Colour::Red),
            (self.calib.yellow.hue, Colour::Yellow),
            (self.calib.green.hue, Colour::Green),
            (self.calib.blue.hue, Colour::Blue),
        ];

        let mut best = chromatic[0].1;
        let mut best_dist = f64::INFINITY;
        for (ref_hue, colour) in chromatic.iter() {
            let dist = ang_dist_deg(hsv.hue, *ref_hue).abs();
            if dist < best_dist {
                best_dist = dist;
                best = *colour;
            }
        }

        best
    }
}

impl DebouncedReader {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Read and classify the sensor, debouncing colour transitions.
    ///
    /// A reading differing from the current stable colour stops the motors
    /// and must then repeat for `confirm_count` consecutive reads to be
    /// accepted, otherwise the current colour is retained. Stopping keeps
    /// the sensor over the disputed patch while the change is confirmed;
    /// callers re-issue their motor demands on the next control iteration.
    pub fn read(
        &mut self,
        brick: &mut dyn Brick,
        classifier: &Classifier,
    ) -> Result<Colour, BrickError> {
        let new = classifier.classify_rgb(brick.read_colour_rgb()?);

        match self.current {
            Some(current) if current == new => Ok(current),
            Some(current) => {
                brick.stop_all()?;

                for _ in 0..classifier.params.confirm_count {
                    let confirm = classifier.classify_rgb(brick.read_colour_rgb()?);
                    if confirm != new {
                        return Ok(current);
                    }
                }
                self.current = Some(new);
                Ok(new)
            }
            None => {
                self.current = Some(new);
                Ok(new)
            }
        }
    }

}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Rescale an RGB triple so that no channel exceeds 255.
///
/// The sensor's gain drifts with battery level and can push readings past
/// the nominal channel maximum; all channels are scaled down together to
/// preserve the ratios. Negative channels are clamped to zero.
pub fn rescale_rgb(rgb: [i32; 3]) -> [f64; 3] {
    let mut out = [0f64; 3];
    let mut maxval = 255f64;

    for (i, c) in rgb.iter().enumerate() {
        out[i] = (*c).max(0) as f64;
        if out[i] > maxval {
            maxval = out[i];
        }
    }

    if maxval > 255.0 {
        for c in out.iter_mut() {
            *c *= 255.0 / maxval;
        }
    }

    out
}

/// Convert an RGB triple into hue/saturation/value.
pub fn rgb_to_hsv(rgb: [i32; 3]) -> Hsv {
    let scaled = rescale_rgb(rgb);

    let fr = scaled[0] / 255.0;
    let fg = scaled[1] / 255.0;
    let fb = scaled[2] / 255.0;

    let cmax = fr.max(fg).max(fb);
    let cmin = fr.min(fg).min(fb);
    let delta = cmax - cmin;

    let mut hue;
    let sat;

    if delta > 0.0 {
        if cmax == fr {
            hue = 60.0 * (((fg - fb) / delta) % 6.0);
        } else if cmax == fg {
            hue = 60.0 * (((fb - fr) / delta) + 2.0);
        } else {
            hue = 60.0 * (((fr - fg) / delta) + 4.0);
        }

        sat = if cmax > 0.0 { delta / cmax * 100.0 } else { 0.0 };
    } else {
        hue = 0.0;
        sat = 0.0;
    }

    if hue < 0.0 {
        hue += 360.0;
    }

    Hsv {
        hue,
        sat,
        val: cmax * 100.0,
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn test_calib() -> CalibrationData {
        CalibrationData {
            red: rgb_to_hsv([220, 30, 30]),
            blue: rgb_to_hsv([20, 30, 220]),
            white: rgb_to_hsv([230, 230, 230]),
            green: rgb_to_hsv([30, 200, 40]),
            black: rgb_to_hsv([10, 10, 10]),
            yellow: rgb_to_hsv([230, 220, 30]),
        }
    }

    fn test_params() -> ColourParams {
        ColourParams {
            sat_threshold: 50.0,
            val_threshold: 50.0,
            confirm_count: 5,
        }
    }

    #[test]
    fn test_rgb_to_hsv() {
        let red = rgb_to_hsv([255, 0, 0]);
        assert!((red.hue - 0.0).abs() < 1e-9);
        assert!((red.sat - 100.0).abs() < 1e-9);
        assert!((red.val - 100.0).abs() < 1e-9);

        let green = rgb_to_hsv([0, 255, 0]);
        assert!((green.hue - 120.0).abs() < 1e-9);

        let blue = rgb_to_hsv([0, 0, 255]);
        assert!((blue.hue - 240.0).abs() < 1e-9);

        let grey = rgb_to_hsv([128, 128, 128]);
        assert!((grey.sat - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_rescale_rgb() {
        // Over-range channels scale down together
        let scaled = rescale_rgb([510, 255, 0]);
        assert!((scaled[0] - 255.0).abs() < 1e-9);
        assert!((scaled[1] - 127.5).abs() < 1e-9);
        assert!((scaled[2] - 0.0).abs() < 1e-9);

        // Negative channels clamp to zero
        let scaled = rescale_rgb([-10, 100, 200]);
        assert!((scaled[0] - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_classify_references_round_trip() {
        let classifier = Classifier::new(test_calib(), test_params());

        // Each reference RGB must classify back to its own colour with no
        // ambiguity.
        assert_eq!(classifier.classify_rgb([220, 30, 30]), Colour::Red);
        assert_eq!(classifier.classify_rgb([20, 30, 220]), Colour::Blue);
        assert_eq!(classifier.classify_rgb([230, 230, 230]), Colour::White);
        assert_eq!(classifier.classify_rgb([30, 200, 40]), Colour::Green);
        assert_eq!(classifier.classify_rgb([10, 10, 10]), Colour::Black);
        assert_eq!(classifier.classify_rgb([230, 220, 30]), Colour::Yellow);
    }

    #[test]
    fn test_classify_hue_wraps() {
        let classifier = Classifier::new(test_calib(), test_params());

        // A hue just below 360 is closer to red (near 0) than to blue
        let hsv = Hsv {
            hue: 350.0,
            sat: 80.0,
            val: 80.0,
        };
        assert_eq!(classifier.classify_hsv(&hsv), Colour::Red);
    }
}
