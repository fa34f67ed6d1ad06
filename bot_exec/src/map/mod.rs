//! # Street map module
//!
//! The map is a fixed grid of street intersections, each surrounded by up to
//! four coloured buildings. Intersections are raster-indexed
//! (`index = x + y*sx`) and each stores its four building colours in
//! clockwise order from top-left, relative to the map's UP direction. The
//! map is immutable once parsed; the estimator only ever reads it.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod parse;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use owo_colors::OwoColorize;

// Internal
pub use parse::{load_map_image, parse_map};
use crate::colour::Colour;
use crate::loc::Heading;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The static street map.
#[derive(Debug, Clone)]
pub struct StreetMap {
    /// Number of intersections along the horizontal axis
    sx: usize,

    /// Number of intersections along the vertical axis
    sy: usize,

    /// Building colours for each intersection, clockwise from top-left,
    /// raster ordered
    corners: Vec<[Colour; 4]>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors when building or parsing a map.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    #[error("Cannot open the map image: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unable to determine intersection geometry from the map image")]
    GeometryNotFound,

    #[error("The map contains no intersections")]
    Empty,

    #[error("Expected {expected} intersections, found {found}")]
    SizeMismatch { expected: usize, found: usize },

    #[error(
        "Colour is not valid for intersection ({x}, {y}), corner {corner}: \
         RGB = {rgb:?}"
    )]
    InvalidBuildingColour {
        x: usize,
        y: usize,
        corner: usize,
        rgb: [u8; 3],
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl StreetMap {
    /// Build a map from a raster-ordered corner colour list.
    pub fn from_corners(
        sx: usize,
        sy: usize,
        corners: Vec<[Colour; 4]>,
    ) -> Result<Self, MapError> {
        if sx == 0 || sy == 0 {
            return Err(MapError::Empty);
        }

        if corners.len() != sx * sy {
            return Err(MapError::SizeMismatch {
                expected: sx * sy,
                found: corners.len(),
            });
        }

        Ok(Self { sx, sy, corners })
    }

    /// Number of intersections along the horizontal axis.
    pub fn sx(&self) -> usize {
        self.sx
    }

    /// Number of intersections along the vertical axis.
    pub fn sy(&self) -> usize {
        self.sy
    }

    /// Total number of intersections.
    pub fn num_intersections(&self) -> usize {
        self.sx * self.sy
    }

    /// Raster index of the intersection at `(x, y)`.
    pub fn index(&self, x: usize, y: usize) -> usize {
        x + y * self.sx
    }

    /// Grid coordinates of the intersection with the given raster index.
    pub fn coords(&self, index: usize) -> (usize, usize) {
        (index % self.sx, index / self.sx)
    }

    /// Whether the signed grid coordinates lie on the map.
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.sx && (y as usize) < self.sy
    }

    /// Building colours around the given intersection, clockwise from
    /// top-left relative to map-UP.
    pub fn corners(&self, index: usize) -> &[Colour; 4] {
        &self.corners[index]
    }

    /// Building colours around the given intersection as seen by a robot
    /// facing `heading`, clockwise from the robot's top-left.
    ///
    /// The stored colours are relative to UP; a robot facing `heading` sees
    /// them rotated by the heading's quarter turns.
    pub fn corners_facing(&self, index: usize, heading: Heading) -> [Colour; 4] {
        let stored = &self.corners[index];
        let mut out = [stored[0]; 4];

        for (z, slot) in out.iter_mut().enumerate() {
            *slot = stored[(heading.index() + z) % 4];
        }

        out
    }

    /// Render the map as a coloured string for terminal display.
    ///
    /// Each intersection is drawn as a 2x2 block of its building colours.
    pub fn render(&self) -> String {
        let mut out = String::new();

        for y in 0..self.sy {
            let mut top = String::new();
            let mut bottom = String::new();

            for x in 0..self.sx {
                let c = &self.corners[self.index(x, y)];
                top.push_str(&format!(
                    "{}{}  ",
                    coloured_block(c[0]),
                    coloured_block(c[1])
                ));
                bottom.push_str(&format!(
                    "{}{}  ",
                    coloured_block(c[3]),
                    coloured_block(c[2])
                ));
            }

            out.push_str(&top);
            out.push('\n');
            out.push_str(&bottom);
            out.push_str("\n\n");
        }

        out
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Get a terminal-coloured block for the given palette colour.
fn coloured_block(colour: Colour) -> String {
    let block = "\u{25a0}\u{25a0}";
    match colour {
        Colour::Black => format!("{}", block.dimmed()),
        Colour::Blue => format!("{}", block.blue()),
        Colour::Green => format!("{}", block.green()),
        Colour::Yellow => format!("{}", block.yellow()),
        Colour::Red => format!("{}", block.red()),
        Colour::White => format!("{}", block.white()),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
