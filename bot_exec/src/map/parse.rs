//! Street map image parsing
//!
//! Maps are supplied as colour-segmented raster images: white background,
//! red border, black streets, yellow intersections, and buildings in pure
//! green, blue, or white. The size and resolution of the image do not
//! matter; the intersection geometry (anchor, width and pitch) is recovered
//! from the first yellow region found.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use image::RgbImage;
use log::{debug, info};
use nalgebra::Point2;
use std::path::Path;

// Internal
use super::{MapError, StreetMap};
use crate::colour::Colour;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const YELLOW: [u8; 3] = [255, 255, 0];
const GREEN: [u8; 3] = [0, 255, 0];
const BLUE: [u8; 3] = [0, 0, 255];
const WHITE: [u8; 3] = [255, 255, 255];

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Pixel geometry of the intersection grid within the image.
#[derive(Debug, Clone, Copy)]
struct GridGeometry {
    /// Top-left pixel of the first intersection
    anchor: Point2<u32>,

    /// Pixel size of an intersection in x and y
    width: Point2<u32>,

    /// Pixel distance between successive intersections in x and y
    pitch: Point2<u32>,
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load and parse a street map from an image file.
pub fn load_map_image<P: AsRef<Path>>(path: P) -> Result<StreetMap, MapError> {
    let img = image::open(path)?.to_rgb8();
    parse_map(&img)
}

/// Parse a street map from a raster image.
pub fn parse_map(img: &RgbImage) -> Result<StreetMap, MapError> {
    let geom = find_geometry(img)?;

    debug!(
        "Intersection geometry: anchor = ({}, {}), width = ({}, {}), pitch = ({}, {})",
        geom.anchor.x, geom.anchor.y, geom.width.x, geom.width.y, geom.pitch.x, geom.pitch.y
    );

    // Count intersections by striding across the centres of the first row
    // and column
    let mut sx = 0;
    let mut x = geom.anchor.x + geom.width.x / 2;
    while x < img.width() {
        if pixel(img, x, geom.anchor.y) == Some(YELLOW) {
            sx += 1;
        }
        x += geom.pitch.x;
    }

    let mut sy = 0;
    let mut y = geom.anchor.y + geom.width.y / 2;
    while y < img.height() {
        if pixel(img, geom.anchor.x, y) == Some(YELLOW) {
            sy += 1;
        }
        y += geom.pitch.y;
    }

    if sx == 0 || sy == 0 {
        return Err(MapError::Empty);
    }

    info!("Map size: {} x {} intersections", sx, sy);

    // Sample the building colours one intersection-width out from each
    // corner of every intersection
    let mut corners = Vec::with_capacity(sx * sy);

    for j in 0..sy {
        for i in 0..sx {
            let cx = (geom.anchor.x + i as u32 * geom.pitch.x + geom.width.x / 2) as i64;
            let cy = (geom.anchor.y + j as u32 * geom.pitch.y + geom.width.y / 2) as i64;
            let wx = geom.width.x as i64;
            let wy = geom.width.y as i64;

            // Clockwise from top-left
            let offsets = [
                (cx - wx, cy - wy),
                (cx + wx, cy - wy),
                (cx + wx, cy + wy),
                (cx - wx, cy + wy),
            ];

            let mut cell = [Colour::White; 4];

            for (corner, (px, py)) in offsets.iter().enumerate() {
                let rgb = signed_pixel(img, *px, *py)
                    .ok_or(MapError::GeometryNotFound)?;

                cell[corner] = match rgb {
                    GREEN => Colour::Green,
                    BLUE => Colour::Blue,
                    WHITE => Colour::White,
                    _ => {
                        return Err(MapError::InvalidBuildingColour {
                            x: i,
                            y: j,
                            corner,
                            rgb,
                        })
                    }
                };
            }

            corners.push(cell);
        }
    }

    StreetMap::from_corners(sx, sy, corners)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Recover the intersection grid geometry from the first yellow region.
fn find_geometry(img: &RgbImage) -> Result<GridGeometry, MapError> {
    // Find the top-left pixel of the first intersection
    let mut anchor = None;

    'outer: for x in 0..img.width() {
        for y in 0..img.height() {
            if pixel(img, x, y) == Some(YELLOW) {
                anchor = Some((x, y));
                break 'outer;
            }
        }
    }

    let (bx, by) = anchor.ok_or(MapError::GeometryNotFound)?;

    // Scan right along the anchor row for the intersection width and the
    // distance to the next intersection
    let mut wx = None;
    let mut dx = None;

    for k in bx..img.width() {
        let yellow = pixel(img, k, by) == Some(YELLOW);
        if wx.is_none() && !yellow {
            wx = Some(k - bx);
        }
        if wx.is_some() && yellow {
            dx = Some(k - bx);
            break;
        }
    }

    // Scan down the anchor column for the height and vertical distance
    let mut wy = None;
    let mut dy = None;

    for k in by..img.height() {
        let yellow = pixel(img, bx, k) == Some(YELLOW);
        if wy.is_none() && !yellow {
            wy = Some(k - by);
        }
        if wy.is_some() && yellow {
            dy = Some(k - by);
            break;
        }
    }

    match (wx, dx, wy, dy) {
        (Some(wx), Some(dx), Some(wy), Some(dy)) => Ok(GridGeometry {
            anchor: Point2::new(bx, by),
            width: Point2::new(wx, wy),
            pitch: Point2::new(dx, dy),
        }),
        _ => Err(MapError::GeometryNotFound),
    }
}

/// Get the RGB triple at the given pixel, or `None` if outside the image.
fn pixel(img: &RgbImage, x: u32, y: u32) -> Option<[u8; 3]> {
    if x < img.width() && y < img.height() {
        Some(img.get_pixel(x, y).0)
    } else {
        None
    }
}

/// As [`pixel`] but accepting signed coordinates.
fn signed_pixel(img: &RgbImage, x: i64, y: i64) -> Option<[u8; 3]> {
    if x < 0 || y < 0 {
        return None;
    }
    pixel(img, x as u32, y as u32)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    /// Draw a synthetic map image with the given corner colours.
    ///
    /// Intersections are 8px yellow squares on a 24px pitch with black
    /// streets between them and a red border around the sheet.
    fn draw_map(sx: usize, sy: usize, corners: &[[Colour; 4]]) -> RgbImage {
        let margin = 20u32;
        let cell = 8u32;
        let pitch = 24u32;

        let w = 2 * margin + (sx as u32 - 1) * pitch + cell;
        let h = 2 * margin + (sy as u32 - 1) * pitch + cell;

        let mut img = RgbImage::from_pixel(w, h, image::Rgb(WHITE));

        // Red border
        for x in 0..w {
            for t in 0..2 {
                img.put_pixel(x, t, image::Rgb([255, 0, 0]));
                img.put_pixel(x, h - 1 - t, image::Rgb([255, 0, 0]));
            }
        }
        for y in 0..h {
            for t in 0..2 {
                img.put_pixel(t, y, image::Rgb([255, 0, 0]));
                img.put_pixel(w - 1 - t, y, image::Rgb([255, 0, 0]));
            }
        }

        // Streets: black strips joining intersection centres
        for j in 0..sy {
            let cy = margin + j as u32 * pitch + cell / 2;
            for x in margin..(margin + (sx as u32 - 1) * pitch + cell) {
                img.put_pixel(x, cy, image::Rgb([0, 0, 0]));
            }
        }
        for i in 0..sx {
            let cx = margin + i as u32 * pitch + cell / 2;
            for y in margin..(margin + (sy as u32 - 1) * pitch + cell) {
                img.put_pixel(cx, y, image::Rgb([0, 0, 0]));
            }
        }

        // Yellow intersection squares
        for j in 0..sy {
            for i in 0..sx {
                let bx = margin + i as u32 * pitch;
                let by = margin + j as u32 * pitch;
                for x in bx..(bx + cell) {
                    for y in by..(by + cell) {
                        img.put_pixel(x, y, image::Rgb(YELLOW));
                    }
                }
            }
        }

        // Building pixels at the corner sample points
        for j in 0..sy {
            for i in 0..sx {
                let cx = (margin + i as u32 * pitch + cell / 2) as i64;
                let cy = (margin + j as u32 * pitch + cell / 2) as i64;
                let offsets = [
                    (cx - cell as i64, cy - cell as i64),
                    (cx + cell as i64, cy - cell as i64),
                    (cx + cell as i64, cy + cell as i64),
                    (cx - cell as i64, cy + cell as i64),
                ];

                for (corner, (px, py)) in offsets.iter().enumerate() {
                    let rgb = match corners[i + j * sx][corner] {
                        Colour::Green => GREEN,
                        Colour::Blue => BLUE,
                        _ => WHITE,
                    };
                    img.put_pixel(*px as u32, *py as u32, image::Rgb(rgb));
                }
            }
        }

        img
    }

    #[test]
    fn test_parse_synthetic_map() {
        let corners = vec![
            [Colour::Green, Colour::Blue, Colour::White, Colour::Green],
            [Colour::Blue, Colour::Blue, Colour::Green, Colour::White],
            [Colour::White, Colour::Green, Colour::Blue, Colour::Blue],
            [Colour::Green, Colour::Green, Colour::Green, Colour::Blue],
            [Colour::Blue, Colour::White, Colour::White, Colour::Green],
            [Colour::White, Colour::White, Colour::Blue, Colour::Green],
        ];

        let img = draw_map(3, 2, &corners);
        let map = parse_map(&img).unwrap();

        assert_eq!(map.sx(), 3);
        assert_eq!(map.sy(), 2);

        for (i, cell) in corners.iter().enumerate() {
            assert_eq!(map.corners(i), cell, "intersection {}", i);
        }
    }

    #[test]
    fn test_parse_rejects_blank_image() {
        let img = RgbImage::from_pixel(64, 64, image::Rgb(WHITE));

        assert!(matches!(
            parse_map(&img),
            Err(MapError::GeometryNotFound)
        ));
    }

    #[test]
    fn test_parse_rejects_invalid_building() {
        let corners = vec![[Colour::Green; 4]; 4];
        let mut img = draw_map(2, 2, &corners);

        // Corrupt the top-left building pixel of intersection (0, 0)
        let cx = 20 + 4;
        let cy = 20 + 4;
        img.put_pixel(cx - 8, cy - 8, image::Rgb([200, 10, 150]));

        assert!(matches!(
            parse_map(&img),
            Err(MapError::InvalidBuildingColour {
                x: 0,
                y: 0,
                corner: 0,
                ..
            })
        ));
    }
}
