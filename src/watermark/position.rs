//! Placement geometry for logo watermarks.
//!
//! Everything here is pure arithmetic on floating point pixel coordinates:
//! logo sizing, pattern grid layout, single-position anchors and the rotated
//! bounding boxes used to decide whether a tile fits on the canvas.
//!
//! # Example
//!
//! ```
//! use watermill::watermark::position::{pattern_tiles, SurfaceDimensions};
//! use watermill::watermark::PatternMargins;
//!
//! let surface = SurfaceDimensions { width: 1000, height: 800 };
//! let tiles: Vec<_> = pattern_tiles(&surface, 3, 4, &PatternMargins::default()).collect();
//! assert_eq!(tiles.len(), 12);
//! let (x, y) = tiles[0].center;
//! assert!((x - 80.0).abs() < 1e-9 && (y - 96.0).abs() < 1e-9);
//! ```

use super::{PatternMargins, WatermarkPosition};

/// Inset from the image edge for corner positions, in pixels.
pub const CORNER_INSET: f64 = 20.0;

/// Dimensions of the surface being watermarked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceDimensions {
    pub width: u32,
    pub height: u32,
}

/// Rendered logo size in (fractional) pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogoSize {
    pub width: f64,
    pub height: f64,
}

impl LogoSize {
    /// Scale a logo against the shorter side of the surface, preserving its
    /// aspect ratio (`width / height`).
    pub fn fit(surface: &SurfaceDimensions, logo_aspect: f64, size_ratio: f64) -> Self {
        let base = surface.width.min(surface.height) as f64;
        let size = base * size_ratio;
        if logo_aspect > 1.0 {
            Self {
                width: size,
                height: size / logo_aspect,
            }
        } else {
            Self {
                width: size * logo_aspect,
                height: size,
            }
        }
    }

    /// Integer pixel size used when resampling the logo bitmap
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.round().max(1.0) as u32,
            self.height.round().max(1.0) as u32,
        )
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.width >= 0.5 && self.height >= 0.5)
    }
}

/// Axis-aligned bounding box in surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Bounding box of a `width` x `height` rectangle centred on `center`
    /// after rotating it by `angle_degrees`.
    pub fn rotated(center: (f64, f64), logo: &LogoSize, angle_degrees: f64) -> Self {
        let (sin, cos) = angle_degrees.to_radians().sin_cos();
        let half_w = (logo.width * cos.abs() + logo.height * sin.abs()) / 2.0;
        let half_h = (logo.width * sin.abs() + logo.height * cos.abs()) / 2.0;
        Self {
            min_x: center.0 - half_w,
            min_y: center.1 - half_h,
            max_x: center.0 + half_w,
            max_y: center.1 + half_h,
        }
    }

    /// True when the box lies entirely inside `[0, width] x [0, height]`.
    ///
    /// A small epsilon absorbs rounding from the trig above so that an
    /// unrotated tile touching the edge still counts as inside.
    pub fn fits_within(&self, surface: &SurfaceDimensions) -> bool {
        const EPSILON: f64 = 1e-6;
        self.min_x >= -EPSILON
            && self.min_y >= -EPSILON
            && self.max_x <= surface.width as f64 + EPSILON
            && self.max_y <= surface.height as f64 + EPSILON
    }
}

/// Pixel margins around the pattern grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternMarginsPx {
    pub x: f64,
    pub y: f64,
}

/// Margins for pattern mode: the longer axis gets the smaller ratio.
pub fn pattern_margins(surface: &SurfaceDimensions, margins: &PatternMargins) -> PatternMarginsPx {
    let ratio_x = if surface.width > surface.height {
        margins.major
    } else {
        margins.minor
    };
    let ratio_y = if surface.height > surface.width {
        margins.major
    } else {
        margins.minor
    };
    PatternMarginsPx {
        x: surface.width as f64 * ratio_x,
        y: surface.height as f64 * ratio_y,
    }
}

/// One attempted tile of the pattern grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternTile {
    pub row: u32,
    pub col: u32,
    pub center: (f64, f64),
}

/// Tile centers for an evenly spaced `rows` x `cols` grid.
///
/// With more than one column the first and last centers sit exactly on the
/// margins; a single column is centred. Rows behave the same way. Tiles are
/// yielded row-major and computed on demand.
pub fn pattern_tiles(
    surface: &SurfaceDimensions,
    rows: u32,
    cols: u32,
    margins: &PatternMargins,
) -> impl Iterator<Item = PatternTile> {
    let margin = pattern_margins(surface, margins);
    let width = surface.width as f64;
    let height = surface.height as f64;

    (0..rows).flat_map(move |row| {
        let y = axis_center(height, margin.y, rows, row);
        (0..cols).map(move |col| PatternTile {
            row,
            col,
            center: (axis_center(width, margin.x, cols, col), y),
        })
    })
}

fn axis_center(extent: f64, margin: f64, count: u32, index: u32) -> f64 {
    if count <= 1 {
        return extent / 2.0;
    }
    let available = extent - 2.0 * margin;
    let step = available / (count - 1) as f64;
    margin + step * index as f64
}

/// Center of a single-position stamp.
///
/// Corner positions are inset by [`CORNER_INSET`]; `Center` is exact.
/// `Pattern` has no single anchor and falls back to the centre.
pub fn single_position_center(
    position: WatermarkPosition,
    surface: &SurfaceDimensions,
    logo: &LogoSize,
) -> (f64, f64) {
    let w = surface.width as f64;
    let h = surface.height as f64;
    let (x, y) = match position {
        WatermarkPosition::TopLeft => (CORNER_INSET, CORNER_INSET),
        WatermarkPosition::TopRight => (w - logo.width - CORNER_INSET, CORNER_INSET),
        WatermarkPosition::BottomLeft => (CORNER_INSET, h - logo.height - CORNER_INSET),
        WatermarkPosition::BottomRight => (
            w - logo.width - CORNER_INSET,
            h - logo.height - CORNER_INSET,
        ),
        WatermarkPosition::Center | WatermarkPosition::Pattern => {
            ((w - logo.width) / 2.0, (h - logo.height) / 2.0)
        }
    };
    (x + logo.width / 2.0, y + logo.height / 2.0)
}
