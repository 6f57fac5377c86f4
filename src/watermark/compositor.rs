//! Watermark compositor for stamping logos onto images.
//!
//! The renderer resamples the logo once to its target size and then draws it
//! tile by tile. Every tile draw receives its own center, rotation and
//! opacity; there is no shared drawing state between tiles or between calls.
//!
//! Rotated tiles are drawn by inverse-mapping each destination pixel inside
//! the tile's rotated bounding box back into logo space and sampling the logo
//! bilinearly, then blending with the Porter-Duff "over" operator.
//!
//! # Example
//!
//! ```ignore
//! use watermill::watermark::{render_watermark, WatermarkOptions};
//!
//! let report = render_watermark(&mut surface, &logo, &WatermarkOptions::default());
//! assert_eq!(report.attempted, 12);
//! ```

use super::logo_cache::LogoHandle;
use super::position::{
    pattern_tiles, single_position_center, Bounds, LogoSize, SurfaceDimensions,
};
use super::{WatermarkOptions, WatermarkPosition};
use image::imageops::FilterType;
use image::{Rgba, RgbaImage};

/// Outcome of one render call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Tiles the layout produced
    pub attempted: usize,
    /// Tiles actually drawn
    pub drawn: usize,
    /// Tiles left out because they did not fit on the surface
    pub skipped: usize,
}

/// Parameters for drawing one tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileDraw {
    /// Tile center in surface coordinates
    pub center: (f64, f64),
    /// Clockwise rotation about the center
    pub angle_degrees: f64,
    /// Opacity multiplied into the logo's own alpha
    pub opacity: f32,
}

/// Stamp `logo` onto `surface` according to `options`.
///
/// Pattern mode attempts `pattern_rows * pattern_cols` tiles and skips every
/// tile whose rotated bounding box leaves the surface. Single positions draw
/// once unless the logo does not fit. Invalid options and degenerate
/// geometry (empty surface or a logo that rounds to nothing) draw nothing.
pub fn render_watermark(
    surface: &mut RgbaImage,
    logo: &LogoHandle,
    options: &WatermarkOptions,
) -> RenderReport {
    let dims = SurfaceDimensions {
        width: surface.width(),
        height: surface.height(),
    };
    if dims.width == 0 || dims.height == 0 {
        return RenderReport::default();
    }
    if let Err(e) = options.validate() {
        tracing::debug!(error = %e, "Invalid watermark options, nothing rendered");
        return RenderReport::default();
    }

    let size = LogoSize::fit(&dims, logo.aspect_ratio(), options.size_ratio as f64);
    if size.is_degenerate() {
        tracing::debug!(
            width = dims.width,
            height = dims.height,
            "Logo too small to render, skipping watermark"
        );
        return RenderReport::default();
    }

    let (logo_w, logo_h) = size.pixel_size();
    let scaled = image::imageops::resize(logo.image(), logo_w, logo_h, FilterType::Lanczos3);
    let angle = options.angle_degrees as f64;
    let opacity = options.opacity.clamp(0.0, 1.0);

    let centers: Box<dyn Iterator<Item = (f64, f64)>> = match options.position {
        WatermarkPosition::Pattern => Box::new(
            pattern_tiles(
                &dims,
                options.pattern_rows,
                options.pattern_cols,
                &options.margins,
            )
            .map(|tile| tile.center),
        ),
        position => Box::new(std::iter::once(single_position_center(
            position, &dims, &size,
        ))),
    };

    let mut report = RenderReport::default();

    for center in centers {
        report.attempted += 1;
        let fits = match options.position {
            WatermarkPosition::Pattern => Bounds::rotated(center, &size, angle).fits_within(&dims),
            _ => size.width <= dims.width as f64 && size.height <= dims.height as f64,
        };
        if !fits {
            report.skipped += 1;
            continue;
        }

        draw_tile(
            surface,
            &scaled,
            &TileDraw {
                center,
                angle_degrees: angle,
                opacity,
            },
        );
        report.drawn += 1;
    }

    tracing::debug!(
        position = options.position.as_str(),
        attempted = report.attempted,
        drawn = report.drawn,
        skipped = report.skipped,
        logo_width = logo_w,
        logo_height = logo_h,
        "Rendered watermark"
    );

    report
}

/// Draw one (already scaled) logo tile onto the surface.
///
/// Pixels outside the surface are clipped.
pub fn draw_tile(surface: &mut RgbaImage, logo: &RgbaImage, tile: &TileDraw) {
    let logo_w = logo.width() as f64;
    let logo_h = logo.height() as f64;
    if logo_w == 0.0 || logo_h == 0.0 || tile.opacity <= 0.0 {
        return;
    }

    let size = LogoSize {
        width: logo_w,
        height: logo_h,
    };
    let bounds = Bounds::rotated(tile.center, &size, tile.angle_degrees);
    let (sin, cos) = tile.angle_degrees.to_radians().sin_cos();

    let x_start = bounds.min_x.floor().max(0.0) as u32;
    let y_start = bounds.min_y.floor().max(0.0) as u32;
    let x_end = (bounds.max_x.ceil().max(0.0) as u32).min(surface.width());
    let y_end = (bounds.max_y.ceil().max(0.0) as u32).min(surface.height());

    for ty in y_start..y_end {
        for tx in x_start..x_end {
            let dx = tx as f64 + 0.5 - tile.center.0;
            let dy = ty as f64 + 0.5 - tile.center.1;

            // Inverse rotation back into the logo's own frame
            let lx = dx * cos + dy * sin + logo_w / 2.0;
            let ly = -dx * sin + dy * cos + logo_h / 2.0;
            if lx < 0.0 || ly < 0.0 || lx > logo_w || ly > logo_h {
                continue;
            }

            let Some(fg) = sample_bilinear(logo, lx - 0.5, ly - 0.5) else {
                continue;
            };
            let bg = *surface.get_pixel(tx, ty);
            surface.put_pixel(tx, ty, blend_pixels(bg, fg, tile.opacity));
        }
    }
}

/// Bilinear sample at a continuous pixel coordinate. Texels outside the
/// logo count as fully transparent so rotated edges are anti-aliased.
fn sample_bilinear(image: &RgbaImage, x: f64, y: f64) -> Option<Rgba<u8>> {
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;
    let (x0, y0) = (x0 as i64, y0 as i64);

    let texel = |x: i64, y: i64| -> [f64; 4] {
        if x < 0 || y < 0 || x >= image.width() as i64 || y >= image.height() as i64 {
            return [0.0; 4];
        }
        let p = image.get_pixel(x as u32, y as u32);
        let a = p[3] as f64;
        // premultiply so transparent texels do not bleed color
        [p[0] as f64 * a, p[1] as f64 * a, p[2] as f64 * a, a]
    };

    let weights = [
        ((1.0 - fx) * (1.0 - fy), texel(x0, y0)),
        (fx * (1.0 - fy), texel(x0 + 1, y0)),
        ((1.0 - fx) * fy, texel(x0, y0 + 1)),
        (fx * fy, texel(x0 + 1, y0 + 1)),
    ];

    let mut acc = [0.0f64; 4];
    for (w, t) in weights {
        for i in 0..4 {
            acc[i] += w * t[i];
        }
    }

    let alpha = acc[3];
    if alpha < 0.5 {
        return None;
    }
    let channel = |v: f64| (v / alpha).round().clamp(0.0, 255.0) as u8;
    Some(Rgba([
        channel(acc[0]),
        channel(acc[1]),
        channel(acc[2]),
        alpha.round().clamp(0.0, 255.0) as u8,
    ]))
}

/// Blend two pixels using alpha compositing with additional opacity.
///
/// Uses the "over" operator: result = foreground + background * (1 - foreground.alpha)
fn blend_pixels(background: Rgba<u8>, foreground: Rgba<u8>, opacity: f32) -> Rgba<u8> {
    let fg_alpha = (foreground[3] as f32 / 255.0) * opacity.clamp(0.0, 1.0);
    let bg_alpha = background[3] as f32 / 255.0;

    let out_alpha = fg_alpha + bg_alpha * (1.0 - fg_alpha);

    if out_alpha < 0.001 {
        return Rgba([0, 0, 0, 0]);
    }

    let blend_channel = |fg: u8, bg: u8| -> u8 {
        let fg_f = fg as f32 / 255.0;
        let bg_f = bg as f32 / 255.0;
        let result = (fg_f * fg_alpha + bg_f * bg_alpha * (1.0 - fg_alpha)) / out_alpha;
        (result * 255.0).round().clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend_channel(foreground[0], background[0]),
        blend_channel(foreground[1], background[1]),
        blend_channel(foreground[2], background[2]),
        (out_alpha * 255.0).round() as u8,
    ])
}
