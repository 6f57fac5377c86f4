//! Image fixtures shared by the integration tests

use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;

/// Encode a gradient test photo in the given format
pub fn photo(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 251) as u8, (y % 241) as u8, ((x + y) % 239) as u8, 255])
    });
    encode(DynamicImage::ImageRgba8(img), format)
}

/// Opaque white logo with a 2:1 aspect ratio
pub fn logo_png() -> Vec<u8> {
    let img = RgbaImage::from_pixel(80, 40, image::Rgba([255, 255, 255, 255]));
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img,
    };
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}
