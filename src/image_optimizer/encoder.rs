//! Output encoding
//!
//! Every optimized image is written as baseline JPEG. Transparency is
//! flattened onto white first.

use super::error::ImageError;

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Jpeg,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
        }
    }
}

/// Quality settings for image encoding
#[derive(Debug, Clone, Copy)]
pub struct EncoderQuality {
    /// Quality value (1-100, where 100 is best quality)
    pub quality: u8,
}

impl EncoderQuality {
    pub fn with_quality(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }
}

/// Result of encoding an image
#[derive(Debug)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: OutputFormat,
    /// Content-Type header value
    pub content_type: &'static str,
}

impl EncodedImage {
    pub fn new(data: Vec<u8>, format: OutputFormat) -> Self {
        let content_type = format.content_type();
        Self {
            data,
            format,
            content_type,
        }
    }
}

/// Baseline JPEG encoder from the image crate
pub struct JpegEncoder;

impl JpegEncoder {
    /// Encode raw RGBA image data (4 bytes per pixel)
    pub fn encode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        quality: EncoderQuality,
    ) -> Result<EncodedImage, ImageError> {
        use image::codecs::jpeg::JpegEncoder as ImageJpegEncoder;
        use image::ImageEncoder as _;
        use std::io::Cursor;

        let format = OutputFormat::Jpeg;
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(ImageError::encode_failed(
                format.as_str(),
                format!("expected {} RGBA bytes, got {}", expected, data.len()),
            ));
        }

        let rgb_data = flatten_onto_white(data);

        let mut output = Cursor::new(Vec::new());
        let encoder = ImageJpegEncoder::new_with_quality(&mut output, quality.quality);

        encoder
            .write_image(&rgb_data, width, height, image::ColorType::Rgb8)
            .map_err(|e| ImageError::encode_failed(format.as_str(), e.to_string()))?;

        Ok(EncodedImage::new(output.into_inner(), format))
    }
}

/// Convert RGBA to RGB, compositing any transparency over white
fn flatten_onto_white(rgba: &[u8]) -> Vec<u8> {
    let pixel_count = rgba.len() / 4;
    let mut rgb = Vec::with_capacity(pixel_count * 3);

    for chunk in rgba.chunks_exact(4) {
        let alpha = chunk[3] as u32;
        if alpha == 255 {
            rgb.extend_from_slice(&chunk[..3]);
            continue;
        }
        for &c in &chunk[..3] {
            let v = (c as u32 * alpha + 255 * (255 - alpha) + 127) / 255;
            rgb.push(v as u8);
        }
    }

    rgb
}
