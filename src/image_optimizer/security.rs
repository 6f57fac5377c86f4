//! Upload validation
//!
//! Guards the decoder against oversized payloads, image bombs and MIME types
//! we cannot decode.

use super::error::ImageError;

/// MIME types accepted for uploads
pub const SUPPORTED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/gif",
];

/// Limits applied to every uploaded image before and after decoding
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Maximum allowed source image width
    pub max_source_width: u32,
    /// Maximum allowed source image height
    pub max_source_height: u32,
    /// Maximum allowed total pixels (width * height)
    pub max_source_pixels: u64,
    /// Maximum source file size in bytes
    pub max_source_file_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_source_width: 20000,
            max_source_height: 20000,
            max_source_pixels: 100_000_000,         // 100 megapixels
            max_source_file_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

/// Validate image dimensions to prevent image bomb attacks
pub fn validate_dimensions(
    width: u32,
    height: u32,
    config: &SecurityConfig,
) -> Result<(), ImageError> {
    if width == 0 || height == 0 {
        return Err(ImageError::InvalidDimensions {
            width,
            height,
            reason: "image has no pixels".to_string(),
        });
    }

    let pixels = width as u64 * height as u64;
    if width > config.max_source_width
        || height > config.max_source_height
        || pixels > config.max_source_pixels
    {
        return Err(ImageError::image_bomb(
            width,
            height,
            config.max_source_pixels,
        ));
    }

    Ok(())
}

/// Validate file size before decoding
pub fn validate_file_size(size: usize, config: &SecurityConfig) -> Result<(), ImageError> {
    if size > config.max_source_file_size {
        return Err(ImageError::FileTooLarge {
            size,
            max_size: config.max_source_file_size,
        });
    }
    Ok(())
}

/// Validate the declared MIME type of an upload.
///
/// Parameters such as `; charset=binary` are ignored and matching is
/// case-insensitive.
pub fn validate_mime_type(mime_type: &str) -> Result<(), ImageError> {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if SUPPORTED_MIME_TYPES.contains(&essence.as_str()) {
        Ok(())
    } else {
        Err(ImageError::unsupported_format(mime_type))
    }
}
