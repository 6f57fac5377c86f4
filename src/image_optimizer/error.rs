//! Image processing error types
//!
//! Only failures of the primary image live here. Watermark problems are
//! recovered inside the pipeline and never surface as an `ImageError`.

use std::fmt;

/// Errors that can occur while optimizing an uploaded image
#[derive(Debug, Clone)]
pub enum ImageError {
    // === Input Errors ===
    /// Declared MIME type is not an image type we can decode
    UnsupportedFormat { format: String },
    /// Failed to decode image data
    DecodeFailed { message: String },
    /// Image dimensions exceed safety limits (image bomb protection)
    ImageBombDetected {
        width: u32,
        height: u32,
        pixels: u64,
        max_pixels: u64,
    },
    /// Input file size exceeds limit
    FileTooLarge { size: usize, max_size: usize },
    /// Decoded or requested dimensions are unusable
    InvalidDimensions {
        width: u32,
        height: u32,
        reason: String,
    },

    // === Processing Errors ===
    /// Resize operation failed
    ResizeFailed { message: String },
    /// Encoding to output format failed
    EncodeFailed { format: String, message: String },
    /// The processing task panicked or was cancelled
    Internal { message: String },
}

impl fmt::Display for ImageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageError::UnsupportedFormat { format } => {
                write!(f, "Unsupported image format: {}", format)
            }
            ImageError::DecodeFailed { message } => {
                write!(f, "Failed to decode image: {}", message)
            }
            ImageError::ImageBombDetected {
                width,
                height,
                pixels,
                max_pixels,
            } => {
                write!(
                    f,
                    "Image dimensions {}x{} ({} pixels) exceed limit of {} pixels",
                    width, height, pixels, max_pixels
                )
            }
            ImageError::FileTooLarge { size, max_size } => {
                write!(
                    f,
                    "File size {} bytes exceeds maximum {} bytes",
                    size, max_size
                )
            }
            ImageError::InvalidDimensions {
                width,
                height,
                reason,
            } => {
                write!(f, "Invalid dimensions {}x{}: {}", width, height, reason)
            }
            ImageError::ResizeFailed { message } => {
                write!(f, "Resize failed: {}", message)
            }
            ImageError::EncodeFailed { format, message } => {
                write!(f, "Failed to encode to {}: {}", format, message)
            }
            ImageError::Internal { message } => {
                write!(f, "Internal processing error: {}", message)
            }
        }
    }
}

impl std::error::Error for ImageError {}

impl ImageError {
    /// True for failures caused by the uploaded bytes rather than by us.
    ///
    /// Rejected uploads are reported to the uploader; everything else is an
    /// operational failure.
    pub fn is_client_error(&self) -> bool {
        match self {
            ImageError::UnsupportedFormat { .. }
            | ImageError::DecodeFailed { .. }
            | ImageError::ImageBombDetected { .. }
            | ImageError::FileTooLarge { .. }
            | ImageError::InvalidDimensions { .. } => true,

            ImageError::ResizeFailed { .. }
            | ImageError::EncodeFailed { .. }
            | ImageError::Internal { .. } => false,
        }
    }

    pub fn unsupported_format(format: impl Into<String>) -> Self {
        ImageError::UnsupportedFormat {
            format: format.into(),
        }
    }

    pub fn decode_failed(message: impl Into<String>) -> Self {
        ImageError::DecodeFailed {
            message: message.into(),
        }
    }

    pub fn resize_failed(message: impl Into<String>) -> Self {
        ImageError::ResizeFailed {
            message: message.into(),
        }
    }

    pub fn encode_failed(format: impl Into<String>, message: impl Into<String>) -> Self {
        ImageError::EncodeFailed {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ImageError::Internal {
            message: message.into(),
        }
    }

    pub fn image_bomb(width: u32, height: u32, max_pixels: u64) -> Self {
        ImageError::ImageBombDetected {
            width,
            height,
            pixels: width as u64 * height as u64,
            max_pixels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_display() {
        let err = ImageError::unsupported_format("image/tiff");
        assert_eq!(err.to_string(), "Unsupported image format: image/tiff");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_decode_failed_display() {
        let err = ImageError::decode_failed("invalid header");
        assert_eq!(err.to_string(), "Failed to decode image: invalid header");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_encode_failed_display() {
        let err = ImageError::encode_failed("jpeg", "encoder error");
        assert_eq!(err.to_string(), "Failed to encode to jpeg: encoder error");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_image_bomb_display() {
        let err = ImageError::image_bomb(10000, 10000, 50_000_000);
        assert!(err.to_string().contains("100000000 pixels"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_file_too_large_display() {
        let err = ImageError::FileTooLarge {
            size: 100_000_000,
            max_size: 50_000_000,
        };
        assert!(err.to_string().contains("100000000 bytes"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ImageError>();
    }
}
