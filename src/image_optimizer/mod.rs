//! Image optimization module
//!
//! Turns an uploaded photo into a web-sized JPEG:
//! - MIME, file size and dimension checks before any pixel work
//! - EXIF orientation correction
//! - Size-dependent compression tiers (see [`select_optimization`])
//! - Lanczos3 downscaling, never upscaling
//! - Optional logo watermark before encoding
//!
//! # Tiers
//!
//! ```text
//! 12 MP (4000x3000)  -> 1000x750  @ q60
//!  6 MP (3000x2000)  ->  900x600  @ q65
//!  3 MP (2000x1500)  ->  800x600  @ q70
//! ```

pub mod encoder;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod processor;
pub mod security;

// Re-export commonly used types
pub use encoder::{EncodedImage, EncoderQuality, JpegEncoder, OutputFormat};
pub use error::ImageError;
pub use metrics::{ImageProcessingMetrics, ImageProcessingMetricsBuilder};
pub use policy::{select_optimization, CompressionTier, OptimizationSettings};
pub use processor::{
    calculate_dimensions, process_image, process_image_with_limits, ProcessedImageResult, RawImage,
};
pub use security::{
    validate_dimensions, validate_file_size, validate_mime_type, SecurityConfig,
    SUPPORTED_MIME_TYPES,
};
