// Watermill image upload library
// Size-aware optimization and logo watermarking for uploaded photos

pub mod config;
pub mod image_optimizer;
pub mod logging;
pub mod pipeline;
pub mod watermark;

pub use config::{AppConfig, ConfigError};
pub use image_optimizer::{
    process_image, select_optimization, ImageError, OptimizationSettings, ProcessedImageResult,
    RawImage,
};
pub use pipeline::ImagePipeline;
pub use watermark::{render_watermark, LogoCache, LogoHandle, WatermarkConfig, WatermarkOptions};
