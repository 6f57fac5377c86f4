//! Logo watermarking for uploaded photos.
//!
//! Stamps a semi-transparent logo onto an image, either once at a fixed
//! position or as a rotated grid of tiles covering the whole picture (the
//! "stock photo" look).
//!
//! # Features
//!
//! - **Pattern mode**: `rows x cols` tiles laid out between aspect-dependent
//!   margins, every tile rotated by the same angle
//! - **Single positions**: center and the four corners (20px inset)
//! - **Logo cache**: decoded logos shared between uploads for 30 minutes
//! - **Settings mapping**: flat key-value settings to [`WatermarkConfig`]
//!
//! # Configuration Example
//!
//! ```yaml
//! watermark:
//!   enabled: true
//!   logo_source: "https://cdn.example.com/brand/logo.png"
//!   fallback_logo_source: "/srv/assets/default-logo.png"
//!   opacity: 0.15
//!   size_ratio: 0.08
//!   position: pattern
//!   pattern_rows: 3
//!   pattern_cols: 4
//!   angle_degrees: -30
//! ```

pub mod compositor;
pub mod config;
pub mod error;
pub mod logo_cache;
pub mod position;

pub use compositor::{draw_tile, render_watermark, RenderReport, TileDraw};
pub use config::{PatternMargins, WatermarkConfig, WatermarkOptions, WatermarkPosition};
pub use error::WatermarkError;
pub use logo_cache::{
    CacheStats, Clock, DefaultLogoLoader, LogoCache, LogoCacheConfig, LogoHandle, LogoLoader,
    LogoSource, ManualClock, SystemClock,
};
pub use position::{Bounds, LogoSize, PatternTile, SurfaceDimensions};
