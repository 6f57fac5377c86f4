//! Size-dependent compression policy
//!
//! Larger originals get smaller bounding boxes and lower JPEG quality. The
//! selector is a total function of the decoded pixel dimensions and is
//! recomputed for every image.

use super::encoder::OutputFormat;

const ULTRA_HIGH_PIXELS: u64 = 8_000_000;
const HIGH_PIXELS: u64 = 4_000_000;
const MEDIUM_PIXELS: u64 = 2_000_000;

/// Aspect ratio above which an image counts as a wide panorama
const WIDE_ASPECT: f64 = 1.5;
/// Aspect ratio below which an image counts as a tall portrait
const TALL_ASPECT: f64 = 0.7;

/// Compression aggressiveness bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompressionTier {
    Low,
    Medium,
    High,
    UltraHigh,
}

impl CompressionTier {
    pub fn as_label(&self) -> &'static str {
        match self {
            CompressionTier::Low => "low",
            CompressionTier::Medium => "medium",
            CompressionTier::High => "high",
            CompressionTier::UltraHigh => "ultra_high",
        }
    }
}

/// Output bounds and quality chosen for one image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptimizationSettings {
    pub max_width: u32,
    pub max_height: u32,
    /// Encoder quality in (0, 1]
    pub quality: f32,
    pub format: OutputFormat,
    pub tier: CompressionTier,
}

impl OptimizationSettings {
    /// Replace the bounding box with caller overrides, keeping quality and tier.
    pub fn with_max_dimensions(mut self, max_width: Option<u32>, max_height: Option<u32>) -> Self {
        if let Some(w) = max_width {
            self.max_width = w;
        }
        if let Some(h) = max_height {
            self.max_height = h;
        }
        self
    }

    /// Quality on the 1-100 scale the JPEG encoder expects
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// Pick output bounds and quality from the source pixel dimensions.
///
/// | pixels        | max width (wide/else) | max height (tall/else) | quality |
/// |---------------|-----------------------|------------------------|---------|
/// | > 8 MP        | 1200 / 1000           | 1200 / 800             | 0.60    |
/// | (4 MP, 8 MP]  | 1000 / 900            | 1000 / 700             | 0.65    |
/// | (2 MP, 4 MP]  | 900 / 800             | 900 / 650              | 0.70    |
/// | <= 2 MP       | 800 / 600             | 800 / 500              | 0.75    |
pub fn select_optimization(width: u32, height: u32) -> OptimizationSettings {
    let pixels = width as u64 * height as u64;
    let aspect = if height == 0 {
        1.0
    } else {
        width as f64 / height as f64
    };
    let wide = aspect > WIDE_ASPECT;
    let tall = aspect < TALL_ASPECT;
    let pick = |wide_value: u32, tall_value: u32, default_w: u32, default_h: u32| {
        (
            if wide { wide_value } else { default_w },
            if tall { tall_value } else { default_h },
        )
    };

    let ((max_width, max_height), quality, tier) = if pixels > ULTRA_HIGH_PIXELS {
        (pick(1200, 1200, 1000, 800), 0.60, CompressionTier::UltraHigh)
    } else if pixels > HIGH_PIXELS {
        (pick(1000, 1000, 900, 700), 0.65, CompressionTier::High)
    } else if pixels > MEDIUM_PIXELS {
        (pick(900, 900, 800, 650), 0.70, CompressionTier::High)
    } else {
        (pick(800, 800, 600, 500), 0.75, CompressionTier::Medium)
    };

    OptimizationSettings {
        max_width,
        max_height,
        quality,
        format: OutputFormat::Jpeg,
        tier,
    }
}
