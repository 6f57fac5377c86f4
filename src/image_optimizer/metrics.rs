//! Per-image processing diagnostics
//!
//! Returned alongside every processed image and logged by the processor. None
//! of these values are part of the persisted result.

use super::policy::CompressionTier;
use std::time::Duration;

/// Image processing metrics for a single operation
#[derive(Debug, Clone)]
pub struct ImageProcessingMetrics {
    /// Original image size in bytes
    pub original_size: usize,
    /// Processed image size in bytes
    pub processed_size: usize,
    /// Decoded (orientation-corrected) dimensions (width, height)
    pub original_dimensions: (u32, u32),
    /// Processed dimensions (width, height)
    pub processed_dimensions: (u32, u32),
    /// Encoder quality in (0, 1]
    pub quality: f32,
    pub tier: CompressionTier,
    /// Time taken to process
    pub processing_time: Duration,
    /// Watermark tiles drawn onto the surface
    pub watermark_tiles_drawn: usize,
    /// Watermark tiles skipped because they did not fit
    pub watermark_tiles_skipped: usize,
}

impl Default for ImageProcessingMetrics {
    fn default() -> Self {
        Self {
            original_size: 0,
            processed_size: 0,
            original_dimensions: (0, 0),
            processed_dimensions: (0, 0),
            quality: 0.0,
            tier: CompressionTier::Medium,
            processing_time: Duration::ZERO,
            watermark_tiles_drawn: 0,
            watermark_tiles_skipped: 0,
        }
    }
}

impl ImageProcessingMetrics {
    pub fn builder() -> ImageProcessingMetricsBuilder {
        ImageProcessingMetricsBuilder::default()
    }

    /// Fraction of the original bytes saved: `(original - processed) / original`.
    ///
    /// Negative when the output grew.
    pub fn compression_ratio(&self) -> f64 {
        if self.original_size == 0 {
            0.0
        } else {
            self.bytes_saved() as f64 / self.original_size as f64
        }
    }

    /// Calculate bytes saved by processing
    pub fn bytes_saved(&self) -> i64 {
        self.original_size as i64 - self.processed_size as i64
    }

    /// Check if the image was resized
    pub fn was_resized(&self) -> bool {
        self.original_dimensions != self.processed_dimensions
    }

    /// Processed pixels / original pixels
    pub fn resize_ratio(&self) -> f64 {
        let original_pixels = self.original_dimensions.0 as u64 * self.original_dimensions.1 as u64;
        let processed_pixels =
            self.processed_dimensions.0 as u64 * self.processed_dimensions.1 as u64;
        if original_pixels == 0 {
            0.0
        } else {
            processed_pixels as f64 / original_pixels as f64
        }
    }
}

/// Builder for ImageProcessingMetrics
#[derive(Debug, Clone, Default)]
pub struct ImageProcessingMetricsBuilder {
    metrics: ImageProcessingMetrics,
}

impl ImageProcessingMetricsBuilder {
    pub fn original_size(mut self, size: usize) -> Self {
        self.metrics.original_size = size;
        self
    }

    pub fn processed_size(mut self, size: usize) -> Self {
        self.metrics.processed_size = size;
        self
    }

    pub fn original_dimensions(mut self, width: u32, height: u32) -> Self {
        self.metrics.original_dimensions = (width, height);
        self
    }

    pub fn processed_dimensions(mut self, width: u32, height: u32) -> Self {
        self.metrics.processed_dimensions = (width, height);
        self
    }

    pub fn quality(mut self, quality: f32, tier: CompressionTier) -> Self {
        self.metrics.quality = quality;
        self.metrics.tier = tier;
        self
    }

    pub fn processing_time(mut self, time: Duration) -> Self {
        self.metrics.processing_time = time;
        self
    }

    pub fn watermark_tiles(mut self, drawn: usize, skipped: usize) -> Self {
        self.metrics.watermark_tiles_drawn = drawn;
        self.metrics.watermark_tiles_skipped = skipped;
        self
    }

    pub fn build(self) -> ImageProcessingMetrics {
        self.metrics
    }
}
