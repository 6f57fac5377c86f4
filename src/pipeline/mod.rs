// Upload pipeline - resolves the watermark logo and runs image processing
//
// Watermark problems never fail an upload: every failure on the logo path is
// logged at warn and the image is processed without a watermark.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::image_optimizer::{
    process_image_with_limits, ImageError, ProcessedImageResult, RawImage, SecurityConfig,
};
use crate::watermark::{LogoCache, LogoHandle, WatermarkConfig, WatermarkError};

/// Processes uploads against a shared logo cache
pub struct ImagePipeline {
    logo_cache: Arc<LogoCache>,
    max_width: Option<u32>,
    max_height: Option<u32>,
    limits: SecurityConfig,
}

impl ImagePipeline {
    /// Create a pipeline using the given cache and default limits
    pub fn new(logo_cache: Arc<LogoCache>) -> Self {
        Self {
            logo_cache,
            max_width: None,
            max_height: None,
            limits: SecurityConfig::default(),
        }
    }

    /// Build the pipeline and its logo cache from application config
    pub fn from_config(config: &AppConfig) -> Result<Self, WatermarkError> {
        let cache = LogoCache::new(config.logo_cache.to_cache_config())?;
        Ok(Self::new(Arc::new(cache))
            .with_max_dimensions(config.processing.max_width, config.processing.max_height)
            .with_limits(config.processing.security_config()))
    }

    /// Override the bounding box chosen by the compression policy
    pub fn with_max_dimensions(mut self, max_width: Option<u32>, max_height: Option<u32>) -> Self {
        self.max_width = max_width;
        self.max_height = max_height;
        self
    }

    pub fn with_limits(mut self, limits: SecurityConfig) -> Self {
        self.limits = limits;
        self
    }

    pub fn logo_cache(&self) -> &Arc<LogoCache> {
        &self.logo_cache
    }

    /// Find the logo to stamp, if any.
    ///
    /// Returns `None` without touching the cache when watermarking is disabled
    /// or the config is invalid. Otherwise each configured source is tried in
    /// order and the first one that loads wins.
    pub async fn resolve_logo(&self, config: &WatermarkConfig) -> Option<LogoHandle> {
        if !config.enabled {
            return None;
        }

        if let Err(e) = config.validate() {
            tracing::warn!(error = %e, "Invalid watermark config, skipping watermark");
            return None;
        }

        for source in config.logo_sources() {
            match self.logo_cache.get_or_load(source).await {
                Ok(logo) => return Some(logo),
                Err(e) => {
                    tracing::warn!(
                        source = %source,
                        error = %e,
                        "Failed to load watermark logo"
                    );
                }
            }
        }

        tracing::debug!("No watermark logo available, processing without watermark");
        None
    }

    /// Optimize an upload and stamp the configured logo on it.
    ///
    /// Only failures of the uploaded image itself are returned as errors.
    /// Pixel work runs on the blocking thread pool.
    pub async fn process_image_with_watermark(
        &self,
        raw: RawImage,
        config: &WatermarkConfig,
    ) -> Result<ProcessedImageResult, ImageError> {
        let logo = self.resolve_logo(config).await;
        let options = config.to_options();
        let max_width = self.max_width;
        let max_height = self.max_height;
        let limits = self.limits.clone();

        tokio::task::spawn_blocking(move || {
            process_image_with_limits(
                &raw,
                logo.as_ref(),
                max_width,
                max_height,
                &options,
                &limits,
            )
        })
        .await
        .map_err(|e| ImageError::internal(e.to_string()))?
    }
}
