//! End-to-end upload processing through `ImagePipeline`

use super::test_images::{logo_png, photo};
use image::ImageFormat;
use rstest::rstest;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use watermill::image_optimizer::{ImageError, RawImage};
use watermill::pipeline::ImagePipeline;
use watermill::watermark::config::keys;
use watermill::watermark::{LogoCache, LogoCacheConfig, WatermarkConfig, WatermarkPosition};

fn pipeline() -> ImagePipeline {
    let cache = LogoCache::new(LogoCacheConfig {
        ttl: Duration::from_secs(60),
        fetch_timeout: Duration::from_secs(2),
        ..Default::default()
    })
    .unwrap();
    ImagePipeline::new(Arc::new(cache))
}

fn write_logo(dir: &TempDir) -> String {
    let path = dir.path().join("logo.png");
    std::fs::write(&path, logo_png()).unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_twelve_megapixel_upload() {
    let raw = RawImage::new(photo(4000, 3000, ImageFormat::Jpeg), "image/jpeg");
    let result = pipeline()
        .process_image_with_watermark(raw, &WatermarkConfig::default())
        .await
        .unwrap();

    assert_eq!((result.width, result.height), (1000, 750));
    assert_eq!(result.metrics.quality, 0.60);
    assert_eq!(result.metrics.original_dimensions, (4000, 3000));
    assert_eq!(result.content_type, "image/jpeg");

    let decoded = image::load_from_memory(&result.bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1000, 750));
}

#[tokio::test]
async fn test_unreachable_logo_still_processes() {
    let config = WatermarkConfig {
        logo_source: Some("https://127.0.0.1:9/logo.png".to_string()),
        ..Default::default()
    };
    let raw = RawImage::new(photo(640, 480, ImageFormat::Png), "image/png");

    let pipeline = pipeline();
    let result = pipeline
        .process_image_with_watermark(raw, &config)
        .await
        .unwrap();

    assert!(!result.had_watermark);
    assert_eq!((result.width, result.height), (600, 450));
    assert_eq!(pipeline.logo_cache().stats().load_failures, 1);
}

#[tokio::test]
async fn test_file_logo_is_stamped() {
    let dir = TempDir::new().unwrap();
    let logo = write_logo(&dir);
    let raw = RawImage::new(photo(500, 400, ImageFormat::Png), "image/png");
    let pipeline = pipeline();

    let plain = pipeline
        .process_image_with_watermark(raw.clone(), &WatermarkConfig::default())
        .await
        .unwrap();
    let config = WatermarkConfig {
        logo_source: Some(logo),
        opacity: 0.8,
        ..Default::default()
    };
    let stamped = pipeline
        .process_image_with_watermark(raw, &config)
        .await
        .unwrap();

    assert!(!plain.had_watermark);
    assert!(stamped.had_watermark);
    assert_eq!(stamped.metrics.watermark_tiles_drawn, 12);
    assert_ne!(plain.bytes, stamped.bytes);
}

#[tokio::test]
async fn test_broken_primary_logo_falls_back() {
    let dir = TempDir::new().unwrap();
    let fallback = write_logo(&dir);
    let broken = dir.path().join("broken.png");
    std::fs::write(&broken, b"not a png").unwrap();

    let config = WatermarkConfig {
        logo_source: Some(broken.to_string_lossy().into_owned()),
        fallback_logo_source: Some(fallback),
        position: WatermarkPosition::BottomRight,
        ..Default::default()
    };
    let raw = RawImage::new(photo(300, 300, ImageFormat::Png), "image/png");
    let result = pipeline()
        .process_image_with_watermark(raw, &config)
        .await
        .unwrap();

    assert!(result.had_watermark);
    assert_eq!(result.metrics.watermark_tiles_drawn, 1);
}

#[tokio::test]
async fn test_huge_pattern_grid_setting_is_ignored() {
    let dir = TempDir::new().unwrap();
    let logo = write_logo(&dir);
    let settings: HashMap<String, String> = [
        (keys::ENABLED, "true".to_string()),
        (keys::LOGO_URL, logo),
        (keys::POSITION, "pattern".to_string()),
        (keys::PATTERN_ROWS, "200000".to_string()),
        (keys::PATTERN_COLS, "200000".to_string()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();
    let config = WatermarkConfig::from_settings(&settings);
    assert!(config.validate().is_err());

    let raw = RawImage::new(photo(400, 300, ImageFormat::Png), "image/png");
    let result = pipeline()
        .process_image_with_watermark(raw, &config)
        .await
        .unwrap();

    assert!(!result.had_watermark);
    assert_eq!(result.metrics.watermark_tiles_drawn, 0);
    assert_eq!((result.width, result.height), (400, 300));
}

#[tokio::test]
async fn test_oversized_logo_file_is_skipped() {
    let dir = TempDir::new().unwrap();
    let logo = dir.path().join("huge.png");
    std::fs::write(&logo, photo(5000, 10, ImageFormat::Png)).unwrap();
    let config = WatermarkConfig {
        logo_source: Some(logo.to_string_lossy().into_owned()),
        ..Default::default()
    };

    let pipeline = pipeline();
    let raw = RawImage::new(photo(300, 200, ImageFormat::Png), "image/png");
    let result = pipeline
        .process_image_with_watermark(raw, &config)
        .await
        .unwrap();

    assert!(!result.had_watermark);
    assert_eq!(pipeline.logo_cache().stats().load_failures, 1);
    assert!(pipeline.logo_cache().is_empty());
}

#[tokio::test]
async fn test_corrupt_upload_is_an_error() {
    let raw = RawImage::new(b"definitely not an image".to_vec(), "image/png");
    let err = pipeline()
        .process_image_with_watermark(raw, &WatermarkConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ImageError::DecodeFailed { .. }));
    assert!(err.is_client_error());
}

#[rstest]
#[case(4000, 3000)]
#[case(3000, 2000)]
#[case(1999, 1001)]
#[case(1080, 1920)]
#[case(5000, 1000)]
#[case(1000, 3001)]
#[tokio::test]
async fn test_aspect_ratio_preserved(#[case] width: u32, #[case] height: u32) {
    let raw = RawImage::new(photo(width, height, ImageFormat::Jpeg), "image/jpeg");
    let result = pipeline()
        .process_image_with_watermark(raw, &WatermarkConfig::default())
        .await
        .unwrap();

    let settings = watermill::select_optimization(width, height);
    assert!(result.width <= settings.max_width && result.height <= settings.max_height);
    assert!(result.width <= width && result.height <= height);

    // Both axes scaled by the same factor, within one pixel of rounding
    let expected_height = result.width as f64 * height as f64 / width as f64;
    assert!((result.height as f64 - expected_height).abs() <= 1.0);
}
