//! Loading `AppConfig` from disk and building a pipeline from it

use super::test_images::{logo_png, photo};
use image::ImageFormat;
use std::io::Write;
use tempfile::{NamedTempFile, TempDir};
use watermill::config::{AppConfig, ConfigError};
use watermill::image_optimizer::{ImageError, RawImage};
use watermill::pipeline::ImagePipeline;

fn write_config(yaml: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(yaml.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn test_pipeline_from_config_file() {
    let dir = TempDir::new().unwrap();
    let logo = dir.path().join("logo.png");
    std::fs::write(&logo, logo_png()).unwrap();
    std::env::set_var("WATERMILL_IT_LOGO", logo.to_string_lossy().as_ref());

    let file = write_config(
        r#"
watermark:
  logo_source: "${WATERMILL_IT_LOGO}"
  position: center
  angle_degrees: 0
logo_cache:
  ttl_seconds: 120
processing:
  max_width: 200
"#,
    );

    let config = AppConfig::from_file(file.path()).unwrap();
    config.validate().unwrap();
    assert_eq!(config.logo_cache.ttl_seconds, 120);

    let pipeline = ImagePipeline::from_config(&config).unwrap();
    assert_eq!(pipeline.logo_cache().ttl().as_secs(), 120);

    let raw = RawImage::new(photo(800, 400, ImageFormat::Png), "image/png");
    let result = pipeline
        .process_image_with_watermark(raw, &config.watermark)
        .await
        .unwrap();
    assert_eq!((result.width, result.height), (200, 100));
    assert!(result.had_watermark);
    assert_eq!(result.metrics.watermark_tiles_drawn, 1);
}

#[tokio::test]
async fn test_file_size_limit_from_config() {
    let file = write_config("processing:\n  max_file_size_bytes: 1024\n");
    let config = AppConfig::from_file(file.path()).unwrap();
    let pipeline = ImagePipeline::from_config(&config).unwrap();

    let raw = RawImage::new(photo(200, 200, ImageFormat::Png), "image/png");
    assert!(raw.len() > 1024);
    let err = pipeline
        .process_image_with_watermark(raw, &config.watermark)
        .await
        .unwrap_err();
    assert!(matches!(err, ImageError::FileTooLarge { max_size: 1024, .. }));
    assert!(err.is_client_error());
}

#[test]
fn test_invalid_watermark_section_fails_validation() {
    let file = write_config("watermark:\n  pattern_rows: 0\n");
    let config = AppConfig::from_file(file.path()).unwrap();
    let err = config.validate().unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("pattern grid"));
}

#[test]
fn test_unknown_position_is_a_parse_error() {
    let file = write_config("watermark:\n  position: sideways\n");
    let err = AppConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}
