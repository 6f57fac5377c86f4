// Watermark settings rows mapped onto render options

use std::collections::HashMap;
use watermill::watermark::config::keys;
use watermill::watermark::{WatermarkConfig, WatermarkPosition};

fn rows(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_admin_panel_settings() {
    let settings = rows(&[
        (keys::ENABLED, "1"),
        (keys::LOGO_URL, "https://cdn.example.com/brand.png"),
        (keys::DEFAULT_LOGO_URL, "/srv/assets/default.png"),
        (keys::OPACITY, "0.25"),
        (keys::SIZE, "0.1"),
        (keys::POSITION, "bottom_right"),
        (keys::PATTERN_ROWS, "2"),
        (keys::PATTERN_COLS, "5"),
        (keys::ANGLE, "15"),
    ]);

    let config = WatermarkConfig::from_settings(&settings);
    assert!(config.validate().is_ok());
    assert_eq!(
        config.logo_sources().collect::<Vec<_>>(),
        vec!["https://cdn.example.com/brand.png", "/srv/assets/default.png"]
    );

    let options = config.to_options();
    assert_eq!(options.opacity, 0.25);
    assert_eq!(options.size_ratio, 0.1);
    assert_eq!(options.position, WatermarkPosition::BottomRight);
    assert_eq!((options.pattern_rows, options.pattern_cols), (2, 5));
    assert_eq!(options.angle_degrees, 15.0);
}

#[test]
fn test_empty_settings_give_defaults() {
    let config = WatermarkConfig::from_settings(&HashMap::new());
    assert_eq!(config, WatermarkConfig::default());
    assert_eq!(config.logo_sources().count(), 0);
}

#[test]
fn test_garbage_values_fall_back() {
    let settings = rows(&[
        (keys::ENABLED, "maybe"),
        (keys::OPACITY, "very"),
        (keys::POSITION, "diagonal"),
        (keys::LOGO_URL, "   "),
    ]);
    let config = WatermarkConfig::from_settings(&settings);
    assert!(config.enabled);
    assert_eq!(config.opacity, 0.15);
    assert_eq!(config.position, WatermarkPosition::Pattern);
    assert!(config.logo_source.is_none());
}

#[test]
fn test_disabled_setting() {
    let config = WatermarkConfig::from_settings(&rows(&[(keys::ENABLED, "false")]));
    assert!(!config.enabled);
}
