//! Watermark configuration types.
//!
//! The site stores watermark settings as flat key-value rows. This module
//! turns those rows (or a YAML section) into a validated [`WatermarkConfig`]
//! and derives the per-render [`WatermarkOptions`] from it.

use super::WatermarkError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

// Default values
fn default_opacity() -> f32 {
    0.15
}

fn default_size_ratio() -> f32 {
    0.08
}

fn default_angle() -> f32 {
    -30.0
}

fn default_rows() -> u32 {
    3
}

fn default_cols() -> u32 {
    4
}

fn default_enabled() -> bool {
    true
}

/// Largest accepted pattern grid dimension, per axis.
pub const MAX_PATTERN_DIM: u32 = 50;

/// Settings-store keys understood by [`WatermarkConfig::from_settings`].
pub mod keys {
    pub const ENABLED: &str = "watermark_enabled";
    pub const LOGO_URL: &str = "watermark_logo_url";
    pub const DEFAULT_LOGO_URL: &str = "watermark_default_logo_url";
    pub const OPACITY: &str = "watermark_opacity";
    pub const SIZE: &str = "watermark_size";
    pub const POSITION: &str = "watermark_position";
    pub const PATTERN_ROWS: &str = "watermark_pattern_rows";
    pub const PATTERN_COLS: &str = "watermark_pattern_cols";
    pub const ANGLE: &str = "watermark_angle";
}

/// Where the logo is stamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkPosition {
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    /// Rotated grid of tiles across the whole image
    #[default]
    Pattern,
}

impl WatermarkPosition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::TopLeft => "top-left",
            Self::TopRight => "top-right",
            Self::BottomLeft => "bottom-left",
            Self::BottomRight => "bottom-right",
            Self::Pattern => "pattern",
        }
    }
}

impl FromStr for WatermarkPosition {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "center" | "centre" => Ok(Self::Center),
            "topleft" => Ok(Self::TopLeft),
            "topright" => Ok(Self::TopRight),
            "bottomleft" => Ok(Self::BottomLeft),
            "bottomright" => Ok(Self::BottomRight),
            "pattern" | "tiled" => Ok(Self::Pattern),
            _ => Err(WatermarkError::ConfigError(format!(
                "unknown watermark position: {}",
                s
            ))),
        }
    }
}

/// Margin ratios for pattern mode.
///
/// The longer axis uses `major`, the shorter (or equal) axis uses `minor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternMargins {
    pub major: f64,
    pub minor: f64,
}

impl Default for PatternMargins {
    fn default() -> Self {
        Self {
            major: 0.08,
            minor: 0.12,
        }
    }
}

/// Options for a single watermark render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatermarkOptions {
    /// Logo size as a fraction of the shorter image side, in (0, 1]
    pub size_ratio: f32,
    /// Tile opacity in [0, 1]
    pub opacity: f32,
    /// Rotation applied to every tile, clockwise in image coordinates
    pub angle_degrees: f32,
    pub position: WatermarkPosition,
    pub pattern_rows: u32,
    pub pattern_cols: u32,
    pub margins: PatternMargins,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        Self {
            size_ratio: default_size_ratio(),
            opacity: default_opacity(),
            angle_degrees: default_angle(),
            position: WatermarkPosition::default(),
            pattern_rows: default_rows(),
            pattern_cols: default_cols(),
            margins: PatternMargins::default(),
        }
    }
}

impl WatermarkOptions {
    pub fn validate(&self) -> Result<(), WatermarkError> {
        if !(self.size_ratio > 0.0 && self.size_ratio <= 1.0) {
            return Err(WatermarkError::ConfigError(format!(
                "size_ratio must be in (0, 1], got {}",
                self.size_ratio
            )));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(WatermarkError::ConfigError(format!(
                "opacity must be in [0, 1], got {}",
                self.opacity
            )));
        }
        if !self.angle_degrees.is_finite() {
            return Err(WatermarkError::ConfigError(
                "angle must be a finite number".to_string(),
            ));
        }
        if self.pattern_rows == 0 || self.pattern_cols == 0 {
            return Err(WatermarkError::ConfigError(format!(
                "pattern grid must be at least 1x1, got {}x{}",
                self.pattern_rows, self.pattern_cols
            )));
        }
        if self.pattern_rows > MAX_PATTERN_DIM || self.pattern_cols > MAX_PATTERN_DIM {
            return Err(WatermarkError::ConfigError(format!(
                "pattern grid must be at most {max}x{max}, got {}x{}",
                self.pattern_rows,
                self.pattern_cols,
                max = MAX_PATTERN_DIM
            )));
        }
        // margins of half the extent or more leave no room for the grid
        let margin_ok = |r: f64| r.is_finite() && (0.0..0.5).contains(&r);
        if !margin_ok(self.margins.major) || !margin_ok(self.margins.minor) {
            return Err(WatermarkError::ConfigError(format!(
                "pattern margins must be in [0, 0.5), got major={} minor={}",
                self.margins.major, self.margins.minor
            )));
        }
        Ok(())
    }
}

/// Watermark settings as persisted by the admin panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatermarkConfig {
    /// When false, images are optimized without any logo lookup
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Logo chosen in the watermark settings (https:// URL or file path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_source: Option<String>,

    /// Site default logo, tried when `logo_source` is missing or fails
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_logo_source: Option<String>,

    #[serde(default = "default_opacity")]
    pub opacity: f32,

    #[serde(default = "default_size_ratio")]
    pub size_ratio: f32,

    #[serde(default)]
    pub position: WatermarkPosition,

    #[serde(default = "default_rows")]
    pub pattern_rows: u32,

    #[serde(default = "default_cols")]
    pub pattern_cols: u32,

    #[serde(default = "default_angle")]
    pub angle_degrees: f32,

    /// Pattern margin ratios; settings rows never carry these
    #[serde(default)]
    pub margins: PatternMargins,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            logo_source: None,
            fallback_logo_source: None,
            opacity: default_opacity(),
            size_ratio: default_size_ratio(),
            position: WatermarkPosition::default(),
            pattern_rows: default_rows(),
            pattern_cols: default_cols(),
            angle_degrees: default_angle(),
            margins: PatternMargins::default(),
        }
    }
}

impl WatermarkConfig {
    /// Build a config from flat settings rows.
    ///
    /// Missing or unparsable values keep their defaults. Empty logo URLs are
    /// treated as unset.
    pub fn from_settings(settings: &HashMap<String, String>) -> Self {
        let defaults = Self::default();
        let source = |key: &str| {
            settings
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            enabled: parse_setting(settings, keys::ENABLED, parse_bool)
                .unwrap_or(defaults.enabled),
            logo_source: source(keys::LOGO_URL),
            fallback_logo_source: source(keys::DEFAULT_LOGO_URL),
            opacity: parse_setting(settings, keys::OPACITY, |v| v.parse().ok())
                .unwrap_or(defaults.opacity),
            size_ratio: parse_setting(settings, keys::SIZE, |v| v.parse().ok())
                .unwrap_or(defaults.size_ratio),
            position: parse_setting(settings, keys::POSITION, |v| v.parse().ok())
                .unwrap_or(defaults.position),
            pattern_rows: parse_setting(settings, keys::PATTERN_ROWS, |v| v.parse().ok())
                .unwrap_or(defaults.pattern_rows),
            pattern_cols: parse_setting(settings, keys::PATTERN_COLS, |v| v.parse().ok())
                .unwrap_or(defaults.pattern_cols),
            angle_degrees: parse_setting(settings, keys::ANGLE, |v| v.parse().ok())
                .unwrap_or(defaults.angle_degrees),
            margins: defaults.margins,
        }
    }

    /// Render options derived from this config.
    pub fn to_options(&self) -> WatermarkOptions {
        WatermarkOptions {
            size_ratio: self.size_ratio,
            opacity: self.opacity,
            angle_degrees: self.angle_degrees,
            position: self.position,
            pattern_rows: self.pattern_rows,
            pattern_cols: self.pattern_cols,
            margins: self.margins,
        }
    }

    /// Logo sources in the order they should be tried.
    pub fn logo_sources(&self) -> impl Iterator<Item = &str> {
        self.logo_source
            .iter()
            .chain(self.fallback_logo_source.iter())
            .map(String::as_str)
    }

    pub fn validate(&self) -> Result<(), WatermarkError> {
        self.to_options().validate()
    }
}

fn parse_setting<T>(
    settings: &HashMap<String, String>,
    key: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    let raw = settings.get(key)?;
    let parsed = parse(raw.trim());
    if parsed.is_none() {
        tracing::debug!(key = key, value = %raw, "Ignoring unparsable watermark setting");
    }
    parsed
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
