//! Watermark error types.
//!
//! None of these reach the uploader: the pipeline logs them and carries on
//! without a watermark.

use std::fmt;
use std::time::Duration;

/// Errors that can occur while resolving or configuring a watermark.
#[derive(Debug)]
pub enum WatermarkError {
    /// Failed to fetch the logo from its source
    FetchError(String),

    /// Logo bytes could not be decoded
    DecodeError(String),

    /// Logo fetch did not finish in time
    Timeout { source: String, after: Duration },

    /// Invalid configuration
    ConfigError(String),
}

impl fmt::Display for WatermarkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchError(msg) => write!(f, "Failed to fetch logo: {}", msg),
            Self::DecodeError(msg) => write!(f, "Failed to decode logo image: {}", msg),
            Self::Timeout { source, after } => write!(
                f,
                "Timed out after {}ms fetching logo: {}",
                after.as_millis(),
                source
            ),
            Self::ConfigError(msg) => write!(f, "Watermark configuration error: {}", msg),
        }
    }
}

impl std::error::Error for WatermarkError {}
