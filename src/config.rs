//! TOML parameter-file support for repeatable runs.
//!
//! Instead of passing every policy value as a CLI flag, users can keep them
//! in a config file:
//!
//! ```toml
//! # mztrace.toml
//! [build]
//! min_scan_span = 6.0
//! intensity_threshold = 1000.0
//! start_intensity = 5000.0
//! mz = 0.001
//! ppm = 5.0
//! ```
//!
//! Explicit CLI flags always win over config-file values.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Root configuration structure for mztrace.toml files.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Build-specific settings.
    #[serde(default)]
    pub build: BuildConfig,
}

/// Configuration for the build command.
#[derive(Debug, Default, Deserialize)]
pub struct BuildConfig {
    /// Minimum continuous retention-time span above the intensity threshold.
    pub min_scan_span: Option<f64>,

    /// Intensity required for a point to extend a trace and count toward
    /// the span.
    pub intensity_threshold: Option<f64>,

    /// Intensity required for a point to start a new trace.
    pub start_intensity: Option<f64>,

    /// Absolute m/z tolerance.
    pub mz: Option<f64>,

    /// Relative m/z tolerance in ppm.
    pub ppm: Option<f64>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [build]
            min_scan_span = 6.0
            intensity_threshold = 1000.0
            start_intensity = 5000.0
            mz = 0.002
            ppm = 10.0
        "#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.build.min_scan_span, Some(6.0));
        assert_eq!(config.build.intensity_threshold, Some(1000.0));
        assert_eq!(config.build.start_intensity, Some(5000.0));
        assert_eq!(config.build.mz, Some(0.002));
        assert_eq!(config.build.ppm, Some(10.0));
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [build]
            min_scan_span = 3.0
        "#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.build.min_scan_span, Some(3.0));
        assert_eq!(config.build.intensity_threshold, None);
    }

    #[test]
    fn test_empty_config() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.build.min_scan_span, None);
    }
}
