//! Pipeline configuration, loadable from TOML.
//!
//! Every section has defaults, so an empty file (or no file) is a valid
//! configuration:
//!
//! ```toml
//! refresh_rate_hz = 30.0
//!
//! [eyes]
//! width_pct = 35.0
//! height_pct = 30.0
//! top_pct = 25.0
//! side_pct = 13.0
//!
//! [smoothing]
//! enabled = false
//! factor = 0.005
//!
//! [corners]
//! enabled = true
//!
//! [preprocess]
//! mirror = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::gradient::GradientPupilParams;
use crate::regions::EyeGeometry;
use crate::selection::SelectionPolicy;

/// Sane range for the eye region percentages.
const PERCENT_RANGE: std::ops::RangeInclusive<f64> = 0.0..=50.0;

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Processing cycles per second, independent of the host tick rate.
    pub refresh_rate_hz: f64,
    /// Which detected face to process.
    pub selection: SelectionPolicy,
    pub eyes: EyeGeometry,
    pub smoothing: SmoothingConfig,
    pub corners: CornerConfig,
    pub preprocess: PreprocessConfig,
    /// Tuning for the built-in pupil locator.
    pub pupil: GradientPupilParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: 30.0,
            selection: SelectionPolicy::default(),
            eyes: EyeGeometry::default(),
            smoothing: SmoothingConfig::default(),
            corners: CornerConfig::default(),
            preprocess: PreprocessConfig::default(),
            pupil: GradientPupilParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml(&contents)?;
        tracing::info!("Loaded pipeline config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.refresh_rate_hz.is_finite() && self.refresh_rate_hz > 0.0) {
            return Err(Error::invalid_config(
                "refresh_rate_hz",
                format!("Refresh rate must be greater than 0, got {}", self.refresh_rate_hz),
            ));
        }

        let percentages = [
            ("eyes.width_pct", self.eyes.width_pct),
            ("eyes.height_pct", self.eyes.height_pct),
            ("eyes.top_pct", self.eyes.top_pct),
            ("eyes.side_pct", self.eyes.side_pct),
        ];
        for (field, value) in percentages {
            if !PERCENT_RANGE.contains(&value) {
                return Err(Error::invalid_config(
                    field,
                    format!("Percentage must be between 0 and 50, got {}", value),
                ));
            }
        }

        if !(self.smoothing.factor.is_finite() && self.smoothing.factor >= 0.0) {
            return Err(Error::invalid_config(
                "smoothing.factor",
                "Smoothing factor must be a non-negative number",
            ));
        }

        if !(self.preprocess.gain.is_finite() && self.preprocess.gain > 0.0) {
            return Err(Error::invalid_config(
                "preprocess.gain",
                "Gain must be greater than 0",
            ));
        }

        if !self.preprocess.bias.is_finite() {
            return Err(Error::invalid_config("preprocess.bias", "Bias must be finite"));
        }

        if self.pupil.fast_width == 0 {
            return Err(Error::invalid_config(
                "pupil.fast_width",
                "Fast width must be greater than 0",
            ));
        }

        if self.pupil.weight_divisor == 0.0 {
            return Err(Error::invalid_config(
                "pupil.weight_divisor",
                "Weight divisor must not be 0",
            ));
        }

        Ok(())
    }
}

/// Gaussian smoothing of the face region before any locator runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub enabled: bool,
    /// Blur sigma as a fraction of the face width.
    pub factor: f32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            factor: 0.005,
        }
    }
}

impl SmoothingConfig {
    /// Blur sigma for a face of the given width, or `None` when disabled.
    pub fn sigma(&self, face_width: i32) -> Option<f32> {
        if !self.enabled {
            return None;
        }
        let sigma = self.factor * face_width as f32;
        (sigma > 0.0).then_some(sigma)
    }
}

/// Eye corner detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerConfig {
    pub enabled: bool,
}

impl Default for CornerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Per-frame adjustments applied before detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Multiplier applied to every pixel.
    pub gain: f32,
    /// Offset added after the gain.
    pub bias: f32,
    /// Mirror the frame horizontally, as a front-facing camera preview does.
    pub mirror: bool,
    /// Equalize the histogram to boost contrast.
    pub equalize: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            gain: 1.0,
            bias: 0.0,
            mirror: true,
            equalize: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.refresh_rate_hz, 30.0);
        assert_eq!(config.eyes.side_pct, 13.0);
        assert!(config.corners.enabled);
        assert!(!config.smoothing.enabled);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = PipelineConfig::from_toml("").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn parses_partial_sections() {
        let config = PipelineConfig::from_toml(
            r#"
            refresh_rate_hz = 60.0
            selection = "first"

            [eyes]
            width_pct = 25.0
            height_pct = 15.0

            [smoothing]
            enabled = true

            [preprocess]
            mirror = false
            "#,
        )
        .unwrap();

        assert_eq!(config.refresh_rate_hz, 60.0);
        assert_eq!(config.selection, SelectionPolicy::First);
        assert_eq!(config.eyes.width_pct, 25.0);
        assert_eq!(config.eyes.top_pct, 25.0);
        assert!(config.smoothing.enabled);
        assert_eq!(config.smoothing.factor, 0.005);
        assert!(!config.preprocess.mirror);
        assert!(config.preprocess.equalize);
    }

    #[test]
    fn rejects_non_positive_refresh_rate() {
        for rate in [0.0, -1.0, f64::NAN] {
            let config = PipelineConfig {
                refresh_rate_hz: rate,
                ..Default::default()
            };
            match config.validate() {
                Err(Error::InvalidConfig { field, .. }) => assert_eq!(field, "refresh_rate_hz"),
                other => panic!("expected invalid refresh rate, got {:?}", other),
            }
        }
    }

    #[test]
    fn rejects_out_of_range_percentages() {
        let mut config = PipelineConfig::default();
        config.eyes.side_pct = 51.0;
        match config.validate() {
            Err(Error::InvalidConfig { field, .. }) => assert_eq!(field, "eyes.side_pct"),
            other => panic!("expected invalid side_pct, got {:?}", other),
        }

        let mut config = PipelineConfig::default();
        config.eyes.height_pct = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_gain() {
        let mut config = PipelineConfig::default();
        config.preprocess.gain = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = PipelineConfig::from_toml("refresh_rate_hz = \"fast\"").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn smoothing_sigma_scales_with_face_width() {
        let smoothing = SmoothingConfig {
            enabled: true,
            factor: 0.005,
        };
        assert_eq!(smoothing.sigma(200), Some(1.0));
        assert_eq!(SmoothingConfig::default().sigma(200), None);
    }

    #[test]
    fn loads_from_file() {
        let path = std::env::temp_dir().join("percent_eyes_config_test.toml");
        std::fs::write(&path, "refresh_rate_hz = 15.0\n[corners]\nenabled = false\n").unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.refresh_rate_hz, 15.0);
        assert!(!config.corners.enabled);

        std::fs::remove_file(path).ok();
    }
}
