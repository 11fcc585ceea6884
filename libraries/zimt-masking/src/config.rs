//! Analysis configuration
//!
//! Settings come from an optional TOML file, then from `ZIMT_`-prefixed environment
//! variables (nested keys use `__`, e.g. `ZIMT_MASKING__MAX_MASK=25`).

use crate::energy::DEFAULT_PERCEPTUAL_SAMPLE_RATE;
use crate::error::{MaskingError, Result};
use crate::masking::Masking;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

/// Reference dB SPL of a full-scale sine used when none is configured
pub const DEFAULT_FULL_SCALE_SINE_DB: f32 = 80.0;

/// Energy floor added before taking logarithms when none is configured
pub const DEFAULT_EPSILON: f32 = 1e-9;

/// Settings for the energy → dB → partial loudness pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// dB SPL of a sine wave of amplitude 1
    #[serde(default = "default_full_scale_sine_db")]
    pub full_scale_sine_db: f32,

    /// Added to linear energy before converting to dB
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,

    /// Cam spacing between adjacent channels of the filterbank
    pub cam_delta: f32,

    /// Rate in Hz of the downsampled energy signal
    #[serde(default = "default_perceptual_sample_rate")]
    pub perceptual_sample_rate: f32,

    /// Masking curve parameters
    #[serde(default)]
    pub masking: Masking,
}

impl AnalysisConfig {
    /// Default settings for a filterbank with channels `cam_delta` Cam apart
    pub fn new(cam_delta: f32) -> Self {
        Self {
            full_scale_sine_db: DEFAULT_FULL_SCALE_SINE_DB,
            epsilon: DEFAULT_EPSILON,
            cam_delta,
            perceptual_sample_rate: DEFAULT_PERCEPTUAL_SAMPLE_RATE,
            masking: Masking::default(),
        }
    }

    /// Load configuration from `path` (if given and present) and the environment
    ///
    /// # Errors
    /// `Config` if a source cannot be read or deserialized, `InvalidConfiguration` if
    /// the result does not validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = config::Config::builder();

        if let Some(path) = path {
            if path.exists() {
                debug!("Loading analysis configuration from {:?}", path);
                settings = settings.add_source(config::File::from(path));
            } else {
                warn!("Configuration file {:?} not found, using environment only", path);
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix("ZIMT")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = settings.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` naming the first offending setting.
    pub fn validate(&self) -> Result<()> {
        if !self.full_scale_sine_db.is_finite() {
            return Err(MaskingError::invalid_configuration(format!(
                "full_scale_sine_db must be finite, got {}",
                self.full_scale_sine_db
            )));
        }
        let positive = [
            ("epsilon", self.epsilon),
            ("cam_delta", self.cam_delta),
            ("perceptual_sample_rate", self.perceptual_sample_rate),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(MaskingError::invalid_configuration(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        self.masking.validate()
    }
}

// Default values
fn default_full_scale_sine_db() -> f32 {
    DEFAULT_FULL_SCALE_SINE_DB
}

fn default_epsilon() -> f32 {
    DEFAULT_EPSILON
}

fn default_perceptual_sample_rate() -> f32 {
    DEFAULT_PERCEPTUAL_SAMPLE_RATE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(
            r#"
cam_delta = 0.25
full_scale_sine_db = 90.0

[masking]
max_mask = 25.0
"#,
        );

        let config = AnalysisConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.cam_delta, 0.25);
        assert_eq!(config.full_scale_sine_db, 90.0);
        assert_eq!(config.epsilon, DEFAULT_EPSILON);
        assert_eq!(config.perceptual_sample_rate, 100.0);
        assert_eq!(config.masking.max_mask, 25.0);
        assert_eq!(config.masking.onset_width, 10.0);
    }

    #[test]
    fn test_load_rejects_invalid_masking() {
        let file = write_config(
            r#"
cam_delta = 0.5

[masking]
onset_width = 0.0
"#,
        );

        let err = AnalysisConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, MaskingError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let file = write_config("cam_delta = \"wide\"\n");
        let err = AnalysisConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, MaskingError::Config(_)));
    }

    #[test]
    fn test_environment_overrides_file() {
        // Tests share the process environment; only this one touches onset_peak
        let file = write_config("cam_delta = 0.5\n\n[masking]\nonset_peak = 8.0\n");
        std::env::set_var("ZIMT_MASKING__ONSET_PEAK", "4.5");
        let loaded = AnalysisConfig::load(Some(file.path()));
        std::env::remove_var("ZIMT_MASKING__ONSET_PEAK");

        let config = loaded.unwrap();
        assert_eq!(config.cam_delta, 0.5);
        assert_eq!(config.masking.onset_peak, 4.5);
    }

    #[test]
    fn test_missing_file_needs_cam_delta() {
        let dir = tempfile::tempdir().unwrap();
        let err = AnalysisConfig::load(Some(&dir.path().join("zimt.toml"))).unwrap_err();
        assert!(matches!(err, MaskingError::Config(_)));
    }

    #[test]
    fn test_validate() {
        assert!(AnalysisConfig::new(0.5).validate().is_ok());
        assert!(AnalysisConfig::new(0.0).validate().is_err());

        let mut config = AnalysisConfig::new(0.5);
        config.epsilon = 0.0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::new(0.5);
        config.full_scale_sine_db = f32::NAN;
        assert!(config.validate().is_err());
    }
}
