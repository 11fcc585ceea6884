//! Samples to partial loudness in one call
//!
//! Chains energy reduction, dB conversion and masking for a block of filterbank
//! output. Unlike the operations it wraps, the analyzer allocates its own
//! intermediate and output arrays.

use crate::array::Array2;
use crate::config::AnalysisConfig;
use crate::energy::{compute_energy, downsampled_len};
use crate::error::Result;
use crate::level::to_db_in_place;
use tracing::debug;

/// Perceptual-rate energy of a signal before and after masking
#[derive(Debug, Clone, PartialEq)]
pub struct PerceptualLoudness {
    /// (frames, channels) energy in dB SPL
    pub energy_db: Array2,
    /// (frames, channels) energy left after masking, in dB SPL
    pub partial_loudness_db: Array2,
}

impl PerceptualLoudness {
    /// Number of perceptual-rate frames
    pub fn frames(&self) -> usize {
        self.energy_db.rows()
    }

    /// dB removed by masking, summed over all cells
    pub fn total_masked_db(&self) -> f64 {
        self.energy_db
            .view()
            .iter()
            .zip(self.partial_loudness_db.view().iter())
            .map(|(&energy, &partial)| f64::from(energy - partial))
            .sum()
    }
}

/// Runs the masking model over filterbank output
#[derive(Debug, Clone)]
pub struct PerceptualAnalyzer {
    config: AnalysisConfig,
}

impl PerceptualAnalyzer {
    /// Create an analyzer
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if `config` does not validate.
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Settings in use
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze a (num_samples, num_channels) block of Cam-ordered channel samples
    ///
    /// # Errors
    /// `InvalidShape` if the block is too short to reduce to the perceptual rate,
    /// `InvalidConfiguration` for a non-positive `sample_rate`.
    pub fn analyze(&self, channels: &Array2, sample_rate: f32) -> Result<PerceptualLoudness> {
        let [num_samples, num_channels] = channels.shape();
        let frames = downsampled_len(
            num_samples,
            sample_rate,
            self.config.perceptual_sample_rate,
        )?;
        debug!(
            num_samples,
            num_channels, frames, sample_rate, "Analyzing channel block"
        );

        let mut energy_db = Array2::zeros([frames, num_channels]);
        compute_energy(channels, &mut energy_db)?;
        to_db_in_place(
            &mut energy_db,
            self.config.full_scale_sine_db,
            self.config.epsilon,
        )?;

        let mut partial_loudness_db = Array2::zeros([frames, num_channels]);
        self.config
            .masking
            .partial_loudness(&energy_db, self.config.cam_delta, &mut partial_loudness_db)?;

        Ok(PerceptualLoudness {
            energy_db,
            partial_loudness_db,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MaskingError;

    #[test]
    fn test_analyzer_rejects_bad_config() {
        assert!(PerceptualAnalyzer::new(AnalysisConfig::new(-1.0)).is_err());
    }

    #[test]
    fn test_full_scale_sine_energy() {
        let analyzer = PerceptualAnalyzer::new(AnalysisConfig::new(1.0)).unwrap();
        let sample_rate = 8000.0;
        let samples: Vec<f32> = (0..8000)
            .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / sample_rate).sin())
            .collect();
        let channels = Array2::from_vec([8000, 1], samples).unwrap();

        let loudness = analyzer.analyze(&channels, sample_rate).unwrap();
        assert_eq!(loudness.frames(), 100);

        // Mean square of a unit sine is 1/2, i.e. 3 dB below the reference
        for frame in 0..loudness.frames() {
            let level = loudness.energy_db.row(frame)[0];
            assert!((level - 76.99).abs() < 0.05, "frame {} at {} dB", frame, level);
        }
        // A lone channel is never masked
        assert_eq!(loudness.energy_db, loudness.partial_loudness_db);
        assert_eq!(loudness.total_masked_db(), 0.0);
    }

    #[test]
    fn test_too_short_block() {
        let analyzer = PerceptualAnalyzer::new(AnalysisConfig::new(1.0)).unwrap();
        let channels = Array2::zeros([1, 4]);
        assert!(matches!(
            analyzer.analyze(&channels, 48000.0),
            Err(MaskingError::InvalidShape(_))
        ));
    }
}
