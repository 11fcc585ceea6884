//! Energy reduction from samples to a perceptual-rate energy signal
//!
//! The sample axis is split into contiguous windows and each window is reduced to the
//! mean of its squared amplitudes. Window `i` of `d` over `n` samples spans
//! `[i * n / d, (i + 1) * n / d)` in integer arithmetic, so window lengths differ by at
//! most one sample.

use crate::array::Array2;
use crate::error::{MaskingError, Result};
use ndarray::{s, Zip};
use tracing::{debug, trace};

/// Default rate of the downsampled energy signal in Hz
///
/// 100 Hz has proven a reasonable time resolution for human hearing.
pub const DEFAULT_PERCEPTUAL_SAMPLE_RATE: f32 = 100.0;

/// Sample range covered by energy window `window`
fn window_bounds(window: usize, num_samples: usize, num_windows: usize) -> (usize, usize) {
    (
        window * num_samples / num_windows,
        (window + 1) * num_samples / num_windows,
    )
}

/// Populate `energy` with the mean-square energy of `samples`
///
/// `samples` is a (num_samples, num_channels) array of amplitudes and `energy` a
/// pre-shaped (num_downsampled_samples, num_channels) array of linear energy.
///
/// # Errors
/// Returns `InvalidShape` if the channel counts differ or if
/// `num_downsampled_samples >= num_samples`. Nothing is written on error.
pub fn compute_energy(samples: &Array2, energy: &mut Array2) -> Result<()> {
    let [num_samples, num_channels] = samples.shape();
    let [num_windows, energy_channels] = energy.shape();

    if energy_channels != num_channels {
        return Err(MaskingError::invalid_shape(format!(
            "energy has {} channels, samples have {}",
            energy_channels, num_channels
        )));
    }
    if num_windows >= num_samples {
        return Err(MaskingError::invalid_shape(format!(
            "{} energy frames must be fewer than {} samples",
            num_windows, num_samples
        )));
    }

    debug!(
        num_samples,
        num_windows, num_channels, "Computing downsampled energy"
    );

    for window in 0..num_windows {
        let (start, end) = window_bounds(window, num_samples, num_windows);
        let mut out = energy.row_mut(window);
        out.fill(0.0);
        for frame in samples.view().slice_move(s![start..end, ..]).rows() {
            Zip::from(&mut out)
                .and(&frame)
                .for_each(|acc, &amplitude| *acc += amplitude * amplitude);
        }
        let scale = 1.0 / (end - start) as f32;
        out.mapv_inplace(|acc| acc * scale);
        trace!(window, start, end, "Reduced energy window");
    }

    Ok(())
}

/// Number of energy frames for `num_samples` at `sample_rate` reduced to
/// `perceptual_sample_rate`
///
/// The result is always strictly below `num_samples` and at least one.
///
/// # Errors
/// Returns `InvalidConfiguration` for non-positive rates, and `InvalidShape` if the
/// signal is too short to be reduced (fewer than two samples).
pub fn downsampled_len(
    num_samples: usize,
    sample_rate: f32,
    perceptual_sample_rate: f32,
) -> Result<usize> {
    if !(sample_rate.is_finite() && sample_rate > 0.0) {
        return Err(MaskingError::invalid_configuration(format!(
            "sample rate must be positive, got {}",
            sample_rate
        )));
    }
    if !(perceptual_sample_rate.is_finite() && perceptual_sample_rate > 0.0) {
        return Err(MaskingError::invalid_configuration(format!(
            "perceptual sample rate must be positive, got {}",
            perceptual_sample_rate
        )));
    }
    if num_samples < 2 {
        return Err(MaskingError::invalid_shape(format!(
            "{} samples cannot be reduced",
            num_samples
        )));
    }

    let frames = (num_samples as f64 * f64::from(perceptual_sample_rate) / f64::from(sample_rate))
        .round() as usize;
    Ok(frames.clamp(1, num_samples - 1))
}
