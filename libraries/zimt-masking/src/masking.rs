//! Auditory masking model
//!
//! A masker channel hides energy in nearby channels. How far its influence reaches
//! along the Cam scale grows with its level: the reach is interpolated between the
//! zero crossing of a 20 dB masker and that of an 80 dB masker, separately for the
//! lower (lower channel index) and upper side. Within its reach the full masking level
//! falls linearly from the masker's own level by up to `max_mask` dB.
//!
//! How much of a probe a masker removes then depends on how far the probe sits above
//! the full masking level:
//!
//! - at or below full masking: `max_mask` dB
//! - up to `onset_width` dB above: falls linearly to `onset_peak` dB
//! - up to `max_mask` dB above: falls linearly to zero
//! - beyond: nothing
//!
//! Any non-zero amount is capped at the probe's own level.
//!
//! Channel distance is linear in channel index: `(k - m) * cam_delta`.

use crate::array::{Array2, Array3};
use crate::error::{MaskingError, Result};
use ndarray::{ArrayView1, ArrayViewMut1, Zip};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stand-in for minus infinity in dB outputs
///
/// Far below any realistic level so arithmetic on it stays finite.
pub const NEGLIGIBLE_DB: f32 = -1000.0;

/// Level of the quieter reference masker in dB
const LOW_REFERENCE_DB: f32 = 20.0;

/// Level of the louder reference masker in dB
const HIGH_REFERENCE_DB: f32 = 80.0;

/// Masking parameters
///
/// Immutable configuration shared by all masking operations; it can be read from any
/// number of threads at once.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Masking {
    /// Negative distance in Cam at which a 20 dB masker no longer masks any probe
    pub lower_zero_at_20: f32,
    /// Negative distance in Cam at which an 80 dB masker no longer masks any probe
    pub lower_zero_at_80: f32,
    /// Positive distance in Cam at which a 20 dB masker no longer masks any probe
    pub upper_zero_at_20: f32,
    /// Positive distance in Cam at which an 80 dB masker no longer masks any probe
    pub upper_zero_at_80: f32,

    /// dB a probe has to rise above full masking to be masked no more than
    /// `onset_peak` dB
    pub onset_width: f32,
    /// Masking of a probe that sits `onset_width` dB above full masking
    pub onset_peak: f32,
    /// dB a masker masks in its own band, and the dB above full masking where a
    /// probe is no longer masked
    pub max_mask: f32,
}

impl Default for Masking {
    fn default() -> Self {
        Self {
            lower_zero_at_20: -2.0,
            lower_zero_at_80: -6.0,
            upper_zero_at_20: 2.0,
            upper_zero_at_80: 10.0,
            onset_width: 10.0,
            onset_peak: 6.0,
            max_mask: 20.0,
        }
    }
}

impl Masking {
    /// Check that the parameters describe a usable masking curve
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` naming the first offending parameter.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("lower_zero_at_20", self.lower_zero_at_20),
            ("lower_zero_at_80", self.lower_zero_at_80),
            ("upper_zero_at_20", self.upper_zero_at_20),
            ("upper_zero_at_80", self.upper_zero_at_80),
            ("onset_width", self.onset_width),
            ("onset_peak", self.onset_peak),
            ("max_mask", self.max_mask),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, value)| !value.is_finite()) {
            return Err(MaskingError::invalid_configuration(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }

        let invalid = |msg: String| Err(MaskingError::invalid_configuration(msg));
        if self.lower_zero_at_20 >= 0.0 || self.lower_zero_at_80 >= 0.0 {
            return invalid(format!(
                "lower zero crossings must be negative, got {} and {}",
                self.lower_zero_at_20, self.lower_zero_at_80
            ));
        }
        if self.upper_zero_at_20 <= 0.0 || self.upper_zero_at_80 <= 0.0 {
            return invalid(format!(
                "upper zero crossings must be positive, got {} and {}",
                self.upper_zero_at_20, self.upper_zero_at_80
            ));
        }
        if self.lower_zero_at_80 > self.lower_zero_at_20
            || self.upper_zero_at_80 < self.upper_zero_at_20
        {
            return invalid("an 80 dB masker must reach at least as far as a 20 dB masker".into());
        }
        if self.max_mask <= 0.0 {
            return invalid(format!("max_mask must be positive, got {}", self.max_mask));
        }
        if self.onset_width <= 0.0 || self.onset_width >= self.max_mask {
            return invalid(format!(
                "onset_width must lie in (0, max_mask = {}), got {}",
                self.max_mask, self.onset_width
            ));
        }
        if !(0.0..=self.max_mask).contains(&self.onset_peak) {
            return invalid(format!(
                "onset_peak must lie in [0, max_mask = {}], got {}",
                self.max_mask, self.onset_peak
            ));
        }
        Ok(())
    }

    /// Cam distance a masker at `masker_db` reaches in the direction of `distance`
    ///
    /// Interpolates linearly in the masker level between the 20 dB and 80 dB zero
    /// crossings and extrapolates outside that range. Zero when the extrapolated
    /// crossing falls on the wrong side of the masker, or when `distance` is zero.
    pub fn reach(&self, masker_db: f32, distance: f32) -> f32 {
        let (at_20, at_80) = if distance < 0.0 {
            (self.lower_zero_at_20, self.lower_zero_at_80)
        } else if distance > 0.0 {
            (self.upper_zero_at_20, self.upper_zero_at_80)
        } else {
            return 0.0;
        };
        let zero_at = at_20
            + (masker_db - LOW_REFERENCE_DB) * (at_80 - at_20)
                / (HIGH_REFERENCE_DB - LOW_REFERENCE_DB);
        (zero_at * distance.signum()).max(0.0)
    }

    /// Full masking level a masker at `masker_db` casts `distance` Cam away
    ///
    /// Equals the masker level at distance zero and falls linearly by `max_mask` dB
    /// towards the reach; at or beyond the reach it is [`NEGLIGIBLE_DB`].
    pub fn full_masking_level(&self, masker_db: f32, distance: f32) -> f32 {
        if distance == 0.0 {
            return masker_db;
        }
        let reach = self.reach(masker_db, distance);
        let spread = distance.abs();
        if spread >= reach {
            NEGLIGIBLE_DB
        } else {
            masker_db - self.max_mask * spread / reach
        }
    }

    /// dB of a probe at `probe_db` that a full masking level of `full_masking_db`
    /// removes
    ///
    /// Never more than the probe's own level while any masking applies.
    pub fn masked_amount_level(&self, full_masking_db: f32, probe_db: f32) -> f32 {
        let above = probe_db - full_masking_db;
        let amount = if above <= 0.0 {
            self.max_mask
        } else if above < self.onset_width {
            self.max_mask - (self.max_mask - self.onset_peak) * above / self.onset_width
        } else if above < self.max_mask {
            self.onset_peak * (self.max_mask - above) / (self.max_mask - self.onset_width)
        } else {
            return 0.0;
        };
        amount.min(probe_db)
    }

    /// Populate `full_masking_db` with the full masking levels of `energy_db`
    ///
    /// `energy_db` is (num_samples, num_channels); `full_masking_db` is
    /// (num_samples, num_masked_channels, num_masker_channels) with both channel axes
    /// equal to num_channels. `cam_delta` is the Cam spacing of adjacent channels.
    ///
    /// # Errors
    /// `InvalidConfiguration` for bad parameters or `cam_delta`, `InvalidShape` when
    /// the output shape does not match.
    pub fn full_masking(
        &self,
        energy_db: &Array2,
        cam_delta: f32,
        full_masking_db: &mut Array3,
    ) -> Result<()> {
        self.validate()?;
        check_cam_delta(cam_delta)?;
        let [num_samples, num_channels] = energy_db.shape();
        let expected = [num_samples, num_channels, num_channels];
        if full_masking_db.shape() != expected {
            return Err(MaskingError::invalid_shape(format!(
                "full masking shape {:?}, expected {:?}",
                full_masking_db.shape(),
                expected
            )));
        }
        debug!(num_samples, num_channels, cam_delta, "Computing full masking");

        for sample in 0..num_samples {
            let maskers = energy_db.row(sample);
            for masked in 0..num_channels {
                let mut lane = full_masking_db.lane_mut(sample, masked);
                for (masker, (out, &masker_db)) in lane.iter_mut().zip(&maskers).enumerate() {
                    *out = self.full_masking_level(masker_db, distance(masked, masker, cam_delta));
                }
            }
        }
        Ok(())
    }

    /// Populate `masked_amount_db` with the energy `full_masking_db` masks in
    /// `probe_energy_db`
    ///
    /// `full_masking_db` and `masked_amount_db` are (num_samples, num_masked_channels,
    /// num_masker_channels); `probe_energy_db` is (num_samples, num_channels) with
    /// num_channels equal to both channel axes.
    ///
    /// # Errors
    /// `InvalidConfiguration` for bad parameters, `InvalidShape` when shapes differ.
    pub fn masked_amount(
        &self,
        full_masking_db: &Array3,
        probe_energy_db: &Array2,
        masked_amount_db: &mut Array3,
    ) -> Result<()> {
        self.validate()?;
        let [num_samples, num_masked, num_maskers] = full_masking_db.shape();
        if num_masked != num_maskers {
            return Err(MaskingError::invalid_shape(format!(
                "{} masked channels but {} masker channels",
                num_masked, num_maskers
            )));
        }
        if probe_energy_db.shape() != [num_samples, num_masked] {
            return Err(MaskingError::invalid_shape(format!(
                "probe shape {:?}, expected {:?}",
                probe_energy_db.shape(),
                [num_samples, num_masked]
            )));
        }
        full_masking_db.ensure_same_shape(masked_amount_db, "masked amount output")?;
        debug!(num_samples, num_channels = num_masked, "Computing masked amount");

        for sample in 0..num_samples {
            let probes = probe_energy_db.row(sample);
            for (masked, &probe_db) in probes.iter().enumerate() {
                Zip::from(masked_amount_db.lane_mut(sample, masked))
                    .and(full_masking_db.lane(sample, masked))
                    .for_each(|out, &full_db| *out = self.masked_amount_level(full_db, probe_db));
            }
        }
        Ok(())
    }

    /// Populate `partial_loudness_db` with the energy left in `energy_db` after
    /// masking
    ///
    /// Both arrays are (num_samples, num_channels) and must be distinct storage.
    /// Padding cells of `energy_db` are never read.
    ///
    /// # Errors
    /// `InvalidConfiguration` for bad parameters or `cam_delta`, `InvalidShape` when
    /// shapes differ, `AliasingViolation` when both arrays share storage.
    pub fn partial_loudness(
        &self,
        energy_db: &Array2,
        cam_delta: f32,
        partial_loudness_db: &mut Array2,
    ) -> Result<()> {
        self.validate()?;
        check_cam_delta(cam_delta)?;
        if energy_db.shares_storage(partial_loudness_db) {
            return Err(MaskingError::AliasingViolation(
                "partial loudness cannot be computed in place".into(),
            ));
        }
        energy_db.ensure_same_shape(partial_loudness_db, "partial loudness output")?;
        let [num_samples, num_channels] = energy_db.shape();
        debug!(num_samples, num_channels, cam_delta, "Computing partial loudness");

        for sample in 0..num_samples {
            self.fill_partial_loudness(
                energy_db.row(sample),
                cam_delta,
                partial_loudness_db.row_mut(sample),
            );
        }
        Ok(())
    }

    /// Partial loudness of a single sample row
    ///
    /// Rows are independent, so callers may spread rows over threads.
    ///
    /// # Errors
    /// `InvalidConfiguration` for bad parameters or `cam_delta`, `InvalidShape` when
    /// the rows differ in length.
    pub fn partial_loudness_row(
        &self,
        energy_db: ArrayView1<'_, f32>,
        cam_delta: f32,
        partial_loudness_db: ArrayViewMut1<'_, f32>,
    ) -> Result<()> {
        self.validate()?;
        check_cam_delta(cam_delta)?;
        if energy_db.len() != partial_loudness_db.len() {
            return Err(MaskingError::invalid_shape(format!(
                "row of {} channels, output of {}",
                energy_db.len(),
                partial_loudness_db.len()
            )));
        }
        self.fill_partial_loudness(energy_db, cam_delta, partial_loudness_db);
        Ok(())
    }

    fn fill_partial_loudness(
        &self,
        energy_db: ArrayView1<'_, f32>,
        cam_delta: f32,
        mut out: ArrayViewMut1<'_, f32>,
    ) {
        for (masked, out) in out.iter_mut().enumerate() {
            *out = self.residual_level(&energy_db, masked, cam_delta);
        }
    }

    /// Probe level left after every other channel in the row has masked it
    ///
    /// Masked amounts are summed in linear energy relative to the probe, which makes
    /// the result independent of the dB reference level. A channel does not mask
    /// itself.
    fn residual_level(
        &self,
        energy_db: &ArrayView1<'_, f32>,
        masked: usize,
        cam_delta: f32,
    ) -> f32 {
        let probe_db = energy_db[masked];
        let mut masked_fraction = 0.0_f32;
        for (masker, &masker_db) in energy_db.iter().enumerate() {
            if masker == masked {
                continue;
            }
            let full_db = self.full_masking_level(masker_db, distance(masked, masker, cam_delta));
            if probe_db - full_db >= self.max_mask {
                continue;
            }
            let amount_db = self.masked_amount_level(full_db, probe_db);
            masked_fraction += 10.0_f32.powf((amount_db - probe_db) / 10.0);
        }

        if masked_fraction >= 1.0 {
            NEGLIGIBLE_DB.min(probe_db)
        } else {
            probe_db + 10.0 * (1.0 - masked_fraction).log10()
        }
    }
}

/// Cam distance from masked channel `masked` to masker channel `masker`
#[inline]
fn distance(masked: usize, masker: usize, cam_delta: f32) -> f32 {
    (masker as f32 - masked as f32) * cam_delta
}

fn check_cam_delta(cam_delta: f32) -> Result<()> {
    if cam_delta.is_finite() && cam_delta > 0.0 {
        Ok(())
    } else {
        Err(MaskingError::invalid_configuration(format!(
            "cam_delta must be positive, got {}",
            cam_delta
        )))
    }
}
