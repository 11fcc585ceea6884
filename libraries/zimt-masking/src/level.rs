//! Conversion between linear energy and dB SPL
//!
//! `full_scale_sine_db` is the reference dB SPL of a sine wave of amplitude 1. The
//! forward conversion adds a caller-supplied `epsilon` so the logarithm stays finite
//! at zero energy; the inverse does not subtract it back out.

use crate::array::Array2;
use crate::error::{MaskingError, Result};
use ndarray::Zip;
use tracing::debug;

/// dB SPL of `energy` relative to a full-scale sine at `full_scale_sine_db`
#[inline]
pub fn db_from_linear(energy: f32, full_scale_sine_db: f32, epsilon: f32) -> f32 {
    full_scale_sine_db + 10.0 * (energy + epsilon).log10()
}

/// Linear energy of `energy_db` relative to a full-scale sine at `full_scale_sine_db`
#[inline]
pub fn linear_from_db(energy_db: f32, full_scale_sine_db: f32) -> f32 {
    10.0_f32.powf((energy_db - full_scale_sine_db) / 10.0)
}

fn check_reference(full_scale_sine_db: f32) -> Result<()> {
    if full_scale_sine_db.is_finite() {
        Ok(())
    } else {
        Err(MaskingError::invalid_configuration(format!(
            "full scale sine level must be finite, got {}",
            full_scale_sine_db
        )))
    }
}

fn check_epsilon(epsilon: f32) -> Result<()> {
    if epsilon.is_finite() && epsilon > 0.0 {
        Ok(())
    } else {
        Err(MaskingError::invalid_configuration(format!(
            "epsilon must be a small positive value, got {}",
            epsilon
        )))
    }
}

/// Populate `energy_db` with the dB value of `energy_linear`
///
/// Each cell becomes `full_scale_sine_db + 10 * log10(energy_linear + epsilon)`.
///
/// # Errors
/// `InvalidShape` if the shapes differ, `InvalidConfiguration` if `epsilon` is not
/// positive or the reference level is not finite.
pub fn to_db(
    energy_linear: &Array2,
    full_scale_sine_db: f32,
    epsilon: f32,
    energy_db: &mut Array2,
) -> Result<()> {
    check_reference(full_scale_sine_db)?;
    check_epsilon(epsilon)?;
    energy_linear.ensure_same_shape(energy_db, "dB output")?;
    debug!(shape = ?energy_linear.shape(), full_scale_sine_db, epsilon, "Converting energy to dB");

    Zip::from(energy_db.view_mut())
        .and(energy_linear.view())
        .for_each(|out, &energy| *out = db_from_linear(energy, full_scale_sine_db, epsilon));
    Ok(())
}

/// In-place form of [`to_db`]
///
/// # Errors
/// `InvalidConfiguration` if `epsilon` is not positive or the reference level is
/// not finite.
pub fn to_db_in_place(energy: &mut Array2, full_scale_sine_db: f32, epsilon: f32) -> Result<()> {
    check_reference(full_scale_sine_db)?;
    check_epsilon(epsilon)?;
    debug!(shape = ?energy.shape(), full_scale_sine_db, epsilon, "Converting energy to dB in place");

    energy
        .view_mut()
        .mapv_inplace(|cell| db_from_linear(cell, full_scale_sine_db, epsilon));
    Ok(())
}

/// Populate `energy_linear` with the linear value of `energy_db`
///
/// Each cell becomes `10^((energy_db - full_scale_sine_db) / 10)`.
///
/// # Errors
/// `InvalidShape` if the shapes differ, `InvalidConfiguration` if the reference
/// level is not finite.
pub fn to_linear(
    energy_db: &Array2,
    full_scale_sine_db: f32,
    energy_linear: &mut Array2,
) -> Result<()> {
    check_reference(full_scale_sine_db)?;
    energy_db.ensure_same_shape(energy_linear, "linear output")?;
    debug!(shape = ?energy_db.shape(), full_scale_sine_db, "Converting dB to linear energy");

    Zip::from(energy_linear.view_mut())
        .and(energy_db.view())
        .for_each(|out, &level| *out = linear_from_db(level, full_scale_sine_db));
    Ok(())
}

/// In-place form of [`to_linear`]
///
/// # Errors
/// `InvalidConfiguration` if the reference level is not finite.
pub fn to_linear_in_place(energy: &mut Array2, full_scale_sine_db: f32) -> Result<()> {
    check_reference(full_scale_sine_db)?;
    debug!(shape = ?energy.shape(), full_scale_sine_db, "Converting dB to linear energy in place");

    energy
        .view_mut()
        .mapv_inplace(|cell| linear_from_db(cell, full_scale_sine_db));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_SCALE: f32 = 80.0;
    const EPSILON: f32 = 1e-9;

    #[test]
    fn test_full_scale_sine_reference() {
        // Unit energy sits exactly at the reference level
        assert!((db_from_linear(1.0, FULL_SCALE, EPSILON) - 80.0).abs() < 1e-4);
        assert!((db_from_linear(0.01, FULL_SCALE, EPSILON) - 60.0).abs() < 1e-3);
        assert!((linear_from_db(70.0, FULL_SCALE) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_zero_energy_stays_finite() {
        let db = db_from_linear(0.0, FULL_SCALE, EPSILON);
        assert!(db.is_finite());
        assert!((db - (FULL_SCALE - 90.0)).abs() < 1e-3);
    }

    #[test]
    fn test_round_trip_is_approximate_near_zero() {
        let energy = Array2::from_vec([1, 3], vec![0.0, 1e-12, 0.5]).unwrap();
        let mut db = Array2::zeros([1, 3]);
        let mut back = Array2::zeros([1, 3]);
        to_db(&energy, FULL_SCALE, EPSILON, &mut db).unwrap();
        to_linear(&db, FULL_SCALE, &mut back).unwrap();

        // Epsilon is not removed again
        assert!((back.row(0)[0] - EPSILON).abs() < 1e-12);
        assert!(back.row(0)[1] > 1e-12);
        assert!((back.row(0)[2] - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_in_place_matches_out_of_place() {
        let energy = Array2::from_rows(&[vec![0.25, 1.0], vec![4.0, 0.0]]).unwrap();
        let mut expected = Array2::zeros([2, 2]);
        to_db(&energy, FULL_SCALE, EPSILON, &mut expected).unwrap();

        let mut in_place = energy.clone();
        to_db_in_place(&mut in_place, FULL_SCALE, EPSILON).unwrap();
        assert_eq!(in_place, expected);

        to_linear_in_place(&mut in_place, FULL_SCALE).unwrap();
        assert!((in_place.row(1)[0] - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_in_place_skips_padding() {
        let mut energy = Array2::with_padding([1, 2], [2, 3]).unwrap();
        energy.fill(1.0);
        to_db_in_place(&mut energy, FULL_SCALE, EPSILON).unwrap();
        assert!(energy.padding_is_zero());
    }

    #[test]
    fn test_invalid_epsilon() {
        let energy = Array2::zeros([1, 1]);
        let mut db = Array2::zeros([1, 1]);
        for epsilon in [0.0, -1e-9, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                to_db(&energy, FULL_SCALE, epsilon, &mut db),
                Err(MaskingError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_shape_mismatch() {
        let energy = Array2::zeros([2, 2]);
        let mut db = Array2::zeros([2, 3]);
        assert!(matches!(
            to_db(&energy, FULL_SCALE, EPSILON, &mut db),
            Err(MaskingError::InvalidShape(_))
        ));
        assert!(matches!(
            to_linear(&energy, FULL_SCALE, &mut db),
            Err(MaskingError::InvalidShape(_))
        ));
    }
}
