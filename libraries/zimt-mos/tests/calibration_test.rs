//! Calibration and property tests for the MOS mapping

use proptest::prelude::*;
use zimt_mos::{MosError, MosMapper, CALIBRATION_ANCHORS, MAX_MOS, MIN_MOS};

#[test]
fn mos_from_distance_anchors() {
    let distances = [0.0, 0.1, 0.5, 0.7, 1.0];
    let expected = [5.0, 3.8631, 1.7515, 1.3850, 1.1412];
    let mapper = MosMapper::calibrated();

    for (distance, mos) in distances.iter().zip(expected) {
        assert!(
            (mapper.map(*distance) - mos).abs() < 1e-2,
            "distance {} mapped to {}, expected {}",
            distance,
            mapper.map(*distance),
            mos
        );
    }
}

#[test]
fn fit_through_shifted_anchors() {
    // Anchors generated from a slower decay are recovered by the fit
    let anchors: Vec<(f64, f64)> = [0.2_f64, 0.4, 0.8]
        .iter()
        .map(|&d| (d, 1.0 + 4.0 * (-2.0 * d).exp()))
        .collect();
    let mapper = MosMapper::fit(&anchors).unwrap();
    assert!((mapper.decay() - 2.0).abs() < 1e-9);
    assert!(mapper.max_anchor_error(&CALIBRATION_ANCHORS) > 1e-2);
}

#[test]
fn rejected_anchors_name_the_problem() {
    let err = MosMapper::fit(&[(0.3, 0.5)]).unwrap_err();
    assert!(matches!(err, MosError::InvalidAnchors(_)));
    assert!(err.to_string().contains("0.5"));
}

#[test]
fn parameters_serialize() {
    let mapper = MosMapper::new(2.5).unwrap();
    let json = serde_json::to_string(&mapper).unwrap();
    assert_eq!(json, r#"{"decay":2.5}"#);
    let back: MosMapper = serde_json::from_str(&json).unwrap();
    assert_eq!(back, mapper);

    // A stored curve that never decays is rejected on load
    assert!(serde_json::from_str::<MosMapper>(r#"{"decay":-1.0}"#).is_err());
}

proptest! {
    /// Property: scores stay on the 1..=5 scale
    #[test]
    fn map_stays_on_scale(distance in -10.0f64..100.0) {
        let mos = MosMapper::default().map(distance);
        prop_assert!((MIN_MOS..=MAX_MOS).contains(&mos));
    }

    /// Property: larger distances never score better
    #[test]
    fn map_is_monotone(a in 0.0f64..5.0, b in 0.0f64..5.0) {
        let mapper = MosMapper::default();
        let (near, far) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(mapper.map(far) <= mapper.map(near));
    }
}
