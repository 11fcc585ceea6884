//! Mean opinion score mapping for Zimt distances
//!
//! Turns an aggregate perceptual distance into an approximate MOS on the usual
//! 1 (bad) to 5 (excellent) scale. The curve is calibrated against listening-test
//! anchors and only meant as a rough, human-readable companion to the distance.
//!
//! # Example
//!
//! ```
//! use zimt_mos::MosMapper;
//!
//! let mapper = MosMapper::default();
//! assert_eq!(mapper.map(0.0), 5.0);
//! assert!((mapper.map(0.5) - 1.7515).abs() < 1e-2);
//! ```

#![deny(unsafe_code)]

mod error;
mod mapper;

pub use crate::error::{MosError, Result};
pub use crate::mapper::{
    MosMapper, CALIBRATION_ANCHORS, CALIBRATION_TOLERANCE, DEFAULT_DECAY, MAX_MOS, MIN_MOS,
};
