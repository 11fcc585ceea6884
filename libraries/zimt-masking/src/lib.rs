//! Auditory masking for the Zimt perceptual audio metric
//!
//! This crate provides:
//! - Energy reduction from filterbank samples to a perceptual-rate energy signal
//! - Conversion between linear energy and dB SPL
//! - Full masking, masked amount and partial loudness across Cam-spaced channels
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌─────────────┐     ┌──────────────────┐
//! │ Channel      │ ──► │ compute_energy │ ──► │ to_db       │ ──► │ Masking          │
//! │ samples      │     │ (mean square)  │     │ (dB SPL)    │     │ partial_loudness │
//! └──────────────┘     └────────────────┘     └─────────────┘     └──────────────────┘
//! ```
//!
//! The operations write into caller-allocated arrays and keep no state between
//! calls. [`PerceptualAnalyzer`] chains them for convenience.
//!
//! # Example
//!
//! ```
//! use zimt_masking::{Array2, Masking};
//!
//! let energy_db = Array2::from_rows(&[vec![80.0, -10.0, 40.0]])?;
//! let mut partial_loudness_db = Array2::zeros([1, 3]);
//!
//! let masking = Masking::default();
//! masking.partial_loudness(&energy_db, 0.5, &mut partial_loudness_db)?;
//!
//! // The quiet channel next to the 80 dB masker is fully masked
//! assert!(partial_loudness_db.row(0)[1] < -10.0);
//! # Ok::<(), zimt_masking::MaskingError>(())
//! ```

#![deny(unsafe_code)]

mod array;
mod config;
mod energy;
mod error;
mod level;
mod masking;
mod pipeline;

pub use ndarray;

pub use crate::array::{Array2, Array3, PaddedArray};
pub use crate::config::{AnalysisConfig, DEFAULT_EPSILON, DEFAULT_FULL_SCALE_SINE_DB};
pub use crate::energy::{compute_energy, downsampled_len, DEFAULT_PERCEPTUAL_SAMPLE_RATE};
pub use crate::error::{ErrorKind, MaskingError, Result};
pub use crate::level::{
    db_from_linear, linear_from_db, to_db, to_db_in_place, to_linear, to_linear_in_place,
};
pub use crate::masking::{Masking, NEGLIGIBLE_DB};
pub use crate::pipeline::{PerceptualAnalyzer, PerceptualLoudness};
