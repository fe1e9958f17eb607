//! Appearance dissimilarity measures.
//!
//! - [`DiffusionDistance`]: multi-resolution L1 distance between feature maps
//!   or histograms of any dimension, used by the decomposed likelihood.
//! - [`ColorHistogram`]: HSV histogram with the Bhattacharyya distance, used
//!   by the holistic colour likelihood.

mod diffusion;
mod histogram;

pub use diffusion::DiffusionDistance;
pub use histogram::{histo_bin, ColorHistogram, NUM_HUE_BINS, NUM_SAT_BINS, NUM_VAL_BINS};
