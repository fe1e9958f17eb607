//! Stochastic state propagation for the chain bank.
//!
//! This module provides:
//! - `TransitionModel` - second-order autoregressive motion applied to every object
//! - `ProposalSampler` - small single-object perturbations used as MH proposals
//! - `acceptance_ratio` - Metropolis-Hastings acceptance with a weight floor
//! - `MotionNoise` - standard deviations and AR coefficients

mod noise;
mod transition;
mod proposal;
mod acceptance;

pub use noise::{gaussian, MotionNoise};
pub use transition::TransitionModel;
pub use proposal::ProposalSampler;
pub use acceptance::{acceptance_ratio, accept_move};

/// Frame and scale limits applied to every propagated state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionBounds {
    pub frame_width: f64,
    pub frame_height: f64,
    pub scale_min: f64,
    pub scale_max: f64,
}

impl MotionBounds {
    pub fn new(frame_width: u32, frame_height: u32, scale_min: f64, scale_max: f64) -> Self {
        Self {
            frame_width: frame_width as f64,
            frame_height: frame_height as f64,
            scale_min,
            scale_max,
        }
    }
}

/// Minimum distance kept between a particle centre and the top/left border.
pub const BORDER_MARGIN: f64 = 10.0;

/// Noise multiplier for a motion index: the base variance for index 0,
/// doubled for any other index.
#[inline]
pub fn motion_param(variance: f64, motion_index: usize) -> f64 {
    if motion_index == 0 {
        variance
    } else {
        2.0 * variance
    }
}
