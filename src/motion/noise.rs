//! Motion noise parameters and the Gaussian deviate used by the motion models.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Standard deviations and autoregressive coefficients for state propagation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionNoise {
    /// Transition standard deviation along x.
    pub transition_x_std: f64,
    /// Transition standard deviation along y.
    pub transition_y_std: f64,
    /// Transition standard deviation of the scale.
    pub transition_s_std: f64,
    /// Proposal standard deviation along x.
    pub proposal_x_std: f64,
    /// Proposal standard deviation along y.
    pub proposal_y_std: f64,
    /// Proposal standard deviation of the scale.
    pub proposal_s_std: f64,
    /// Weight of the current displacement from the origin.
    pub a1: f64,
    /// Weight of the previous displacement from the origin.
    pub a2: f64,
    /// Noise gain.
    pub b0: f64,
    /// Multiplier applied to every standard-normal draw.
    pub deviate_scale: f64,
}

impl Default for MotionNoise {
    fn default() -> Self {
        Self {
            transition_x_std: 8.0_f64.sqrt(),
            transition_y_std: 4.0_f64.sqrt(),
            transition_s_std: 0.025,
            proposal_x_std: 4.0_f64.sqrt(),
            proposal_y_std: 2.0_f64.sqrt(),
            proposal_s_std: 0.0165,
            a1: 2.0,
            a2: -1.0,
            b0: 1.0,
            deviate_scale: 1.0 / 3.0,
        }
    }
}

impl MotionNoise {
    /// Draw one scaled Gaussian deviate.
    #[inline]
    pub fn deviate<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        gaussian(rng) * self.deviate_scale
    }
}

/// Draw from the standard normal distribution.
#[inline]
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.sample::<f64, _>(StandardNormal)
}
