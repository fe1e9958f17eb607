//! Single-object proposal density for Metropolis-Hastings moves.

use rand::Rng;

use super::{motion_param, MotionBounds, MotionNoise, BORDER_MARGIN};
use crate::particle::Particle;
use crate::utils::clamp;

/// Perturbs one object of a joint hypothesis with zero-mean Gaussian noise.
#[derive(Debug, Clone, Copy)]
pub struct ProposalSampler {
    noise: MotionNoise,
    variance: f64,
}

impl ProposalSampler {
    pub fn new(noise: MotionNoise, variance: f64) -> Self {
        Self { noise, variance }
    }

    /// Propose a move of object `m`.
    ///
    /// Every other object is copied through unchanged. The window of object
    /// `m` is kept inside the frame and its centre inside the border margin.
    pub fn propose<R: Rng + ?Sized>(
        &self,
        particle: &Particle,
        m: usize,
        bounds: &MotionBounds,
        motion_index: usize,
        rng: &mut R,
    ) -> Particle {
        let param = motion_param(self.variance, motion_index);
        let n = &self.noise;

        let mut next = particle.clone();
        let prev = &particle.objects[m];
        let state = &mut next.objects[m];

        let half_w = prev.scaled_width() / 2.0;
        let half_h = prev.scaled_height() / 2.0;

        let x = n.b0 * param * n.proposal_x_std * n.deviate(rng) + prev.x;
        let x = clamp(x, half_w, bounds.frame_width - half_w);
        state.x = clamp(x, BORDER_MARGIN, bounds.frame_width - 1.0);

        let y = n.b0 * param * n.proposal_y_std * n.deviate(rng) + prev.y;
        let y = clamp(y, half_h, bounds.frame_height - half_h);
        state.y = clamp(y, BORDER_MARGIN, bounds.frame_height - 1.0);

        let s = n.b0 * param * n.proposal_s_std * n.deviate(rng) + prev.s;
        state.s = clamp(s, bounds.scale_min, bounds.scale_max);

        state.xp = prev.x;
        state.yp = prev.y;
        state.sp = prev.s;
        state.weight = 0.0;

        next
    }
}
