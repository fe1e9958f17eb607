//! Second-order autoregressive transition model.

use rand::Rng;

use super::{motion_param, MotionBounds, MotionNoise, BORDER_MARGIN};
use crate::particle::Particle;
use crate::utils::clamp;

/// Propagates every object of a joint hypothesis one frame forward.
///
/// For each object the new position is
/// `x' = A1·(x − x0) + A2·(xp − x0) + B0·param·σx·n + x0`
/// (and symmetrically for y and the scale around 1), clamped to the frame.
#[derive(Debug, Clone, Copy)]
pub struct TransitionModel {
    noise: MotionNoise,
    variance: f64,
}

impl TransitionModel {
    pub fn new(noise: MotionNoise, variance: f64) -> Self {
        Self { noise, variance }
    }

    /// Sample a successor of `particle`.
    ///
    /// Draws three deviates per object (x, y, scale) in object order. The
    /// returned particle carries zero weights and remembers the input state as
    /// its previous state.
    pub fn propagate<R: Rng + ?Sized>(
        &self,
        particle: &Particle,
        bounds: &MotionBounds,
        motion_index: usize,
        rng: &mut R,
    ) -> Particle {
        let param = motion_param(self.variance, motion_index);
        let n = &self.noise;

        let mut next = particle.clone();
        for (state, prev) in next.objects.iter_mut().zip(&particle.objects) {
            let x = n.a1 * (prev.x - prev.x0)
                + n.a2 * (prev.xp - prev.x0)
                + n.b0 * param * n.transition_x_std * n.deviate(rng)
                + prev.x0;
            state.x = clamp(x, BORDER_MARGIN, bounds.frame_width - 1.0);

            let y = n.a1 * (prev.y - prev.y0)
                + n.a2 * (prev.yp - prev.y0)
                + n.b0 * param * n.transition_y_std * n.deviate(rng)
                + prev.y0;
            state.y = clamp(y, BORDER_MARGIN, bounds.frame_height - 1.0);

            let s = n.a1 * (prev.s - 1.0)
                + n.a2 * (prev.sp - 1.0)
                + n.b0 * param * n.transition_s_std * n.deviate(rng)
                + 1.0;
            state.s = clamp(s, bounds.scale_min, bounds.scale_max);

            state.xp = prev.x;
            state.yp = prev.y;
            state.sp = prev.s;
            state.weight = 0.0;
        }

        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ObjectState;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn bounds() -> MotionBounds {
        MotionBounds::new(100, 100, 0.9, 1.1)
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let model = TransitionModel::new(MotionNoise::default(), 1.0);
        let p = Particle::new(vec![ObjectState::at_rest(50.0, 50.0, 10.0, 10.0)]);

        let a = model.propagate(&p, &bounds(), 0, &mut StdRng::seed_from_u64(5));
        let b = model.propagate(&p, &bounds(), 0, &mut StdRng::seed_from_u64(5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_zero_variance_follows_constant_velocity() {
        let model = TransitionModel::new(MotionNoise::default(), 0.0);
        let mut o = ObjectState::at_rest(50.0, 50.0, 10.0, 10.0);
        o.xp = 46.0; // moving +4 px per frame in x
        o.yp = 52.0; // moving -2 px per frame in y
        let p = Particle::new(vec![o]);

        let next = model.propagate(&p, &bounds(), 0, &mut StdRng::seed_from_u64(1));
        let s = next.objects[0];
        assert!((s.x - 54.0).abs() < 1e-12);
        assert!((s.y - 48.0).abs() < 1e-12);
        assert_eq!((s.xp, s.yp, s.sp), (50.0, 50.0, 1.0));
        assert_eq!(s.weight, 0.0);
    }

    #[test]
    fn test_clamps_to_frame_and_scale_bounds() {
        let model = TransitionModel::new(MotionNoise::default(), 0.0);
        let mut o = ObjectState::at_rest(95.0, 5.0, 10.0, 10.0);
        o.xp = 60.0; // would jump far beyond the right border
        o.yp = 30.0; // would jump above the top margin
        o.s = 1.5;
        let p = Particle::new(vec![o]);

        let s = model.propagate(&p, &bounds(), 1, &mut StdRng::seed_from_u64(2)).objects[0];
        assert_eq!(s.x, 99.0);
        assert_eq!(s.y, BORDER_MARGIN);
        assert_eq!(s.s, 1.1);
    }

    #[test]
    fn test_doubled_variance_spreads_further() {
        let model = TransitionModel::new(MotionNoise::default(), 1.0);
        let p = Particle::new(vec![ObjectState::at_rest(50.0, 50.0, 10.0, 10.0)]);
        let wide = MotionBounds::new(1000, 1000, 0.5, 2.0);
        let mut rng = StdRng::seed_from_u64(9);

        let spread = |index: usize, rng: &mut StdRng| -> f64 {
            (0..4000)
                .map(|_| (model.propagate(&p, &wide, index, rng).objects[0].x - 50.0).powi(2))
                .sum::<f64>()
        };
        let base = spread(0, &mut rng);
        let doubled = spread(1, &mut rng);
        assert!(doubled > 3.0 * base, "base {} doubled {}", base, doubled);
    }
}
