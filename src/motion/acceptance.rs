//! Metropolis-Hastings acceptance.

use rand::Rng;

/// Acceptance ratio `exp(ln w_new − ln w_old)`.
///
/// Both weights are floored at `floor` before taking logarithms so that an
/// underflowed likelihood never produces NaN.
#[inline]
pub fn acceptance_ratio(w_new: f64, w_old: f64, floor: f64) -> f64 {
    let new = w_new.max(floor);
    let old = w_old.max(floor);
    (new.ln() - old.ln()).exp()
}

/// Decide whether a proposal with acceptance `ratio` is taken.
///
/// A ratio of at least one is accepted without consuming randomness;
/// otherwise a single uniform draw decides.
#[inline]
pub fn accept_move<R: Rng + ?Sized>(ratio: f64, rng: &mut R) -> bool {
    if ratio >= 1.0 {
        return true;
    }
    rng.gen::<f64>() < ratio
}
