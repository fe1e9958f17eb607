//! HSV colour histograms and the Bhattacharyya distance.

use crate::internal::imgproc::HsvPlanes;
use crate::observation::PixelWindow;

/// Number of hue bins.
pub const NUM_HUE_BINS: usize = 10;
/// Number of saturation bins.
pub const NUM_SAT_BINS: usize = 10;
/// Number of value-only bins for colourless pixels.
pub const NUM_VAL_BINS: usize = 10;

const HUE_MAX: f64 = 360.0;
const SAT_THRESHOLD: f64 = 0.1;
const VAL_THRESHOLD: f64 = 0.2;

/// Bin index for an HSV pixel.
///
/// Pixels with low saturation or value fall into one of the trailing
/// "colourless" bins, indexed by value alone.
pub fn histo_bin(h: f64, s: f64, v: f64) -> usize {
    let vd = ((v * NUM_VAL_BINS as f64) as usize).min(NUM_VAL_BINS - 1);
    if s < SAT_THRESHOLD || v < VAL_THRESHOLD {
        return NUM_HUE_BINS * NUM_SAT_BINS + vd;
    }

    let hd = ((h * NUM_HUE_BINS as f64 / HUE_MAX) as usize).min(NUM_HUE_BINS - 1);
    let sd = ((s * NUM_SAT_BINS as f64) as usize).min(NUM_SAT_BINS - 1);
    sd * NUM_HUE_BINS + hd
}

/// HSV histogram with `10 × 10` colour bins plus 10 value bins.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorHistogram {
    bins: Vec<f64>,
}

impl Default for ColorHistogram {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorHistogram {
    /// Number of bins in every histogram.
    pub const LEN: usize = NUM_HUE_BINS * NUM_SAT_BINS + NUM_VAL_BINS;

    /// Empty (all-zero) histogram.
    pub fn new() -> Self {
        Self { bins: vec![0.0; Self::LEN] }
    }

    /// Normalised histogram accumulated over several windows of the same or
    /// different frames.
    pub fn from_windows<'a, I>(windows: I) -> Self
    where
        I: IntoIterator<Item = (&'a HsvPlanes, PixelWindow)>,
    {
        let mut histo = Self::new();
        for (planes, window) in windows {
            histo.accumulate(planes, window);
        }
        histo.normalize();
        histo
    }

    /// Add every pixel of `window` (clipped to the image) to the histogram.
    pub fn accumulate(&mut self, planes: &HsvPlanes, window: PixelWindow) {
        let Some((r0, c0, rows, cols)) = window.clip(planes.nrows(), planes.ncols()) else {
            return;
        };

        for r in r0..r0 + rows {
            for c in c0..c0 + cols {
                let bin = histo_bin(
                    planes.hue[(r, c)],
                    planes.saturation[(r, c)],
                    planes.value[(r, c)],
                );
                self.bins[bin] += 1.0;
            }
        }
    }

    /// Scale the bins so they sum to one. An empty histogram stays empty.
    pub fn normalize(&mut self) {
        let sum: f64 = self.bins.iter().sum();
        if sum > 0.0 {
            let inv = 1.0 / sum;
            self.bins.iter_mut().for_each(|b| *b *= inv);
        }
    }

    pub fn bins(&self) -> &[f64] {
        &self.bins
    }

    pub fn total(&self) -> f64 {
        self.bins.iter().sum()
    }

    /// Squared Bhattacharyya distance `1 − Σ √(h1·h2)`; both histograms
    /// should be normalised.
    pub fn bhattacharyya_dist_sq(&self, other: &ColorHistogram) -> f64 {
        let coeff: f64 = self
            .bins
            .iter()
            .zip(&other.bins)
            .map(|(a, b)| (a * b).sqrt())
            .sum();
        1.0 - coeff
    }
}
