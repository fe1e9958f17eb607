//! Diffusion distance between histograms or feature maps.
//!
//! The difference of the two inputs is diffused with a small Gaussian kernel
//! and downsampled by two along every axis until an axis reaches length one.
//! The distance is the sum of the L1 norms of every level of that pyramid.
//!
//! Inputs are flat slices in row-major order: element `[i, j, k]` of an
//! `n1 × n2 × n3` histogram lives at `i*(n2*n3) + j*n3 + k`.

use crate::{Error, Result};

/// One-dimensional smoothing kernel; its outer product gives the 2D and 3D
/// Gaussian filters.
const KERNEL: [f64; 3] = [0.1065, 0.787, 0.1065];

/// Diffusion distance calculator with reusable scratch buffers.
///
/// Buffers are only reallocated when the input dimensions differ from the
/// previous call.
#[derive(Debug, Clone, Default)]
pub struct DiffusionDistance {
    dims: Vec<usize>,
    diff: Vec<f64>,
    tmp: Vec<f64>,
    resizes: usize,
}

impl DiffusionDistance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a calculator with buffers sized for `dims`.
    pub fn with_dimensions(dims: &[usize]) -> Self {
        let mut dd = Self::new();
        dd.set_dimensions(dims);
        dd
    }

    /// Resize the scratch buffers for inputs of shape `dims`.
    pub fn set_dimensions(&mut self, dims: &[usize]) {
        let len = dims.iter().product();
        self.dims = dims.to_vec();
        self.diff.resize(len, 0.0);
        self.tmp.resize(len, 0.0);
        self.resizes += 1;
    }

    /// Dimensions the buffers are currently sized for.
    pub fn dimensions(&self) -> &[usize] {
        &self.dims
    }

    /// How many times the buffers have been resized.
    pub fn resize_count(&self) -> usize {
        self.resizes
    }

    /// Distance between two `n1 × n2` histograms.
    pub fn dd2d(&mut self, h1: &[f64], h2: &[f64], n1: usize, n2: usize) -> Result<f64> {
        self.distance(h1, h2, &[n1, n2])
    }

    /// Distance between two `n1 × n2 × n3` histograms.
    pub fn dd3d(&mut self, h1: &[f64], h2: &[f64], n1: usize, n2: usize, n3: usize) -> Result<f64> {
        self.distance(h1, h2, &[n1, n2, n3])
    }

    /// Distance between two histograms of arbitrary shape.
    ///
    /// The pyramid stops as soon as any axis has length one, so an input
    /// with a singleton axis contributes only its level-0 L1 norm.
    pub fn distance(&mut self, h1: &[f64], h2: &[f64], dims: &[usize]) -> Result<f64> {
        let len: usize = dims.iter().product();
        if dims.is_empty() || len == 0 {
            return Err(Error::DistanceError(format!(
                "histogram dimensions must be non-empty and non-zero, got {:?}",
                dims
            )));
        }
        if h1.len() != len || h2.len() != len {
            return Err(Error::DistanceError(format!(
                "histogram lengths {} and {} don't match dimensions {:?}",
                h1.len(),
                h2.len(),
                dims
            )));
        }

        if self.dims != dims {
            self.set_dimensions(dims);
        }

        for ((d, a), b) in self.diff.iter_mut().zip(h1).zip(h2) {
            *d = a - b;
        }

        let mut shape = dims.to_vec();
        let mut dist = l1(&self.diff[..len]);

        while shape.iter().all(|&n| n > 1) {
            self.smooth(&shape);
            self.downsample(&mut shape);
            let level_len: usize = shape.iter().product();
            dist += l1(&self.diff[..level_len]);
        }

        Ok(dist)
    }

    /// Separable smoothing with boundary renormalisation along every axis.
    fn smooth(&mut self, shape: &[usize]) {
        for axis in 0..shape.len() {
            let outer: usize = shape[..axis].iter().product();
            let n = shape[axis];
            let inner: usize = shape[axis + 1..].iter().product();

            for o in 0..outer {
                let base = o * n * inner;
                for i in 0..n {
                    let lo = i.saturating_sub(1);
                    let hi = (i + 1).min(n - 1);
                    let norm: f64 = (lo..=hi).map(|j| KERNEL[j + 1 - i]).sum();

                    for r in 0..inner {
                        let acc: f64 = (lo..=hi)
                            .map(|j| KERNEL[j + 1 - i] * self.diff[base + j * inner + r])
                            .sum();
                        self.tmp[base + i * inner + r] = acc / norm;
                    }
                }
            }
            std::mem::swap(&mut self.diff, &mut self.tmp);
        }
    }

    /// Halve every axis by summing adjacent pairs; an odd trailing element is dropped.
    fn downsample(&mut self, shape: &mut [usize]) {
        for axis in 0..shape.len() {
            let outer: usize = shape[..axis].iter().product();
            let n = shape[axis];
            let half = n / 2;
            let inner: usize = shape[axis + 1..].iter().product();

            for o in 0..outer {
                for i in 0..half {
                    let src = o * n * inner + 2 * i * inner;
                    let dst = o * half * inner + i * inner;
                    for r in 0..inner {
                        self.tmp[dst + r] = self.diff[src + r] + self.diff[src + inner + r];
                    }
                }
            }
            shape[axis] = half;
            std::mem::swap(&mut self.diff, &mut self.tmp);
        }
    }
}

#[inline]
fn l1(values: &[f64]) -> f64 {
    values.iter().map(|v| v.abs()).sum()
}
