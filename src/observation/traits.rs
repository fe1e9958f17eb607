//! Pluggable backends for feature extraction and chain decomposition.

use image::RgbImage;
use nalgebra::DMatrix;

use super::FeatureChain;
use crate::Result;

/// Turns a frame into an ordered list of single-channel feature planes.
///
/// Every plane must have the frame's shape (rows = height, cols = width).
pub trait FeatureExtractor: Send + Sync {
    /// Number of planes returned by [`extract`](Self::extract).
    fn num_features(&self) -> usize;

    fn extract(&self, frame: &RgbImage) -> Result<Vec<DMatrix<f64>>>;
}

/// Turns an object's template history into a fixed number of feature chains.
pub trait ChainDecomposer: Send + Sync {
    /// Produce exactly `num_chains` chains from the filled part of the queue.
    fn decompose(&self, history: &TemplateHistory<'_>, num_chains: usize) -> Result<Vec<FeatureChain>>;
}

/// Read-only view of the filled template slots of one object, `[feature][slot]`.
#[derive(Debug, Clone)]
pub struct TemplateHistory<'a> {
    templates: Vec<Vec<&'a DMatrix<f64>>>,
}

impl<'a> TemplateHistory<'a> {
    /// Build a history; every feature must list the same number of slots.
    pub fn new(templates: Vec<Vec<&'a DMatrix<f64>>>) -> Self {
        Self { templates }
    }

    pub fn num_features(&self) -> usize {
        self.templates.len()
    }

    pub fn num_slots(&self) -> usize {
        self.templates.first().map_or(0, Vec::len)
    }

    pub fn get(&self, feature: usize, slot: usize) -> Option<&'a DMatrix<f64>> {
        self.templates.get(feature).and_then(|f| f.get(slot)).copied()
    }
}
