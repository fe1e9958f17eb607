//! Default chain decomposer based on an eigen-decomposition of the template
//! Gram matrix.

use nalgebra::{DMatrix, SymmetricEigen};

use super::{ChainDecomposer, ChainEntry, FeatureChain, TemplateHistory};
use crate::{Error, Result};

/// Loading magnitude above which a template joins a chain.
pub const DEFAULT_LOADING_THRESHOLD: f64 = 0.1;

/// Builds feature chains from the principal components of the normalised
/// template matrix.
///
/// Every `(feature, slot)` template becomes one column of a data matrix,
/// column `slot + num_slots * feature`. Columns are scaled to unit L2 norm and
/// the Gram matrix is eigen-decomposed. Chain `i` takes the `i`-th strongest
/// component (wrapping when there are fewer components than chains) and keeps
/// every template whose loading exceeds the threshold, plus every slot-0
/// template.
#[derive(Debug, Clone, Copy)]
pub struct EigenChainDecomposer {
    threshold: f64,
}

impl Default for EigenChainDecomposer {
    fn default() -> Self {
        Self::new(DEFAULT_LOADING_THRESHOLD)
    }
}

impl EigenChainDecomposer {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn data_matrix(history: &TemplateHistory<'_>) -> Result<DMatrix<f64>> {
        let num_features = history.num_features();
        let num_slots = history.num_slots();
        let first = history
            .get(0, 0)
            .ok_or_else(|| Error::Decomposition("template history is empty".to_string()))?;
        let pixels = first.len();

        let mut data = DMatrix::zeros(pixels, num_slots * num_features);
        for feature in 0..num_features {
            for slot in 0..num_slots {
                let template = history.get(feature, slot).ok_or_else(|| {
                    Error::Decomposition(format!("missing template for feature {} slot {}", feature, slot))
                })?;
                if template.len() != pixels {
                    return Err(Error::Decomposition(format!(
                        "template for feature {} slot {} has {} pixels, expected {}",
                        feature,
                        slot,
                        template.len(),
                        pixels
                    )));
                }

                let mut column = data.column_mut(slot + num_slots * feature);
                column.copy_from_slice(template.as_slice());
                let norm = column.norm();
                if norm > 0.0 {
                    column /= norm;
                }
            }
        }
        Ok(data)
    }
}

impl ChainDecomposer for EigenChainDecomposer {
    fn decompose(&self, history: &TemplateHistory<'_>, num_chains: usize) -> Result<Vec<FeatureChain>> {
        let num_slots = history.num_slots();
        let data = Self::data_matrix(history)?;
        let gram = data.transpose() * &data;

        let eigen = SymmetricEigen::new(gram);
        if eigen.eigenvalues.iter().any(|v| !v.is_finite()) {
            return Err(Error::Decomposition("non-finite eigenvalues".to_string()));
        }

        let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let chains = (0..num_chains)
            .map(|i| {
                let component = eigen.eigenvectors.column(order[i % order.len()]);
                let mut chain = FeatureChain::default();
                for (j, loading) in component.iter().enumerate() {
                    let (feature, slot) = (j / num_slots, j % num_slots);
                    let magnitude = loading.abs();
                    if magnitude > self.threshold || slot == 0 {
                        chain.push(ChainEntry::new(feature, slot, magnitude));
                    }
                }
                chain
            })
            .collect();

        Ok(chains)
    }
}
