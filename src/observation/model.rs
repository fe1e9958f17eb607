//! Per-object appearance model: template queue, feature chains and colour
//! reference.

use log::debug;
use nalgebra::DMatrix;
use rand::Rng;

use super::patch::{crop_resize, FloatPlane, PixelWindow};
use super::{ChainDecomposer, FeatureChain, TemplateHistory};
use crate::distances::ColorHistogram;
use crate::internal::imgproc::HsvPlanes;
use crate::sampler::SamplerConfig;
use crate::{Error, Result};

/// Appearance templates and feature chains of one tracked object.
///
/// Templates are stored as `[feature][slot]`. Slot 0 holds the detection-time
/// template for the whole run; the other slots form a ring that is refilled
/// once per frame.
#[derive(Debug, Clone)]
pub struct ObservationModel {
    templates: Vec<Vec<Option<DMatrix<f64>>>>,
    chains: Vec<FeatureChain>,
    /// Mean template per `[chain][feature]`, `None` for features a chain skips.
    averaged: Vec<Vec<Option<DMatrix<f64>>>>,
    queue: usize,
    update: usize,
    queue_len: usize,
    refresh_interval: usize,
    num_chains: usize,
    patch_width: usize,
    patch_height: usize,
    color: ColorReference,
}

impl ObservationModel {
    /// Fresh model for a newly detected object.
    pub fn new(num_features: usize, config: &SamplerConfig, color: ColorReference) -> Result<Self> {
        if num_features == 0 {
            return Err(Error::InvalidConfig("observation model needs at least one feature".to_string()));
        }
        config.validate()?;

        Ok(Self {
            templates: vec![vec![None; config.queue_len]; num_features],
            chains: Vec::new(),
            averaged: Vec::new(),
            queue: 0,
            update: 1,
            queue_len: config.queue_len,
            refresh_interval: config.refresh_interval,
            num_chains: config.num_feature_chains,
            patch_width: config.patch_width,
            patch_height: config.patch_height,
            color,
        })
    }

    pub fn num_features(&self) -> usize {
        self.templates.len()
    }

    pub fn num_chains(&self) -> usize {
        self.num_chains
    }

    /// Slot that the next [`refresh`](Self::refresh) writes.
    pub fn queue_index(&self) -> usize {
        self.queue
    }

    /// Number of refreshes so far plus one.
    pub fn update_count(&self) -> usize {
        self.update
    }

    /// Canonical `(width, height)` of every template.
    pub fn patch_size(&self) -> (usize, usize) {
        (self.patch_width, self.patch_height)
    }

    pub fn template(&self, feature: usize, slot: usize) -> Option<&DMatrix<f64>> {
        self.templates.get(feature)?.get(slot)?.as_ref()
    }

    pub fn chains(&self) -> &[FeatureChain] {
        &self.chains
    }

    pub fn chain(&self, index: usize) -> Option<&FeatureChain> {
        self.chains.get(index)
    }

    /// Mean of the templates chain `chain` references for `feature`.
    pub fn averaged_template(&self, chain: usize, feature: usize) -> Option<&DMatrix<f64>> {
        self.averaged.get(chain)?.get(feature)?.as_ref()
    }

    pub fn color(&self) -> &ColorReference {
        &self.color
    }

    pub fn color_mut(&mut self) -> &mut ColorReference {
        &mut self.color
    }

    /// Store the object's current appearance in the active queue slot and
    /// update the feature chains.
    ///
    /// On the first update every chain is seeded with one random feature at
    /// slot 0. On every `refresh_interval`-th update the decomposer rebuilds
    /// the chains from the slots filled so far.
    pub fn refresh<R: Rng + ?Sized>(
        &mut self,
        features: &[FloatPlane],
        window: PixelWindow,
        decomposer: &dyn ChainDecomposer,
        rng: &mut R,
    ) -> Result<()> {
        if features.len() != self.num_features() {
            return Err(Error::FeatureExtraction(format!(
                "expected {} feature planes, got {}",
                self.num_features(),
                features.len()
            )));
        }

        let slot = self.queue;
        for (feature, plane) in features.iter().enumerate() {
            let patch = crop_resize(plane, window, self.patch_width, self.patch_height);
            self.templates[feature][slot] = Some(patch);
        }

        if self.update == 1 {
            let num_features = self.num_features();
            let chains = (0..self.num_chains)
                .map(|_| FeatureChain::single(rng.gen_range(0..num_features), 0, 1.0))
                .collect();
            self.set_chains(chains)?;
        } else if self.update % self.refresh_interval == 0 {
            let filled = if self.update < self.queue_len {
                self.queue + 1
            } else {
                self.queue_len
            };
            let chains = {
                let history = self.history(filled)?;
                decomposer.decompose(&history, self.num_chains)?
            };
            debug!(
                "Decomposed {} template slots into {} chains (update {})",
                filled,
                chains.len(),
                self.update
            );
            self.set_chains(chains)?;
        } else {
            self.rebuild_averages()?;
        }

        Ok(())
    }

    /// Advance the queue after a frame; the ring wraps back to slot 1.
    pub fn advance(&mut self) {
        self.update += 1;
        self.queue += 1;
        if self.queue == self.queue_len {
            self.queue = 1;
        }
    }

    /// Install a new set of chains.
    ///
    /// Rejects a wrong chain count, empty chains, over-long chains and
    /// references to features or slots that hold no template.
    pub fn set_chains(&mut self, chains: Vec<FeatureChain>) -> Result<()> {
        if chains.len() != self.num_chains {
            return Err(Error::Decomposition(format!(
                "expected {} chains, got {}",
                self.num_chains,
                chains.len()
            )));
        }

        let max_len = self.queue_len * self.num_features();
        for (i, chain) in chains.iter().enumerate() {
            if chain.is_empty() {
                return Err(Error::Decomposition(format!("chain {} is empty", i)));
            }
            if chain.len() > max_len {
                return Err(Error::Decomposition(format!(
                    "chain {} has {} entries, at most {} allowed",
                    i,
                    chain.len(),
                    max_len
                )));
            }
            for e in chain.entries() {
                if self.template(e.feature, e.slot).is_none() {
                    return Err(Error::Decomposition(format!(
                        "chain {} references feature {} slot {} which holds no template",
                        i, e.feature, e.slot
                    )));
                }
            }
        }

        self.chains = chains;
        self.rebuild_averages()
    }

    fn history(&self, filled: usize) -> Result<TemplateHistory<'_>> {
        let templates = self
            .templates
            .iter()
            .enumerate()
            .map(|(feature, slots)| {
                slots[..filled]
                    .iter()
                    .enumerate()
                    .map(|(slot, t)| {
                        t.as_ref().ok_or_else(|| {
                            Error::Decomposition(format!("feature {} slot {} is not filled", feature, slot))
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TemplateHistory::new(templates))
    }

    fn rebuild_averages(&mut self) -> Result<()> {
        let num_features = self.num_features();
        let mut averaged = Vec::with_capacity(self.chains.len());

        for chain in &self.chains {
            let mut per_feature = Vec::with_capacity(num_features);
            for (feature, slots) in chain.slots_by_feature(num_features).iter().enumerate() {
                if slots.is_empty() {
                    per_feature.push(None);
                    continue;
                }

                let mut sum = DMatrix::zeros(self.patch_height, self.patch_width);
                for &slot in slots {
                    let t = self.template(feature, slot).ok_or_else(|| {
                        Error::LikelihoodError(format!("feature {} slot {} holds no template", feature, slot))
                    })?;
                    sum += t;
                }
                per_feature.push(Some(sum / slots.len() as f64));
            }
            averaged.push(per_feature);
        }

        self.averaged = averaged;
        Ok(())
    }
}

/// Reference colour histograms for the upper and lower half of an object.
///
/// The detection-time pixel counts are kept so the reference can be blended
/// with the object's latest appearance.
#[derive(Debug, Clone, Default)]
pub struct ColorReference {
    initial: [ColorHistogram; 2],
    current: [ColorHistogram; 2],
}

impl ColorReference {
    /// Upper and lower half windows of a `w × h` box centred on `(row, col)`.
    pub fn half_windows(row: i64, col: i64, w: i64, h: i64) -> [PixelWindow; 2] {
        let upper = PixelWindow { col: col - w / 2, row: row - h / 2, width: w, height: h / 2 };
        let lower = PixelWindow { col: col - w / 2, row, width: w, height: h / 2 };
        [upper, lower]
    }

    /// Reference taken from the detection window.
    pub fn from_window(planes: &HsvPlanes, row: i64, col: i64, w: i64, h: i64) -> Self {
        let windows = Self::half_windows(row, col, w, h);
        let initial = windows.map(|win| {
            let mut histo = ColorHistogram::new();
            histo.accumulate(planes, win);
            histo
        });
        let current = initial.clone().map(|mut histo| {
            histo.normalize();
            histo
        });
        Self { initial, current }
    }

    /// Recompute the reference from the detection-time pixels together with
    /// the pixels of the given window.
    pub fn blend(&mut self, planes: &HsvPlanes, row: i64, col: i64, w: i64, h: i64) {
        let windows = Self::half_windows(row, col, w, h);
        for (i, win) in windows.into_iter().enumerate() {
            let mut histo = self.initial[i].clone();
            histo.accumulate(planes, win);
            histo.normalize();
            self.current[i] = histo;
        }
    }

    /// Normalised reference histograms, `[upper, lower]`.
    pub fn histograms(&self) -> &[ColorHistogram; 2] {
        &self.current
    }
}
