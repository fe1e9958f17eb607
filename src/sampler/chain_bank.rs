//! Parallel chain buffers and the per-frame particle pool.

use rand::Rng;

use crate::particle::Particle;

/// Current and proposed hypotheses of every chain slot, plus the pool of
/// particles recorded during one frame's sweep.
#[derive(Debug, Clone)]
pub struct ChainBank {
    current: Vec<Particle>,
    proposed: Vec<Particle>,
    pool: Vec<Particle>,
    capacity: usize,
    map_index: Option<usize>,
    map_weight: f64,
}

impl ChainBank {
    /// Empty bank for `num_chains` slots with room for `capacity` pooled particles.
    pub fn new(num_chains: usize, capacity: usize) -> Self {
        Self {
            current: Vec::with_capacity(num_chains),
            proposed: Vec::with_capacity(num_chains),
            pool: Vec::with_capacity(capacity),
            capacity,
            map_index: None,
            map_weight: f64::NEG_INFINITY,
        }
    }

    /// Drop every hypothesis and pooled particle.
    pub fn reset(&mut self) {
        self.current.clear();
        self.proposed.clear();
        self.pool.clear();
        self.map_index = None;
        self.map_weight = f64::NEG_INFINITY;
    }

    pub fn num_chains(&self) -> usize {
        self.current.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn current(&self) -> &[Particle] {
        &self.current
    }

    pub fn proposed(&self) -> &[Particle] {
        &self.proposed
    }

    pub fn proposed_mut(&mut self) -> &mut [Particle] {
        &mut self.proposed
    }

    /// Replace the proposed hypotheses.
    pub fn set_proposed(&mut self, proposed: Vec<Particle>) {
        self.proposed = proposed;
    }

    /// Make the proposed hypotheses the current ones.
    pub fn promote_proposed(&mut self) {
        self.current = self.proposed.clone();
    }

    /// Accept the proposed move of object `m` in chain slot `l`.
    pub fn accept(&mut self, l: usize, m: usize) {
        self.current[l].accept_object(m, &self.proposed[l]);
    }

    /// Record the current hypothesis of slot `l` in the pool.
    ///
    /// Returns `false` without recording when the pool is full. The MAP
    /// estimate is updated with the recorded particle's joint weight.
    pub fn record(&mut self, l: usize) -> bool {
        if self.pool.len() >= self.capacity {
            return false;
        }

        let particle = self.current[l].clone();
        let weight = particle.joint_weight();
        self.pool.push(particle);

        if weight > self.map_weight {
            self.map_weight = weight;
            self.map_index = Some(self.pool.len() - 1);
        }
        true
    }

    pub fn is_full(&self) -> bool {
        self.pool.len() >= self.capacity
    }

    pub fn pool(&self) -> &[Particle] {
        &self.pool
    }

    /// Pooled particle with the highest joint weight.
    pub fn map(&self) -> Option<&Particle> {
        self.map_index.map(|i| &self.pool[i])
    }

    pub fn map_weight(&self) -> Option<f64> {
        self.map_index.map(|_| self.map_weight)
    }

    /// Resample every chain slot in proportion to object `m`'s weight.
    ///
    /// Draws one uniform per slot. A draw that falls past the cumulative sum
    /// leaves that slot unchanged; nothing is resampled (and nothing drawn)
    /// when the total weight is not positive.
    pub fn interact<R: Rng + ?Sized>(&mut self, m: usize, rng: &mut R) -> bool {
        let total: f64 = self.current.iter().map(|p| p.objects[m].weight).sum();
        if !(total.is_finite() && total > 0.0) {
            return false;
        }

        let mut next = Vec::with_capacity(self.current.len());
        for l in 0..self.current.len() {
            let draw: f64 = rng.gen();
            let mut cumulative = 0.0;
            let picked = self.current.iter().position(|p| {
                cumulative += p.objects[m].weight / total;
                draw < cumulative
            });
            next.push(self.current[picked.unwrap_or(l)].clone());
        }

        self.current = next;
        true
    }
}
