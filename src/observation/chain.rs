//! Feature chains: weighted (feature, template slot) references.

/// One reference inside a [`FeatureChain`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainEntry {
    /// Feature plane index.
    pub feature: usize,
    /// Template queue slot.
    pub slot: usize,
    /// Component loading; not used by the likelihood itself.
    pub weight: f64,
}

impl ChainEntry {
    pub fn new(feature: usize, slot: usize, weight: f64) -> Self {
        Self { feature, slot, weight }
    }
}

/// An ordered list of template references describing one decomposition
/// component of an object's appearance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureChain {
    entries: Vec<ChainEntry>,
}

impl FeatureChain {
    pub fn new(entries: Vec<ChainEntry>) -> Self {
        Self { entries }
    }

    /// A chain referencing a single template.
    pub fn single(feature: usize, slot: usize, weight: f64) -> Self {
        Self::new(vec![ChainEntry::new(feature, slot, weight)])
    }

    pub fn push(&mut self, entry: ChainEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Slots referenced by each feature, indexed by feature.
    ///
    /// Features the chain never mentions map to an empty list. Entries with a
    /// feature index `>= num_features` are ignored.
    pub fn slots_by_feature(&self, num_features: usize) -> Vec<Vec<usize>> {
        let mut slots = vec![Vec::new(); num_features];
        for e in &self.entries {
            if let Some(list) = slots.get_mut(e.feature) {
                list.push(e.slot);
            }
        }
        slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_chain() {
        let chain = FeatureChain::single(2, 0, 1.0);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.entries()[0], ChainEntry::new(2, 0, 1.0));
    }

    #[test]
    fn test_slots_by_feature() {
        let chain = FeatureChain::new(vec![
            ChainEntry::new(0, 0, 0.5),
            ChainEntry::new(1, 0, 0.5),
            ChainEntry::new(0, 3, 0.2),
            ChainEntry::new(7, 1, 0.9),
        ]);
        let slots = chain.slots_by_feature(2);
        assert_eq!(slots, vec![vec![0, 3], vec![0]]);
    }

    #[test]
    fn test_empty_chain() {
        let chain = FeatureChain::default();
        assert!(chain.is_empty());
        assert_eq!(chain.slots_by_feature(3), vec![Vec::<usize>::new(); 3]);
    }
}
