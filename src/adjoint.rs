use std::collections::HashMap;

use log::trace;

use crate::{
    tensor::Tensor,
    term::{NodeId, Term},
};

/// Running sums of chain-rule contributions, keyed by node.
///
/// A value is only final once every consumer of the node has contributed.
#[derive(Debug)]
pub struct AdjointStore<T> {
    values: HashMap<NodeId, T>,
}

impl<T: Tensor> Default for AdjointStore<T> {
    fn default() -> Self {
        Self {
            values: HashMap::new(),
        }
    }
}

impl<T: Tensor> AdjointStore<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// d root / d root: ones shaped like the root's value.
    pub fn seed(&mut self, root: &Term<T>) {
        self.values.insert(root.id(), root.value().ones_like());
    }

    pub fn add(&mut self, id: NodeId, value: T) {
        trace!("adjoint[{id}] += {value}");
        *self.values.entry(id).or_default() += value;
    }

    /// The accumulated value, zero if nothing was written yet.
    pub fn get(&self, id: NodeId) -> T {
        self.values.get(&id).cloned().unwrap_or_default()
    }

    /// Mark the node's own contribution as fully forwarded. The entry stays
    /// present (as zero), so [`touched`](Self::touched) still reports it.
    pub fn reset(&mut self, id: NodeId) {
        self.values.insert(id, T::default());
    }

    /// Whether the node has been seeded, accumulated into or reset.
    pub fn touched(&self, id: NodeId) -> bool {
        self.values.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &T)> {
        self.values.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tensor::Array;

    #[test]
    fn accumulates_instead_of_overwriting() {
        let x = Term::variable("x", 0.);
        let mut store = AdjointStore::new();
        assert_eq!(store.get(x.id()), 0.);
        assert!(!store.touched(x.id()));
        store.add(x.id(), 2.);
        store.add(x.id(), 3.);
        assert_eq!(store.get(x.id()), 5.);
        store.reset(x.id());
        assert_eq!(store.get(x.id()), 0.);
        assert!(store.touched(x.id()));
    }

    #[test]
    fn seed_matches_root_shape() {
        let x = Term::variable("x", Array::new(vec![1., 2., 3.]));
        let mut store = AdjointStore::new();
        store.seed(&x);
        assert_eq!(store.get(x.id()), Array::new(vec![1., 1., 1.]));
    }
}
