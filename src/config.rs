use crate::queue::PopOrder;

/// Tunables for a replay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WalkerConfig {
    /// Pop order of the walker's traversal queue. Adjoints do not depend on it,
    /// only the order in which frames visit nodes.
    pub pop_order: PopOrder,
    /// Maximum characters per number in chain-rule text and labels.
    pub precision: usize,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            pop_order: PopOrder::Lifo,
            precision: 4,
        }
    }
}

impl WalkerConfig {
    pub fn with_pop_order(mut self, pop_order: PopOrder) -> Self {
        self.pop_order = pop_order;
        self
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision.max(1);
        self
    }
}
