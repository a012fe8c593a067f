use std::collections::{HashSet, VecDeque};

use log::trace;

use crate::{
    tensor::Tensor,
    term::{NodeId, Term},
};

/// Which end of the queue [`TraversalQueue::pop`] takes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PopOrder {
    /// Most recently pushed first.
    #[default]
    Lifo,
    /// Oldest first, i.e. breadth-first replay.
    Fifo,
}

/// A de-duplicating work-list of nodes.
///
/// Membership is tracked in a companion set keyed by [`NodeId`], so
/// [`contains`](Self::contains) is O(1). A node leaves the set when it is popped
/// and may be pushed again afterwards.
pub struct TraversalQueue<T> {
    order: PopOrder,
    nodes: VecDeque<Term<T>>,
    members: HashSet<NodeId>,
}

impl<T: Tensor> TraversalQueue<T> {
    pub fn new(order: PopOrder) -> Self {
        Self {
            order,
            nodes: VecDeque::new(),
            members: HashSet::new(),
        }
    }

    /// Push `node` unless it is already waiting. Returns whether it was added.
    pub fn push(&mut self, node: Term<T>) -> bool {
        if !self.members.insert(node.id()) {
            return false;
        }
        trace!("queue push {} ({})", node.id(), node.name());
        self.nodes.push_back(node);
        true
    }

    pub fn pop(&mut self) -> Option<Term<T>> {
        let node = match self.order {
            PopOrder::Lifo => self.nodes.pop_back(),
            PopOrder::Fifo => self.nodes.pop_front(),
        }?;
        self.members.remove(&node.id());
        trace!("queue pop {} ({})", node.id(), node.name());
        Some(node)
    }

    pub fn contains(&self, node: &Term<T>) -> bool {
        self.members.contains(&node.id())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
