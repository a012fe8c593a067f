//! One backward traversal from a root node, collecting the static graph the
//! walker replays.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::{
    queue::{PopOrder, TraversalQueue},
    tensor::Tensor,
    term::{Category, NodeId, Term},
};

/// A directed edge from an operand to the node consuming it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Edge {
    pub operand: NodeId,
    pub consumer: NodeId,
}

impl Edge {
    pub fn new(operand: NodeId, consumer: NodeId) -> Self {
        Self { operand, consumer }
    }
}

/// The graph reachable backward from a root.
pub struct Sweep<T> {
    root: Term<T>,
    nodes: Vec<Term<T>>,
    index: HashMap<NodeId, usize>,
    edges: Vec<Edge>,
    leaf_count: usize,
    variables: Vec<Term<T>>,
    /// Number of operand slots that refer to each node, counting `x * x` twice.
    consumer_slots: HashMap<NodeId, usize>,
    repeated_slots: usize,
}

impl<T: Tensor> Sweep<T> {
    pub fn new(root: &Term<T>) -> Self {
        let mut queue = TraversalQueue::new(PopOrder::Lifo);
        let mut discovered = HashSet::new();
        let mut nodes = vec![];
        let mut index = HashMap::new();
        let mut edges = vec![];
        let mut leaf_count = 0;
        let mut variables = vec![];
        let mut consumer_slots = HashMap::new();
        let mut repeated_slots = 0;

        discovered.insert(root.id());
        queue.push(root.clone());

        while let Some(current) = queue.pop() {
            index.insert(current.id(), nodes.len());
            nodes.push(current.clone());

            match current.category() {
                Category::Variable => {
                    leaf_count += 1;
                    variables.push(current);
                    continue;
                }
                Category::Constant => {
                    leaf_count += 1;
                    continue;
                }
                Category::Operation => (),
            }

            let operands = current.operand_list();
            for operand in &operands {
                *consumer_slots.entry(operand.id()).or_insert(0) += 1;
            }

            let mut distinct = operands.clone();
            distinct.sort_by_key(|operand| operand.id());
            distinct.dedup_by_key(|operand| operand.id());
            repeated_slots += operands.len() - distinct.len();

            for operand in distinct {
                edges.push(Edge::new(operand.id(), current.id()));
                if discovered.insert(operand.id()) {
                    queue.push(operand.clone());
                }
            }
        }

        debug!(
            "swept {}: {} nodes, {} edges, {} leaves, {} variables",
            root.name(),
            nodes.len(),
            edges.len(),
            leaf_count,
            variables.len()
        );

        Self {
            root: root.clone(),
            nodes,
            index,
            edges,
            leaf_count,
            variables,
            consumer_slots,
            repeated_slots,
        }
    }

    pub fn root(&self) -> &Term<T> {
        &self.root
    }

    /// Every reachable node, in the order the sweep visited them.
    pub fn nodes(&self) -> &[Term<T>] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Term<T>> {
        self.index.get(&id).map(|i| &self.nodes[*i])
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Variable nodes in discovery order.
    pub fn variables(&self) -> &[Term<T>] {
        &self.variables
    }

    pub fn consumer_slots(&self, id: NodeId) -> usize {
        self.consumer_slots.get(&id).copied().unwrap_or(0)
    }

    /// How many frames a full replay emits: one per operand slot of every
    /// operation plus one per leaf. Equals `edges().len() + leaf_count()`
    /// unless some node uses the same operand twice.
    pub fn frame_budget(&self) -> usize {
        self.edges.len() + self.leaf_count + self.repeated_slots
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn diamond_visits_each_node_once() {
        let a = Term::variable("a", 1.);
        let b = Term::variable("b", 3.);
        let c = Term::variable("c", 5.);
        let ab = &a + &b;
        let ac = &a + &c;
        let abac = &ab + &ac;

        let sweep = Sweep::new(&abac);
        assert_eq!(sweep.nodes().len(), 6);
        assert_eq!(sweep.edges().len(), 6);
        assert_eq!(sweep.leaf_count(), 3);
        assert_eq!(sweep.variables().len(), 3);
        assert_eq!(sweep.consumer_slots(a.id()), 2);
        assert_eq!(sweep.frame_budget(), 9);

        let mut ids: Vec<_> = sweep.nodes().iter().map(|n| n.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 6);
    }

    #[test]
    fn repeated_operand_yields_one_edge() {
        let x = Term::variable("x", 2.);
        let sq = &x * &x;
        let sweep = Sweep::new(&sq);
        assert_eq!(sweep.edges(), &[Edge::new(x.id(), sq.id())]);
        assert_eq!(sweep.leaf_count(), 1);
        assert_eq!(sweep.consumer_slots(x.id()), 2);
        assert_eq!(sweep.frame_budget(), 3);
    }

    #[test]
    fn operands_ordered_by_id() {
        let a = Term::variable("a", 1.);
        let b = Term::variable("b", 2.);
        let ba = &b - &a;
        let sweep = Sweep::new(&ba);
        assert_eq!(
            sweep.edges(),
            &[Edge::new(a.id(), ba.id()), Edge::new(b.id(), ba.id())]
        );
    }

    #[test]
    fn leaf_root() {
        let k = Term::constant(4.);
        let sweep = Sweep::new(&k);
        assert!(sweep.edges().is_empty());
        assert_eq!(sweep.leaf_count(), 1);
        assert!(sweep.variables().is_empty());
        assert_eq!(sweep.frame_budget(), 1);
        assert_eq!(sweep.node(k.id()).map(|n| n.name()), Some("4"));
    }
}
