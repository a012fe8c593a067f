//! Stepwise replay of reverse-mode differentiation.
//!
//! A [`Walker`] advances by exactly one unit of work per [`Walker::tick`]: one
//! operand edge of an operation, or the acknowledgement of a leaf. Binary
//! operations therefore span two consecutive ticks, modelled by
//! an "awaiting second operand" state.
//!
//! An operand is queued only once every consumer slot that refers to it has
//! been processed, so a node is popped exactly once and with its final
//! adjoint, also when subexpressions are shared.

use std::collections::HashMap;

use log::debug;

use crate::{
    adjoint::AdjointStore,
    config::WalkerConfig,
    frame::{EdgeLabel, Frame, FrameKind, VariableAdjoint},
    op::partial,
    queue::TraversalQueue,
    sweep::{Edge, Sweep},
    tensor::Tensor,
    term::{Category, NodeId, Term},
};

enum WalkState<T> {
    AwaitingNode,
    /// Operand A of `node` was processed on the previous tick.
    AwaitingSecondOperand { node: Term<T>, operand: Term<T> },
}

struct EdgeStep<T> {
    edge: Edge,
    text: String,
    contribution: Option<T>,
}

pub struct Walker<T> {
    sweep: Sweep<T>,
    config: WalkerConfig,
    queue: TraversalQueue<T>,
    adjoint: AdjointStore<T>,
    display: HashMap<Edge, T>,
    /// Consumer slots of each node that have not been processed yet.
    pending: HashMap<NodeId, usize>,
    state: WalkState<T>,
    ticks: usize,
}

impl<T: Tensor> Walker<T> {
    pub fn new(root: &Term<T>) -> Self {
        Self::with_config(root, WalkerConfig::default())
    }

    pub fn with_config(root: &Term<T>, config: WalkerConfig) -> Self {
        Self::from_sweep(Sweep::new(root), config)
    }

    pub fn from_sweep(sweep: Sweep<T>, config: WalkerConfig) -> Self {
        let mut queue = TraversalQueue::new(config.pop_order);
        let mut adjoint = AdjointStore::new();
        adjoint.seed(sweep.root());
        queue.push(sweep.root().clone());
        let pending = sweep
            .nodes()
            .iter()
            .map(|node| (node.id(), sweep.consumer_slots(node.id())))
            .collect();
        Self {
            sweep,
            config,
            queue,
            adjoint,
            display: HashMap::new(),
            pending,
            state: WalkState::AwaitingNode,
            ticks: 0,
        }
    }

    /// Advance one step. Returns `None` once the replay is complete.
    pub fn tick(&mut self) -> Option<Frame<T>> {
        let state = std::mem::replace(&mut self.state, WalkState::AwaitingNode);
        let (node, index, step) = match state {
            WalkState::AwaitingSecondOperand { node, operand } => {
                let step = self.process_edge(&node, &operand, 1);
                self.release(&operand);
                self.adjoint.reset(node.id());
                (node, 1, step)
            }
            WalkState::AwaitingNode => {
                let node = self.queue.pop()?;

                let mut operands = node
                    .operand_list()
                    .into_iter()
                    .cloned()
                    .collect::<Vec<_>>()
                    .into_iter();
                let Some(first) = operands.next() else {
                    return Some(self.terminal(node));
                };

                let step = self.process_edge(&node, &first, 0);
                self.release(&first);
                match operands.next() {
                    Some(second) => {
                        self.state = WalkState::AwaitingSecondOperand {
                            node: node.clone(),
                            operand: second,
                        }
                    }
                    None => self.adjoint.reset(node.id()),
                }
                (node, 0, step)
            }
        };

        debug!(
            "tick {}: edge {} -> {} (operand {index})",
            self.ticks,
            step.edge.operand,
            node.name()
        );
        Some(self.frame(
            &node,
            Some(step.edge),
            FrameKind::EdgeProcessed { operand: index },
            step.text,
            step.contribution,
        ))
    }

    fn terminal(&mut self, node: Term<T>) -> Frame<T> {
        let (kind, text) = if node.category() == Category::Constant {
            (FrameKind::ConstantTerminal, "Constant node → End of path")
        } else {
            (FrameKind::VariableTerminal, "Variable node → End of path")
        };
        debug!("tick {}: {:?} {}", self.ticks, kind, node.name());
        self.frame(&node, None, kind, text.to_string(), None)
    }

    fn process_edge(&mut self, node: &Term<T>, operand: &Term<T>, index: usize) -> EdgeStep<T> {
        let edge = Edge::new(operand.id(), node.id());
        if operand.category() == Category::Constant {
            return EdgeStep {
                edge,
                text: "Constant operand\nNo derivatives to propagate".to_string(),
                contribution: None,
            };
        }

        let upstream = self.adjoint.get(node.id());
        let contribution = match node.local_grads(&upstream) {
            Some((grad_a, _)) if index == 0 => grad_a,
            Some((_, Some(grad_b))) => grad_b,
            _ => unreachable!("{} has no operand {index}", node.name()),
        };
        self.adjoint.add(operand.id(), contribution.clone());

        let local = contribution.div_or_zero(&upstream);
        self.display.insert(edge, local.clone());

        let width = self.config.precision;
        let formula = node
            .local_derivative(index)
            .and_then(|derivative| node.formula(index, &derivative, width))
            .unwrap_or_default();
        let text = format!(
            "{formula}\n${} \\/ += \\/ {}{} = {}\\times{}={}$",
            partial("f", operand.name()),
            partial("f", node.name()),
            partial(node.name(), operand.name()),
            upstream.short(width),
            local.short(width),
            contribution.short(width),
        );

        EdgeStep {
            edge,
            text,
            contribution: Some(contribution),
        }
    }

    /// Count down one consumer slot of `operand` and queue it once none remain.
    fn release(&mut self, operand: &Term<T>) {
        let remaining = self.pending.entry(operand.id()).or_insert(1);
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 && !self.queue.contains(operand) {
            self.queue.push(operand.clone());
        }
    }

    fn frame(
        &mut self,
        node: &Term<T>,
        edge: Option<Edge>,
        kind: FrameKind,
        chain_rule: String,
        contribution: Option<T>,
    ) -> Frame<T> {
        let frame = Frame {
            index: self.ticks,
            node: node.id(),
            node_name: node.name().to_string(),
            edge,
            kind,
            chain_rule,
            contribution,
            edge_labels: self.edge_labels(),
            variable_adjoints: self.variable_adjoints(),
        };
        self.ticks += 1;
        frame
    }

    fn edge_labels(&self) -> Vec<EdgeLabel<T>> {
        self.sweep
            .edges()
            .iter()
            .filter(|edge| self.adjoint.touched(edge.consumer))
            .filter(|edge| {
                self.sweep
                    .node(edge.operand)
                    .is_some_and(|operand| operand.category() != Category::Constant)
            })
            .map(|edge| EdgeLabel {
                edge: *edge,
                local: self.display.get(edge).cloned(),
            })
            .collect()
    }

    fn variable_adjoints(&self) -> Vec<VariableAdjoint<T>> {
        self.sweep
            .variables()
            .iter()
            .map(|var| VariableAdjoint {
                node: var.id(),
                name: var.name().to_string(),
                adjoint: self.adjoint.get(var.id()),
            })
            .collect()
    }

    /// Run the remaining ticks and return how many frames were produced.
    pub fn finish(&mut self) -> usize {
        std::iter::from_fn(|| self.tick()).count()
    }

    pub fn sweep(&self) -> &Sweep<T> {
        &self.sweep
    }

    pub fn frame_budget(&self) -> usize {
        self.sweep.frame_budget()
    }

    pub fn adjoints(&self) -> &AdjointStore<T> {
        &self.adjoint
    }

    /// The accumulated adjoint of `node`. Final for leaves once the walk is
    /// finished; operations read as zero after they have forwarded it.
    pub fn adjoint(&self, node: &Term<T>) -> T {
        self.adjoint.get(node.id())
    }

    pub fn display_adjoint(&self, edge: Edge) -> Option<&T> {
        self.display.get(&edge)
    }

    pub fn is_awaiting_second_operand(&self) -> bool {
        matches!(self.state, WalkState::AwaitingSecondOperand { .. })
    }

    pub fn is_finished(&self) -> bool {
        !self.is_awaiting_second_operand() && self.queue.is_empty()
    }

    /// Number of nodes waiting to be popped.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }
}

impl<T: Tensor> Iterator for Walker<T> {
    type Item = Frame<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.tick()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn binary_node_spans_two_ticks() {
        let a = Term::variable("a", 2.);
        let b = Term::variable("b", 5.);
        let f = &a * &b;
        let mut walker = Walker::new(&f);

        let first = walker.tick().unwrap();
        assert_eq!(first.kind, FrameKind::EdgeProcessed { operand: 0 });
        assert!(walker.is_awaiting_second_operand());
        assert_eq!(walker.adjoint(&f), 1.);

        let second = walker.tick().unwrap();
        assert_eq!(second.kind, FrameKind::EdgeProcessed { operand: 1 });
        assert!(!walker.is_awaiting_second_operand());
        assert_eq!(walker.adjoint(&f), 0.);
        assert_eq!(walker.adjoint(&a), 5.);
        assert_eq!(walker.adjoint(&b), 2.);
    }

    #[test]
    fn unary_node_is_reset_after_one_tick() {
        let x = Term::variable("x", 0.);
        let f = x.sin();
        let mut walker = Walker::new(&f);
        let frame = walker.tick().unwrap();
        assert_eq!(frame.contribution, Some(1.));
        assert!(!walker.is_awaiting_second_operand());
        assert!(walker.adjoints().touched(f.id()));
        assert_eq!(walker.adjoint(&f), 0.);
        assert_eq!(walker.finish(), 1);
        assert!(walker.is_finished());
        assert!(walker.tick().is_none());
    }

    #[test]
    fn edge_labels_cover_reached_nodes() {
        let a = Term::variable("a", 2.);
        let b = Term::variable("b", 3.);
        let f = &a + &b;
        let mut walker = Walker::new(&f);
        let first = walker.tick().unwrap();
        let pending = Edge::new(b.id(), f.id());
        assert_eq!(first.edge_label(pending).map(|l| l.local), Some(None));
        let second = walker.tick().unwrap();
        assert_eq!(second.edge_label(pending).map(|l| l.local), Some(Some(1.)));
    }
}
