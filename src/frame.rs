use crate::{sweep::Edge, term::NodeId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    /// A constant was popped; nothing flows out of it.
    ConstantTerminal,
    /// A variable was popped; its adjoint is final.
    VariableTerminal,
    /// One operand edge of an operation was processed. `operand` is the slot
    /// index, 0 for operand A and 1 for operand B.
    EdgeProcessed { operand: usize },
}

/// Per-edge annotation: the local partial derivative recorded when the edge was
/// processed, or `None` while it is still pending.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeLabel<T> {
    pub edge: Edge,
    pub local: Option<T>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableAdjoint<T> {
    pub node: NodeId,
    pub name: String,
    pub adjoint: T,
}

/// Everything a renderer needs to draw one step of the replay.
#[derive(Clone, Debug)]
pub struct Frame<T> {
    /// Zero-based tick number.
    pub index: usize,
    pub node: NodeId,
    pub node_name: String,
    pub edge: Option<Edge>,
    pub kind: FrameKind,
    pub chain_rule: String,
    /// The value added into the operand's adjoint, if anything was added.
    pub contribution: Option<T>,
    pub edge_labels: Vec<EdgeLabel<T>>,
    pub variable_adjoints: Vec<VariableAdjoint<T>>,
}

impl<T> Frame<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self.kind, FrameKind::EdgeProcessed { .. })
    }

    pub fn edge_label(&self, edge: Edge) -> Option<&EdgeLabel<T>> {
        self.edge_labels.iter().find(|label| label.edge == edge)
    }

    pub fn variable_adjoint(&self, name: &str) -> Option<&T> {
        self.variable_adjoints
            .iter()
            .find(|var| var.name == name)
            .map(|var| &var.adjoint)
    }
}
