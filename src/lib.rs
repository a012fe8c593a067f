//! Step-by-step replay of reverse-mode automatic differentiation.
//!
//! Build an expression from [`Term`]s, hand its root to a [`Walker`] and call
//! [`Walker::tick`] (or iterate) to get one [`Frame`] per step of the
//! backward pass.

pub mod adjoint;
mod config;
pub mod dot;
pub mod error;
mod frame;
pub mod op;
pub mod parse;
pub mod queue;
pub mod sweep;
mod tensor;
mod term;
pub mod walker;

pub use adjoint::AdjointStore;
pub use config::WalkerConfig;
pub use dot::FrameDotBuilder;
pub use error::{Error, Result};
pub use frame::{EdgeLabel, Frame, FrameKind, VariableAdjoint};
pub use op::{BinaryOp, Op, UnaryOp};
pub use queue::{PopOrder, TraversalQueue};
pub use sweep::{Edge, Sweep};
pub use tensor::{Array, Tensor};
pub use term::{Category, NodeId, Operands, Term};
pub use walker::Walker;

#[cfg(feature = "macro")]
pub use gradwalk_macro::gradwalk;
