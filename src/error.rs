use thiserror::Error;

/// Errors raised while building or driving a differentiation replay.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The operation name has no entry in the local gradient registry.
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// An operation was given the wrong number of operands.
    #[error("operation {op} takes {expected} operand(s), got {actual}")]
    Arity {
        op: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Only variable nodes hold a settable value.
    #[error("cannot set value of non-variable node {0}")]
    NotAVariable(String),

    #[error("parse error at {pos}: {message}")]
    Parse { pos: usize, message: String },

    #[error("variable {0} has no value bound")]
    UnboundVariable(String),

    /// A `name=value` binding could not be understood.
    #[error("invalid binding {0:?}, expected NAME=VALUE")]
    InvalidBinding(String),
}

pub type Result<T> = std::result::Result<T, Error>;
