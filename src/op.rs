//! The closed set of operations a graph node can carry, together with their
//! local gradient rules.
//!
//! Each variant knows how to compute its value (`f`), its local partial
//! derivatives (`grad`) and how to typeset the derivative it is applying.
//! Operation names coming from text are resolved with [`Op::from_str`], which
//! rejects anything outside this set.

use std::{fmt::Display, str::FromStr};

use crate::{error::Error, tensor::Tensor};

/// An operation with a single operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Sin,
    Cos,
    Exp,
    Log,
}

/// An operation with two operands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

/// Any supported operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Unary(UnaryOp),
    Binary(BinaryOp),
}

pub(crate) fn partial(of: &str, wrt: &str) -> String {
    format!("\\frac{{\\partial {of}}}{{\\partial {wrt}}}")
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 4] = [UnaryOp::Sin, UnaryOp::Cos, UnaryOp::Exp, UnaryOp::Log];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Exp => "exp",
            Self::Log => "log",
        }
    }

    pub fn f<T: Tensor>(&self, data: &T) -> T {
        match self {
            Self::Sin => data.sin(),
            Self::Cos => data.cos(),
            Self::Exp => data.exp(),
            Self::Log => data.ln(),
        }
    }

    /// Local derivative of the output with respect to the operand.
    /// `out` is the already computed value of this operation.
    pub fn grad<T: Tensor>(&self, data: &T, out: &T) -> T {
        match self {
            Self::Sin => data.cos(),
            Self::Cos => -data.sin(),
            Self::Exp => out.clone(),
            Self::Log => T::one() / data.clone(),
        }
    }

    pub(crate) fn label(&self, operand: &str) -> String {
        match self {
            Self::Log => format!("ln({operand})"),
            _ => format!("{}({operand})", self.name()),
        }
    }

    /// Typeset `out = op(arg) => d out / d arg = ... = local`.
    pub fn formula<T: Tensor>(&self, out: &str, arg: &str, local: &T, width: usize) -> String {
        let (def, rule) = match self {
            Self::Sin => (format!("\\sin({arg})"), format!("\\cos({arg})")),
            Self::Cos => (format!("\\cos({arg})"), format!("-\\sin({arg})")),
            Self::Exp => (format!("\\exp({arg})"), format!("\\exp({arg})")),
            Self::Log => (format!("\\ln({arg})"), format!("\\frac{{1}}{{{arg}}}")),
        };
        format!(
            "${out} = {def} \\Rightarrow {} = {rule} = {}$",
            partial(out, arg),
            local.short(width)
        )
    }
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 5] = [
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::Pow,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Pow => "pow",
        }
    }

    pub fn f<T: Tensor>(&self, lhs: &T, rhs: &T) -> T {
        match self {
            Self::Add => lhs.clone() + rhs.clone(),
            Self::Sub => lhs.clone() - rhs.clone(),
            Self::Mul => lhs.clone() * rhs.clone(),
            Self::Div => lhs.clone() / rhs.clone(),
            Self::Pow => lhs.pow(rhs),
        }
    }

    /// Local derivatives of the output with respect to `(lhs, rhs)`.
    /// `out` is the already computed value of this operation.
    pub fn grad<T: Tensor>(&self, lhs: &T, rhs: &T, out: &T) -> (T, T) {
        match self {
            Self::Add => (lhs.ones_like(), rhs.ones_like()),
            Self::Sub => (lhs.ones_like(), -rhs.ones_like()),
            Self::Mul => (rhs.clone(), lhs.clone()),
            Self::Div => (
                T::one() / rhs.clone(),
                -(lhs.clone() / (rhs.clone() * rhs.clone())),
            ),
            Self::Pow => (
                rhs.clone() * lhs.pow(&(rhs.clone() - T::one())),
                out.clone() * lhs.ln(),
            ),
        }
    }

    pub(crate) fn label(&self, lhs: &str, rhs: &str) -> String {
        match self {
            Self::Add => format!("({lhs} + {rhs})"),
            Self::Sub => format!("({lhs} - {rhs})"),
            Self::Mul => format!("({lhs} * {rhs})"),
            Self::Div => format!("({lhs} / {rhs})"),
            Self::Pow => format!("({lhs}^{rhs})"),
        }
    }

    /// Typeset `out = lhs op rhs => d out / d operand = ... = local` for the
    /// operand at `index` (0 for `lhs`, 1 for `rhs`).
    pub fn formula<T: Tensor>(
        &self,
        out: &str,
        (lhs, rhs): (&str, &str),
        index: usize,
        local: &T,
        width: usize,
    ) -> String {
        let wrt = if index == 0 { lhs } else { rhs };
        let local = local.short(width);
        let (def, rule) = match self {
            Self::Add => (format!("{lhs} + {rhs}"), "1".to_string()),
            Self::Sub => {
                let sign = if index == 0 { "" } else { "-" };
                (format!("{lhs} - {rhs}"), format!("{sign}1"))
            }
            Self::Mul => {
                let other = if index == 0 { rhs } else { lhs };
                (format!("{lhs} \\times {rhs}"), format!("{other} = {local}"))
            }
            Self::Div => {
                let rule = if index == 0 {
                    format!("\\frac{{1}}{{{rhs}}} = {local}")
                } else {
                    format!("-\\frac{{{lhs}}}{{{rhs}^2}} = {local}")
                };
                (format!("\\frac{{{lhs}}}{{{rhs}}}"), rule)
            }
            Self::Pow => {
                let rule = if index == 0 {
                    format!("{rhs} \\times {lhs}^{{{rhs} - 1}} = {local}")
                } else {
                    format!("{lhs}^{{{rhs}}}\\ln {lhs} = {local}")
                };
                (format!("{lhs}^{{{rhs}}}"), rule)
            }
        };
        format!("${out} = {def} \\Rightarrow {} = {rule}$", partial(out, wrt))
    }
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unary(op) => op.name(),
            Self::Binary(op) => op.name(),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Self::Unary(_) => 1,
            Self::Binary(_) => 2,
        }
    }
}

impl Display for Op {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<UnaryOp> for Op {
    fn from(op: UnaryOp) -> Self {
        Self::Unary(op)
    }
}

impl From<BinaryOp> for Op {
    fn from(op: BinaryOp) -> Self {
        Self::Binary(op)
    }
}

impl FromStr for Op {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "ln" is accepted as a spelling of the natural logarithm.
        if s == "ln" {
            return Ok(Self::Unary(UnaryOp::Log));
        }
        UnaryOp::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .map(Self::Unary)
            .or_else(|| {
                BinaryOp::ALL
                    .into_iter()
                    .find(|op| op.name() == s)
                    .map(Self::Binary)
            })
            .ok_or_else(|| Error::UnsupportedOperation(s.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn parse_names() {
        assert_eq!("mul".parse::<Op>(), Ok(Op::Binary(BinaryOp::Mul)));
        assert_eq!("ln".parse::<Op>(), Ok(Op::Unary(UnaryOp::Log)));
        assert_eq!("log".parse::<Op>(), Ok(Op::Unary(UnaryOp::Log)));
        assert_eq!(
            "tanh".parse::<Op>(),
            Err(Error::UnsupportedOperation("tanh".to_string()))
        );
    }

    #[test]
    fn binary_grads() {
        let (a, b) = (3., 4.);
        assert_eq!(BinaryOp::Add.grad(&a, &b, &7.), (1., 1.));
        assert_eq!(BinaryOp::Sub.grad(&a, &b, &-1.), (1., -1.));
        assert_eq!(BinaryOp::Mul.grad(&a, &b, &12.), (4., 3.));
        let (da, db) = BinaryOp::Div.grad(&a, &b, &0.75);
        assert_relative_eq!(da, 0.25);
        assert_relative_eq!(db, -3. / 16.);
        let (da, db) = BinaryOp::Pow.grad(&a, &2., &9.);
        assert_relative_eq!(da, 6.);
        assert_relative_eq!(db, 9. * 3f64.ln());
    }

    #[test]
    fn unary_grads() {
        let x = 0.5f64;
        assert_relative_eq!(UnaryOp::Sin.grad(&x, &x.sin()), x.cos());
        assert_relative_eq!(UnaryOp::Cos.grad(&x, &x.cos()), -x.sin());
        assert_relative_eq!(UnaryOp::Exp.grad(&x, &x.exp()), x.exp());
        assert_relative_eq!(UnaryOp::Log.grad(&x, &x.ln()), 2.);
    }

    #[test]
    fn sub_formula_sign() {
        let lhs = BinaryOp::Sub.formula("f", ("a", "b"), 0, &1., 4);
        let rhs = BinaryOp::Sub.formula("f", ("a", "b"), 1, &-1., 4);
        assert!(lhs.ends_with("= 1$"), "{lhs}");
        assert!(rhs.ends_with("= -1$"), "{rhs}");
    }

    #[test]
    fn mul_formula_names_other_operand() {
        let text = BinaryOp::Mul.formula("f", ("x", "y"), 0, &2.5, 4);
        assert_eq!(
            text,
            "$f = x \\times y \\Rightarrow \\frac{\\partial f}{\\partial x} = y = 2.5$"
        );
    }
}
