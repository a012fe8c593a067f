use std::{
    cell::RefCell,
    fmt::Display,
    ops::{Add, Div, Mul, Sub},
    rc::Rc,
    sync::atomic::{AtomicUsize, Ordering},
};

use crate::{
    error::{Error, Result},
    op::{BinaryOp, Op, UnaryOp},
    tensor::Tensor,
};

/// Stable identifier of a node, unique within the process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    fn next() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Variable,
    Constant,
    Operation,
}

#[derive(Debug)]
enum TermInt<T> {
    Variable,
    Constant,
    Unary(UnaryOp, Term<T>),
    Binary(BinaryOp, Term<T>, Term<T>),
}

#[derive(Debug)]
struct TermPayload<T> {
    id: NodeId,
    name: String,
    value: TermInt<T>,
    data: RefCell<T>,
}

/// A node of an expression graph.
///
/// Cloning a `Term` is cheap and yields a handle to the same node; operands are
/// shared, so `&a * &a` or reusing a subexpression produces a DAG, never a copy.
/// Operands are fixed at construction, which makes cycles unrepresentable.
#[derive(Debug)]
pub struct Term<T = f64>(Rc<TermPayload<T>>);

impl<T> Clone for Term<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

/// Borrowed view of a node's structure.
pub enum Operands<'a, T> {
    Leaf,
    Unary(UnaryOp, &'a Term<T>),
    Binary(BinaryOp, &'a Term<T>, &'a Term<T>),
}

impl<T: Tensor> Term<T> {
    pub fn variable(name: impl Into<String>, val: T) -> Self {
        Self::new_payload(name.into(), TermInt::Variable, val)
    }

    /// A constant named after its value.
    pub fn constant(val: T) -> Self {
        Self::new_payload(val.to_string(), TermInt::Constant, val)
    }

    pub fn unary(op: UnaryOp, operand: &Self) -> Self {
        let data = op.f(&operand.value());
        Self::new_payload(
            op.label(&operand.0.name),
            TermInt::Unary(op, operand.clone()),
            data,
        )
    }

    /// Build a binary node, computing its value right away.
    ///
    /// # Panics
    ///
    /// Panics if the operand values cannot be combined, e.g. [`Array`]s of
    /// mismatched lengths. The `&Term` operators and [`Term::pow`] build
    /// through here and panic alike.
    ///
    /// [`Array`]: crate::Array
    pub fn binary(op: BinaryOp, lhs: &Self, rhs: &Self) -> Self {
        let data = op.f(&lhs.value(), &rhs.value());
        Self::new_payload(
            op.label(&lhs.0.name, &rhs.0.name),
            TermInt::Binary(op, lhs.clone(), rhs.clone()),
            data,
        )
    }

    /// Build a node from an operation tag, checking the operand count.
    pub fn apply(op: Op, operands: &[&Self]) -> Result<Self> {
        match (op, operands) {
            (Op::Unary(op), [operand]) => Ok(Self::unary(op, operand)),
            (Op::Binary(op), [lhs, rhs]) => Ok(Self::binary(op, lhs, rhs)),
            _ => Err(Error::Arity {
                op: op.name(),
                expected: op.arity(),
                actual: operands.len(),
            }),
        }
    }

    fn new_payload(name: String, value: TermInt<T>, data: T) -> Self {
        Self(Rc::new(TermPayload {
            id: NodeId::next(),
            name,
            value,
            data: RefCell::new(data),
        }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn category(&self) -> Category {
        match self.0.value {
            TermInt::Variable => Category::Variable,
            TermInt::Constant => Category::Constant,
            TermInt::Unary(..) | TermInt::Binary(..) => Category::Operation,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.category() != Category::Operation
    }

    pub fn op(&self) -> Option<Op> {
        match self.0.value {
            TermInt::Unary(op, _) => Some(Op::Unary(op)),
            TermInt::Binary(op, ..) => Some(Op::Binary(op)),
            TermInt::Variable | TermInt::Constant => None,
        }
    }

    pub fn operands(&self) -> Operands<'_, T> {
        match &self.0.value {
            TermInt::Variable | TermInt::Constant => Operands::Leaf,
            TermInt::Unary(op, operand) => Operands::Unary(*op, operand),
            TermInt::Binary(op, lhs, rhs) => Operands::Binary(*op, lhs, rhs),
        }
    }

    /// Operands in slot order, operand A first.
    pub fn operand_list(&self) -> Vec<&Self> {
        match self.operands() {
            Operands::Leaf => vec![],
            Operands::Unary(_, operand) => vec![operand],
            Operands::Binary(_, lhs, rhs) => vec![lhs, rhs],
        }
    }

    /// The value computed when this node was built or last evaluated.
    pub fn value(&self) -> T {
        self.0.data.borrow().clone()
    }

    /// Recompute the values of this node and everything it depends on.
    pub fn eval(&self) -> T {
        let val = match &self.0.value {
            TermInt::Variable | TermInt::Constant => self.value(),
            TermInt::Unary(op, operand) => op.f(&operand.eval()),
            TermInt::Binary(op, lhs, rhs) => op.f(&lhs.eval(), &rhs.eval()),
        };
        *self.0.data.borrow_mut() = val.clone();
        val
    }

    /// Update a variable. Call [`Term::eval`] on dependent nodes afterwards.
    pub fn set(&self, value: T) -> Result<()> {
        if let TermInt::Variable = self.0.value {
            *self.0.data.borrow_mut() = value;
            Ok(())
        } else {
            Err(Error::NotAVariable(self.0.name.clone()))
        }
    }

    /// Chain-rule contributions of `upstream` to each operand of this node,
    /// `(operand A, operand B)`. `None` for leaves.
    pub fn local_grads(&self, upstream: &T) -> Option<(T, Option<T>)> {
        let out = self.value();
        match self.operands() {
            Operands::Leaf => None,
            Operands::Unary(op, operand) => {
                let local = op.grad(&operand.value(), &out);
                Some((upstream.clone() * local, None))
            }
            Operands::Binary(op, lhs, rhs) => {
                let (dlhs, drhs) = op.grad(&lhs.value(), &rhs.value(), &out);
                Some((upstream.clone() * dlhs, Some(upstream.clone() * drhs)))
            }
        }
    }

    /// Partial derivative of this node with respect to the operand at `index`.
    pub fn local_derivative(&self, index: usize) -> Option<T> {
        let (grad_a, grad_b) = self.local_grads(&self.value().ones_like())?;
        if index == 0 {
            Some(grad_a)
        } else {
            grad_b
        }
    }

    /// Typeset the local derivative with respect to the operand at `index`.
    pub fn formula(&self, index: usize, local: &T, width: usize) -> Option<String> {
        match self.operands() {
            Operands::Leaf => None,
            Operands::Unary(op, operand) => {
                Some(op.formula(&self.0.name, &operand.0.name, local, width))
            }
            Operands::Binary(op, lhs, rhs) => Some(op.formula(
                &self.0.name,
                (&lhs.0.name, &rhs.0.name),
                index,
                local,
                width,
            )),
        }
    }

    pub fn pow(&self, rhs: &Self) -> Self {
        Self::binary(BinaryOp::Pow, self, rhs)
    }

    pub fn sin(&self) -> Self {
        Self::unary(UnaryOp::Sin, self)
    }

    pub fn cos(&self) -> Self {
        Self::unary(UnaryOp::Cos, self)
    }

    pub fn exp(&self) -> Self {
        Self::unary(UnaryOp::Exp, self)
    }

    pub fn ln(&self) -> Self {
        Self::unary(UnaryOp::Log, self)
    }
}

impl Term<f64> {
    /// Raise to a constant power.
    pub fn powf(&self, exponent: f64) -> Self {
        self.pow(&Self::constant(exponent))
    }
}

impl<T: Tensor> Add for &Term<T> {
    type Output = Term<T>;
    fn add(self, rhs: Self) -> Self::Output {
        Term::binary(BinaryOp::Add, self, rhs)
    }
}

impl<T: Tensor> Sub for &Term<T> {
    type Output = Term<T>;
    fn sub(self, rhs: Self) -> Self::Output {
        Term::binary(BinaryOp::Sub, self, rhs)
    }
}

impl<T: Tensor> Mul for &Term<T> {
    type Output = Term<T>;
    fn mul(self, rhs: Self) -> Self::Output {
        Term::binary(BinaryOp::Mul, self, rhs)
    }
}

impl<T: Tensor> Div for &Term<T> {
    type Output = Term<T>;
    fn div(self, rhs: Self) -> Self::Output {
        Term::binary(BinaryOp::Div, self, rhs)
    }
}
