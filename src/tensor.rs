use std::fmt::{Debug, Display};

/// A trait that represents a type that can be used as a node value in this library.
///
/// Implementations are provided for `f64` and for [`Array`], a flat vector with
/// elementwise arithmetic. The walker never branches on values, it only needs the
/// algebra below to apply the local gradient rules and to format text.
pub trait Tensor:
    std::ops::Add<Self, Output = Self>
    + std::ops::AddAssign<Self>
    + std::ops::Sub<Self, Output = Self>
    + std::ops::Mul<Self, Output = Self>
    + std::ops::Div<Self, Output = Self>
    + std::ops::Neg<Output = Self>
    + Sized
    + Default
    + Display
    + Debug
    + Clone
{
    fn one() -> Self;

    /// Ones with the same shape as `self`. Used to seed the root adjoint.
    fn ones_like(&self) -> Self {
        Self::one()
    }

    fn is_zero(&self) -> bool;

    fn sin(&self) -> Self;
    fn cos(&self) -> Self;
    fn exp(&self) -> Self;
    fn ln(&self) -> Self;
    fn pow(&self, exponent: &Self) -> Self;

    /// `self / divisor`, but zero wherever `divisor` is zero.
    fn div_or_zero(&self, divisor: &Self) -> Self {
        if divisor.is_zero() {
            Self::default()
        } else {
            self.clone() / divisor.clone()
        }
    }

    /// Human readable text cut to at most `width` characters per number.
    fn short(&self, width: usize) -> String {
        truncate(&self.to_string(), width)
    }
}

pub(crate) fn truncate(s: &str, width: usize) -> String {
    s.chars().take(width.max(1)).collect()
}

impl Tensor for f64 {
    fn one() -> Self {
        1.
    }

    fn is_zero(&self) -> bool {
        *self == 0.
    }

    fn sin(&self) -> Self {
        f64::sin(*self)
    }

    fn cos(&self) -> Self {
        f64::cos(*self)
    }

    fn exp(&self) -> Self {
        f64::exp(*self)
    }

    fn ln(&self) -> Self {
        f64::ln(*self)
    }

    fn pow(&self, exponent: &Self) -> Self {
        self.powf(*exponent)
    }
}

/// A flat array of `f64` with elementwise arithmetic.
///
/// An array of length 1 broadcasts against any other length, so the default
/// value `[0]` is a valid zero for every shape.
///
/// # Panics
///
/// Arithmetic between two arrays of different lengths, neither of them 1,
/// panics with "array shape mismatch".
#[derive(Clone, Debug, PartialEq)]
pub struct Array(Vec<f64>);

impl Array {
    pub fn new(data: Vec<f64>) -> Self {
        Self(data)
    }

    fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self(self.0.iter().copied().map(f).collect())
    }

    fn zip_with(&self, rhs: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        match (self.0.len(), rhs.0.len()) {
            (1, _) => rhs.map(|r| f(self.0[0], r)),
            (_, 1) => self.map(|l| f(l, rhs.0[0])),
            (l, r) => {
                assert_eq!(l, r, "array shape mismatch: {l} vs {r}");
                Self(
                    self.0
                        .iter()
                        .zip(rhs.0.iter())
                        .map(|(l, r)| f(*l, *r))
                        .collect(),
                )
            }
        }
    }
}

impl From<Vec<f64>> for Array {
    fn from(data: Vec<f64>) -> Self {
        Self(data)
    }
}

impl Default for Array {
    fn default() -> Self {
        Self(vec![0.])
    }
}

impl Display for Array {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, v) in self.0.iter().enumerate() {
            if i != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, "]")
    }
}

macro_rules! impl_array_binop {
    ($trait:ident, $fn:ident, $op:tt) => {
        impl std::ops::$trait for Array {
            type Output = Self;
            fn $fn(self, rhs: Self) -> Self::Output {
                self.zip_with(&rhs, |l, r| l $op r)
            }
        }
    };
}

impl_array_binop!(Add, add, +);
impl_array_binop!(Sub, sub, -);
impl_array_binop!(Mul, mul, *);
impl_array_binop!(Div, div, /);

impl std::ops::AddAssign for Array {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.zip_with(&rhs, |l, r| l + r);
    }
}

impl std::ops::Neg for Array {
    type Output = Self;
    fn neg(self) -> Self::Output {
        self.map(|v| -v)
    }
}

impl Tensor for Array {
    fn one() -> Self {
        Self(vec![1.])
    }

    fn ones_like(&self) -> Self {
        Self(vec![1.; self.0.len().max(1)])
    }

    fn is_zero(&self) -> bool {
        self.0.iter().all(|v| *v == 0.)
    }

    fn sin(&self) -> Self {
        self.map(f64::sin)
    }

    fn cos(&self) -> Self {
        self.map(f64::cos)
    }

    fn exp(&self) -> Self {
        self.map(f64::exp)
    }

    fn ln(&self) -> Self {
        self.map(f64::ln)
    }

    fn pow(&self, exponent: &Self) -> Self {
        self.zip_with(exponent, f64::powf)
    }

    fn div_or_zero(&self, divisor: &Self) -> Self {
        self.zip_with(divisor, |l, r| if r == 0. { 0. } else { l / r })
    }

    fn short(&self, width: usize) -> String {
        let items: Vec<_> = self
            .0
            .iter()
            .map(|v| truncate(&v.to_string(), width))
            .collect();
        format!("[{}]", items.join(", "))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn broadcast_scalar_array() {
        let a = Array::new(vec![1., 2., 3.]);
        let b = Array::new(vec![2.]);
        assert_eq!(a.clone() * b.clone(), Array::new(vec![2., 4., 6.]));
        assert_eq!(b - a, Array::new(vec![1., 0., -1.]));
    }

    #[test]
    fn default_is_zero_for_any_shape() {
        let mut acc = Array::default();
        assert!(acc.is_zero());
        acc += Array::new(vec![1., 2.]);
        assert_eq!(acc, Array::new(vec![1., 2.]));
    }

    #[test]
    fn ones_like_keeps_shape() {
        let a = Array::new(vec![5., 6., 7.]);
        assert_eq!(a.ones_like(), Array::new(vec![1., 1., 1.]));
        assert_eq!(3.5f64.ones_like(), 1.);
    }

    #[test]
    fn div_or_zero_per_element() {
        assert_eq!(3f64.div_or_zero(&0.), 0.);
        assert_eq!(3f64.div_or_zero(&2.), 1.5);
        let num = Array::new(vec![4., 6., 8.]);
        let den = Array::new(vec![2., 0., 4.]);
        assert_eq!(num.div_or_zero(&den), Array::new(vec![2., 0., 2.]));
    }

    #[test]
    fn short_truncates_each_element() {
        assert_eq!((1f64 / 3.).short(4), "0.33");
        let a = Array::new(vec![1. / 3., 2.]);
        assert_eq!(a.short(4), "[0.33, 2]");
    }
}
