//! A type that can be treated as a difference.
//!
//! The engine tracks the signed count associated with each record of a multiset. Counts are
//! added when updates to the same record meet, tested for zero when consolidating, negated to
//! retract earlier outputs, and multiplied when two records are joined.

/// A type with addition and a test for zero.
///
/// Addition allows the engine to compact multiple updates to the same data, and the test for zero
/// allows it to retire updates that have no effect.
pub trait Semigroup : Sized + Clone + 'static {
    /// The method of `std::ops::AddAssign`, for types that do not implement `AddAssign`.
    fn plus_equals(&mut self, rhs: &Self);
    /// Returns true if the element is the additive identity.
    fn is_zero(&self) -> bool;
}

/// A semigroup with an explicit zero element.
pub trait Monoid : Semigroup {
    /// A zero element under the semigroup addition operator.
    fn zero() -> Self;
}

/// A `Monoid` with negation.
///
/// Operators that revise their output, like `reduce`, retract prior outputs by negating them.
pub trait Abelian : Monoid {
    /// The method of `std::ops::Neg`, for types that do not implement `Neg`.
    fn negate(self) -> Self;
}

/// A replacement for `std::ops::Mul` for types that do not implement it.
pub trait Multiply<Rhs = Self> {
    /// Output type per the `Mul` trait.
    type Output;
    /// Core method per the `Mul` trait.
    fn multiply(self, rhs: &Rhs) -> Self::Output;
}

/// Implementation for built-in signed integers.
macro_rules! builtin_implementation {
    ($($t:ty,)*) => {
        $(
            impl Semigroup for $t {
                #[inline] fn plus_equals(&mut self, rhs: &Self) { *self += rhs; }
                #[inline] fn is_zero(&self) -> bool { self == &0 }
            }

            impl Monoid for $t {
                #[inline] fn zero() -> Self { 0 }
            }

            impl Abelian for $t {
                #[inline] fn negate(self) -> Self { -self }
            }

            impl Multiply<Self> for $t {
                type Output = Self;
                #[inline] fn multiply(self, rhs: &Self) -> Self { self * rhs }
            }
        )*
    };
}

builtin_implementation!(i8, i16, i32, i64, i128, isize,);
