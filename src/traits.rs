use num_traits::{One, Zero};
use std::fmt::{Debug, Display};

use crate::ast::Literal;
use crate::error::FaultReason;
use crate::functions::OpCode;
use crate::math;

/// Numeric family of an element type; selects the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericClass {
    SignedInt,
    UnsignedInt,
    Float,
}

impl NumericClass {
    /// Human readable name used in error messages
    pub fn label(self) -> &'static str {
        match self {
            NumericClass::SignedInt => "signed integer",
            NumericClass::UnsignedInt => "unsigned integer",
            NumericClass::Float => "floating point",
        }
    }
}

/// A fixed-width array element type an equation can be compiled for.
///
/// Implemented for `i8`..`i64`, `u8`..`u64`, `f32` and `f64`. The
/// arithmetic itself lives in [`crate::math`]; this trait only routes each
/// opcode to the integer or floating point kernels.
pub trait Element:
    Copy + Debug + Display + PartialEq + PartialOrd + Zero + One + Send + Sync + 'static
{
    /// Which opcode table programs for this type use
    const CLASS: NumericClass;
    /// Type name, e.g. `i8`
    const NAME: &'static str;

    /// Convert a literal, returning `None` if it is not representable.
    ///
    /// Integer types truncate finite float literals toward zero. Float types
    /// accept any finite value that stays finite once rounded to the type, so
    /// text slightly above `MAX` that rounds down to it is accepted.
    /// NaN and infinities are never representable.
    fn from_literal(lit: Literal) -> Option<Self>;

    /// The value as a literal, for disassembly and error messages
    fn to_literal(self) -> Literal;

    /// Whether a runtime parameter value may be bound (finite for floats)
    fn is_admissible(self) -> bool;

    /// Apply a unary opcode (operators, `abs`, one-argument math calls)
    fn unary(op: OpCode, a: Self, checked: bool) -> Result<Self, FaultReason>;

    /// Apply a binary opcode to `left op right`
    fn binary(op: OpCode, left: Self, right: Self, checked: bool) -> Result<Self, FaultReason>;
}

macro_rules! int_element {
    ($class:expr => $($t:ty),*) => {
        $(impl Element for $t {
            const CLASS: NumericClass = $class;
            const NAME: &'static str = stringify!($t);

            fn from_literal(lit: Literal) -> Option<Self> {
                match lit {
                    Literal::Int(v) => <$t>::try_from(v).ok(),
                    Literal::Float(v) if v.is_finite() => num_traits::cast(v.trunc()),
                    Literal::Float(_) => None,
                }
            }

            fn to_literal(self) -> Literal {
                Literal::Int(i128::from(self))
            }

            #[inline]
            fn is_admissible(self) -> bool {
                true
            }

            #[inline]
            fn unary(op: OpCode, a: Self, checked: bool) -> Result<Self, FaultReason> {
                math::int_unary(op, a, checked)
            }

            #[inline]
            fn binary(op: OpCode, left: Self, right: Self, checked: bool) -> Result<Self, FaultReason> {
                math::int_binary(op, left, right, checked)
            }
        })*
    };
}

macro_rules! float_element {
    ($($t:ident),*) => {
        $(impl Element for $t {
            const CLASS: NumericClass = NumericClass::Float;
            const NAME: &'static str = stringify!($t);

            #[allow(
                clippy::cast_possible_truncation,
                reason = "Narrowing rounds to nearest; overflow shows up as infinity"
            )]
            fn from_literal(lit: Literal) -> Option<Self> {
                let v = lit.as_f64();
                let narrowed = v as $t;
                (v.is_finite() && narrowed.is_finite()).then_some(narrowed)
            }

            fn to_literal(self) -> Literal {
                Literal::Float(f64::from(self))
            }

            #[inline]
            fn is_admissible(self) -> bool {
                self.is_finite()
            }

            #[inline]
            fn unary(op: OpCode, a: Self, checked: bool) -> Result<Self, FaultReason> {
                math::float_unary(op, a, checked)
            }

            #[inline]
            fn binary(op: OpCode, left: Self, right: Self, checked: bool) -> Result<Self, FaultReason> {
                math::float_binary(op, left, right, checked)
            }
        })*
    };
}

int_element!(NumericClass::SignedInt => i8, i16, i32, i64);
int_element!(NumericClass::UnsignedInt => u8, u16, u32, u64);
float_element!(f32, f64);
