//! Per-opcode numeric kernels
//!
//! One generic implementation for all integer widths and one for both float
//! widths. Each kernel takes a `checked` flag:
//!
//! - **checked**: any result that is not mathematically representable in the
//!   element type is reported as a [`FaultReason`]
//! - **unchecked**: integers wrap, floats follow IEEE-754
//!
//! Integer division/modulo by zero and negative integer exponents have no
//! native value and fault in both modes.

use num_traits::{
    CheckedNeg, CheckedRem, Float, PrimInt, WrappingAdd, WrappingMul, WrappingNeg, WrappingShl,
    WrappingShr, WrappingSub,
};

use crate::error::FaultReason;
use crate::functions::OpCode;


/// Integer operations required by the kernels.
pub(crate) trait IntScalar:
    PrimInt
    + CheckedRem
    + CheckedNeg
    + WrappingAdd
    + WrappingSub
    + WrappingMul
    + WrappingNeg
    + WrappingShl
    + WrappingShr
{
}

impl<T> IntScalar for T where
    T: PrimInt
        + CheckedRem
        + CheckedNeg
        + WrappingAdd
        + WrappingSub
        + WrappingMul
        + WrappingNeg
        + WrappingShl
        + WrappingShr
{
}

#[inline]
fn truth<T: num_traits::Zero + num_traits::One>(b: bool) -> T {
    if b { T::one() } else { T::zero() }
}

/// Pick the exact result, or the wrapped one if overflow checking is off.
#[inline]
fn settle<T>(exact: Option<T>, wrapped: impl FnOnce() -> T, checked: bool) -> Result<T, FaultReason> {
    match exact {
        Some(v) => Ok(v),
        None if checked => Err(FaultReason::Overflow),
        None => Ok(wrapped()),
    }
}

#[inline]
fn negate<T: IntScalar>(a: T, checked: bool) -> Result<T, FaultReason> {
    settle(a.checked_neg(), || a.wrapping_neg(), checked)
}

/// Shift count as `u32` if it lies in `0..bits`, plus the raw low bits for wrapping.
fn shift_amount<T: IntScalar>(b: T) -> (Option<u32>, u32) {
    let bits = T::zero().count_zeros();
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Wrapping shifts only look at the low bits of the count"
    )]
    let raw = b
        .to_u64()
        .or_else(|| b.to_i64().map(|v| v as u64))
        .unwrap_or(0) as u32;
    let valid = b.to_u32().filter(|&n| n < bits);
    (valid, raw)
}

fn int_pow<T: IntScalar>(base: T, exp: T, checked: bool) -> Result<T, FaultReason> {
    if exp < T::zero() {
        return Err(FaultReason::NegativeExponent);
    }
    let mut e = exp.to_u64().unwrap_or(0);
    let mut result = T::one();
    let mut base = base;
    while e > 0 {
        if e & 1 == 1 {
            result = settle(result.checked_mul(&base), || result.wrapping_mul(&base), checked)?;
        }
        e >>= 1;
        if e > 0 {
            base = settle(base.checked_mul(&base), || base.wrapping_mul(&base), checked)?;
        }
    }
    Ok(result)
}

pub(crate) fn int_unary<T: IntScalar>(op: OpCode, a: T, checked: bool) -> Result<T, FaultReason> {
    match op {
        OpCode::USub => negate(a, checked),
        OpCode::Invert => Ok(!a),
        OpCode::Not => Ok(truth(a.is_zero())),
        OpCode::Abs if a < T::zero() => negate(a, checked),
        // uadd, abs of non-negative; anything else was rejected at decode time
        _ => Ok(a),
    }
}

pub(crate) fn int_binary<T: IntScalar>(
    op: OpCode,
    a: T,
    b: T,
    checked: bool,
) -> Result<T, FaultReason> {
    let zero = T::zero();
    match op {
        OpCode::Add => settle(a.checked_add(&b), || a.wrapping_add(&b), checked),
        OpCode::Sub => settle(a.checked_sub(&b), || a.wrapping_sub(&b), checked),
        OpCode::Mult => settle(a.checked_mul(&b), || a.wrapping_mul(&b), checked),
        OpCode::Div | OpCode::FloorDiv => {
            if b.is_zero() {
                return Err(FaultReason::DivisionByZero);
            }
            // only MIN / -1 overflows, and it wraps to MIN
            let q = settle(a.checked_div(&b), || a.wrapping_neg(), checked)?;
            let r = a.checked_rem(&b).unwrap_or(zero);
            if op == OpCode::FloorDiv && !r.is_zero() && ((a < zero) != (b < zero)) {
                Ok(q - T::one())
            } else {
                Ok(q)
            }
        }
        OpCode::Mod => {
            if b.is_zero() {
                return Err(FaultReason::DivisionByZero);
            }
            let r = a.checked_rem(&b).unwrap_or(zero);
            if !r.is_zero() && ((r < zero) != (b < zero)) {
                Ok(r + b)
            } else {
                Ok(r)
            }
        }
        OpCode::Pow => int_pow(a, b, checked),
        OpCode::LShift => match shift_amount(b) {
            (Some(n), _) => {
                let shifted = a << n as usize;
                if checked && (shifted >> n as usize) != a {
                    Err(FaultReason::Overflow)
                } else {
                    Ok(shifted)
                }
            }
            (None, _) if checked => Err(FaultReason::Overflow),
            (None, raw) => Ok(a.wrapping_shl(raw)),
        },
        OpCode::RShift => match shift_amount(b) {
            (Some(n), _) => Ok(a >> n as usize),
            (None, _) if checked => Err(FaultReason::Overflow),
            (None, raw) => Ok(a.wrapping_shr(raw)),
        },
        OpCode::BitAnd => Ok(a & b),
        OpCode::BitOr => Ok(a | b),
        OpCode::BitXor => Ok(a ^ b),
        OpCode::Eq => Ok(truth(a == b)),
        OpCode::Ne => Ok(truth(a != b)),
        OpCode::Lt => Ok(truth(a < b)),
        OpCode::Le => Ok(truth(a <= b)),
        OpCode::Gt => Ok(truth(a > b)),
        OpCode::Ge => Ok(truth(a >= b)),
        OpCode::And => Ok(truth(!a.is_zero() && !b.is_zero())),
        OpCode::Or => Ok(truth(!a.is_zero() || !b.is_zero())),
        _ => Ok(a),
    }
}

/// Report a non-finite result produced from finite inputs.
#[inline]
fn finite<T: Float>(result: T, inputs_finite: bool, checked: bool) -> Result<T, FaultReason> {
    if checked && inputs_finite && !result.is_finite() {
        Err(FaultReason::NonFinite)
    } else {
        Ok(result)
    }
}

pub(crate) fn float_unary<T: Float>(op: OpCode, a: T, checked: bool) -> Result<T, FaultReason> {
    let r = match op {
        OpCode::USub => -a,
        OpCode::Not => truth(a.is_zero()),
        OpCode::Abs | OpCode::Fabs => a.abs(),
        OpCode::Acos => a.acos(),
        OpCode::Acosh => a.acosh(),
        OpCode::Asin => a.asin(),
        OpCode::Asinh => a.asinh(),
        OpCode::Atan => a.atan(),
        OpCode::Atanh => a.atanh(),
        OpCode::Ceil => a.ceil(),
        OpCode::Cos => a.cos(),
        OpCode::Cosh => a.cosh(),
        OpCode::Degrees => a.to_degrees(),
        OpCode::Exp => a.exp(),
        OpCode::Expm1 => a.exp_m1(),
        OpCode::Floor => a.floor(),
        OpCode::Log => a.ln(),
        OpCode::Log10 => a.log10(),
        OpCode::Log1p => a.ln_1p(),
        OpCode::Log2 => a.log2(),
        OpCode::Radians => a.to_radians(),
        OpCode::Sin => a.sin(),
        OpCode::Sinh => a.sinh(),
        OpCode::Sqrt => a.sqrt(),
        OpCode::Tan => a.tan(),
        OpCode::Tanh => a.tanh(),
        OpCode::Trunc => a.trunc(),
        _ => a,
    };
    finite(r, a.is_finite(), checked)
}

pub(crate) fn float_binary<T: Float>(
    op: OpCode,
    a: T,
    b: T,
    checked: bool,
) -> Result<T, FaultReason> {
    let r = match op {
        OpCode::Add => a + b,
        OpCode::Sub => a - b,
        OpCode::Mult => a * b,
        OpCode::Div => a / b,
        OpCode::FloorDiv => (a / b).floor(),
        OpCode::Mod => {
            let r = a % b;
            if !r.is_zero() && (r < T::zero()) != (b < T::zero()) {
                r + b
            } else {
                r
            }
        }
        OpCode::Pow | OpCode::MathPow => a.powf(b),
        OpCode::Eq => truth(a == b),
        OpCode::Ne => truth(a != b),
        OpCode::Lt => truth(a < b),
        OpCode::Le => truth(a <= b),
        OpCode::Gt => truth(a > b),
        OpCode::Ge => truth(a >= b),
        OpCode::And => truth(!a.is_zero() && !b.is_zero()),
        OpCode::Or => truth(!a.is_zero() || !b.is_zero()),
        OpCode::Atan2 => a.atan2(b),
        OpCode::Copysign => a.copysign(b),
        OpCode::Fmod => a % b,
        OpCode::Hypot => a.hypot(b),
        OpCode::Ldexp => a * b.trunc().exp2(),
        _ => a,
    };
    finite(r, a.is_finite() && b.is_finite(), checked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_add_checked_and_wrapping() {
        assert_eq!(int_binary(OpCode::Add, 127i8, 1, true), Err(FaultReason::Overflow));
        assert_eq!(int_binary(OpCode::Add, 127i8, 1, false), Ok(-128));
        assert_eq!(int_binary(OpCode::Sub, 0u8, 1, false), Ok(255));
        assert_eq!(int_binary(OpCode::Mult, 16i8, 8, true), Err(FaultReason::Overflow));
    }

    #[test]
    fn test_int_division_semantics() {
        assert_eq!(int_binary(OpCode::Div, -7i32, 2, true), Ok(-3));
        assert_eq!(int_binary(OpCode::FloorDiv, -7i32, 2, true), Ok(-4));
        assert_eq!(int_binary(OpCode::FloorDiv, 7i32, 2, true), Ok(3));
        assert_eq!(int_binary(OpCode::Mod, -7i32, 2, true), Ok(1));
        assert_eq!(int_binary(OpCode::Mod, 7i32, -2, true), Ok(-1));
        assert_eq!(
            int_binary(OpCode::Div, 1i32, 0, false),
            Err(FaultReason::DivisionByZero)
        );
        assert_eq!(
            int_binary(OpCode::Mod, 1u16, 0, false),
            Err(FaultReason::DivisionByZero)
        );
    }

    #[test]
    fn test_int_min_div_minus_one() {
        assert_eq!(int_binary(OpCode::Div, i8::MIN, -1, true), Err(FaultReason::Overflow));
        assert_eq!(int_binary(OpCode::Div, i8::MIN, -1, false), Ok(i8::MIN));
        assert_eq!(int_binary(OpCode::Mod, i8::MIN, -1, true), Ok(0));
    }

    #[test]
    fn test_int_pow() {
        assert_eq!(int_binary(OpCode::Pow, 3i32, 4, true), Ok(81));
        assert_eq!(int_binary(OpCode::Pow, -2i8, 7, true), Ok(-128));
        assert_eq!(int_binary(OpCode::Pow, 2i8, 7, true), Err(FaultReason::Overflow));
        assert_eq!(int_binary(OpCode::Pow, 2i8, 7, false), Ok(-128));
        assert_eq!(int_binary(OpCode::Pow, 5u8, 0, true), Ok(1));
        assert_eq!(
            int_binary(OpCode::Pow, 2i32, -1, false),
            Err(FaultReason::NegativeExponent)
        );
    }

    #[test]
    fn test_int_shifts() {
        assert_eq!(int_binary(OpCode::LShift, 1i32, 4, true), Ok(16));
        assert_eq!(int_binary(OpCode::LShift, 64i8, 1, true), Err(FaultReason::Overflow));
        assert_eq!(int_binary(OpCode::LShift, 64i8, 1, false), Ok(-128));
        assert_eq!(int_binary(OpCode::LShift, 1u8, 8, true), Err(FaultReason::Overflow));
        assert_eq!(int_binary(OpCode::LShift, 1u8, 9, false), Ok(2));
        assert_eq!(int_binary(OpCode::RShift, -16i32, 2, true), Ok(-4));
        assert_eq!(int_binary(OpCode::RShift, 1i32, -1, true), Err(FaultReason::Overflow));
    }

    #[test]
    fn test_int_unary() {
        assert_eq!(int_unary(OpCode::USub, i8::MIN, true), Err(FaultReason::Overflow));
        assert_eq!(int_unary(OpCode::USub, i8::MIN, false), Ok(i8::MIN));
        assert_eq!(int_unary(OpCode::Abs, -5i16, true), Ok(5));
        assert_eq!(int_unary(OpCode::Invert, 0u8, true), Ok(255));
        assert_eq!(int_unary(OpCode::Not, 3i32, true), Ok(0));
        assert_eq!(int_unary(OpCode::Not, 0i32, true), Ok(1));
    }

    #[test]
    fn test_int_logic_and_compare() {
        assert_eq!(int_binary(OpCode::Lt, 1i32, 2, true), Ok(1));
        assert_eq!(int_binary(OpCode::Ge, 1i32, 2, true), Ok(0));
        assert_eq!(int_binary(OpCode::And, 3i32, 0, true), Ok(0));
        assert_eq!(int_binary(OpCode::Or, 3i32, 0, true), Ok(1));
        assert_eq!(int_binary(OpCode::BitXor, 0b1100u8, 0b1010, true), Ok(0b0110));
    }

    #[test]
    fn test_float_checked_non_finite() {
        assert_eq!(float_binary(OpCode::Div, 1.0f64, 0.0, true), Err(FaultReason::NonFinite));
        assert_eq!(float_binary(OpCode::Div, 1.0f64, 0.0, false), Ok(f64::INFINITY));
        assert_eq!(float_unary(OpCode::Sqrt, -1.0f64, true), Err(FaultReason::NonFinite));
        assert!(float_unary(OpCode::Sqrt, -1.0f64, false).unwrap().is_nan());
        assert_eq!(
            float_binary(OpCode::Mult, f32::MAX, 2.0, true),
            Err(FaultReason::NonFinite)
        );
        // already non-finite inputs pass through
        assert_eq!(float_binary(OpCode::Add, f64::INFINITY, 1.0, true), Ok(f64::INFINITY));
    }

    #[test]
    fn test_float_mod_and_floordiv() {
        assert_eq!(float_binary(OpCode::Mod, -7.0f64, 2.0, true), Ok(1.0));
        assert_eq!(float_binary(OpCode::Fmod, -7.0f64, 2.0, true), Ok(-1.0));
        assert_eq!(float_binary(OpCode::FloorDiv, -7.0f64, 2.0, true), Ok(-4.0));
    }

    #[test]
    fn test_float_math_calls() {
        assert_eq!(float_binary(OpCode::Hypot, 3.0f64, 4.0, true), Ok(5.0));
        assert_eq!(float_binary(OpCode::Ldexp, 1.5f64, 3.0, true), Ok(12.0));
        assert_eq!(float_binary(OpCode::Copysign, 2.0f64, -0.5, true), Ok(-2.0));
        assert_eq!(float_binary(OpCode::MathPow, 2.0f64, 10.0, true), Ok(1024.0));
        let deg = float_unary(OpCode::Degrees, std::f64::consts::PI, true).unwrap();
        assert!((deg - 180.0).abs() < 1e-10);
        assert_eq!(float_unary(OpCode::Trunc, -2.7f64, true), Ok(-2.0));
        let y = float_binary(OpCode::Atan2, 1.0f64, 0.0, true).unwrap();
        assert!((y - std::f64::consts::FRAC_PI_2).abs() < 1e-15);
    }
}
