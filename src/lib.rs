//! Array Equation Compiler
//!
//! Compile a small arithmetic expression once against a fixed-width numeric
//! element type, then evaluate it over every element of an array.
//!
//! # Features
//! - Python-flavoured expression grammar: arithmetic, bitwise, comparison and
//!   boolean operators, `abs`, and a whitelist of `math.*` functions
//! - Compile-time range checking of constants against the element type,
//!   with signs folded into literals (`-128` is a valid `i8`)
//! - Stack-depth analysis so the evaluation stack can be sized up front
//! - Optional overflow checking at run time, reporting the failing element
//! - Parallel evaluation lanes on Rayon (`parallel` feature)
//! - Explicit [`TargetCapabilities`] instead of toolchain sniffing
//!
//! # Usage
//!
//! ```
//! use arraycalc::{EquationCompiler, ErrorKind, ExecOptions, Literal};
//!
//! let mut compiler = EquationCompiler::<i8>::new();
//! compiler.compile("x + 1", "x", &[] as &[&str]).unwrap();
//!
//! let mut dest = [0i8];
//! let err = compiler
//!     .execute(&[127], &mut dest, &[], &ExecOptions::new())
//!     .unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::TypeRange);
//! assert_eq!(err.fault_index(), Some(0));
//!
//! // Wraparound when checking is off
//! compiler
//!     .execute(&[127], &mut dest, &[], &ExecOptions::new().overflow_check(false))
//!     .unwrap();
//! assert_eq!(dest, [-128]);
//! ```
//!
//! Operand order follows the text: `"10 - 3"` evaluates to 7 and
//! `math.atan2(y, x)` receives `y` first.

mod ast;
mod error;
mod evaluator;
pub mod functions;
pub(crate) mod math;
mod parser;
pub mod traits;
pub mod visitor;

#[cfg(test)]
mod tests;

// Re-export key types for easier usage
pub use ast::{BinaryOp, BoolOp, CompareOp, Literal, Node, UnaryOp};
pub use error::{CalcError, ErrorKind, FaultReason, Span};
pub use evaluator::{
    CompiledProgram, DEFAULT_MAX_STACK_DEPTH, EquationCompiler, ExecOptions, execute,
};
pub use functions::{OpCode, OpDescriptor, TargetCapabilities, descriptor, descriptors, lookup};
pub use parser::{ILLEGAL_CHARACTERS, parse};
pub use traits::{Element, NumericClass};

/// Compile `equation` and run it over `source` in one call.
///
/// Uses default capabilities and [`ExecOptions::new`]. For repeated runs keep
/// an [`EquationCompiler`] instead.
///
/// # Example
/// ```
/// use arraycalc::{evaluate, Literal};
///
/// let out = evaluate::<f64>("x / 2 + k", "x", &[("k", Literal::Float(0.5))], &[1.0, 3.0]).unwrap();
/// assert_eq!(out, vec![1.0, 2.0]);
/// ```
///
/// # Errors
/// Any compile or execution error.
pub fn evaluate<T: Element>(
    equation: &str,
    element_name: &str,
    params: &[(&str, Literal)],
    source: &[T],
) -> Result<Vec<T>, CalcError> {
    let (names, values): (Vec<&str>, Vec<Literal>) = params.iter().copied().unzip();
    let mut compiler = EquationCompiler::<T>::new();
    compiler.compile(equation, element_name, &names)?;
    let mut destination = vec![T::zero(); source.len()];
    compiler.execute(source, &mut destination, &values, &ExecOptions::new())?;
    Ok(destination)
}
