//! Equation compiler and evaluation stack machine.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    ┌────────────┐    ┌─────────────┐    ┌─────────────────┐
//! │  Equation   │ -> │  Analyzer  │ -> │  Compiler   │ -> │ CompiledProgram │
//! │   (text)    │    │ (raw ops)  │    │  (passes)   │    │   (bytecode)    │
//! └─────────────┘    └────────────┘    └─────────────┘    └─────────────────┘
//!                                                                  │
//!                                            ┌─────────────────────┤
//!                                            ▼                     ▼
//!                                      ┌──────────┐         ┌────────────┐
//!                                      │ execute  │         │  parallel  │
//!                                      │ (1 lane) │         │  (Rayon)   │
//!                                      └──────────┘         └────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use arraycalc::{EquationCompiler, ExecOptions, Literal};
//!
//! let mut compiler = EquationCompiler::<i32>::new();
//! compiler.compile("x * 2 + k", "x", &["k"]).unwrap();
//!
//! let source = [1, 2, 3];
//! let mut dest = [0; 3];
//! compiler
//!     .execute(&source, &mut dest, &[Literal::from(10)], &ExecOptions::new())
//!     .unwrap();
//! assert_eq!(dest, [12, 14, 16]);
//! ```
//!
//! # Modules
//!
//! - [`analyzer`]: parse, validate and flatten to raw operations
//! - [`compiler`]: the compile passes
//! - [`program`]: the compiled artifact
//! - [`execution`]: the stack machine

mod analyzer;
mod compiler;
mod execution;
mod program;

pub use execution::execute;
pub use program::CompiledProgram;

use tracing::debug;

use crate::ast::Literal;
use crate::error::CalcError;
use crate::functions::TargetCapabilities;
use crate::traits::Element;

/// Default cap on the stack depth a compiled program may require
pub const DEFAULT_MAX_STACK_DEPTH: usize = 1024;

/// Compiles equations for element type `T` and runs the last compiled program.
///
/// Configuration follows the builder pattern:
///
/// ```
/// use arraycalc::{EquationCompiler, TargetCapabilities};
///
/// let mut compiler = EquationCompiler::<f64>::new()
///     .capabilities(TargetCapabilities::baseline())
///     .max_stack_depth(64);
/// assert!(compiler.compile("math.log2(x)", "x", &[] as &[&str]).is_err());
/// assert!(compiler.compile("math.log(x)", "x", &[] as &[&str]).is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct EquationCompiler<T: Element> {
    capabilities: TargetCapabilities,
    max_stack_depth: usize,
    program: Option<CompiledProgram<T>>,
}

impl<T: Element> Default for EquationCompiler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> EquationCompiler<T> {
    /// Create a compiler with full target capabilities and the default stack limit
    pub fn new() -> Self {
        Self {
            capabilities: TargetCapabilities::default(),
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
            program: None,
        }
    }

    /// Set which operations the execution target supports
    #[must_use]
    pub fn capabilities(mut self, capabilities: TargetCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Set the largest stack depth a program may need
    #[must_use]
    pub fn max_stack_depth(mut self, depth: usize) -> Self {
        self.max_stack_depth = depth;
        self
    }

    /// Compile `equation`, where `element_name` stands for the current array
    /// element and `parameter_names` are the scalar parameters in register
    /// order.
    ///
    /// On failure the compiler is left without a program, so a later
    /// [`execute`](Self::execute) fails with [`CalcError::NotCompiled`].
    ///
    /// # Errors
    /// Parse, validation, type-range, or stack errors from any compile pass.
    pub fn compile<S: AsRef<str>>(
        &mut self,
        equation: &str,
        element_name: &str,
        parameter_names: &[S],
    ) -> Result<&CompiledProgram<T>, CalcError> {
        self.program = None;
        let names: Vec<String> = parameter_names
            .iter()
            .map(|s| s.as_ref().to_string())
            .collect();
        let program = compiler::compile::<T>(
            equation,
            element_name,
            &names,
            &self.capabilities,
            self.max_stack_depth,
        )
        .inspect_err(|e| debug!(equation, error = %e, "compile failed"))?;
        Ok(self.program.insert(program))
    }

    /// The last successfully compiled program
    pub fn program(&self) -> Option<&CompiledProgram<T>> {
        self.program.as_ref()
    }

    pub fn is_compiled(&self) -> bool {
        self.program.is_some()
    }

    /// Run the compiled program over `source`, writing `destination`.
    ///
    /// Parameter values are converted into `T` with the same range rules as
    /// literal constants.
    ///
    /// # Errors
    /// - [`CalcError::NotCompiled`] if nothing is compiled
    /// - [`CalcError::InvalidArguments`] if the parameter count is wrong
    /// - [`CalcError::ParameterOutOfRange`] if a value does not fit `T`
    /// - any error from [`execute`]
    pub fn execute(
        &self,
        source: &[T],
        destination: &mut [T],
        params: &[Literal],
        options: &ExecOptions,
    ) -> Result<(), CalcError> {
        let program = self.program.as_ref().ok_or(CalcError::NotCompiled)?;
        let values = convert_params::<T>(program, params)?;
        program.run(source, destination, &values, options)
    }

    /// Like [`execute`](Self::execute), but overwrites `data` with the results.
    ///
    /// # Errors
    /// Same as [`execute`](Self::execute).
    pub fn execute_in_place(
        &self,
        data: &mut [T],
        params: &[Literal],
        options: &ExecOptions,
    ) -> Result<(), CalcError> {
        let source = data.to_vec();
        self.execute(&source, data, params, options)
    }
}

fn convert_params<T: Element>(
    program: &CompiledProgram<T>,
    params: &[Literal],
) -> Result<Vec<T>, CalcError> {
    if params.len() != program.param_count() {
        return Err(CalcError::InvalidArguments(format!(
            "expected {} parameter value(s), got {}",
            program.param_count(),
            params.len()
        )));
    }
    params
        .iter()
        .enumerate()
        .map(|(index, lit)| {
            T::from_literal(*lit).ok_or_else(|| CalcError::ParameterOutOfRange {
                index,
                value: lit.to_string(),
                target: T::NAME,
            })
        })
        .collect()
}

/// Options for one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    lanes: usize,
    overflow_check: bool,
    element_limit: usize,
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecOptions {
    /// One lane, overflow checking on, whole array
    pub fn new() -> Self {
        Self {
            lanes: 1,
            overflow_check: true,
            element_limit: 0,
        }
    }

    /// Number of parallel evaluation lanes, each with its own stack slice
    #[must_use]
    pub fn lanes(mut self, lanes: usize) -> Self {
        self.lanes = lanes;
        self
    }

    /// Fault on results not representable in the element type
    #[must_use]
    pub fn overflow_check(mut self, enabled: bool) -> Self {
        self.overflow_check = enabled;
        self
    }

    /// Process at most this many elements; 0 means the whole array
    #[must_use]
    pub fn element_limit(mut self, limit: usize) -> Self {
        self.element_limit = limit;
        self
    }

    pub fn lane_count(&self) -> usize {
        self.lanes
    }

    pub fn is_overflow_checked(&self) -> bool {
        self.overflow_check
    }

    pub fn limit(&self) -> usize {
        self.element_limit
    }
}
