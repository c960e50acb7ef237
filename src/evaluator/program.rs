use std::fmt::Write as _;

use super::ExecOptions;
use super::execution::execute;
use crate::error::CalcError;
use crate::functions::{OpCode, registry};
use crate::traits::Element;

/// Bytecode produced by a successful compile.
///
/// Three parallel arrays describe the program: instruction `i` has code
/// `instruction_codes()[i]`, reads register `variable_registers()[i]` if it
/// is a variable push, and pushes `constants()[i]` if it is a constant
/// push. Unused slots hold zero.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram<T: Element> {
    instruction_codes: Box<[u32]>,
    variable_registers: Box<[u32]>,
    constants: Box<[T]>,
    required_stack_depth: usize,
    param_names: Box<[String]>,
}

impl<T: Element> CompiledProgram<T> {
    pub(crate) fn new(
        instruction_codes: Vec<u32>,
        variable_registers: Vec<u32>,
        constants: Vec<T>,
        required_stack_depth: usize,
        param_names: Vec<String>,
    ) -> Self {
        Self {
            instruction_codes: instruction_codes.into_boxed_slice(),
            variable_registers: variable_registers.into_boxed_slice(),
            constants: constants.into_boxed_slice(),
            required_stack_depth,
            param_names: param_names.into_boxed_slice(),
        }
    }

    /// Instruction codes for `T`'s numeric class
    #[inline]
    pub fn instruction_codes(&self) -> &[u32] {
        &self.instruction_codes
    }

    #[inline]
    pub fn variable_registers(&self) -> &[u32] {
        &self.variable_registers
    }

    #[inline]
    pub fn constants(&self) -> &[T] {
        &self.constants
    }

    /// Stack slots one lane needs
    #[inline]
    pub fn required_stack_depth(&self) -> usize {
        self.required_stack_depth
    }

    /// Declared parameter names, in register order
    #[inline]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    #[inline]
    pub fn param_count(&self) -> usize {
        self.param_names.len()
    }

    /// Number of instructions
    #[inline]
    pub fn len(&self) -> usize {
        self.instruction_codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instruction_codes.is_empty()
    }

    /// Run the program over `source`, writing `destination`.
    ///
    /// Allocates the stack buffer for `options.lane_count()` lanes and calls
    /// [`execute`](crate::execute).
    ///
    /// # Errors
    /// See [`execute`](crate::execute).
    pub fn run(
        &self,
        source: &[T],
        destination: &mut [T],
        params: &[T],
        options: &ExecOptions,
    ) -> Result<(), CalcError> {
        let lanes = options.lane_count().max(1);
        let mut stack = vec![T::zero(); self.required_stack_depth * lanes];
        execute(
            &self.instruction_codes,
            &self.variable_registers,
            params,
            &self.constants,
            &mut stack,
            source,
            destination,
            lanes,
            options.is_overflow_checked(),
            options.limit(),
        )
    }

    /// Evaluate the program for a single element value, with overflow checking.
    ///
    /// # Errors
    /// Fails on a parameter count mismatch, an inadmissible parameter, or an
    /// arithmetic fault (reported at index 0).
    pub fn evaluate(&self, x: T, params: &[T]) -> Result<T, CalcError> {
        let mut out = [T::zero()];
        self.run(&[x], &mut out, params, &ExecOptions::default())?;
        Ok(out[0])
    }

    /// Human readable listing, one instruction per line.
    ///
    /// ```
    /// use arraycalc::EquationCompiler;
    ///
    /// let mut compiler = EquationCompiler::<i32>::new();
    /// let program = compiler.compile("x * 2 + k", "x", &["k"]).unwrap();
    /// let listing = program.disassemble();
    /// assert!(listing.contains("pushvar"));
    /// assert!(listing.contains("mult"));
    /// ```
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for (i, &code) in self.instruction_codes.iter().enumerate() {
            let Some(desc) = registry::decode(T::CLASS, code) else {
                let _ = writeln!(out, "{i:>4}  <unknown {code}>");
                continue;
            };
            let _ = match desc.op {
                OpCode::PushVar => {
                    let reg = self.variable_registers[i];
                    let name = self
                        .param_names
                        .get(reg as usize)
                        .map_or("?", String::as_str);
                    writeln!(out, "{i:>4}  {:<14}r{reg} ({name})", desc.name)
                }
                OpCode::PushConst => {
                    writeln!(out, "{i:>4}  {:<14}{}", desc.name, self.constants[i])
                }
                _ => writeln!(out, "{i:>4}  {}", desc.name),
            };
        }
        out
    }
}
