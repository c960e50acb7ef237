//! Stack-machine execution of compiled programs.
//!
//! The instruction stream is decoded once per call into [`Step`]s, checked
//! for stack balance, then run for every element. Each lane owns a disjoint
//! `depth`-sized slice of the stack buffer and a contiguous block of
//! elements, so lanes never share mutable state.
//!
//! Binary steps pop the left operand first: the analyzer pushes the first
//! operand last.

use std::sync::atomic::{AtomicUsize, Ordering};

use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use super::compiler::required_stack_depth;
use crate::error::{CalcError, FaultReason};
use crate::functions::{OpCode, registry};
use crate::traits::Element;

/// One decoded instruction
#[derive(Debug, Clone, Copy)]
enum Step<T> {
    PushArray,
    PushVar(usize),
    PushConst(T),
    Unary(OpCode),
    Binary(OpCode),
}

/// Element offset within a lane, the failing opcode, and why
type LaneFault = (usize, OpCode, FaultReason);

/// Execute a compiled program over `source`, writing `destination`.
///
/// This is the raw entry point; [`EquationCompiler::execute`](crate::EquationCompiler::execute)
/// and [`CompiledProgram::run`](crate::CompiledProgram::run) build the
/// arguments for you.
///
/// Elements `0..n` are processed, where `n` is `source.len()` capped by
/// `element_limit` when it is non-zero. Destination slots past `n` are left
/// untouched.
///
/// # Errors
/// - [`CalcError::InvalidArguments`] if array lengths disagree, `lane_count`
///   is zero, the stack buffer is too small, the parameter count does not
///   match the registers used, or an instruction code is unknown
/// - Stack errors if the instruction stream is not balanced
/// - [`CalcError::ParameterOutOfRange`] if a parameter is not admissible
///   (NaN or infinite for float elements)
/// - [`CalcError::ArithmeticFault`] at the lowest faulting element index
#[allow(
    clippy::too_many_arguments,
    reason = "Mirrors the flat VM calling convention; wrappers exist for ergonomic use"
)]
pub fn execute<T: Element>(
    instruction_codes: &[u32],
    variable_registers: &[u32],
    params: &[T],
    constants: &[T],
    stack_buffer: &mut [T],
    source: &[T],
    destination: &mut [T],
    lane_count: usize,
    overflow_check: bool,
    element_limit: usize,
) -> Result<(), CalcError> {
    if instruction_codes.len() != variable_registers.len()
        || instruction_codes.len() != constants.len()
    {
        return Err(CalcError::InvalidArguments(format!(
            "program arrays differ in length ({}, {}, {})",
            instruction_codes.len(),
            variable_registers.len(),
            constants.len()
        )));
    }
    if source.len() != destination.len() {
        return Err(CalcError::InvalidArguments(format!(
            "source has {} elements but destination has {}",
            source.len(),
            destination.len()
        )));
    }
    if lane_count == 0 {
        return Err(CalcError::InvalidArguments(
            "lane count must be positive".to_string(),
        ));
    }

    let steps = decode::<T>(instruction_codes, variable_registers, constants, params.len())?;
    let depth = required_stack_depth(
        steps.iter().map(|s| match s {
            Step::PushArray | Step::PushVar(_) | Step::PushConst(_) => 1,
            Step::Unary(_) => 0,
            Step::Binary(_) => -1,
        }),
        usize::MAX,
    )?;
    let stack_needed = depth.saturating_mul(lane_count);
    if stack_buffer.len() < stack_needed {
        return Err(CalcError::InvalidArguments(format!(
            "stack buffer holds {} values, {depth} x {lane_count} lanes needed",
            stack_buffer.len()
        )));
    }

    // Loading
    if let Some((index, value)) = params.iter().enumerate().find(|(_, p)| !p.is_admissible()) {
        return Err(CalcError::ParameterOutOfRange {
            index,
            value: value.to_string(),
            target: T::NAME,
        });
    }

    // Running
    let n = if element_limit == 0 {
        source.len()
    } else {
        element_limit.min(source.len())
    };
    if n == 0 {
        return Ok(());
    }
    let chunk = n.div_ceil(lane_count).max(1);
    debug!(
        elements = n,
        lanes = lane_count,
        instructions = steps.len(),
        overflow_check,
        "executing program"
    );

    let fault = run_lanes(
        &steps,
        params,
        &source[..n],
        &mut destination[..n],
        &mut stack_buffer[..stack_needed],
        depth,
        chunk,
        overflow_check,
    );

    match fault {
        Some((index, op, reason)) => {
            trace!(index, op = op.name(), %reason, "arithmetic fault");
            Err(CalcError::ArithmeticFault {
                index,
                op: op.name(),
                reason,
            })
        }
        None => Ok(()),
    }
}

fn decode<T: Element>(
    codes: &[u32],
    registers: &[u32],
    constants: &[T],
    param_count: usize,
) -> Result<Vec<Step<T>>, CalcError> {
    let mut used_registers = FxHashSet::default();
    let steps = codes
        .iter()
        .enumerate()
        .map(|(i, &code)| {
            let desc = registry::decode(T::CLASS, code).ok_or_else(|| {
                CalcError::InvalidArguments(format!(
                    "instruction {i}: code {code} is not a {} operation",
                    T::CLASS.label()
                ))
            })?;
            Ok(match desc.op {
                OpCode::PushArray => Step::PushArray,
                OpCode::PushVar => {
                    let reg = registers[i] as usize;
                    if reg >= param_count {
                        return Err(CalcError::InvalidArguments(format!(
                            "instruction {i} reads register {reg} but {param_count} parameters were given"
                        )));
                    }
                    used_registers.insert(reg);
                    Step::PushVar(reg)
                }
                OpCode::PushConst => Step::PushConst(constants[i]),
                op if desc.stack_delta == 0 => Step::Unary(op),
                op => Step::Binary(op),
            })
        })
        .collect::<Result<Vec<_>, CalcError>>()?;

    if used_registers.len() != param_count {
        return Err(CalcError::InvalidArguments(format!(
            "{param_count} parameters given but the program uses {}",
            used_registers.len()
        )));
    }
    Ok(steps)
}

/// Run every lane, returning the fault with the lowest element index.
///
/// Lanes share the lowest fault index seen so far and stop once their next
/// element lies past it, so no lane works beyond a known fault while every
/// element before it is still evaluated.
#[allow(
    clippy::too_many_arguments,
    reason = "Internal helper threading the already validated VM arguments"
)]
fn run_lanes<T: Element>(
    steps: &[Step<T>],
    params: &[T],
    source: &[T],
    destination: &mut [T],
    stack: &mut [T],
    depth: usize,
    chunk: usize,
    checked: bool,
) -> Option<LaneFault> {
    let first_fault = AtomicUsize::new(usize::MAX);

    #[cfg(feature = "parallel")]
    if chunk < source.len() {
        use rayon::prelude::*;

        return source
            .par_chunks(chunk)
            .zip(destination.par_chunks_mut(chunk))
            .zip(stack.par_chunks_mut(depth))
            .enumerate()
            .filter_map(|(lane, ((src, dst), lane_stack))| {
                run_lane(steps, params, src, dst, lane_stack, checked, lane * chunk, &first_fault)
                    .err()
            })
            .min_by_key(|(index, _, _)| *index);
    }

    source
        .chunks(chunk)
        .zip(destination.chunks_mut(chunk))
        .zip(stack.chunks_mut(depth))
        .enumerate()
        .find_map(|(lane, ((src, dst), lane_stack))| {
            run_lane(steps, params, src, dst, lane_stack, checked, lane * chunk, &first_fault)
                .err()
        })
}

/// Evaluate one block of elements, starting at element `offset`, on one stack slice.
///
/// Faults carry absolute element indices.
#[inline]
#[allow(
    clippy::too_many_arguments,
    reason = "Internal helper threading the already validated VM arguments"
)]
fn run_lane<T: Element>(
    steps: &[Step<T>],
    params: &[T],
    source: &[T],
    destination: &mut [T],
    stack: &mut [T],
    checked: bool,
    offset: usize,
    first_fault: &AtomicUsize,
) -> Result<(), LaneFault> {
    for (i, (&x, out)) in source.iter().zip(destination.iter_mut()).enumerate() {
        let index = offset + i;
        if index > first_fault.load(Ordering::Relaxed) {
            return Ok(());
        }
        let fault = |op, reason| {
            first_fault.fetch_min(index, Ordering::Relaxed);
            (index, op, reason)
        };
        let mut sp = 0;
        for step in steps {
            match *step {
                Step::PushArray => {
                    stack[sp] = x;
                    sp += 1;
                }
                Step::PushVar(reg) => {
                    stack[sp] = params[reg];
                    sp += 1;
                }
                Step::PushConst(c) => {
                    stack[sp] = c;
                    sp += 1;
                }
                Step::Unary(op) => {
                    stack[sp - 1] =
                        T::unary(op, stack[sp - 1], checked).map_err(|r| fault(op, r))?;
                }
                Step::Binary(op) => {
                    let left = stack[sp - 1];
                    let right = stack[sp - 2];
                    sp -= 1;
                    stack[sp - 1] =
                        T::binary(op, left, right, checked).map_err(|r| fault(op, r))?;
                }
            }
        }
        *out = stack[0];
    }
    Ok(())
}
