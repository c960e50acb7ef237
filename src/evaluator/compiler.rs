//! Equation compiler passes.
//!
//! # Compilation Process
//!
//! 1. **Name check**: element and parameter names are valid, unreserved identifiers
//! 2. **Analysis**: parse, validate and flatten (see [`analyzer`](super::analyzer))
//! 3. **Sign folding**: `usub`/`uadd` applied to a literal are folded into it
//! 4. **Constant conversion**: literals are range-checked into the element type
//! 5. **Opcode legality**: every operation exists for the element class and target
//! 6. **Stack analysis**: no underflow, exactly one result, bounded depth
//! 7. **Register allocation**: parameters map to registers in declaration order
//! 8. **Emission**: parallel code / register / constant arrays
//!
//! Every pass fails fast; nothing is produced unless all of them succeed.

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use super::analyzer::{Operand, RawOperation, analyze};
use super::program::CompiledProgram;
use crate::error::CalcError;
use crate::functions::{OpCode, RESERVED_NAMES, TargetCapabilities};
use crate::parser::tokens::is_keyword;
use crate::traits::Element;

/// Compile `equation` for element type `T`.
pub(crate) fn compile<T: Element>(
    equation: &str,
    element_name: &str,
    parameter_names: &[String],
    capabilities: &TargetCapabilities,
    max_stack_depth: usize,
) -> Result<CompiledProgram<T>, CalcError> {
    check_names(element_name, parameter_names)?;

    let raw = analyze(equation, element_name)?;
    trace!(operations = raw.len(), "analyzed equation");

    let mut ops = fold_constant_signs(raw);
    let constants = convert_constants::<T>(&ops)?;
    check_opcodes::<T>(&ops, capabilities)?;

    let depth = required_stack_depth(
        ops.iter().map(|o| o.op.descriptor().stack_delta),
        max_stack_depth,
    )?;
    allocate_registers(&mut ops, element_name, parameter_names)?;

    let program = emit(&ops, constants, depth, parameter_names)?;
    debug!(
        equation,
        element = T::NAME,
        instructions = program.len(),
        stack_depth = depth,
        "compiled equation"
    );
    Ok(program)
}

/// Whether `name` is a plain ASCII identifier
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_names(element_name: &str, parameter_names: &[String]) -> Result<(), CalcError> {
    for name in std::iter::once(element_name).chain(parameter_names.iter().map(String::as_str)) {
        if is_keyword(name) || RESERVED_NAMES.contains(&name) {
            return Err(CalcError::ReservedName(name.to_string()));
        }
        if !is_identifier(name) {
            return Err(CalcError::InvalidName(name.to_string()));
        }
    }
    Ok(())
}

/// Fold unary signs into the literal they apply to.
///
/// In program order a sign applied to a constant directly follows the
/// `pushconst`, possibly several times (`-(-(5))`). Signs applied to
/// anything else are kept.
pub(crate) fn fold_constant_signs(ops: Vec<RawOperation>) -> Vec<RawOperation> {
    let mut folded: Vec<RawOperation> = Vec::with_capacity(ops.len());
    // Index in `folded` of the constant being signed, and whether to negate it
    let mut pending: Option<(usize, bool)> = None;

    for op in ops {
        match (op.op, pending) {
            (OpCode::USub, Some((at, flip))) => pending = Some((at, !flip)),
            (OpCode::UAdd, Some(_)) => {}
            _ => {
                close_run(&mut folded, pending.take());
                if op.op == OpCode::PushConst {
                    pending = Some((folded.len(), false));
                }
                folded.push(op);
            }
        }
    }
    close_run(&mut folded, pending);
    folded
}

fn close_run(folded: &mut [RawOperation], run: Option<(usize, bool)>) {
    if let Some((at, true)) = run
        && let Some(lit) = folded[at].literal()
    {
        folded[at] = RawOperation::constant(lit.negate());
    }
}

/// Convert every literal into the element type, zero for non-constant slots.
pub(crate) fn convert_constants<T: Element>(ops: &[RawOperation]) -> Result<Vec<T>, CalcError> {
    ops.iter()
        .map(|op| match op.literal() {
            Some(lit) => T::from_literal(lit).ok_or_else(|| CalcError::ConstantOutOfRange {
                literal: lit.to_string(),
                target: T::NAME,
            }),
            None => Ok(T::zero()),
        })
        .collect()
}

/// Distinct opcode names in first-use order
fn used_names(ops: &[RawOperation], pred: impl Fn(OpCode) -> bool) -> Vec<String> {
    let mut seen = FxHashSet::default();
    ops.iter()
        .map(|o| o.op)
        .filter(|op| pred(*op) && seen.insert(*op))
        .map(|op| op.name().to_string())
        .collect()
}

pub(crate) fn check_opcodes<T: Element>(
    ops: &[RawOperation],
    capabilities: &TargetCapabilities,
) -> Result<(), CalcError> {
    let illegal = used_names(ops, |op| !op.descriptor().is_legal_for(T::CLASS));
    if !illegal.is_empty() {
        return Err(CalcError::IllegalOperation {
            target: T::CLASS.label(),
            ops: illegal,
        });
    }

    let unavailable = used_names(ops, |op| !capabilities.is_available(op));
    if !unavailable.is_empty() {
        return Err(CalcError::UnavailableOperation(unavailable));
    }
    Ok(())
}

/// Minimum stack size for a program with the given per-instruction stack deltas.
///
/// The running sum must stay positive and end at exactly one value.
/// The reported depth is the peak plus two, and must not exceed `limit`.
pub(crate) fn required_stack_depth(
    deltas: impl IntoIterator<Item = i32>,
    limit: usize,
) -> Result<usize, CalcError> {
    let mut running: isize = 0;
    let mut peak: isize = 0;
    for (position, delta) in deltas.into_iter().enumerate() {
        running += delta as isize;
        if running <= 0 {
            return Err(CalcError::StackUnderflow { position });
        }
        peak = peak.max(running);
    }
    if running != 1 {
        return Err(CalcError::StackImbalance { remaining: running });
    }

    let depth = peak.unsigned_abs() + 2;
    if depth > limit {
        return Err(CalcError::StackOverflow { depth, limit });
    }
    Ok(depth)
}

pub(crate) fn allocate_registers(
    ops: &mut [RawOperation],
    element_name: &str,
    parameter_names: &[String],
) -> Result<(), CalcError> {
    let mut registers: FxHashMap<&str, u32> = FxHashMap::default();
    for (index, name) in parameter_names.iter().enumerate() {
        if name == element_name || registers.contains_key(name.as_str()) {
            return Err(CalcError::DuplicateParameter(name.clone()));
        }
        let index = u32::try_from(index)
            .map_err(|_| CalcError::InvalidArguments("too many parameters".to_string()))?;
        registers.insert(name.as_str(), index);
    }

    let mut undefined = Vec::new();
    let mut referenced = FxHashSet::default();
    for op in ops.iter() {
        if let Some(Operand::Name(name)) = &op.param {
            if registers.contains_key(name.as_str()) {
                referenced.insert(name.as_str());
            } else if !undefined.contains(name) {
                undefined.push(name.clone());
            }
        }
    }
    if !undefined.is_empty() {
        return Err(CalcError::UndefinedVariable(undefined));
    }

    let unused: Vec<String> = parameter_names
        .iter()
        .filter(|n| !referenced.contains(n.as_str()))
        .cloned()
        .collect();
    if !unused.is_empty() {
        return Err(CalcError::UnusedVariable(unused));
    }

    for op in ops.iter_mut() {
        let register = match &op.param {
            Some(Operand::Name(name)) => registers.get(name.as_str()).copied(),
            _ => None,
        };
        if let Some(r) = register {
            op.param = Some(Operand::Register(r));
        }
    }
    Ok(())
}

fn emit<T: Element>(
    ops: &[RawOperation],
    constants: Vec<T>,
    depth: usize,
    parameter_names: &[String],
) -> Result<CompiledProgram<T>, CalcError> {
    let mut codes = Vec::with_capacity(ops.len());
    let mut registers = Vec::with_capacity(ops.len());
    for op in ops {
        let code = op.op.descriptor().code_for(T::CLASS).ok_or_else(|| {
            CalcError::IllegalOperation {
                target: T::CLASS.label(),
                ops: vec![op.op.name().to_string()],
            }
        })?;
        codes.push(code);
        registers.push(match op.param {
            Some(Operand::Register(r)) => r,
            _ => 0,
        });
    }
    Ok(CompiledProgram::new(
        codes,
        registers,
        constants,
        depth,
        parameter_names.to_vec(),
    ))
}
