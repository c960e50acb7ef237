//! Opcode descriptor table
//!
//! Single source of truth for every operation an equation can compile to:
//! its numeric encodings, which element classes may use it, whether it is a
//! math-library call, and its effect on the evaluation stack.

use rustc_hash::FxHashSet;

use crate::traits::NumericClass;

pub(crate) mod definitions;
pub(crate) mod registry;

pub use registry::{descriptor, descriptors, lookup};

/// Every symbolic operation known to the compiler and VM.
///
/// The discriminant doubles as the index into the descriptor table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpCode {
    PushArray,
    PushVar,
    PushConst,
    USub,
    UAdd,
    Invert,
    Not,
    Add,
    Sub,
    Mult,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Abs,
    Acos,
    Acosh,
    Asin,
    Asinh,
    Atan,
    Atanh,
    Ceil,
    Cos,
    Cosh,
    Degrees,
    Exp,
    Expm1,
    Fabs,
    Floor,
    Log,
    Log10,
    Log1p,
    Log2,
    Radians,
    Sin,
    Sinh,
    Sqrt,
    Tan,
    Tanh,
    Trunc,
    Atan2,
    Copysign,
    Fmod,
    Hypot,
    Ldexp,
    MathPow,
}

impl OpCode {
    /// Descriptor for this opcode
    #[inline]
    pub fn descriptor(self) -> &'static OpDescriptor {
        &definitions::DESCRIPTORS[self as usize]
    }

    /// Symbolic name, e.g. `add` or `math.sin`
    #[inline]
    pub fn name(self) -> &'static str {
        self.descriptor().name
    }
}

/// Static description of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpDescriptor {
    pub op: OpCode,
    pub name: &'static str,
    /// Instruction code in integer (signed and unsigned) programs
    pub int_code: Option<u32>,
    /// Instruction code in floating point programs
    pub float_code: Option<u32>,
    /// Only legal for signed element classes (signed integers, floats)
    pub signed_only: bool,
    /// Member of the `math` library (`math.sin`, ...)
    pub is_math_call: bool,
    /// +1 push, 0 unary, -1 binary
    pub stack_delta: i32,
    /// Needs the extended math library; see [`TargetCapabilities`]
    pub extended: bool,
}

impl OpDescriptor {
    /// Instruction code for the given element class, if the operation is legal there.
    pub fn code_for(&self, class: NumericClass) -> Option<u32> {
        match class {
            NumericClass::SignedInt => self.int_code,
            NumericClass::UnsignedInt if self.signed_only => None,
            NumericClass::UnsignedInt => self.int_code,
            NumericClass::Float => self.float_code,
        }
    }

    /// Whether the operation may appear in a program for `class`.
    #[inline]
    pub fn is_legal_for(&self, class: NumericClass) -> bool {
        self.code_for(class).is_some()
    }

    /// Number of values a call pops, for function-like descriptors.
    #[inline]
    pub fn arity(&self) -> usize {
        match self.stack_delta {
            d if d > 0 => 0,
            0 => 1,
            _ => 2,
        }
    }
}

/// Built-in calls that are not part of the `math` module
pub const BUILTIN_CALLS: &[&str] = &["abs"];

/// Names that may never be used as variables
pub const RESERVED_NAMES: &[&str] = &["math", "abs"];

/// `math.<name>` constants accepted as literal pushes
pub const MATH_CONSTANTS: &[(&str, f64)] = &[
    ("pi", std::f64::consts::PI),
    ("e", std::f64::consts::E),
    ("tau", std::f64::consts::TAU),
];

/// Look up a `math.<name>` constant
pub fn math_constant(attr: &str) -> Option<f64> {
    MATH_CONSTANTS
        .iter()
        .find(|(name, _)| *name == attr)
        .map(|(_, v)| *v)
}

/// Whether `name` is a callable the equation may use
pub fn is_callable(name: &str) -> bool {
    BUILTIN_CALLS.contains(&name) || lookup(name).is_some_and(|d| d.is_math_call)
}

/// Which operations the execution target can run.
///
/// Passed explicitly to the compiler instead of inspecting the toolchain,
/// so the same build can be tested against any capability profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetCapabilities {
    extended_math: bool,
    disabled: FxHashSet<OpCode>,
}

impl Default for TargetCapabilities {
    fn default() -> Self {
        Self::full()
    }
}

impl TargetCapabilities {
    /// Everything available
    pub fn full() -> Self {
        Self {
            extended_math: true,
            disabled: FxHashSet::default(),
        }
    }

    /// Only the baseline C89-style math library
    pub fn baseline() -> Self {
        Self {
            extended_math: false,
            disabled: FxHashSet::default(),
        }
    }

    /// Enable or disable the extended math library
    #[must_use]
    pub fn extended_math(mut self, enabled: bool) -> Self {
        self.extended_math = enabled;
        self
    }

    /// Mark a single operation unavailable
    #[must_use]
    pub fn disable(mut self, op: OpCode) -> Self {
        self.disabled.insert(op);
        self
    }

    /// Whether `op` can run on this target
    pub fn is_available(&self, op: OpCode) -> bool {
        !self.disabled.contains(&op) && (self.extended_math || !op.descriptor().extended)
    }

    /// All operations this target cannot run
    pub fn unavailable(&self) -> FxHashSet<OpCode> {
        descriptors()
            .iter()
            .map(|d| d.op)
            .filter(|op| !self.is_available(*op))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_descriptor_has_a_code() {
        for d in descriptors() {
            assert!(
                d.int_code.is_some() || d.float_code.is_some(),
                "{} has no encoding",
                d.name
            );
        }
    }

    #[test]
    fn test_table_is_indexed_by_opcode() {
        for (i, d) in descriptors().iter().enumerate() {
            assert_eq!(d.op as usize, i, "{} out of place", d.name);
        }
    }

    #[test]
    fn test_codes_are_unique_per_class() {
        let mut ints = FxHashSet::default();
        let mut floats = FxHashSet::default();
        for d in descriptors() {
            if let Some(c) = d.int_code {
                assert!(ints.insert(c), "duplicate int code {c}");
            }
            if let Some(c) = d.float_code {
                assert!(floats.insert(c), "duplicate float code {c}");
            }
        }
    }

    #[test]
    fn test_class_legality() {
        let usub = OpCode::USub.descriptor();
        assert!(usub.is_legal_for(NumericClass::SignedInt));
        assert!(!usub.is_legal_for(NumericClass::UnsignedInt));
        assert!(usub.is_legal_for(NumericClass::Float));

        let shl = OpCode::LShift.descriptor();
        assert!(shl.is_legal_for(NumericClass::UnsignedInt));
        assert!(!shl.is_legal_for(NumericClass::Float));

        let sin = OpCode::Sin.descriptor();
        assert!(sin.is_math_call);
        assert!(!sin.is_legal_for(NumericClass::SignedInt));
        assert_eq!(sin.arity(), 1);
        assert_eq!(OpCode::Atan2.descriptor().arity(), 2);
    }

    #[test]
    fn test_callables() {
        assert!(is_callable("abs"));
        assert!(is_callable("math.sin"));
        assert!(is_callable("math.hypot"));
        assert!(!is_callable("open"));
        assert!(!is_callable("add"));
        assert!(!is_callable("math.nonexistent"));
    }

    #[test]
    fn test_capabilities() {
        let full = TargetCapabilities::default();
        assert!(full.is_available(OpCode::Hypot));
        assert!(full.unavailable().is_empty());

        let base = TargetCapabilities::baseline();
        assert!(!base.is_available(OpCode::Hypot));
        assert!(base.is_available(OpCode::Sin));

        let custom = TargetCapabilities::full().disable(OpCode::Pow);
        assert!(!custom.is_available(OpCode::Pow));
        assert_eq!(custom.unavailable().len(), 1);
    }
}
