use std::fmt;
use thiserror::Error;

/// Source location span for error reporting
/// Represents a range of characters in the equation text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start position (0-indexed byte offset)
    pub start: usize,
    /// End position (exclusive, 0-indexed byte offset)
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Create a span for a single position
    pub fn at(pos: usize) -> Self {
        Span {
            start: pos,
            end: pos + 1,
        }
    }

    /// Check if this span has valid location info
    pub fn is_valid(&self) -> bool {
        self.end > self.start
    }

    /// The slice of `source` covered by this span, clamped to the text
    pub fn fragment<'a>(&self, source: &'a str) -> &'a str {
        let end = self.end.min(source.len());
        let start = self.start.min(end);
        source.get(start..end).unwrap_or("")
    }
}

impl fmt::Display for Span {
    /// Format the span for display (1-indexed for users)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            Ok(())
        } else if self.end - self.start == 1 {
            write!(f, " at position {}", self.start + 1)
        } else {
            write!(f, " at positions {}-{}", self.start + 1, self.end)
        }
    }
}

/// Coarse classification of every [`CalcError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The equation text is not a syntactically valid expression
    Parse,
    /// Valid syntax, but forbidden names, nodes, opcodes or arguments
    Validation,
    /// A value does not fit the target element type
    TypeRange,
    /// The instruction stream would under/overflow the evaluation stack
    Stack,
}

/// Why an arithmetic step faulted at run time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultReason {
    /// Result is not representable in the target type
    Overflow,
    /// Integer division or modulo by zero
    DivisionByZero,
    /// Integer power with a negative exponent
    NegativeExponent,
    /// Floating operation produced NaN or infinity from finite inputs
    NonFinite,
}

impl fmt::Display for FaultReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FaultReason::Overflow => "arithmetic overflow",
            FaultReason::DivisionByZero => "division by zero",
            FaultReason::NegativeExponent => "negative integer exponent",
            FaultReason::NonFinite => "non-finite result",
        };
        f.write_str(text)
    }
}

/// Errors produced while compiling or executing an equation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    // Parse errors
    #[error("Equation cannot be empty")]
    EmptyEquation,

    #[error("Invalid syntax: {msg} near '{fragment}'{span}")]
    InvalidSyntax {
        msg: String,
        fragment: String,
        span: Span,
    },

    #[error("Unbalanced parentheses: {opening} opening vs {closing} closing")]
    UnbalancedParentheses { opening: usize, closing: usize },

    #[error("Illegal character '{ch}'{span}")]
    IllegalCharacter { ch: char, span: Span },

    // Validation errors
    #[error("Expression contains a forbidden construct: {0}")]
    ForbiddenNode(String),

    #[error("Unsupported function(s): {}", .0.join(", "))]
    UnsupportedFunction(Vec<String>),

    #[error("'{name}' takes {expected} argument(s), got {got}")]
    WrongArity {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Name '{0}' is reserved and cannot be used as a variable")]
    ReservedName(String),

    #[error("'{0}' is not a valid variable name")]
    InvalidName(String),

    #[error("Undefined variable(s): {}", .0.join(", "))]
    UndefinedVariable(Vec<String>),

    #[error("Declared parameter(s) never used: {}", .0.join(", "))]
    UnusedVariable(Vec<String>),

    #[error("Parameter '{0}' is declared more than once or reuses the array element name")]
    DuplicateParameter(String),

    #[error("Operation(s) not supported for {target} arrays: {}", .ops.join(", "))]
    IllegalOperation {
        target: &'static str,
        ops: Vec<String>,
    },

    #[error("Operation(s) unavailable on this target: {}", .0.join(", "))]
    UnavailableOperation(Vec<String>),

    #[error("No equation has been compiled")]
    NotCompiled,

    #[error("Invalid execution arguments: {0}")]
    InvalidArguments(String),

    // Type/range errors
    #[error("Constant '{literal}' is out of range for {target}")]
    ConstantOutOfRange {
        literal: String,
        target: &'static str,
    },

    #[error("Parameter {index} ({value}) is out of range for {target}")]
    ParameterOutOfRange {
        index: usize,
        value: String,
        target: &'static str,
    },

    #[error("{reason} in '{op}' at element {index}")]
    ArithmeticFault {
        index: usize,
        op: &'static str,
        reason: FaultReason,
    },

    // Stack errors
    #[error("Stack underflow at instruction {position}")]
    StackUnderflow { position: usize },

    #[error("Stack depth {depth} exceeds limit {limit}")]
    StackOverflow { depth: usize, limit: usize },

    #[error("Program leaves {remaining} values on the stack instead of 1")]
    StackImbalance { remaining: isize },
}

impl CalcError {
    /// Classify this error into one of the four error kinds.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalcError::EmptyEquation
            | CalcError::InvalidSyntax { .. }
            | CalcError::UnbalancedParentheses { .. }
            | CalcError::IllegalCharacter { .. } => ErrorKind::Parse,

            CalcError::ForbiddenNode(_)
            | CalcError::UnsupportedFunction(_)
            | CalcError::WrongArity { .. }
            | CalcError::ReservedName(_)
            | CalcError::InvalidName(_)
            | CalcError::UndefinedVariable(_)
            | CalcError::UnusedVariable(_)
            | CalcError::DuplicateParameter(_)
            | CalcError::IllegalOperation { .. }
            | CalcError::UnavailableOperation(_)
            | CalcError::NotCompiled
            | CalcError::InvalidArguments(_) => ErrorKind::Validation,

            CalcError::ConstantOutOfRange { .. }
            | CalcError::ParameterOutOfRange { .. }
            | CalcError::ArithmeticFault { .. } => ErrorKind::TypeRange,

            CalcError::StackUnderflow { .. }
            | CalcError::StackOverflow { .. }
            | CalcError::StackImbalance { .. } => ErrorKind::Stack,
        }
    }

    /// Create InvalidSyntax, capturing the offending fragment of `source`
    pub(crate) fn syntax_at(msg: impl Into<String>, source: &str, span: Span) -> Self {
        CalcError::InvalidSyntax {
            msg: msg.into(),
            fragment: span.fragment(source).to_owned(),
            span,
        }
    }

    /// Element index of a run-time fault, if this is one
    pub fn fault_index(&self) -> Option<usize> {
        match self {
            CalcError::ArithmeticFault { index, .. } => Some(*index),
            _ => None,
        }
    }
}
