//! Abstract Syntax Tree for array equations
//!
//! The grammar is small and closed, so the tree is a plain sum type that
//! every pass matches exhaustively.

use std::fmt;

use crate::functions::OpCode;

/// A numeric literal as written in the equation text.
///
/// Integers are kept exact (up to 128 bits) so that range checks against
/// the target element type see the real value, not a rounded float.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal {
    Int(i128),
    Float(f64),
}

impl Literal {
    /// Arithmetic negation of the literal.
    #[must_use]
    pub fn negate(self) -> Self {
        match self {
            // i128::MIN never comes out of the lexer
            Literal::Int(v) => v
                .checked_neg()
                .map_or(Literal::Float(-(v as f64)), Literal::Int),
            Literal::Float(v) => Literal::Float(-v),
        }
    }

    /// The literal as a float, for display and float targets.
    #[allow(
        clippy::cast_precision_loss,
        reason = "Float targets accept the nearest representable value"
    )]
    pub fn as_f64(self) -> f64 {
        match self {
            Literal::Int(v) => v as f64,
            Literal::Float(v) => v,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{v}"),
            Literal::Float(v) => write!(f, "{v:?}"),
        }
    }
}

macro_rules! literal_from {
    (int: $($t:ty),*) => {
        $(impl From<$t> for Literal {
            fn from(v: $t) -> Self {
                Literal::Int(i128::from(v))
            }
        })*
    };
    (float: $($t:ty),*) => {
        $(impl From<$t> for Literal {
            fn from(v: $t) -> Self {
                Literal::Float(f64::from(v))
            }
        })*
    };
}

literal_from!(int: i8, i16, i32, i64, u8, u16, u32, u64);
literal_from!(float: f32, f64);

/// Unary operators: `+x`, `-x`, `~x`, `not x`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Invert,
    Not,
}

/// Arithmetic and bitwise binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    LShift,
    RShift,
    BitAnd,
    BitOr,
    BitXor,
}

/// Comparison operators, evaluating to 1 or 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
}

/// Boolean connectives, evaluating to 1 or 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

impl UnaryOp {
    pub(crate) fn opcode(self) -> OpCode {
        match self {
            UnaryOp::Plus => OpCode::UAdd,
            UnaryOp::Minus => OpCode::USub,
            UnaryOp::Invert => OpCode::Invert,
            UnaryOp::Not => OpCode::Not,
        }
    }
}

impl BinaryOp {
    pub(crate) fn opcode(self) -> OpCode {
        match self {
            BinaryOp::Add => OpCode::Add,
            BinaryOp::Sub => OpCode::Sub,
            BinaryOp::Mul => OpCode::Mult,
            BinaryOp::Div => OpCode::Div,
            BinaryOp::FloorDiv => OpCode::FloorDiv,
            BinaryOp::Mod => OpCode::Mod,
            BinaryOp::Pow => OpCode::Pow,
            BinaryOp::LShift => OpCode::LShift,
            BinaryOp::RShift => OpCode::RShift,
            BinaryOp::BitAnd => OpCode::BitAnd,
            BinaryOp::BitOr => OpCode::BitOr,
            BinaryOp::BitXor => OpCode::BitXor,
        }
    }
}

impl CompareOp {
    pub(crate) fn opcode(self) -> OpCode {
        match self {
            CompareOp::Eq => OpCode::Eq,
            CompareOp::NotEq => OpCode::Ne,
            CompareOp::Lt => OpCode::Lt,
            CompareOp::LtE => OpCode::Le,
            CompareOp::Gt => OpCode::Gt,
            CompareOp::GtE => OpCode::Ge,
        }
    }
}

impl BoolOp {
    pub(crate) fn opcode(self) -> OpCode {
        match self {
            BoolOp::And => OpCode::And,
            BoolOp::Or => OpCode::Or,
        }
    }
}

/// A node of the parsed equation.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Top-level wrapper; exactly one per parsed equation
    Expression(Box<Node>),
    Number(Literal),
    /// String literal; parsed so it can be reported, never permitted
    Str(String),
    Name(String),
    /// `value.attr`, only meaningful as `math.<name>`
    Attribute {
        value: Box<Node>,
        attr: String,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Compare {
        op: CompareOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    BoolOp {
        op: BoolOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Call {
        func: Box<Node>,
        args: Vec<Node>,
    },
    /// `body if test else orelse`; parsed so it can be reported, never permitted
    IfExp {
        test: Box<Node>,
        body: Box<Node>,
        orelse: Box<Node>,
    },
}

impl Node {
    pub(crate) fn name(name: impl Into<String>) -> Self {
        Node::Name(name.into())
    }

    pub(crate) fn unary(op: UnaryOp, operand: Node) -> Self {
        Node::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub(crate) fn binary(op: BinaryOp, left: Node, right: Node) -> Self {
        Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Short node-kind label used in error messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Expression(_) => "expression",
            Node::Number(_) => "number",
            Node::Str(_) => "string literal",
            Node::Name(_) => "name",
            Node::Attribute { .. } => "attribute",
            Node::Unary { .. } => "unary operator",
            Node::Binary { .. } => "binary operator",
            Node::Compare { .. } => "comparison",
            Node::BoolOp { .. } => "boolean operator",
            Node::Call { .. } => "function call",
            Node::IfExp { .. } => "conditional expression",
        }
    }

    /// Resolved name of a callable or attribute reference:
    /// `abs` for a bare name, `math.sin` for a member reference.
    /// Returns `None` for anything that is not a plain dotted name.
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            Node::Name(n) => Some(n.clone()),
            Node::Attribute { value, attr } => match value.as_ref() {
                Node::Name(module) => Some(format!("{module}.{attr}")),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_negate() {
        assert_eq!(Literal::Int(128).negate(), Literal::Int(-128));
        assert_eq!(Literal::Float(2.5).negate(), Literal::Float(-2.5));
        assert_eq!(Literal::Int(5).negate().negate(), Literal::Int(5));
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(Literal::Int(-7).to_string(), "-7");
        assert_eq!(Literal::Float(1.0).to_string(), "1.0");
        assert_eq!(Literal::from(3u8), Literal::Int(3));
        assert_eq!(Literal::from(0.5f32), Literal::Float(0.5));
    }

    #[test]
    fn test_dotted_name() {
        let attr = Node::Attribute {
            value: Box::new(Node::name("math")),
            attr: "sin".to_string(),
        };
        assert_eq!(attr.dotted_name().as_deref(), Some("math.sin"));
        assert_eq!(Node::name("abs").dotted_name().as_deref(), Some("abs"));
        assert_eq!(Node::Number(Literal::Int(1)).dotted_name(), None);
    }
}
