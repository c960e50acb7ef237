use crate::ast::Literal;
use crate::error::Span;

/// Keywords of the host expression language. `and`, `or` and `not` lex as
/// operators; `if`/`else` are recognized by the parser; every other one is
/// rejected wherever it appears.
pub(crate) const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global",
    "if", "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise",
    "return", "try", "while", "with", "yield",
];

/// Whether `name` is a reserved keyword
pub(crate) fn is_keyword(name: &str) -> bool {
    KEYWORDS.contains(&name)
}

/// Token types produced by the lexer
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Number(Literal),
    Str(String),
    Identifier(String),
    Keyword(&'static str),
    Operator(Operator),
    LeftParen,
    RightParen,
    Comma,
    Dot,
}

/// A token together with its location in the equation text
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    DoubleStar,
    LShift,
    RShift,
    Amp,
    Pipe,
    Caret,
    Tilde,
    EqEq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    And,
    Or,
    Not,
}

impl Operator {
    /// Binding power when used as an infix operator, `None` for prefix-only ones
    pub(crate) fn infix_power(self) -> Option<u8> {
        let bp = match self {
            Operator::Or => 1,
            Operator::And => 2,
            Operator::EqEq
            | Operator::NotEq
            | Operator::Lt
            | Operator::LtE
            | Operator::Gt
            | Operator::GtE => 4,
            Operator::Pipe => 5,
            Operator::Caret => 6,
            Operator::Amp => 7,
            Operator::LShift | Operator::RShift => 8,
            Operator::Plus | Operator::Minus => 9,
            Operator::Star | Operator::Slash | Operator::DoubleSlash | Operator::Percent => 10,
            Operator::DoubleStar => 12,
            Operator::Tilde | Operator::Not => return None,
        };
        Some(bp)
    }

    pub(crate) fn is_comparison(self) -> bool {
        self.infix_power() == Some(4)
    }

    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Star => "*",
            Operator::Slash => "/",
            Operator::DoubleSlash => "//",
            Operator::Percent => "%",
            Operator::DoubleStar => "**",
            Operator::LShift => "<<",
            Operator::RShift => ">>",
            Operator::Amp => "&",
            Operator::Pipe => "|",
            Operator::Caret => "^",
            Operator::Tilde => "~",
            Operator::EqEq => "==",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::LtE => "<=",
            Operator::Gt => ">",
            Operator::GtE => ">=",
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Not => "not",
        }
    }
}

impl Token {
    /// Convert token to a user-friendly description for error messages
    pub(crate) fn to_user_string(&self) -> String {
        match self {
            Token::Number(n) => format!("number {n}"),
            Token::Str(_) => "string literal".to_string(),
            Token::Identifier(s) => format!("name '{s}'"),
            Token::Keyword(k) => format!("keyword '{k}'"),
            Token::Operator(op) => format!("operator '{}'", op.symbol()),
            Token::LeftParen => "'('".to_string(),
            Token::RightParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Dot => "'.'".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_powers_ordered() {
        let low_to_high = [
            Operator::Or,
            Operator::And,
            Operator::EqEq,
            Operator::Pipe,
            Operator::Caret,
            Operator::Amp,
            Operator::LShift,
            Operator::Plus,
            Operator::Star,
            Operator::DoubleStar,
        ];
        for pair in low_to_high.windows(2) {
            assert!(pair[0].infix_power() < pair[1].infix_power(), "{pair:?}");
        }
        assert_eq!(Operator::Tilde.infix_power(), None);
        assert!(Operator::GtE.is_comparison());
        assert!(!Operator::Amp.is_comparison());
    }

    #[test]
    fn test_keywords() {
        assert!(is_keyword("lambda"));
        assert!(is_keyword("None"));
        assert!(!is_keyword("x"));
        assert!(!is_keyword("math"));
    }
}
