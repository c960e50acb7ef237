//! Parser module - converts equation text to an AST
mod lexer;
mod pratt;
pub(crate) mod tokens;

use crate::ast::Node;
use crate::error::{CalcError, Span};

/// Characters that can never appear in a valid equation
pub const ILLEGAL_CHARACTERS: &[char] = &['`', '@', '#', '$', ';', ':', '[', ']', '{', '}', '\\'];

/// Parse an equation into an expression AST
///
/// The result is always a [`Node::Expression`] wrapping the parsed tree.
/// Parsing accepts a slightly wider grammar than the compiler permits
/// (string literals, conditional expressions), so that disallowed
/// constructs are reported as validation errors rather than syntax errors.
///
/// # Example
/// ```
/// use arraycalc::{parse, Node};
///
/// let tree = parse("x * 2 + math.sin(k)").unwrap();
/// assert!(matches!(tree, Node::Expression(_)));
/// ```
///
/// # Errors
/// Returns a [`CalcError`] of kind [`Parse`](crate::ErrorKind::Parse) if:
/// - The input is empty or whitespace
/// - Parentheses are unbalanced
/// - The input contains a character that is never legal
/// - The input is not a single well-formed expression
/// - Parentheses, calls or operators nest too deeply
pub fn parse(input: &str) -> Result<Node, CalcError> {
    // Pipeline: pre-check -> lex -> parse
    precheck(input)?;
    let tokens = lexer::lex(input)?;
    pratt::parse_expression(&tokens, input)
}

/// Cheap rejection filters run before tokenizing
fn precheck(input: &str) -> Result<(), CalcError> {
    if input.trim().is_empty() {
        return Err(CalcError::EmptyEquation);
    }

    let opening = input.matches('(').count();
    let closing = input.matches(')').count();
    if opening != closing {
        return Err(CalcError::UnbalancedParentheses { opening, closing });
    }

    if let Some((pos, ch)) = input
        .char_indices()
        .find(|(_, c)| ILLEGAL_CHARACTERS.contains(c))
    {
        return Err(CalcError::IllegalCharacter {
            ch,
            span: Span::at(pos),
        });
    }
    Ok(())
}
