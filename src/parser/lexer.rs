//! Lexer for equation text
//!
//! Equations are ASCII only. Every token carries its byte span so parse
//! errors can point back into the source.

use crate::ast::Literal;
use crate::error::{CalcError, Span};
use crate::parser::tokens::{KEYWORDS, Operator, Spanned, Token};

/// Split `input` into tokens.
pub(crate) fn lex(input: &str) -> Result<Vec<Spanned>, CalcError> {
    let mut lexer = Lexer {
        source: input,
        bytes: input.as_bytes(),
        pos: 0,
    };
    // Rough heuristic: one token per two bytes
    let mut tokens = Vec::with_capacity(input.len() / 2 + 1);
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl Lexer<'_> {
    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn error(&self, msg: &str, start: usize) -> CalcError {
        CalcError::syntax_at(msg, self.source, Span::new(start, self.pos.max(start + 1)))
    }

    fn eat_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.peek().is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn next_token(&mut self) -> Result<Option<Spanned>, CalcError> {
        self.eat_while(|b| b.is_ascii_whitespace());
        let start = self.pos;
        let Some(b) = self.peek() else {
            return Ok(None);
        };

        let token = match b {
            b'0'..=b'9' => Token::Number(self.lex_number()?),
            b'.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => {
                Token::Number(self.lex_number()?)
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.lex_word(),
            b'\'' | b'"' => Token::Str(self.lex_string(b)?),
            b'(' => self.single(Token::LeftParen),
            b')' => self.single(Token::RightParen),
            b',' => self.single(Token::Comma),
            b'.' => self.single(Token::Dot),
            _ if !b.is_ascii() => {
                self.pos += 1;
                return Err(self.error("non-ASCII character", start));
            }
            _ => Token::Operator(self.lex_operator()?),
        };

        Ok(Some(Spanned {
            token,
            span: Span::new(start, self.pos),
        }))
    }

    fn single(&mut self, token: Token) -> Token {
        self.pos += 1;
        token
    }

    fn lex_word(&mut self) -> Token {
        let start = self.pos;
        self.eat_while(|b| b.is_ascii_alphanumeric() || b == b'_');
        let word = &self.source[start..self.pos];
        match word {
            "and" => Token::Operator(Operator::And),
            "or" => Token::Operator(Operator::Or),
            "not" => Token::Operator(Operator::Not),
            _ => match KEYWORDS.iter().copied().find(|k| *k == word) {
                Some(k) => Token::Keyword(k),
                None => Token::Identifier(word.to_string()),
            },
        }
    }

    fn lex_string(&mut self, quote: u8) -> Result<String, CalcError> {
        let start = self.pos;
        self.pos += 1;
        self.eat_while(|b| b != quote && b != b'\n');
        if self.peek() != Some(quote) {
            return Err(self.error("unterminated string literal", start));
        }
        let text = self.source[start + 1..self.pos].to_string();
        self.pos += 1;
        Ok(text)
    }

    fn lex_operator(&mut self) -> Result<Operator, CalcError> {
        let start = self.pos;
        let (op, len) = match (self.peek().unwrap_or(0), self.peek_at(1)) {
            (b'*', Some(b'*')) => (Operator::DoubleStar, 2),
            (b'/', Some(b'/')) => (Operator::DoubleSlash, 2),
            (b'<', Some(b'<')) => (Operator::LShift, 2),
            (b'>', Some(b'>')) => (Operator::RShift, 2),
            (b'<', Some(b'=')) => (Operator::LtE, 2),
            (b'>', Some(b'=')) => (Operator::GtE, 2),
            (b'=', Some(b'=')) => (Operator::EqEq, 2),
            (b'!', Some(b'=')) => (Operator::NotEq, 2),
            (b'+', _) => (Operator::Plus, 1),
            (b'-', _) => (Operator::Minus, 1),
            (b'*', _) => (Operator::Star, 1),
            (b'/', _) => (Operator::Slash, 1),
            (b'%', _) => (Operator::Percent, 1),
            (b'&', _) => (Operator::Amp, 1),
            (b'|', _) => (Operator::Pipe, 1),
            (b'^', _) => (Operator::Caret, 1),
            (b'~', _) => (Operator::Tilde, 1),
            (b'<', _) => (Operator::Lt, 1),
            (b'>', _) => (Operator::Gt, 1),
            (b'=', _) => {
                self.pos += 1;
                return Err(self.error("assignment is not allowed in an equation", start));
            }
            _ => {
                self.pos += 1;
                return Err(self.error("unexpected character", start));
            }
        };
        self.pos += len;
        Ok(op)
    }

    fn lex_number(&mut self) -> Result<Literal, CalcError> {
        let start = self.pos;

        let radix = match (self.peek(), self.peek_at(1)) {
            (Some(b'0'), Some(b'x' | b'X')) => Some(16),
            (Some(b'0'), Some(b'o' | b'O')) => Some(8),
            (Some(b'0'), Some(b'b' | b'B')) => Some(2),
            _ => None,
        };

        let literal = if let Some(radix) = radix {
            self.pos += 2;
            let digits_start = self.pos;
            self.eat_while(|b| b.is_ascii_alphanumeric() || b == b'_');
            let text = &self.source[digits_start..self.pos];
            let digits: String = text.chars().filter(|c| *c != '_').collect();
            if digits.is_empty()
                || text.ends_with('_')
                || text.contains("__")
                || !digits.chars().all(|c| c.is_digit(radix))
            {
                return Err(self.error("invalid integer literal", start));
            }
            i128::from_str_radix(&digits, radix).map_or_else(
                |_| Literal::Float(wide_radix_value(&digits, radix)),
                Literal::Int,
            )
        } else {
            let mut is_float = false;
            self.eat_while(|b| b.is_ascii_digit() || b == b'_');
            if self.peek() == Some(b'.') {
                is_float = true;
                self.pos += 1;
                self.eat_while(|b| b.is_ascii_digit() || b == b'_');
            }
            if matches!(self.peek(), Some(b'e' | b'E')) {
                let exp_digit_at = match self.peek_at(1) {
                    Some(b'+' | b'-') => 2,
                    _ => 1,
                };
                if self.peek_at(exp_digit_at).is_some_and(|b| b.is_ascii_digit()) {
                    is_float = true;
                    self.pos += exp_digit_at;
                    self.eat_while(|b| b.is_ascii_digit() || b == b'_');
                }
            }
            let text = &self.source[start..self.pos];
            if !underscores_well_placed(text) {
                return Err(self.error("invalid number literal", start));
            }
            let cleaned: String = text.chars().filter(|c| *c != '_').collect();
            if is_float {
                cleaned
                    .parse::<f64>()
                    .map(Literal::Float)
                    .map_err(|_| self.error("invalid number literal", start))?
            } else {
                match cleaned.parse::<i128>() {
                    Ok(v) => Literal::Int(v),
                    // Too wide for 128 bits; keep the magnitude as a float
                    Err(_) => cleaned
                        .parse::<f64>()
                        .map(Literal::Float)
                        .map_err(|_| self.error("invalid number literal", start))?,
                }
            }
        };

        if self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
        {
            self.eat_while(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.');
            return Err(self.error("invalid number literal", start));
        }
        Ok(literal)
    }
}

/// Every `_` must sit between two digits
fn underscores_well_placed(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.iter().enumerate().all(|(i, b)| {
        *b != b'_'
            || (i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
    })
}

fn wide_radix_value(digits: &str, radix: u32) -> f64 {
    digits
        .chars()
        .filter_map(|c| c.to_digit(radix))
        .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d))
}
