use crate::ast::{BinaryOp, BoolOp, CompareOp, Node, UnaryOp};
use crate::error::{CalcError, Span};
use crate::parser::tokens::{Operator, Spanned, Token};

/// Binding power of a prefix `not`
const NOT_POWER: u8 = 3;
/// Binding power of the operand of a prefix `+`, `-` or `~`
const UNARY_POWER: u8 = 11;
/// Deepest chain of nested parentheses, calls and prefix operators
pub(crate) const MAX_NESTING: usize = 200;
/// Tallest tree the parser will build; later passes walk it recursively
pub(crate) const MAX_TREE_HEIGHT: usize = 1000;

/// A parsed subtree and its height
type Parsed = (Node, usize);

/// Parse tokens into an AST using Pratt parsing algorithm
pub(crate) fn parse_expression(tokens: &[Spanned], source: &str) -> Result<Node, CalcError> {
    if tokens.is_empty() {
        return Err(CalcError::EmptyEquation);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        source,
        nesting: 0,
    };

    let (expr, _) = parser.parse_full()?;
    if let Some(extra) = parser.current() {
        return Err(parser.unexpected(extra, "end of equation"));
    }
    Ok(Node::Expression(Box::new(expr)))
}

struct Parser<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    source: &'a str,
    /// Active recursive descents
    nesting: usize,
}

impl<'a> Parser<'a> {
    fn current(&self) -> Option<&'a Spanned> {
        self.tokens.get(self.pos)
    }

    fn current_token(&self) -> Option<&'a Token> {
        self.current().map(|s| &s.token)
    }

    fn current_span(&self) -> Span {
        match self.current() {
            Some(s) => s.span,
            None => {
                let end = self.source.trim_end().len();
                Span::new(end.saturating_sub(1), end)
            }
        }
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn unexpected(&self, got: &Spanned, expected: &str) -> CalcError {
        CalcError::syntax_at(
            format!("expected {expected}, found {}", got.token.to_user_string()),
            self.source,
            got.span,
        )
    }

    fn end_of_input(&self, expected: &str) -> CalcError {
        CalcError::syntax_at(
            format!("expected {expected}, found end of equation"),
            self.source,
            self.current_span(),
        )
    }

    fn too_deep(&self, at: Span) -> CalcError {
        CalcError::syntax_at("expression nested too deeply", self.source, at)
    }

    fn expect(&mut self, token: &Token, expected: &str) -> Result<(), CalcError> {
        match self.current() {
            Some(s) if s.token == *token => {
                self.advance();
                Ok(())
            }
            Some(s) => Err(self.unexpected(s, expected)),
            None => Err(self.end_of_input(expected)),
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self.current_token(), Some(Token::Keyword(k)) if *k == keyword)
    }

    /// Run `f` one recursion level deeper, failing past [`MAX_NESTING`]
    fn nested<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, CalcError>,
    ) -> Result<R, CalcError> {
        if self.nesting >= MAX_NESTING {
            return Err(self.too_deep(self.current_span()));
        }
        self.nesting += 1;
        let result = f(self);
        self.nesting -= 1;
        result
    }

    /// Wrap a new parent node, failing if the tree grows past [`MAX_TREE_HEIGHT`]
    fn grow(&self, node: Node, child_height: usize, at: Span) -> Result<Parsed, CalcError> {
        let height = child_height + 1;
        if height > MAX_TREE_HEIGHT {
            return Err(self.too_deep(at));
        }
        Ok((node, height))
    }

    /// An expression including the conditional form `a if c else b`
    fn parse_full(&mut self) -> Result<Parsed, CalcError> {
        self.nested(|p| {
            let (body, body_height) = p.parse_expr(0)?;
            if !p.is_keyword("if") {
                return Ok((body, body_height));
            }
            let at = p.current_span();
            p.advance();
            let (test, test_height) = p.parse_expr(0)?;
            if !p.is_keyword("else") {
                return match p.current() {
                    Some(s) => Err(p.unexpected(s, "'else'")),
                    None => Err(p.end_of_input("'else'")),
                };
            }
            p.advance();
            let (orelse, orelse_height) = p.parse_full()?;
            let node = Node::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            };
            p.grow(node, body_height.max(test_height).max(orelse_height), at)
        })
    }

    fn parse_expr(&mut self, min_power: u8) -> Result<Parsed, CalcError> {
        self.nested(|p| {
            // Parse left side (prefix)
            let mut left = p.parse_prefix(min_power)?;

            // Parse operators and right side (infix)
            while let Some(Token::Operator(op)) = p.current_token() {
                let Some(power) = op.infix_power() else {
                    break;
                };
                if power < min_power {
                    break;
                }
                left = p.parse_infix(left, *op, power)?;
            }

            Ok(left)
        })
    }

    fn parse_prefix(&mut self, min_power: u8) -> Result<Parsed, CalcError> {
        let Some(spanned) = self.current() else {
            return Err(self.end_of_input("an operand"));
        };

        match &spanned.token {
            Token::Operator(Operator::Not) => {
                if min_power > NOT_POWER {
                    return Err(self.unexpected(spanned, "an operand"));
                }
                self.advance();
                let (operand, height) = self.parse_expr(NOT_POWER)?;
                self.grow(Node::unary(UnaryOp::Not, operand), height, spanned.span)
            }
            Token::Operator(op @ (Operator::Minus | Operator::Plus | Operator::Tilde)) => {
                self.advance();
                let (operand, height) = self.parse_expr(UNARY_POWER)?;
                let op = match op {
                    Operator::Minus => UnaryOp::Minus,
                    Operator::Plus => UnaryOp::Plus,
                    _ => UnaryOp::Invert,
                };
                self.grow(Node::unary(op, operand), height, spanned.span)
            }
            _ => self.parse_postfix(),
        }
    }

    /// An atom followed by any number of calls and member accesses
    fn parse_postfix(&mut self) -> Result<Parsed, CalcError> {
        let (mut node, mut height) = self.parse_atom()?;
        loop {
            let at = self.current_span();
            match self.current_token() {
                Some(Token::Dot) => {
                    self.advance();
                    match self.current() {
                        Some(Spanned {
                            token: Token::Identifier(attr),
                            ..
                        }) => {
                            self.advance();
                            let parent = Node::Attribute {
                                value: Box::new(node),
                                attr: attr.clone(),
                            };
                            (node, height) = self.grow(parent, height, at)?;
                        }
                        Some(s) => return Err(self.unexpected(s, "an attribute name")),
                        None => return Err(self.end_of_input("an attribute name")),
                    }
                }
                Some(Token::LeftParen) => {
                    self.advance(); // consume (
                    let (args, args_height) = self.parse_arguments()?;
                    self.expect(&Token::RightParen, "')'")?;
                    let parent = Node::Call {
                        func: Box::new(node),
                        args,
                    };
                    (node, height) = self.grow(parent, height.max(args_height), at)?;
                }
                _ => return Ok((node, height)),
            }
        }
    }

    fn parse_atom(&mut self) -> Result<Parsed, CalcError> {
        let Some(spanned) = self.current() else {
            return Err(self.end_of_input("an operand"));
        };

        match &spanned.token {
            Token::Number(n) => {
                self.advance();
                Ok((Node::Number(*n), 1))
            }
            Token::Str(s) => {
                self.advance();
                Ok((Node::Str(s.clone()), 1))
            }
            Token::Identifier(name) => {
                self.advance();
                Ok((Node::name(name.as_str()), 1))
            }
            Token::LeftParen => {
                self.advance(); // consume (
                if matches!(self.current_token(), Some(Token::RightParen)) {
                    return Err(self.unexpected(spanned, "an expression inside parentheses"));
                }
                let expr = self.parse_full()?;
                self.expect(&Token::RightParen, "')'")?;
                Ok(expr)
            }
            _ => Err(self.unexpected(spanned, "an operand")),
        }
    }

    /// Call arguments and the tallest of their heights
    fn parse_arguments(&mut self) -> Result<(Vec<Node>, usize), CalcError> {
        let mut args = Vec::new();
        let mut height = 0;

        loop {
            if matches!(self.current_token(), Some(Token::RightParen)) {
                break; // empty list or trailing comma
            }
            let (arg, arg_height) = self.parse_full()?;
            args.push(arg);
            height = height.max(arg_height);

            match self.current() {
                Some(Spanned {
                    token: Token::Comma,
                    ..
                }) => self.advance(),
                Some(Spanned {
                    token: Token::RightParen,
                    ..
                }) => break,
                Some(s) => return Err(self.unexpected(s, "',' or ')'")),
                None => return Err(self.end_of_input("')'")),
            }
        }

        Ok((args, height))
    }

    fn parse_infix(
        &mut self,
        (left, left_height): Parsed,
        op: Operator,
        power: u8,
    ) -> Result<Parsed, CalcError> {
        let op_span = self.current_span();
        self.advance();

        // Right associative for power, left for others
        let next_power = if op == Operator::DoubleStar {
            power
        } else {
            power + 1
        };
        let (right, right_height) = self.parse_expr(next_power)?;

        let node = match op {
            Operator::Or | Operator::And => Node::BoolOp {
                op: if op == Operator::Or {
                    BoolOp::Or
                } else {
                    BoolOp::And
                },
                left: Box::new(left),
                right: Box::new(right),
            },
            _ if op.is_comparison() => {
                if let Some(Token::Operator(next)) = self.current_token()
                    && next.is_comparison()
                {
                    return Err(CalcError::syntax_at(
                        "chained comparisons are not supported",
                        self.source,
                        op_span,
                    ));
                }
                Node::Compare {
                    op: compare_op(op),
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            _ => Node::binary(binary_op(op), left, right),
        };
        self.grow(node, left_height.max(right_height), op_span)
    }
}

fn compare_op(op: Operator) -> CompareOp {
    match op {
        Operator::EqEq => CompareOp::Eq,
        Operator::NotEq => CompareOp::NotEq,
        Operator::Lt => CompareOp::Lt,
        Operator::LtE => CompareOp::LtE,
        Operator::Gt => CompareOp::Gt,
        _ => CompareOp::GtE,
    }
}

fn binary_op(op: Operator) -> BinaryOp {
    match op {
        Operator::Plus => BinaryOp::Add,
        Operator::Minus => BinaryOp::Sub,
        Operator::Star => BinaryOp::Mul,
        Operator::Slash => BinaryOp::Div,
        Operator::DoubleSlash => BinaryOp::FloorDiv,
        Operator::Percent => BinaryOp::Mod,
        Operator::DoubleStar => BinaryOp::Pow,
        Operator::LShift => BinaryOp::LShift,
        Operator::RShift => BinaryOp::RShift,
        Operator::Amp => BinaryOp::BitAnd,
        Operator::Pipe => BinaryOp::BitOr,
        _ => BinaryOp::BitXor,
    }
}
