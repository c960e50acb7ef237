//! Expression analyzer: parse, validate, and flatten an equation into an
//! ordered list of raw stack operations.
//!
//! Flattening captures nodes in pre-order (operator before operands, left
//! to right) and returns the reverse. The result is postfix order with the
//! first operand pushed last, so it sits on top of the stack when the
//! operator runs.

use rustc_hash::FxHashSet;

use crate::ast::{Literal, Node};
use crate::error::CalcError;
use crate::functions::{OpCode, RESERVED_NAMES, is_callable, lookup, math_constant};
use crate::parser::parse;
use crate::visitor::{NodeVisitor, walk_node};

/// Operand attached to a push operation
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    /// Variable reference, before register allocation
    Name(String),
    /// Numeric literal, before conversion to the element type
    Literal(Literal),
    /// Variable reference after register allocation
    Register(u32),
}

/// One analyzer step before register and constant resolution
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawOperation {
    pub op: OpCode,
    pub param: Option<Operand>,
    pub is_call: bool,
}

impl RawOperation {
    fn plain(op: OpCode) -> Self {
        Self {
            op,
            param: None,
            is_call: false,
        }
    }

    pub(crate) fn constant(lit: Literal) -> Self {
        Self {
            op: OpCode::PushConst,
            param: Some(Operand::Literal(lit)),
            is_call: false,
        }
    }

    pub(crate) fn literal(&self) -> Option<Literal> {
        match self.param {
            Some(Operand::Literal(lit)) => Some(lit),
            _ => None,
        }
    }
}

/// Parse and validate `equation`, returning its operations in program order.
pub(crate) fn analyze(equation: &str, element_name: &str) -> Result<Vec<RawOperation>, CalcError> {
    let tree = parse(equation)?;
    validate_nodes(&tree)?;
    validate_calls(&tree)?;

    let mut ops = Vec::new();
    flatten(&tree, element_name, &mut ops)?;
    ops.reverse();
    Ok(ops)
}

/// Rejects node kinds outside the permitted grammar
#[derive(Default)]
struct NodeChecker {
    expressions: usize,
    forbidden: Option<String>,
}

impl NodeChecker {
    fn forbid(&mut self, what: String) {
        self.forbidden.get_or_insert(what);
    }
}

impl NodeVisitor for NodeChecker {
    fn visit_expression(&mut self, _inner: &Node) -> bool {
        self.expressions += 1;
        true
    }

    fn visit_str(&mut self, value: &str) {
        self.forbid(format!("string literal '{value}'"));
    }

    fn visit_attribute(&mut self, value: &Node, attr: &str) -> bool {
        if !matches!(value, Node::Name(module) if module == "math") {
            self.forbid(format!("member access '.{attr}' on a {}", value.kind_name()));
        }
        false
    }

    fn visit_if(&mut self, node: &Node) -> bool {
        self.forbid(node.kind_name().to_string());
        false
    }
}

fn validate_nodes(tree: &Node) -> Result<(), CalcError> {
    let mut checker = NodeChecker::default();
    walk_node(tree, &mut checker);
    if let Some(what) = checker.forbidden {
        return Err(CalcError::ForbiddenNode(what));
    }
    if checker.expressions != 1 {
        return Err(CalcError::ForbiddenNode(format!(
            "{} top-level expressions",
            checker.expressions
        )));
    }
    Ok(())
}

/// Collects resolved call names that are not on the whitelist
#[derive(Default)]
struct CallChecker {
    unsupported: Vec<String>,
    seen: FxHashSet<String>,
    computed_callee: Option<&'static str>,
}

impl NodeVisitor for CallChecker {
    fn visit_call(&mut self, func: &Node, _args: &[Node]) -> bool {
        match func.dotted_name() {
            Some(name) if is_callable(&name) => {}
            Some(name) => {
                if self.seen.insert(name.clone()) {
                    self.unsupported.push(name);
                }
            }
            None => {
                self.computed_callee.get_or_insert(func.kind_name());
            }
        }
        true
    }
}

fn validate_calls(tree: &Node) -> Result<(), CalcError> {
    let mut checker = CallChecker::default();
    walk_node(tree, &mut checker);
    if let Some(kind) = checker.computed_callee {
        return Err(CalcError::ForbiddenNode(format!("call of a {kind}")));
    }
    if !checker.unsupported.is_empty() {
        return Err(CalcError::UnsupportedFunction(checker.unsupported));
    }
    Ok(())
}

fn flatten(node: &Node, element_name: &str, ops: &mut Vec<RawOperation>) -> Result<(), CalcError> {
    match node {
        Node::Expression(inner) => flatten(inner, element_name, ops),
        Node::Number(lit) => {
            ops.push(RawOperation::constant(*lit));
            Ok(())
        }
        Node::Name(name) if name == element_name => {
            ops.push(RawOperation::plain(OpCode::PushArray));
            Ok(())
        }
        Node::Name(name) if RESERVED_NAMES.contains(&name.as_str()) => Err(
            CalcError::ForbiddenNode(format!("'{name}' cannot be used as a value")),
        ),
        Node::Name(name) => {
            ops.push(RawOperation {
                op: OpCode::PushVar,
                param: Some(Operand::Name(name.clone())),
                is_call: false,
            });
            Ok(())
        }
        Node::Attribute { attr, .. } => match math_constant(attr) {
            Some(v) => {
                ops.push(RawOperation::constant(Literal::Float(v)));
                Ok(())
            }
            None => Err(CalcError::ForbiddenNode(format!(
                "'math.{attr}' cannot be used as a value"
            ))),
        },
        Node::Unary { op, operand } => {
            ops.push(RawOperation::plain(op.opcode()));
            flatten(operand, element_name, ops)
        }
        Node::Binary { op, left, right } => {
            ops.push(RawOperation::plain(op.opcode()));
            flatten(left, element_name, ops)?;
            flatten(right, element_name, ops)
        }
        Node::Compare { op, left, right } => {
            ops.push(RawOperation::plain(op.opcode()));
            flatten(left, element_name, ops)?;
            flatten(right, element_name, ops)
        }
        Node::BoolOp { op, left, right } => {
            ops.push(RawOperation::plain(op.opcode()));
            flatten(left, element_name, ops)?;
            flatten(right, element_name, ops)
        }
        Node::Call { func, args } => {
            let name = func.dotted_name().unwrap_or_default();
            let descriptor =
                lookup(&name).ok_or_else(|| CalcError::UnsupportedFunction(vec![name.clone()]))?;
            if args.len() != descriptor.arity() {
                return Err(CalcError::WrongArity {
                    name,
                    expected: descriptor.arity(),
                    got: args.len(),
                });
            }
            ops.push(RawOperation {
                op: descriptor.op,
                param: None,
                is_call: true,
            });
            for arg in args {
                flatten(arg, element_name, ops)?;
            }
            Ok(())
        }
        Node::Str(_) | Node::IfExp { .. } => {
            Err(CalcError::ForbiddenNode(node.kind_name().to_string()))
        }
    }
}
