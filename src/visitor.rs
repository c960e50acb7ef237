//! Node visitor pattern for AST traversal
//!
//! Provides a clean interface for walking the equation tree without
//! manually handling the recursive structure.

use crate::ast::{Literal, Node};

/// Trait for visiting equation nodes in the AST
///
/// Each method returns a boolean indicating whether to continue visiting children.
/// Every method has a default that keeps walking, so visitors only override
/// the node kinds they care about.
///
/// # Example
/// ```
/// use arraycalc::{parse, visitor::{NodeVisitor, walk_node}};
///
/// struct CallCounter { count: usize }
///
/// impl NodeVisitor for CallCounter {
///     fn visit_call(&mut self, _func: &arraycalc::Node, _args: &[arraycalc::Node]) -> bool {
///         self.count += 1;
///         true
///     }
/// }
///
/// let tree = parse("abs(x) + math.sin(abs(y))").unwrap();
/// let mut counter = CallCounter { count: 0 };
/// walk_node(&tree, &mut counter);
/// assert_eq!(counter.count, 3);
/// ```
pub trait NodeVisitor {
    /// Visit the top-level expression wrapper
    fn visit_expression(&mut self, _inner: &Node) -> bool {
        true
    }

    /// Visit a number literal
    fn visit_number(&mut self, _value: Literal) {}

    /// Visit a string literal
    fn visit_str(&mut self, _value: &str) {}

    /// Visit a bare name reference
    fn visit_name(&mut self, _name: &str) {}

    /// Visit a member access such as `math.pi`, returns true to visit the value
    fn visit_attribute(&mut self, _value: &Node, _attr: &str) -> bool {
        true
    }

    /// Visit any unary/binary/comparison/boolean operator, returns true to visit operands
    fn visit_operator(&mut self, _node: &Node) -> bool {
        true
    }

    /// Visit a function call, returns true to visit the callee and arguments
    fn visit_call(&mut self, _func: &Node, _args: &[Node]) -> bool {
        true
    }

    /// Visit a conditional expression, returns true to visit its branches
    fn visit_if(&mut self, _node: &Node) -> bool {
        true
    }
}

/// Walk an equation tree with a visitor
///
/// Visits nodes in pre-order (parent before children), left to right.
pub fn walk_node<V: NodeVisitor>(node: &Node, visitor: &mut V) {
    match node {
        Node::Expression(inner) => {
            if visitor.visit_expression(inner) {
                walk_node(inner, visitor);
            }
        }
        Node::Number(n) => visitor.visit_number(*n),
        Node::Str(s) => visitor.visit_str(s),
        Node::Name(n) => visitor.visit_name(n),
        Node::Attribute { value, attr } => {
            if visitor.visit_attribute(value, attr) {
                walk_node(value, visitor);
            }
        }
        Node::Unary { operand, .. } => {
            if visitor.visit_operator(node) {
                walk_node(operand, visitor);
            }
        }
        Node::Binary { left, right, .. }
        | Node::Compare { left, right, .. }
        | Node::BoolOp { left, right, .. } => {
            if visitor.visit_operator(node) {
                walk_node(left, visitor);
                walk_node(right, visitor);
            }
        }
        Node::Call { func, args } => {
            if visitor.visit_call(func, args) {
                walk_node(func, visitor);
                for arg in args {
                    walk_node(arg, visitor);
                }
            }
        }
        Node::IfExp { test, body, orelse } => {
            if visitor.visit_if(node) {
                walk_node(body, visitor);
                walk_node(test, visitor);
                walk_node(orelse, visitor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    struct NameCollector {
        names: Vec<String>,
    }

    impl NodeVisitor for NameCollector {
        fn visit_name(&mut self, name: &str) {
            self.names.push(name.to_string());
        }
    }

    #[test]
    fn test_walk_preorder_left_to_right() {
        let tree = parse("a * (b - c) + d").unwrap();
        let mut collector = NameCollector { names: Vec::new() };
        walk_node(&tree, &mut collector);
        assert_eq!(collector.names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_skip_children() {
        struct SkipCalls {
            names: usize,
        }
        impl NodeVisitor for SkipCalls {
            fn visit_name(&mut self, _name: &str) {
                self.names += 1;
            }
            fn visit_call(&mut self, _func: &Node, _args: &[Node]) -> bool {
                false
            }
        }

        let tree = parse("x + abs(y)").unwrap();
        let mut v = SkipCalls { names: 0 };
        walk_node(&tree, &mut v);
        assert_eq!(v.names, 1);
    }
}
