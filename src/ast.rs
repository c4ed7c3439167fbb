//! The compiled form of a query: an immutable expression tree.

use std::fmt;

use serde_json::Value;

use crate::lexer::TokenType;
use crate::value::SliceParams;

/// One node of the expression tree.
///
/// Children are stored in evaluation order. Operator-carrying variants keep
/// the operator as its [`TokenType`].
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// The no-op expression produced for elided projection sides.
    Identity,
    /// `@`
    CurrentNode,
    /// `$`
    RootNode,
    /// An identifier lookup.
    Field(String),
    /// `[n]`
    Index(i64),
    /// `left[inner]` where `inner` is an index, slice, filter or projection.
    IndexExpression {
        left: Box<Node>,
        right: Box<Node>,
    },
    /// `left.right`
    Subexpression {
        left: Box<Node>,
        right: Box<Node>,
    },
    /// `left | right`; stops projection propagation.
    Pipe {
        left: Box<Node>,
        right: Box<Node>,
    },
    /// `[]` applied to the child.
    Flatten(Box<Node>),
    /// `left[*].right` and friends.
    Projection {
        left: Box<Node>,
        right: Box<Node>,
    },
    /// `left.*.right`: projects over an object's values.
    ValueProjection {
        left: Box<Node>,
        right: Box<Node>,
    },
    /// `left[?condition].right`
    FilterProjection {
        left: Box<Node>,
        right: Box<Node>,
        condition: Box<Node>,
    },
    /// `[start:stop:step]`
    Slice(SliceParams),
    /// `[expr, expr, ...]`
    MultiSelectList(Vec<Node>),
    /// `{key: expr, ...}`; children are [`Node::KeyValPair`]s.
    MultiSelectHash(Vec<Node>),
    KeyValPair {
        key: String,
        value: Box<Node>,
    },
    /// `==`, `!=`, `<`, `<=`, `>`, `>=`
    Comparator {
        op: TokenType,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// `+`, `-`, `*`, `/`, `%`, `//`
    ArithmeticExpression {
        op: TokenType,
        left: Box<Node>,
        right: Box<Node>,
    },
    /// Prefix `+` / `-`.
    ArithmeticUnaryExpression {
        op: TokenType,
        operand: Box<Node>,
    },
    OrExpression {
        left: Box<Node>,
        right: Box<Node>,
    },
    AndExpression {
        left: Box<Node>,
        right: Box<Node>,
    },
    NotExpression(Box<Node>),
    /// A literal JSON value, a raw string, or a bare number.
    Literal(Value),
    FunctionExpression {
        name: String,
        args: Vec<Node>,
    },
    /// `&expr`; evaluates to an expression reference.
    ExpRef(Box<Node>),
    /// `$name`
    Variable(String),
    /// `$name = expr` inside a `let`; the first child is always a
    /// [`Node::Variable`].
    Binding {
        variable: Box<Node>,
        expr: Box<Node>,
    },
    /// The ordered binding list of a `let`.
    Bindings(Vec<Node>),
    /// `let bindings in body`
    LetExpression {
        bindings: Box<Node>,
        body: Box<Node>,
    },
}

impl Node {
    /// Renders the tree with two-space indentation, one node per block:
    ///
    /// ```text
    /// Projection {
    ///   children: {
    ///     Field {
    ///       value: "foo"
    ///     }
    ///     Identity {
    ///     }
    ///   }
    /// }
    /// ```
    pub fn pretty_print(&self) -> String {
        let mut out = String::new();
        self.pretty_into(&mut out, 0);
        out
    }

    fn pretty_into(&self, out: &mut String, indent: usize) {
        let pad = " ".repeat(indent);
        out.push_str(&format!("{pad}{} {{\n", self.kind_name()));
        if let Some(payload) = self.payload() {
            out.push_str(&format!("{pad}  value: {payload}\n"));
        }
        let children = self.children();
        if !children.is_empty() {
            out.push_str(&format!("{pad}  children: {{\n"));
            for child in &children {
                child.pretty_into(out, indent + 4);
            }
            out.push_str(&format!("{pad}  }}\n"));
        }
        out.push_str(&format!("{pad}}}\n"));
    }

    fn kind_name(&self) -> &'static str {
        match self {
            Node::Identity => "Identity",
            Node::CurrentNode => "CurrentNode",
            Node::RootNode => "RootNode",
            Node::Field(_) => "Field",
            Node::Index(_) => "Index",
            Node::IndexExpression { .. } => "IndexExpression",
            Node::Subexpression { .. } => "Subexpression",
            Node::Pipe { .. } => "Pipe",
            Node::Flatten(_) => "Flatten",
            Node::Projection { .. } => "Projection",
            Node::ValueProjection { .. } => "ValueProjection",
            Node::FilterProjection { .. } => "FilterProjection",
            Node::Slice(_) => "Slice",
            Node::MultiSelectList(_) => "MultiSelectList",
            Node::MultiSelectHash(_) => "MultiSelectHash",
            Node::KeyValPair { .. } => "KeyValPair",
            Node::Comparator { .. } => "Comparator",
            Node::ArithmeticExpression { .. } => "ArithmeticExpression",
            Node::ArithmeticUnaryExpression { .. } => "ArithmeticUnaryExpression",
            Node::OrExpression { .. } => "OrExpression",
            Node::AndExpression { .. } => "AndExpression",
            Node::NotExpression(_) => "NotExpression",
            Node::Literal(_) => "Literal",
            Node::FunctionExpression { .. } => "FunctionExpression",
            Node::ExpRef(_) => "ExpRef",
            Node::Variable(_) => "Variable",
            Node::Binding { .. } => "Binding",
            Node::Bindings(_) => "Bindings",
            Node::LetExpression { .. } => "LetExpression",
        }
    }

    fn payload(&self) -> Option<String> {
        match self {
            Node::Field(name) | Node::Variable(name) => Some(format!("{name:?}")),
            Node::FunctionExpression { name, .. } => Some(format!("{name:?}")),
            Node::KeyValPair { key, .. } => Some(format!("{key:?}")),
            Node::Index(i) => Some(i.to_string()),
            Node::Literal(value) => Some(value.to_string()),
            Node::Comparator { op, .. }
            | Node::ArithmeticExpression { op, .. }
            | Node::ArithmeticUnaryExpression { op, .. } => Some(format!("{op:?}")),
            Node::Slice(params) => {
                let part = |p: Option<i64>| p.map(|n| n.to_string()).unwrap_or_default();
                Some(format!(
                    "{}:{}:{}",
                    part(params.start),
                    part(params.stop),
                    part(params.step)
                ))
            }
            _ => None,
        }
    }

    fn children(&self) -> Vec<&Node> {
        match self {
            Node::Identity
            | Node::CurrentNode
            | Node::RootNode
            | Node::Field(_)
            | Node::Index(_)
            | Node::Slice(_)
            | Node::Literal(_)
            | Node::Variable(_) => Vec::new(),
            Node::Flatten(child) | Node::NotExpression(child) | Node::ExpRef(child) => {
                vec![child.as_ref()]
            }
            Node::ArithmeticUnaryExpression { operand, .. } => vec![operand.as_ref()],
            Node::IndexExpression { left, right }
            | Node::Subexpression { left, right }
            | Node::Pipe { left, right }
            | Node::Projection { left, right }
            | Node::ValueProjection { left, right }
            | Node::Comparator { left, right, .. }
            | Node::ArithmeticExpression { left, right, .. }
            | Node::OrExpression { left, right }
            | Node::AndExpression { left, right } => vec![left.as_ref(), right.as_ref()],
            Node::FilterProjection {
                left,
                right,
                condition,
            } => vec![left.as_ref(), right.as_ref(), condition.as_ref()],
            Node::MultiSelectList(items)
            | Node::MultiSelectHash(items)
            | Node::Bindings(items) => items.iter().collect(),
            Node::KeyValPair { value, .. } => vec![value.as_ref()],
            Node::FunctionExpression { args, .. } => args.iter().collect(),
            Node::Binding { variable, expr } => vec![variable.as_ref(), expr.as_ref()],
            Node::LetExpression { bindings, body } => vec![bindings.as_ref(), body.as_ref()],
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty_print())
    }
}
