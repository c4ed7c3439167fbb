//! A JMESPath query engine.
//!
//! An expression is compiled once into a [`Query`] and can then be
//! evaluated against any number of JSON documents:
//!
//! ```
//! use serde_json::json;
//!
//! let query = jmespath::compile("foo.bar | [0]").unwrap();
//! let data = json!({ "foo": { "bar": ["first", "second"] } });
//! assert_eq!(query.search(&data).unwrap(), json!("first"));
//! ```
//!
//! Custom functions can be layered over the default set with
//! [`FunctionRegistry::register`] and evaluated through
//! [`Query::search_with`]; entries registered under an existing name
//! replace the built-in.

pub mod ast;
pub mod bindings;
mod engine;
pub mod error;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

use std::sync::OnceLock;

use log::debug;
use serde_json::Value;

use crate::bindings::Bindings;
use crate::engine::TreeInterpreter;

pub use crate::ast::Node;
pub use crate::error::{Error, EvaluationError, SyntaxError};
pub use crate::functions::{
    default_functions, ArgSpec, ArgValue, ExpRef, ExprRuntime, FunctionEntry, FunctionRegistry,
    Handler, ParamType,
};
pub use crate::lexer::{tokenize, Token, TokenType};
pub use crate::parser::parse;

/// A compiled expression. Immutable, and safe to share across threads:
/// every [`Query::search`] call evaluates with its own bindings and result
/// values.
#[derive(Debug, Clone)]
pub struct Query {
    node: Node,
}

impl Query {
    /// Evaluates the query against `data` with the default function set.
    pub fn search(&self, data: &Value) -> Result<Value, Error> {
        self.search_with(data, default_registry())
    }

    /// Evaluates the query with a caller-supplied function registry.
    pub fn search_with(&self, data: &Value, functions: &FunctionRegistry) -> Result<Value, Error> {
        let interpreter = TreeInterpreter::new(data, functions);
        let result = interpreter.evaluate(&self.node, data, &Bindings::new())?;
        Ok(result)
    }

    /// The parsed expression tree.
    pub fn ast(&self) -> &Node {
        &self.node
    }
}

/// Parses an expression into a reusable [`Query`].
pub fn compile(expression: &str) -> Result<Query, Error> {
    let node = parser::parse(expression)?;
    debug!("compiled {expression:?}");
    Ok(Query { node })
}

/// Compiles and evaluates in one step.
pub fn search(expression: &str, data: &Value) -> Result<Value, Error> {
    compile(expression)?.search(data)
}

fn default_registry() -> &'static FunctionRegistry {
    static REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();
    REGISTRY.get_or_init(FunctionRegistry::default)
}
