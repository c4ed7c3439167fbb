//! Lexical variable bindings for `let` expressions.
//!
//! Scopes are persistent: [`Bindings::register`] returns a new handle that
//! shares its tail with the old one, so entering a `let` body never
//! disturbs the caller's view and expression references can hold on to the
//! scope they were created under.

use std::rc::Rc;

use serde_json::Value;

use crate::error::EvaluationError;

#[derive(Debug, Clone, Default)]
pub struct Bindings {
    head: Option<Rc<Frame>>,
}

#[derive(Debug)]
struct Frame {
    name: String,
    value: Value,
    parent: Option<Rc<Frame>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a new scope with `name` bound to `value`, shadowing any
    /// outer binding of the same name.
    #[must_use]
    pub fn register(&self, name: impl Into<String>, value: Value) -> Bindings {
        Bindings {
            head: Some(Rc::new(Frame {
                name: name.into(),
                value,
                parent: self.head.clone(),
            })),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let mut frame = self.head.as_deref();
        while let Some(f) = frame {
            if f.name == name {
                return Some(&f.value);
            }
            frame = f.parent.as_deref();
        }
        None
    }

    /// Looks up a variable, failing with an undefined-variable error.
    pub fn resolve(&self, name: &str) -> Result<Value, EvaluationError> {
        self.lookup(name)
            .cloned()
            .ok_or_else(|| EvaluationError::undefined_variable(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_variable() {
        let bindings = Bindings::new();
        assert!(bindings.lookup("foo").is_none());
        assert!(matches!(
            bindings.resolve("foo"),
            Err(EvaluationError::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn register_returns_a_new_scope() {
        let outer = Bindings::new().register("foo", json!("bar"));
        let inner = outer.register("foo", json!("baz"));

        assert_eq!(inner.lookup("foo"), Some(&json!("baz")));
        // The outer scope is untouched.
        assert_eq!(outer.lookup("foo"), Some(&json!("bar")));
    }

    #[test]
    fn inner_scopes_see_outer_bindings() {
        let outer = Bindings::new()
            .register("foo", json!("bar"))
            .register("qux", json!("quux"));
        let inner = outer.register("foo", json!("baz"));

        assert_eq!(inner.lookup("foo"), Some(&json!("baz")));
        assert_eq!(inner.lookup("qux"), Some(&json!("quux")));
    }
}
