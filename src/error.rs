use thiserror::Error;

/// Error produced while tokenizing or parsing an expression.
///
/// Carries enough location information to render the offending span with
/// [`SyntaxError::highlight`].
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Syntax error: {message}, at position {position}")]
pub struct SyntaxError {
    pub message: String,
    pub expression: String,
    /// Zero-based code-point offset of the offending span.
    pub position: usize,
    /// Code-point length of the offending span (at least 1).
    pub length: usize,
}

impl SyntaxError {
    pub fn new(
        message: impl Into<String>,
        expression: impl Into<String>,
        position: usize,
        length: usize,
    ) -> Self {
        Self {
            message: message.into(),
            expression: expression.into(),
            position,
            length: length.max(1),
        }
    }

    /// Renders the original expression with the offending span underlined:
    ///
    /// ```text
    /// foo.bar[?baz ~ qux]
    ///              ^
    /// ```
    pub fn highlight(&self) -> String {
        let mut underline = String::new();
        for _ in 0..self.position {
            underline.push(' ');
        }
        underline.push('^');
        for _ in 1..self.length {
            underline.push('~');
        }
        format!("{}\n{}", self.expression, underline)
    }
}

/// Error produced while evaluating a compiled expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("unknown function: {name}()")]
    UnknownFunction { name: String },

    #[error("{function}() expects at least {expected} argument(s) but received {actual}")]
    NotEnoughArguments {
        function: String,
        expected: usize,
        actual: usize,
        variadic: bool,
    },

    #[error("{function}() expects at most {expected} argument(s) but received {actual}")]
    TooManyArguments {
        function: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid type: {message}")]
    Type { message: String },

    #[error("undefined variable: ${name}")]
    UndefinedVariable { name: String },

    #[error("invalid value: {message}")]
    InvalidValue { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl EvaluationError {
    pub fn unknown_function(name: impl Into<String>) -> Self {
        Self::UnknownFunction { name: name.into() }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type {
            message: message.into(),
        }
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::InvalidValue {
            message: message.into(),
        }
    }

    pub fn undefined_variable(name: impl Into<String>) -> Self {
        Self::UndefinedVariable { name: name.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The `function expects its 'arg' argument to be an integer` family of
    /// messages, shared by `find_first`, `find_last` and friends.
    pub fn not_an_integer(function: &str, argument: &str) -> Self {
        Self::invalid_value(format!(
            "the function '{function}' expects its '{argument}' argument to be an integer"
        ))
    }

    pub fn not_a_positive_integer(function: &str, argument: &str) -> Self {
        Self::invalid_value(format!(
            "the function '{function}' expects its '{argument}' argument to be a non-negative integer"
        ))
    }
}

/// Any failure surfaced by the public API: either the expression did not
/// parse, or it could not be evaluated against the supplied data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlight_underlines_span() {
        let err = SyntaxError::new("Unknown char: '~'", "foo ~ bar", 4, 1);
        assert_eq!(err.highlight(), "foo ~ bar\n    ^");
    }

    #[test]
    fn highlight_spans_multiple_chars() {
        let err = SyntaxError::new("Unexpected token", "a | |  b", 4, 3);
        assert_eq!(err.highlight(), "a | |  b\n    ^~~");
    }

    #[test]
    fn arity_messages() {
        let err = EvaluationError::NotEnoughArguments {
            function: "abs".to_string(),
            expected: 1,
            actual: 0,
            variadic: false,
        };
        assert_eq!(
            err.to_string(),
            "abs() expects at least 1 argument(s) but received 0"
        );

        let err = EvaluationError::TooManyArguments {
            function: "abs".to_string(),
            expected: 1,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "abs() expects at most 1 argument(s) but received 3"
        );
    }
}
