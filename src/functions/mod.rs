//! The built-in function table and its calling convention.
//!
//! Every function declares per-parameter accepted types plus optional and
//! variadic markers; arity and types are validated before the handler runs,
//! so handlers can lean on the argument shapes they declared. Higher-order
//! functions receive expression references and re-enter the interpreter
//! through [`ExprRuntime`].

mod core;
mod hof;
mod numeric;
mod object;
mod sequence;
mod string;

use std::collections::HashMap;
use std::fmt;

use log::trace;
use serde_json::{Map, Value};

use crate::ast::Node;
use crate::bindings::Bindings;
use crate::error::EvaluationError;
use crate::value::{as_number, as_number_array, as_string_array};

/// A type a declared parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Number,
    String,
    Array,
    Object,
    ArrayArray,
    ArrayNumber,
    ArrayString,
    Expref,
    Any,
}

impl ParamType {
    fn matches(self, arg: &ArgValue) -> bool {
        match (self, arg) {
            (ParamType::Expref, ArgValue::Expref(_)) => true,
            (ParamType::Expref, _) => false,
            (_, ArgValue::Expref(_)) => false,
            (param, ArgValue::Value(value)) => match param {
                ParamType::Any => true,
                ParamType::Number => as_number(value).is_some(),
                ParamType::String => value.is_string(),
                ParamType::Array | ParamType::ArrayArray => value.is_array(),
                ParamType::Object => value.is_object(),
                ParamType::ArrayNumber => as_number_array(value).is_some(),
                ParamType::ArrayString => as_string_array(value).is_some(),
                ParamType::Expref => false,
            },
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::Number => "number",
            ParamType::String => "string",
            ParamType::Array => "array",
            ParamType::Object => "object",
            ParamType::ArrayArray => "array[array]",
            ParamType::ArrayNumber => "array[number]",
            ParamType::ArrayString => "array[string]",
            ParamType::Expref => "expref",
            ParamType::Any => "any",
        };
        f.write_str(name)
    }
}

/// One declared parameter.
#[derive(Debug, Clone)]
pub struct ArgSpec {
    pub types: Vec<ParamType>,
    pub variadic: bool,
    pub optional: bool,
}

impl ArgSpec {
    pub fn of(types: &[ParamType]) -> Self {
        Self {
            types: types.to_vec(),
            variadic: false,
            optional: false,
        }
    }

    pub fn optional(types: &[ParamType]) -> Self {
        Self {
            types: types.to_vec(),
            variadic: false,
            optional: true,
        }
    }

    pub fn variadic(types: &[ParamType]) -> Self {
        Self {
            types: types.to_vec(),
            variadic: true,
            optional: false,
        }
    }

    fn type_check(&self, arg: &ArgValue, function: &str, position: usize) -> Result<(), EvaluationError> {
        if self.types.iter().any(|t| t.matches(arg)) {
            return Ok(());
        }
        let accepted = self
            .types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("|");
        Err(EvaluationError::type_error(format!(
            "{function}() expected argument {} to be {accepted}, received {}",
            position + 1,
            arg.type_name(),
        )))
    }
}

/// A first-class expression reference: the referenced subtree plus the
/// value and scope it was created under.
#[derive(Debug, Clone)]
pub struct ExpRef {
    pub(crate) node: Node,
    pub(crate) context: Value,
    pub(crate) bindings: Bindings,
}

impl ExpRef {
    /// The value the surrounding expression was evaluating when the
    /// reference was taken.
    pub fn context(&self) -> &Value {
        &self.context
    }
}

/// A resolved function argument: either a plain value or an expression
/// reference for parameters declared `expref`.
#[derive(Debug, Clone)]
pub enum ArgValue {
    Value(Value),
    Expref(ExpRef),
}

impl ArgValue {
    fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Value(v) => crate::value::type_name(v),
            ArgValue::Expref(_) => "expref",
        }
    }
}

/// Interpreter access for higher-order functions.
pub trait ExprRuntime {
    /// Evaluates an expression reference against a fresh value, under the
    /// bindings captured by the reference.
    fn call_expression(&self, expref: &ExpRef, value: &Value) -> Result<Value, EvaluationError>;

    /// Same, with additional variables layered over the captured bindings
    /// for the duration of the call.
    fn call_expression_scoped(
        &self,
        expref: &ExpRef,
        value: &Value,
        scope: &Map<String, Value>,
    ) -> Result<Value, EvaluationError>;
}

pub type Handler = fn(&dyn ExprRuntime, Vec<ArgValue>) -> Result<Value, EvaluationError>;

/// A named function with its parameter contract.
#[derive(Debug, Clone)]
pub struct FunctionEntry {
    pub name: String,
    pub arguments: Vec<ArgSpec>,
    pub handler: Handler,
    pub description: String,
}

impl FunctionEntry {
    pub fn new(
        name: impl Into<String>,
        arguments: Vec<ArgSpec>,
        handler: Handler,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            arguments,
            handler,
            description: description.into(),
        }
    }

    fn is_variadic(&self) -> bool {
        self.arguments.iter().any(|a| a.variadic)
    }

    fn min_expected(&self) -> usize {
        self.arguments.iter().filter(|a| !a.optional).count()
    }

    fn validate(&self, args: &[ArgValue]) -> Result<(), EvaluationError> {
        let variadic = self.is_variadic();
        let min_expected = self.min_expected();
        let count = args.len();

        if count < min_expected {
            return Err(EvaluationError::NotEnoughArguments {
                function: self.name.clone(),
                expected: min_expected,
                actual: count,
                variadic,
            });
        }
        if !variadic && count > self.arguments.len() {
            return Err(EvaluationError::TooManyArguments {
                function: self.name.clone(),
                expected: self.arguments.len(),
                actual: count,
            });
        }

        for (i, spec) in self.arguments.iter().enumerate() {
            if i < count {
                spec.type_check(&args[i], &self.name, i)?;
            }
        }
        if let Some(last) = self.arguments.last() {
            if last.variadic {
                for (i, arg) in args.iter().enumerate().skip(self.arguments.len()) {
                    last.type_check(arg, &self.name, i)?;
                }
            }
        }
        Ok(())
    }
}

/// Name → function table. The default table holds the built-in set; callers
/// can add or override entries and hand the registry to
/// [`Query::search_with`](crate::Query::search_with).
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    entries: HashMap<String, FunctionEntry>,
}

impl FunctionRegistry {
    /// An empty registry with no functions at all.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Adds an entry, replacing any previous function of the same name.
    pub fn register(&mut self, entry: FunctionEntry) {
        self.entries.insert(entry.name.clone(), entry);
    }

    pub fn get(&self, name: &str) -> Option<&FunctionEntry> {
        self.entries.get(name)
    }

    /// Validates arity and argument types, then dispatches.
    pub fn call(
        &self,
        name: &str,
        args: Vec<ArgValue>,
        runtime: &dyn ExprRuntime,
    ) -> Result<Value, EvaluationError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| EvaluationError::unknown_function(name))?;
        trace!("calling {name}() with {} argument(s)", args.len());
        entry.validate(&args)?;
        (entry.handler)(runtime, args)
    }
}

impl Default for FunctionRegistry {
    /// The built-in function set.
    fn default() -> Self {
        let mut registry = Self::new();
        for entry in default_functions() {
            registry.register(entry);
        }
        registry
    }
}

// --- Handler-side argument accessors ---
//
// Validation has already matched the declared types, so a shape mismatch
// here is an interpreter bug, not a user error.

fn mismatch(what: &str) -> EvaluationError {
    EvaluationError::internal(format!("argument is not a {what} after validation"))
}

pub(crate) fn value_arg<'a>(args: &'a [ArgValue], i: usize) -> Result<&'a Value, EvaluationError> {
    match args.get(i) {
        Some(ArgValue::Value(v)) => Ok(v),
        _ => Err(mismatch("value")),
    }
}

pub(crate) fn string_arg<'a>(args: &'a [ArgValue], i: usize) -> Result<&'a str, EvaluationError> {
    value_arg(args, i)?.as_str().ok_or_else(|| mismatch("string"))
}

pub(crate) fn number_arg(args: &[ArgValue], i: usize) -> Result<f64, EvaluationError> {
    as_number(value_arg(args, i)?).ok_or_else(|| mismatch("number"))
}

pub(crate) fn array_arg<'a>(args: &'a [ArgValue], i: usize) -> Result<&'a Vec<Value>, EvaluationError> {
    value_arg(args, i)?.as_array().ok_or_else(|| mismatch("array"))
}

pub(crate) fn object_arg<'a>(
    args: &'a [ArgValue],
    i: usize,
) -> Result<&'a Map<String, Value>, EvaluationError> {
    value_arg(args, i)?
        .as_object()
        .ok_or_else(|| mismatch("object"))
}

pub(crate) fn expref_arg<'a>(args: &'a [ArgValue], i: usize) -> Result<&'a ExpRef, EvaluationError> {
    match args.get(i) {
        Some(ArgValue::Expref(e)) => Ok(e),
        _ => Err(mismatch("expression reference")),
    }
}

/// The closed default set, in alphabetical order.
pub fn default_functions() -> Vec<FunctionEntry> {
    use ParamType::*;
    vec![
        FunctionEntry::new(
            "abs",
            vec![ArgSpec::of(&[Number])],
            numeric::abs,
            "Returns the absolute value of the provided number.",
        ),
        FunctionEntry::new(
            "avg",
            vec![ArgSpec::of(&[ArrayNumber])],
            numeric::avg,
            "Returns the average of the numbers in the array, or null for an empty array.",
        ),
        FunctionEntry::new(
            "ceil",
            vec![ArgSpec::of(&[Number])],
            numeric::ceil,
            "Rounds up to the next highest integer.",
        ),
        FunctionEntry::new(
            "contains",
            vec![ArgSpec::of(&[Array, String]), ArgSpec::of(&[Any])],
            sequence::contains,
            "Tests substring containment for strings and element membership for arrays.",
        ),
        FunctionEntry::new(
            "ends_with",
            vec![ArgSpec::of(&[String]), ArgSpec::of(&[String])],
            string::ends_with,
            "Reports whether the subject string ends with the given suffix.",
        ),
        FunctionEntry::new(
            "find_first",
            vec![
                ArgSpec::of(&[String]),
                ArgSpec::of(&[String]),
                ArgSpec::optional(&[Number]),
                ArgSpec::optional(&[Number]),
            ],
            string::find_first,
            "Returns the index of the first occurrence of a substring, or null.",
        ),
        FunctionEntry::new(
            "find_last",
            vec![
                ArgSpec::of(&[String]),
                ArgSpec::of(&[String]),
                ArgSpec::optional(&[Number]),
                ArgSpec::optional(&[Number]),
            ],
            string::find_last,
            "Returns the index of the last occurrence of a substring, or null.",
        ),
        FunctionEntry::new(
            "floor",
            vec![ArgSpec::of(&[Number])],
            numeric::floor,
            "Rounds down to the next lowest integer.",
        ),
        FunctionEntry::new(
            "from_items",
            vec![ArgSpec::of(&[ArrayArray])],
            object::from_items,
            "Builds an object from an array of [key, value] pairs.",
        ),
        FunctionEntry::new(
            "group_by",
            vec![ArgSpec::of(&[Array]), ArgSpec::of(&[Expref])],
            hof::group_by,
            "Groups array elements by the string key the expression computes.",
        ),
        FunctionEntry::new(
            "items",
            vec![ArgSpec::of(&[Object])],
            object::items,
            "Converts an object into an array of [key, value] pairs.",
        ),
        FunctionEntry::new(
            "join",
            vec![ArgSpec::of(&[String]), ArgSpec::of(&[ArrayString])],
            string::join,
            "Joins an array of strings with the given separator.",
        ),
        FunctionEntry::new(
            "keys",
            vec![ArgSpec::of(&[Object])],
            object::keys,
            "Returns the keys of the object.",
        ),
        FunctionEntry::new(
            "length",
            vec![ArgSpec::of(&[String, Array, Object])],
            sequence::length,
            "Returns code points for strings, elements for arrays, entries for objects.",
        ),
        FunctionEntry::new(
            "let",
            vec![ArgSpec::of(&[Object]), ArgSpec::of(&[Expref])],
            hof::let_scope,
            "Evaluates the expression with the object's entries bound as variables.",
        ),
        FunctionEntry::new(
            "lower",
            vec![ArgSpec::of(&[String])],
            string::lower,
            "Maps the string to lower case.",
        ),
        FunctionEntry::new(
            "map",
            vec![ArgSpec::of(&[Expref]), ArgSpec::of(&[Array])],
            hof::map,
            "Applies the expression to every element and collects the results.",
        ),
        FunctionEntry::new(
            "max",
            vec![ArgSpec::of(&[ArrayNumber, ArrayString])],
            numeric::max,
            "Returns the highest element, or null for an empty array.",
        ),
        FunctionEntry::new(
            "max_by",
            vec![ArgSpec::of(&[Array]), ArgSpec::of(&[Expref])],
            hof::max_by,
            "Returns the element whose computed key is highest.",
        ),
        FunctionEntry::new(
            "merge",
            vec![ArgSpec::variadic(&[Object])],
            object::merge,
            "Shallow right-biased merge of the given objects.",
        ),
        FunctionEntry::new(
            "min",
            vec![ArgSpec::of(&[ArrayNumber, ArrayString])],
            numeric::min,
            "Returns the lowest element, or null for an empty array.",
        ),
        FunctionEntry::new(
            "min_by",
            vec![ArgSpec::of(&[Array]), ArgSpec::of(&[Expref])],
            hof::min_by,
            "Returns the element whose computed key is lowest.",
        ),
        FunctionEntry::new(
            "not_null",
            vec![ArgSpec::variadic(&[Any])],
            core::not_null,
            "Returns the first non-null argument, or null.",
        ),
        FunctionEntry::new(
            "pad_left",
            vec![
                ArgSpec::of(&[String]),
                ArgSpec::of(&[Number]),
                ArgSpec::optional(&[String]),
            ],
            string::pad_left,
            "Pads the string on the left up to the given width.",
        ),
        FunctionEntry::new(
            "pad_right",
            vec![
                ArgSpec::of(&[String]),
                ArgSpec::of(&[Number]),
                ArgSpec::optional(&[String]),
            ],
            string::pad_right,
            "Pads the string on the right up to the given width.",
        ),
        FunctionEntry::new(
            "replace",
            vec![
                ArgSpec::of(&[String]),
                ArgSpec::of(&[String]),
                ArgSpec::of(&[String]),
                ArgSpec::optional(&[Number]),
            ],
            string::replace,
            "Replaces occurrences of a substring, optionally at most N times.",
        ),
        FunctionEntry::new(
            "reverse",
            vec![ArgSpec::of(&[Array, String])],
            sequence::reverse,
            "Reverses an array or string.",
        ),
        FunctionEntry::new(
            "sort",
            vec![ArgSpec::of(&[ArrayString, ArrayNumber])],
            sequence::sort,
            "Sorts an array of numbers or strings in natural order.",
        ),
        FunctionEntry::new(
            "sort_by",
            vec![ArgSpec::of(&[Array]), ArgSpec::of(&[Expref])],
            hof::sort_by,
            "Stable sort by the key the expression computes for each element.",
        ),
        FunctionEntry::new(
            "split",
            vec![
                ArgSpec::of(&[String]),
                ArgSpec::of(&[String]),
                ArgSpec::optional(&[Number]),
            ],
            string::split,
            "Splits a string on a separator, optionally into at most N+1 parts.",
        ),
        FunctionEntry::new(
            "starts_with",
            vec![ArgSpec::of(&[String]), ArgSpec::of(&[String])],
            string::starts_with,
            "Reports whether the subject string starts with the given prefix.",
        ),
        FunctionEntry::new(
            "sum",
            vec![ArgSpec::of(&[ArrayNumber])],
            numeric::sum,
            "Sums an array of numbers; an empty array sums to 0.",
        ),
        FunctionEntry::new(
            "to_array",
            vec![ArgSpec::of(&[Any])],
            core::to_array,
            "Wraps non-arrays in a one-element array; arrays pass through.",
        ),
        FunctionEntry::new(
            "to_number",
            vec![ArgSpec::of(&[Any])],
            core::to_number,
            "Parses strings as numbers; non-numeric values become null.",
        ),
        FunctionEntry::new(
            "to_string",
            vec![ArgSpec::of(&[Any])],
            core::to_string,
            "Returns strings unchanged and JSON-encodes everything else.",
        ),
        FunctionEntry::new(
            "trim",
            vec![ArgSpec::of(&[String]), ArgSpec::optional(&[String])],
            string::trim,
            "Trims the cutset (or whitespace) from both ends.",
        ),
        FunctionEntry::new(
            "trim_left",
            vec![ArgSpec::of(&[String]), ArgSpec::optional(&[String])],
            string::trim_left,
            "Trims the cutset (or whitespace) from the start.",
        ),
        FunctionEntry::new(
            "trim_right",
            vec![ArgSpec::of(&[String]), ArgSpec::optional(&[String])],
            string::trim_right,
            "Trims the cutset (or whitespace) from the end.",
        ),
        FunctionEntry::new(
            "type",
            vec![ArgSpec::of(&[Any])],
            core::type_of,
            "Returns the JSON type name of the argument.",
        ),
        FunctionEntry::new(
            "upper",
            vec![ArgSpec::of(&[String])],
            string::upper,
            "Maps the string to upper case.",
        ),
        FunctionEntry::new(
            "values",
            vec![ArgSpec::of(&[Object])],
            object::values,
            "Returns the values of the object.",
        ),
        FunctionEntry::new(
            "zip",
            vec![ArgSpec::of(&[Array]), ArgSpec::variadic(&[Array])],
            sequence::zip,
            "Pairs up elements of the input arrays, truncated to the shortest.",
        ),
    ]
}


#[cfg(test)]
mod tests {
    use super::tests_support::{try_call as call, NoRuntime};
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_function() {
        assert!(matches!(
            call("nope", vec![]),
            Err(EvaluationError::UnknownFunction { .. })
        ));
    }

    #[test]
    fn arity_is_enforced() {
        assert!(matches!(
            call("abs", vec![]),
            Err(EvaluationError::NotEnoughArguments { .. })
        ));
        assert!(matches!(
            call("abs", vec![json!(1), json!(2)]),
            Err(EvaluationError::TooManyArguments { .. })
        ));
    }

    #[test]
    fn types_are_enforced() {
        assert!(matches!(
            call("abs", vec![json!("x")]),
            Err(EvaluationError::Type { .. })
        ));
        // Mixed-type arrays satisfy neither array[number] nor array[string].
        assert!(matches!(
            call("sort", vec![json!([1, "a"])]),
            Err(EvaluationError::Type { .. })
        ));
    }

    #[test]
    fn optional_arguments_relax_arity() {
        assert_eq!(call("split", vec![json!("a,b"), json!(",")]).unwrap(), json!(["a", "b"]));
        assert_eq!(
            call("split", vec![json!("a,b,c"), json!(","), json!(1)]).unwrap(),
            json!(["a", "b,c"])
        );
    }

    #[test]
    fn variadic_arguments_are_type_checked() {
        assert!(matches!(
            call("merge", vec![json!({}), json!(1)]),
            Err(EvaluationError::Type { .. })
        ));
        assert!(matches!(
            call("zip", vec![json!([1])]),
            Err(EvaluationError::NotEnoughArguments { .. })
        ));
    }

    #[test]
    fn expref_parameters_reject_plain_values() {
        assert!(matches!(
            call("sort_by", vec![json!([1]), json!(1)]),
            Err(EvaluationError::Type { .. })
        ));
    }

    #[test]
    fn register_overrides_by_name() {
        fn answer(_: &dyn ExprRuntime, _: Vec<ArgValue>) -> Result<Value, EvaluationError> {
            Ok(json!(42))
        }
        let mut registry = FunctionRegistry::default();
        registry.register(FunctionEntry::new(
            "abs",
            vec![ArgSpec::of(&[ParamType::Any])],
            answer,
            "Overridden for the test.",
        ));
        let result = registry
            .call("abs", vec![ArgValue::Value(json!("anything"))], &NoRuntime)
            .unwrap();
        assert_eq!(result, json!(42));
    }
}
