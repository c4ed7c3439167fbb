//! Higher-order functions: these take an expression reference and re-enter
//! the interpreter once per element.

use serde_json::{Map, Value};

use super::{array_arg, expref_arg, object_arg, ArgValue, ExprRuntime};
use crate::error::EvaluationError;
use crate::value::as_number;

pub fn map(runtime: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let expr = expref_arg(&args, 0)?;
    let items = array_arg(&args, 1)?;
    let mut mapped = Vec::with_capacity(items.len());
    for item in items {
        mapped.push(runtime.call_expression(expr, item)?);
    }
    Ok(Value::Array(mapped))
}

/// The key domain a `sort_by`/`max_by`/`min_by` expression settles into,
/// decided by the first element's key.
enum KeyKind {
    Number,
    String,
}

fn key_kind(function: &str, key: &Value) -> Result<KeyKind, EvaluationError> {
    match key {
        Value::String(_) => Ok(KeyKind::String),
        v if as_number(v).is_some() => Ok(KeyKind::Number),
        _ => Err(EvaluationError::type_error(format!(
            "{function}() expects keys to be numbers or strings"
        ))),
    }
}

fn number_key(function: &str, key: &Value) -> Result<f64, EvaluationError> {
    as_number(key).ok_or_else(|| {
        EvaluationError::type_error(format!("{function}() expects every key to be a number"))
    })
}

fn string_key(function: &str, key: Value) -> Result<String, EvaluationError> {
    match key {
        Value::String(s) => Ok(s),
        _ => Err(EvaluationError::type_error(format!(
            "{function}() expects every key to be a string"
        ))),
    }
}

pub fn sort_by(runtime: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let items = array_arg(&args, 0)?;
    let expr = expref_arg(&args, 1)?;
    if items.len() <= 1 {
        return Ok(Value::Array(items.clone()));
    }

    let mut keyed = Vec::with_capacity(items.len());
    for item in items {
        keyed.push((runtime.call_expression(expr, item)?, item.clone()));
    }

    match key_kind("sort_by", &keyed[0].0)? {
        KeyKind::Number => {
            let mut pairs = Vec::with_capacity(keyed.len());
            for (key, item) in keyed {
                pairs.push((number_key("sort_by", &key)?, item));
            }
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
            Ok(Value::Array(pairs.into_iter().map(|(_, v)| v).collect()))
        }
        KeyKind::String => {
            let mut pairs = Vec::with_capacity(keyed.len());
            for (key, item) in keyed {
                pairs.push((string_key("sort_by", key)?, item));
            }
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            Ok(Value::Array(pairs.into_iter().map(|(_, v)| v).collect()))
        }
    }
}

fn extremum_by(
    function: &str,
    runtime: &dyn ExprRuntime,
    args: Vec<ArgValue>,
    keep_right: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<Value, EvaluationError> {
    let items = array_arg(&args, 0)?;
    let expr = expref_arg(&args, 1)?;
    if items.is_empty() {
        return Ok(Value::Null);
    }
    if items.len() == 1 {
        return Ok(items[0].clone());
    }

    let first_key = runtime.call_expression(expr, &items[0])?;
    match key_kind(function, &first_key)? {
        KeyKind::Number => {
            let mut best_key = number_key(function, &first_key)?;
            let mut best = &items[0];
            for item in &items[1..] {
                let key = number_key(function, &runtime.call_expression(expr, item)?)?;
                if keep_right(best_key.total_cmp(&key)) {
                    best_key = key;
                    best = item;
                }
            }
            Ok(best.clone())
        }
        KeyKind::String => {
            let mut best_key = string_key(function, first_key)?;
            let mut best = &items[0];
            for item in &items[1..] {
                let key = string_key(function, runtime.call_expression(expr, item)?)?;
                if keep_right(best_key.cmp(&key)) {
                    best_key = key;
                    best = item;
                }
            }
            Ok(best.clone())
        }
    }
}

pub fn max_by(runtime: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    extremum_by("max_by", runtime, args, |ordering| ordering.is_lt())
}

pub fn min_by(runtime: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    extremum_by("min_by", runtime, args, |ordering| ordering.is_gt())
}

pub fn group_by(runtime: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let items = array_arg(&args, 0)?;
    let expr = expref_arg(&args, 1)?;
    if items.is_empty() {
        return Ok(Value::Null);
    }

    let mut groups: Map<String, Value> = Map::new();
    for item in items {
        let key = match runtime.call_expression(expr, item)? {
            Value::String(s) => s,
            _ => {
                return Err(EvaluationError::type_error(
                    "group_by() expects the expression to evaluate to a string",
                ));
            }
        };
        match groups.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
            Value::Array(group) => group.push(item.clone()),
            _ => return Err(EvaluationError::internal("group entry is not an array")),
        }
    }
    Ok(Value::Object(groups))
}

/// The `let()` function: evaluates the expression against its captured
/// context with the scope object's entries bound as variables.
pub fn let_scope(runtime: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let scope = object_arg(&args, 0)?.clone();
    let expr = expref_arg(&args, 1)?;
    let context = expr.context().clone();
    runtime.call_expression_scoped(expr, &context, &scope)
}

#[cfg(test)]
mod tests {
    use crate::search;
    use serde_json::json;

    #[test]
    fn map_keeps_null_results() {
        let data = json!([{"a": 1}, {"b": 2}, {"a": 3}]);
        assert_eq!(search("map(&a, @)", &data).unwrap(), json!([1, null, 3]));
    }

    #[test]
    fn sort_by_number_key() {
        let data = json!([{"age": 3}, {"age": 1}, {"age": 2}]);
        assert_eq!(
            search("sort_by(@, &age)", &data).unwrap(),
            json!([{"age": 1}, {"age": 2}, {"age": 3}])
        );
    }

    #[test]
    fn sort_by_is_stable() {
        let data = json!([
            {"k": 1, "tag": "a"},
            {"k": 0, "tag": "b"},
            {"k": 1, "tag": "c"},
            {"k": 0, "tag": "d"}
        ]);
        assert_eq!(
            search("sort_by(@, &k)[*].tag", &data).unwrap(),
            json!(["b", "d", "a", "c"])
        );
    }

    #[test]
    fn sort_by_rejects_mixed_keys() {
        let data = json!([{"k": 1}, {"k": "x"}]);
        assert!(search("sort_by(@, &k)", &data).is_err());
    }

    #[test]
    fn sort_by_computed_key() {
        let data = json!([1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(
            search("sort_by(@, &@ * `-1.0`)", &data).unwrap(),
            json!([5.0, 4.0, 3.0, 2.0, 1.0])
        );
    }

    #[test]
    fn max_by_and_min_by() {
        let data = json!([{"age": 3}, {"age": 1}, {"age": 2}]);
        assert_eq!(search("max_by(@, &age)", &data).unwrap(), json!({"age": 3}));
        assert_eq!(search("min_by(@, &age)", &data).unwrap(), json!({"age": 1}));
        assert_eq!(search("max_by(@, &age)", &json!([])).unwrap(), json!(null));
    }

    #[test]
    fn group_by_string_key() {
        let data = json!([
            {"kind": "a", "n": 1},
            {"kind": "b", "n": 2},
            {"kind": "a", "n": 3}
        ]);
        assert_eq!(
            search("group_by(@, &kind)", &data).unwrap(),
            json!({
                "a": [{"kind": "a", "n": 1}, {"kind": "a", "n": 3}],
                "b": [{"kind": "b", "n": 2}]
            })
        );
        assert_eq!(search("group_by(@, &kind)", &json!([])).unwrap(), json!(null));
    }

    #[test]
    fn group_by_rejects_non_string_keys() {
        let data = json!([{"kind": 1}]);
        assert!(search("group_by(@, &kind)", &data).is_err());
    }

    #[test]
    fn let_function_binds_scope_variables() {
        let data = json!({"a": 42});
        assert_eq!(search("let({x: a}, &$x)", &data).unwrap(), json!(42));
    }
}
