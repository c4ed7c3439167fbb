//! Functions over arrays and mixed array/string subjects.

use serde_json::Value;

use super::{value_arg, ArgValue, ExprRuntime};
use crate::error::EvaluationError;
use crate::value::{as_number_array, as_string_array, deep_equal, number};

pub fn contains(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let subject = value_arg(&args, 0)?;
    let search = value_arg(&args, 1)?;
    if let Some(s) = subject.as_str() {
        let found = match search.as_str() {
            Some(needle) => s.contains(needle),
            None => false,
        };
        return Ok(Value::Bool(found));
    }
    let items = subject
        .as_array()
        .ok_or_else(|| EvaluationError::internal("contains() subject is not array or string"))?;
    Ok(Value::Bool(items.iter().any(|item| deep_equal(item, search))))
}

pub fn length(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let subject = value_arg(&args, 0)?;
    let len = match subject {
        Value::String(s) => s.chars().count(),
        Value::Array(a) => a.len(),
        Value::Object(o) => o.len(),
        _ => {
            return Err(EvaluationError::internal(
                "length() subject is not string, array, or object",
            ));
        }
    };
    Ok(number(len as f64))
}

pub fn reverse(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let subject = value_arg(&args, 0)?;
    if let Some(s) = subject.as_str() {
        return Ok(Value::String(s.chars().rev().collect()));
    }
    let items = subject
        .as_array()
        .ok_or_else(|| EvaluationError::internal("reverse() subject is not array or string"))?;
    Ok(Value::Array(items.iter().rev().cloned().collect()))
}

pub fn sort(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let subject = value_arg(&args, 0)?;
    if let Some(mut items) = as_number_array(subject) {
        items.sort_by(f64::total_cmp);
        return Ok(Value::Array(items.into_iter().map(number).collect()));
    }
    let mut items = as_string_array(subject)
        .ok_or_else(|| EvaluationError::internal("sort() subject is not sortable"))?;
    items.sort();
    Ok(Value::Array(
        items
            .into_iter()
            .map(|s| Value::String(s.to_string()))
            .collect(),
    ))
}

pub fn zip(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let mut arrays = Vec::with_capacity(args.len());
    for i in 0..args.len() {
        arrays.push(
            value_arg(&args, i)?
                .as_array()
                .ok_or_else(|| EvaluationError::internal("zip() argument is not an array"))?,
        );
    }
    let count = arrays.iter().map(|a| a.len()).min().unwrap_or(0);
    let mut result = Vec::with_capacity(count);
    for i in 0..count {
        result.push(Value::Array(
            arrays.iter().map(|a| a[i].clone()).collect(),
        ));
    }
    Ok(Value::Array(result))
}

#[cfg(test)]
mod tests {
    use super::super::tests_support::call;
    use serde_json::json;

    #[test]
    fn contains_substring() {
        assert_eq!(call("contains", vec![json!("foobar"), json!("oob")]), json!(true));
        assert_eq!(call("contains", vec![json!("foobar"), json!("x")]), json!(false));
        // A non-string needle never matches inside a string subject.
        assert_eq!(call("contains", vec![json!("foobar"), json!(3)]), json!(false));
    }

    #[test]
    fn contains_array_membership_is_deep() {
        assert_eq!(call("contains", vec![json!([1, 2, 3]), json!(2)]), json!(true));
        assert_eq!(
            call("contains", vec![json!([{}, null, {"foo": "bar"}]), json!({"foo": "bar"})]),
            json!(true)
        );
        assert_eq!(call("contains", vec![json!([1, 2]), json!([1])]), json!(false));
    }

    #[test]
    fn length_counts_code_points() {
        assert_eq!(call("length", vec![json!("héllo")]), json!(5));
        assert_eq!(call("length", vec![json!([1, 2, 3])]), json!(3));
        assert_eq!(call("length", vec![json!({"a": 1})]), json!(1));
    }

    #[test]
    fn reverse_array_and_string() {
        assert_eq!(call("reverse", vec![json!([1, 2, 3])]), json!([3, 2, 1]));
        assert_eq!(call("reverse", vec![json!("abc")]), json!("cba"));
    }

    #[test]
    fn sort_numbers_and_strings() {
        assert_eq!(call("sort", vec![json!([3, 1, 2])]), json!([1, 2, 3]));
        assert_eq!(call("sort", vec![json!(["b", "a", "c"])]), json!(["a", "b", "c"]));
        assert_eq!(call("sort", vec![json!([])]), json!([]));
    }

    #[test]
    fn zip_truncates_to_shortest() {
        assert_eq!(
            call("zip", vec![json!([1, 2, 3]), json!(["a", "b"])]),
            json!([[1, "a"], [2, "b"]])
        );
        assert_eq!(call("zip", vec![json!([]), json!([1])]), json!([]));
    }
}
