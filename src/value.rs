//! Helpers over the JSON value model: truthiness, deep equality, numeric
//! coercion, and the shared slice computation used by `[start:stop:step]`.

use serde_json::{Number, Value};

use crate::error::EvaluationError;

/// JMESPath truthiness: everything is true except `null`, `false`, the
/// empty string, the empty array, and the empty object.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Number(_) => true,
    }
}

/// Deep equality with JSON semantics. Numbers compare by numeric value, so
/// an integer-carried `2` equals a float-carried `2.0`.
pub fn deep_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| deep_equal(x, y))
        }
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|w| deep_equal(v, w)))
        }
        _ => left == right,
    }
}

/// Numeric probe: extracts an `f64` from any JSON number representation.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Re-encodes an arithmetic result as a JSON number. Integral results stay
/// integers; non-finite results cannot be carried by JSON and become null.
pub fn number(f: f64) -> Value {
    if !f.is_finite() {
        return Value::Null;
    }
    if f.fract() == 0.0 && (i64::MIN as f64..=i64::MAX as f64).contains(&f) {
        return Value::Number(Number::from(f as i64));
    }
    match Number::from_f64(f) {
        Some(n) => Value::Number(n),
        None => Value::Null,
    }
}

/// An `f64` that must hold an integral value, as required by index-like
/// function arguments (`find_first`, `replace`, ...).
pub fn as_integer(value: &Value) -> Option<i64> {
    let f = as_number(value)?;
    if f.fract() == 0.0 {
        Some(f as i64)
    } else {
        None
    }
}

pub fn as_non_negative_integer(value: &Value) -> Option<usize> {
    match as_integer(value) {
        Some(i) if i >= 0 => Some(i as usize),
        _ => None,
    }
}

/// The `type()` view of a value.
pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Extracts `[f64]` when every element of an array is a number.
pub fn as_number_array(value: &Value) -> Option<Vec<f64>> {
    value
        .as_array()?
        .iter()
        .map(as_number)
        .collect::<Option<Vec<_>>>()
}

/// Extracts `[&str]` when every element of an array is a string.
pub fn as_string_array(value: &Value) -> Option<Vec<&str>> {
    value
        .as_array()?
        .iter()
        .map(Value::as_str)
        .collect::<Option<Vec<_>>>()
}

/// The three optional parts of a slice expression, in source order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceParams {
    pub start: Option<i64>,
    pub stop: Option<i64>,
    pub step: Option<i64>,
}

/// Computes the slice of `items` described by `params`, with Python slice
/// semantics: defaults depend on the step sign, negative bounds count from
/// the end, and out-of-range bounds clamp.
pub fn slice<T: Clone>(items: &[T], params: SliceParams) -> Result<Vec<T>, EvaluationError> {
    let length = items.len() as i64;
    let step = params.step.unwrap_or(1);
    if step == 0 {
        return Err(EvaluationError::invalid_value("slice step cannot be 0"));
    }

    let start = match params.start {
        Some(n) => clamp_bound(n, length, step),
        None if step < 0 => length - 1,
        None => 0,
    };
    let stop = match params.stop {
        Some(n) => clamp_bound(n, length, step),
        None if step < 0 => -1,
        None => length,
    };

    let mut result = Vec::new();
    let mut i = start;
    if step > 0 {
        while i < stop {
            result.push(items[i as usize].clone());
            i += step;
        }
    } else {
        while i > stop {
            result.push(items[i as usize].clone());
            i += step;
        }
    }
    Ok(result)
}

fn clamp_bound(mut bound: i64, length: i64, step: i64) -> i64 {
    if bound < 0 {
        bound += length;
        if bound < 0 {
            return if step < 0 { -1 } else { 0 };
        }
        bound
    } else if bound >= length {
        if step < 0 { length - 1 } else { length }
    } else {
        bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_of_json_types() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!(0)));
        assert!(is_truthy(&json!("false")));
        assert!(is_truthy(&json!([0])));
    }

    #[test]
    fn deep_equal_mixes_number_representations() {
        assert!(deep_equal(&json!(2), &json!(2.0)));
        assert!(deep_equal(&json!([1, [2]]), &json!([1.0, [2.0]])));
        assert!(deep_equal(&json!({"a": 1}), &json!({"a": 1.0})));
        assert!(!deep_equal(&json!(null), &json!("foo")));
        assert!(!deep_equal(&json!([]), &json!(null)));
        assert!(deep_equal(&json!([]), &json!([])));
    }

    #[test]
    fn number_keeps_integers_integral() {
        assert_eq!(number(2.0), json!(2));
        assert_eq!(number(2.5), json!(2.5));
        assert_eq!(number(-0.0), json!(0));
        assert_eq!(number(f64::INFINITY), Value::Null);
        assert_eq!(number(f64::NAN), Value::Null);
    }

    #[test]
    fn slice_positive_step() {
        let input = vec![0, 1, 2, 3, 4];
        let params = SliceParams {
            start: Some(0),
            stop: Some(3),
            step: Some(1),
        };
        assert_eq!(slice(&input, params).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn slice_defaults_and_negatives() {
        let input = vec![0, 1, 2, 3, 4];
        let reversed = SliceParams {
            step: Some(-1),
            ..Default::default()
        };
        assert_eq!(slice(&input, reversed).unwrap(), vec![4, 3, 2, 1, 0]);

        let tail = SliceParams {
            start: Some(-2),
            ..Default::default()
        };
        assert_eq!(slice(&input, tail).unwrap(), vec![3, 4]);

        let clamped = SliceParams {
            start: Some(-100),
            stop: Some(100),
            step: None,
        };
        assert_eq!(slice(&input, clamped).unwrap(), input);
    }

    #[test]
    fn slice_step_zero_is_an_error() {
        let params = SliceParams {
            step: Some(0),
            ..Default::default()
        };
        assert!(slice(&[0, 1], params).is_err());
    }
}
