//! Numeric aggregates and rounding.

use serde_json::Value;

use super::{number_arg, value_arg, ArgValue, ExprRuntime};
use crate::error::EvaluationError;
use crate::value::{as_number_array, as_string_array, number};

pub fn abs(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    Ok(number(number_arg(&args, 0)?.abs()))
}

pub fn ceil(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    Ok(number(number_arg(&args, 0)?.ceil()))
}

pub fn floor(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    Ok(number(number_arg(&args, 0)?.floor()))
}

pub fn avg(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let items = as_number_array(value_arg(&args, 0)?)
        .ok_or_else(|| EvaluationError::internal("avg() argument is not numeric"))?;
    if items.is_empty() {
        return Ok(Value::Null);
    }
    let total: f64 = items.iter().sum();
    Ok(number(total / items.len() as f64))
}

pub fn sum(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let items = as_number_array(value_arg(&args, 0)?)
        .ok_or_else(|| EvaluationError::internal("sum() argument is not numeric"))?;
    Ok(number(items.iter().sum()))
}

pub fn max(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    extremum(value_arg(&args, 0)?, Extremum::Max)
}

pub fn min(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    extremum(value_arg(&args, 0)?, Extremum::Min)
}

enum Extremum {
    Min,
    Max,
}

fn extremum(value: &Value, which: Extremum) -> Result<Value, EvaluationError> {
    if let Some(items) = as_number_array(value) {
        let best = items.iter().copied().reduce(|a, b| match which {
            Extremum::Max => a.max(b),
            Extremum::Min => a.min(b),
        });
        return Ok(best.map(number).unwrap_or(Value::Null));
    }
    let items = as_string_array(value)
        .ok_or_else(|| EvaluationError::internal("extremum argument is not comparable"))?;
    let best = items.into_iter().reduce(|a, b| {
        let keep_right = match which {
            Extremum::Max => b > a,
            Extremum::Min => b < a,
        };
        if keep_right { b } else { a }
    });
    Ok(best
        .map(|s| Value::String(s.to_string()))
        .unwrap_or(Value::Null))
}

#[cfg(test)]
mod tests {
    use super::super::tests_support::call;
    use serde_json::json;

    #[test]
    fn abs_and_rounding() {
        assert_eq!(call("abs", vec![json!(-2.5)]), json!(2.5));
        assert_eq!(call("abs", vec![json!(3)]), json!(3));
        assert_eq!(call("ceil", vec![json!(1.001)]), json!(2));
        assert_eq!(call("floor", vec![json!(1.999)]), json!(1));
    }

    #[test]
    fn avg_of_numbers() {
        assert_eq!(call("avg", vec![json!([1, 2, 3])]), json!(2));
        assert_eq!(call("avg", vec![json!([])]), json!(null));
    }

    #[test]
    fn sum_of_numbers() {
        assert_eq!(call("sum", vec![json!([1, 2, 3.5])]), json!(6.5));
        assert_eq!(call("sum", vec![json!([])]), json!(0));
    }

    #[test]
    fn max_and_min_numbers() {
        assert_eq!(call("max", vec![json!([1, 3, 2])]), json!(3));
        assert_eq!(call("min", vec![json!([1, 3, 2])]), json!(1));
        assert_eq!(call("max", vec![json!([])]), json!(null));
        assert_eq!(call("min", vec![json!([])]), json!(null));
    }

    #[test]
    fn max_and_min_strings() {
        assert_eq!(call("max", vec![json!(["a", "c", "b"])]), json!("c"));
        assert_eq!(call("min", vec![json!(["a", "c", "b"])]), json!("a"));
    }
}
