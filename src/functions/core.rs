//! Type probes and conversions.

use serde_json::Value;

use super::{value_arg, ArgValue, ExprRuntime};
use crate::error::EvaluationError;
use crate::value::{as_number, number, type_name};

pub fn not_null(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    for i in 0..args.len() {
        let value = value_arg(&args, i)?;
        if !value.is_null() {
            return Ok(value.clone());
        }
    }
    Ok(Value::Null)
}

pub fn to_array(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let value = value_arg(&args, 0)?;
    if value.is_array() {
        Ok(value.clone())
    } else {
        Ok(Value::Array(vec![value.clone()]))
    }
}

pub fn to_number(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let value = value_arg(&args, 0)?;
    if let Some(n) = as_number(value) {
        return Ok(number(n));
    }
    if let Some(s) = value.as_str() {
        return Ok(match s.parse::<f64>() {
            Ok(n) => number(n),
            Err(_) => Value::Null,
        });
    }
    Ok(Value::Null)
}

pub fn to_string(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let value = value_arg(&args, 0)?;
    if value.is_string() {
        return Ok(value.clone());
    }
    let encoded = serde_json::to_string(value)
        .map_err(|e| EvaluationError::internal(format!("could not encode value: {e}")))?;
    Ok(Value::String(encoded))
}

pub fn type_of(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let value = value_arg(&args, 0)?;
    Ok(Value::String(type_name(value).to_string()))
}
