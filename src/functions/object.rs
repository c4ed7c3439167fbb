//! Object constructors and accessors.

use serde_json::{Map, Value};

use super::{array_arg, object_arg, ArgValue, ExprRuntime};
use crate::error::EvaluationError;

pub fn keys(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let object = object_arg(&args, 0)?;
    Ok(Value::Array(
        object.keys().map(|k| Value::String(k.clone())).collect(),
    ))
}

pub fn values(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let object = object_arg(&args, 0)?;
    Ok(Value::Array(object.values().cloned().collect()))
}

pub fn items(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let object = object_arg(&args, 0)?;
    Ok(Value::Array(
        object
            .iter()
            .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), v.clone()]))
            .collect(),
    ))
}

pub fn from_items(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let pairs = array_arg(&args, 0)?;
    let mut result = Map::new();
    for pair in pairs {
        let entry = pair.as_array().filter(|p| p.len() == 2).ok_or_else(|| {
            EvaluationError::invalid_value(
                "each array must contain two elements, a pair of string and value",
            )
        })?;
        let key = entry[0].as_str().ok_or_else(|| {
            EvaluationError::invalid_value(
                "each array must contain two elements, a pair of string and value",
            )
        })?;
        result.insert(key.to_string(), entry[1].clone());
    }
    Ok(Value::Object(result))
}

pub fn merge(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let mut result = Map::new();
    for i in 0..args.len() {
        let object = object_arg(&args, i)?;
        for (key, value) in object {
            result.insert(key.clone(), value.clone());
        }
    }
    Ok(Value::Object(result))
}
