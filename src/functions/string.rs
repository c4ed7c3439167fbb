//! String functions. Indices and lengths count Unicode code points, in
//! line with `length()`.

use serde_json::Value;

use super::{string_arg, value_arg, ArgValue, ExprRuntime};
use crate::error::EvaluationError;
use crate::value::{as_integer, as_non_negative_integer, number};

pub fn starts_with(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let subject = string_arg(&args, 0)?;
    let prefix = string_arg(&args, 1)?;
    Ok(Value::Bool(subject.starts_with(prefix)))
}

pub fn ends_with(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let subject = string_arg(&args, 0)?;
    let suffix = string_arg(&args, 1)?;
    Ok(Value::Bool(subject.ends_with(suffix)))
}

pub fn lower(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    Ok(Value::String(string_arg(&args, 0)?.to_lowercase()))
}

pub fn upper(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    Ok(Value::String(string_arg(&args, 0)?.to_uppercase()))
}

pub fn join(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let separator = string_arg(&args, 0)?;
    let items = crate::value::as_string_array(value_arg(&args, 1)?)
        .ok_or_else(|| EvaluationError::internal("join() argument is not array[string]"))?;
    Ok(Value::String(items.join(separator)))
}

pub fn find_first(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    find_impl("find_first", &args, Direction::First)
}

pub fn find_last(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    find_impl("find_last", &args, Direction::Last)
}

enum Direction {
    First,
    Last,
}

fn find_impl(name: &str, args: &[ArgValue], direction: Direction) -> Result<Value, EvaluationError> {
    let subject: Vec<char> = string_arg(args, 0)?.chars().collect();
    let needle: Vec<char> = string_arg(args, 1)?.chars().collect();
    if subject.is_empty() || needle.is_empty() {
        return Ok(Value::Null);
    }

    let mut start = 0usize;
    if args.len() > 2 {
        let n = as_integer(value_arg(args, 2)?)
            .ok_or_else(|| EvaluationError::not_an_integer(name, "start"))?;
        start = n.max(0) as usize;
    }
    let mut end = subject.len();
    if args.len() > 3 {
        let n = as_integer(value_arg(args, 3)?)
            .ok_or_else(|| EvaluationError::not_an_integer(name, "end"))?;
        end = (n.max(0) as usize).min(subject.len());
    }
    if start + needle.len() > end {
        return Ok(Value::Null);
    }

    let window = &subject[start..end];
    let positions = window.windows(needle.len()).enumerate();
    let found = match direction {
        Direction::First => positions.clone().find(|(_, w)| *w == needle.as_slice()),
        Direction::Last => positions.clone().filter(|(_, w)| *w == needle.as_slice()).last(),
    };
    Ok(found
        .map(|(offset, _)| number((start + offset) as f64))
        .unwrap_or(Value::Null))
}

fn pad_char(name: &str, args: &[ArgValue]) -> Result<String, EvaluationError> {
    if args.len() > 2 {
        let pad = string_arg(args, 2)?;
        if pad.chars().count() > 1 {
            return Err(EvaluationError::invalid_value(format!(
                "the function '{name}' expects its 'pad' argument to be a string of length 1"
            )));
        }
        Ok(pad.to_string())
    } else {
        Ok(" ".to_string())
    }
}

pub fn pad_left(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let subject = string_arg(&args, 0)?;
    let width = as_non_negative_integer(value_arg(&args, 1)?)
        .ok_or_else(|| EvaluationError::not_a_positive_integer("pad_left", "width"))?;
    let pad = pad_char("pad_left", &args)?;
    let missing = width.saturating_sub(subject.chars().count());
    Ok(Value::String(format!("{}{}", pad.repeat(missing), subject)))
}

pub fn pad_right(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let subject = string_arg(&args, 0)?;
    let width = as_non_negative_integer(value_arg(&args, 1)?)
        .ok_or_else(|| EvaluationError::not_a_positive_integer("pad_right", "width"))?;
    let pad = pad_char("pad_right", &args)?;
    let missing = width.saturating_sub(subject.chars().count());
    Ok(Value::String(format!("{}{}", subject, pad.repeat(missing))))
}

pub fn replace(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let subject = string_arg(&args, 0)?;
    let old = string_arg(&args, 1)?;
    let new = string_arg(&args, 2)?;
    let count = if args.len() > 3 {
        as_integer(value_arg(&args, 3)?)
            .filter(|n| *n >= -1)
            .ok_or_else(|| EvaluationError::not_a_positive_integer("replace", "count"))?
    } else {
        -1
    };
    let replaced = if count < 0 {
        subject.replace(old, new)
    } else {
        subject.replacen(old, new, count as usize)
    };
    Ok(Value::String(replaced))
}

pub fn split(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    let subject = string_arg(&args, 0)?;
    if subject.is_empty() {
        return Ok(Value::Array(Vec::new()));
    }
    let separator = string_arg(&args, 1)?;
    let count = if args.len() > 2 {
        Some(
            as_non_negative_integer(value_arg(&args, 2)?)
                .ok_or_else(|| EvaluationError::not_a_positive_integer("split", "count"))?,
        )
    } else {
        None
    };

    if count == Some(0) {
        return Ok(Value::Array(vec![Value::String(subject.to_string())]));
    }

    let parts: Vec<String> = if separator.is_empty() {
        // An empty separator explodes into code points, keeping at most
        // `count` splits off the front.
        let chars: Vec<String> = subject.chars().map(|c| c.to_string()).collect();
        match count {
            Some(n) if n < chars.len() => {
                let mut parts: Vec<String> = chars[..n].to_vec();
                parts.push(chars[n..].concat());
                parts
            }
            _ => chars,
        }
    } else {
        match count {
            Some(n) => subject.splitn(n + 1, separator).map(str::to_string).collect(),
            None => subject.split(separator).map(str::to_string).collect(),
        }
    };
    Ok(Value::Array(parts.into_iter().map(Value::String).collect()))
}

fn trim_impl(
    args: &[ArgValue],
    trim: impl Fn(&str, &dyn Fn(char) -> bool) -> String,
) -> Result<Value, EvaluationError> {
    let subject = string_arg(args, 0)?;
    let cutset = if args.len() > 1 {
        string_arg(args, 1)?
    } else {
        ""
    };
    let trimmed = if cutset.is_empty() {
        trim(subject, &char::is_whitespace)
    } else {
        trim(subject, &|c| cutset.contains(c))
    };
    Ok(Value::String(trimmed))
}

pub fn trim(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    trim_impl(&args, |s, pred| s.trim_matches(pred).to_string())
}

pub fn trim_left(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    trim_impl(&args, |s, pred| s.trim_start_matches(pred).to_string())
}

pub fn trim_right(_: &dyn ExprRuntime, args: Vec<ArgValue>) -> Result<Value, EvaluationError> {
    trim_impl(&args, |s, pred| s.trim_end_matches(pred).to_string())
}

#[cfg(test)]
mod tests {
    use super::super::tests_support::{call, try_call};
    use serde_json::json;

    #[test]
    fn affix_tests() {
        assert_eq!(call("starts_with", vec![json!("foobar"), json!("foo")]), json!(true));
        assert_eq!(call("starts_with", vec![json!("foobar"), json!("bar")]), json!(false));
        assert_eq!(call("ends_with", vec![json!("foobar"), json!("bar")]), json!(true));
    }

    #[test]
    fn case_mapping() {
        assert_eq!(call("upper", vec![json!("héllo")]), json!("HÉLLO"));
        assert_eq!(call("lower", vec![json!("ABC")]), json!("abc"));
    }

    #[test]
    fn join_strings() {
        assert_eq!(
            call("join", vec![json!(", "), json!(["a", "b", "c"])]),
            json!("a, b, c")
        );
    }

    #[test]
    fn find_first_and_last() {
        assert_eq!(call("find_first", vec![json!("subject string"), json!("string")]), json!(8));
        assert_eq!(call("find_first", vec![json!("sss"), json!("s")]), json!(0));
        assert_eq!(call("find_last", vec![json!("sss"), json!("s")]), json!(2));
        assert_eq!(call("find_first", vec![json!("abc"), json!("z")]), json!(null));
        assert_eq!(call("find_first", vec![json!(""), json!("a")]), json!(null));
        assert_eq!(call("find_first", vec![json!("abc"), json!("")]), json!(null));
    }

    #[test]
    fn find_with_bounds() {
        assert_eq!(
            call("find_first", vec![json!("sss"), json!("s"), json!(1)]),
            json!(1)
        );
        assert_eq!(
            call("find_last", vec![json!("sss"), json!("s"), json!(0), json!(2)]),
            json!(1)
        );
        // Bounds clamp instead of failing.
        assert_eq!(
            call("find_first", vec![json!("abc"), json!("c"), json!(-5), json!(99)]),
            json!(2)
        );
        assert!(try_call("find_first", vec![json!("abc"), json!("c"), json!(1.5)]).is_err());
    }

    #[test]
    fn find_counts_code_points() {
        assert_eq!(call("find_first", vec![json!("héllo"), json!("llo")]), json!(2));
    }

    #[test]
    fn padding() {
        assert_eq!(call("pad_left", vec![json!("abc"), json!(5)]), json!("  abc"));
        assert_eq!(
            call("pad_right", vec![json!("abc"), json!(5), json!(".")]),
            json!("abc..")
        );
        assert_eq!(call("pad_left", vec![json!("abc"), json!(2)]), json!("abc"));
        assert!(try_call("pad_left", vec![json!("abc"), json!(5), json!("xy")]).is_err());
        assert!(try_call("pad_left", vec![json!("abc"), json!(-1)]).is_err());
    }

    #[test]
    fn replace_counts() {
        assert_eq!(
            call("replace", vec![json!("aaaa"), json!("a"), json!("b")]),
            json!("bbbb")
        );
        assert_eq!(
            call("replace", vec![json!("aaaa"), json!("a"), json!("b"), json!(2)]),
            json!("bbaa")
        );
        assert_eq!(
            call("replace", vec![json!("aaaa"), json!("a"), json!("b"), json!(-1)]),
            json!("bbbb")
        );
        assert!(try_call("replace", vec![json!("a"), json!("a"), json!("b"), json!(-2)]).is_err());
    }

    #[test]
    fn split_variants() {
        assert_eq!(call("split", vec![json!("a,b,c"), json!(",")]), json!(["a", "b", "c"]));
        assert_eq!(
            call("split", vec![json!("a,b,c"), json!(","), json!(1)]),
            json!(["a", "b,c"])
        );
        assert_eq!(
            call("split", vec![json!("a,b,c"), json!(","), json!(0)]),
            json!(["a,b,c"])
        );
        assert_eq!(call("split", vec![json!(""), json!(",")]), json!([]));
        assert_eq!(call("split", vec![json!("abc"), json!("")]), json!(["a", "b", "c"]));
    }

    #[test]
    fn trimming() {
        assert_eq!(call("trim", vec![json!("  abc  ")]), json!("abc"));
        assert_eq!(call("trim", vec![json!("xxabcxx"), json!("x")]), json!("abc"));
        assert_eq!(call("trim_left", vec![json!("  abc  ")]), json!("abc  "));
        assert_eq!(call("trim_right", vec![json!("  abc  ")]), json!("  abc"));
    }
}
