//! Tree-walking interpreter.
//!
//! [`TreeInterpreter::evaluate`] is a single match over the node kind. The
//! interpreter itself is stateless between calls: the current value and the
//! variable bindings travel through the recursion, so a compiled query can
//! be evaluated from many threads at once.

use serde_json::{Map, Value};

use crate::ast::Node;
use crate::bindings::Bindings;
use crate::error::EvaluationError;
use crate::functions::{ArgValue, ExpRef, ExprRuntime, FunctionRegistry};
use crate::lexer::TokenType;
use crate::value::{as_number, deep_equal, is_truthy, number, slice, type_name};

pub(crate) struct TreeInterpreter<'a> {
    root: &'a Value,
    functions: &'a FunctionRegistry,
}

impl<'a> TreeInterpreter<'a> {
    pub fn new(root: &'a Value, functions: &'a FunctionRegistry) -> Self {
        Self { root, functions }
    }

    pub fn evaluate(
        &self,
        node: &Node,
        value: &Value,
        bindings: &Bindings,
    ) -> Result<Value, EvaluationError> {
        match node {
            Node::Identity | Node::CurrentNode => Ok(value.clone()),
            Node::RootNode => Ok(self.root.clone()),

            Node::Literal(literal) => Ok(literal.clone()),

            Node::Field(name) => match value {
                Value::Object(map) => Ok(map.get(name).cloned().unwrap_or(Value::Null)),
                _ => Ok(Value::Null),
            },

            Node::Index(index) => match value {
                Value::Array(items) => {
                    let mut i = *index;
                    if i < 0 {
                        i += items.len() as i64;
                    }
                    if i >= 0 && (i as usize) < items.len() {
                        Ok(items[i as usize].clone())
                    } else {
                        Ok(Value::Null)
                    }
                }
                _ => Ok(Value::Null),
            },

            Node::Subexpression { left, right } | Node::IndexExpression { left, right } => {
                let left = self.evaluate(left, value, bindings)?;
                if left.is_null() {
                    return Ok(Value::Null);
                }
                self.evaluate(right, &left, bindings)
            }

            Node::Pipe { left, right } => {
                let left = self.evaluate(left, value, bindings)?;
                self.evaluate(right, &left, bindings)
            }

            Node::Flatten(child) => {
                let left = self.evaluate(child, value, bindings)?;
                let Value::Array(items) = left else {
                    return Ok(Value::Null);
                };
                let mut flattened = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Array(inner) => flattened.extend(inner),
                        other => flattened.push(other),
                    }
                }
                Ok(Value::Array(flattened))
            }

            Node::Projection { left, right } => {
                // A slice projection applied to a string is a plain
                // sub-expression: the sliced string passes through once.
                let sliced_string_ok = matches!(
                    left.as_ref(),
                    Node::IndexExpression { right: inner, .. } if matches!(inner.as_ref(), Node::Slice(_))
                );
                let left = self.evaluate(left, value, bindings)?;
                match left {
                    Value::Array(items) => self.project(right, items, bindings),
                    Value::String(s) if sliced_string_ok => {
                        self.evaluate(right, &Value::String(s), bindings)
                    }
                    _ => Ok(Value::Null),
                }
            }

            Node::ValueProjection { left, right } => {
                let left = self.evaluate(left, value, bindings)?;
                let Value::Object(map) = left else {
                    return Ok(Value::Null);
                };
                let values: Vec<Value> = map.into_iter().map(|(_, v)| v).collect();
                self.project(right, values, bindings)
            }

            Node::FilterProjection {
                left,
                right,
                condition,
            } => {
                let left = self.evaluate(left, value, bindings)?;
                let Value::Array(items) = left else {
                    return Ok(Value::Null);
                };
                let mut collected = Vec::new();
                for item in items {
                    let matched = self.evaluate(condition, &item, bindings)?;
                    if is_truthy(&matched) {
                        let current = self.evaluate(right, &item, bindings)?;
                        if !current.is_null() {
                            collected.push(current);
                        }
                    }
                }
                Ok(Value::Array(collected))
            }

            Node::Slice(params) => match value {
                Value::Array(items) => Ok(Value::Array(slice(items, *params)?)),
                Value::String(s) => {
                    let chars: Vec<char> = s.chars().collect();
                    let sliced = slice(&chars, *params)?;
                    Ok(Value::String(sliced.into_iter().collect()))
                }
                _ => Ok(Value::Null),
            },

            Node::MultiSelectList(children) => {
                if value.is_null() {
                    return Ok(Value::Null);
                }
                let mut collected = Vec::with_capacity(children.len());
                for child in children {
                    collected.push(self.evaluate(child, value, bindings)?);
                }
                Ok(Value::Array(collected))
            }

            Node::MultiSelectHash(children) => {
                if value.is_null() {
                    return Ok(Value::Null);
                }
                let mut collected = Map::new();
                for child in children {
                    let Node::KeyValPair { key, value: expr } = child else {
                        return Err(EvaluationError::internal(
                            "multi-select hash child is not a key/value pair",
                        ));
                    };
                    collected.insert(key.clone(), self.evaluate(expr, value, bindings)?);
                }
                Ok(Value::Object(collected))
            }

            Node::KeyValPair { value: expr, .. } => self.evaluate(expr, value, bindings),

            Node::Comparator { op, left, right } => {
                let left = self.evaluate(left, value, bindings)?;
                let right = self.evaluate(right, value, bindings)?;
                match op {
                    TokenType::Eq => return Ok(Value::Bool(deep_equal(&left, &right))),
                    TokenType::Ne => return Ok(Value::Bool(!deep_equal(&left, &right))),
                    _ => {}
                }
                // Ordering comparators only apply to numbers; anything else
                // yields null rather than an error.
                let (Some(l), Some(r)) = (as_number(&left), as_number(&right)) else {
                    return Ok(Value::Null);
                };
                let result = match op {
                    TokenType::Lt => l < r,
                    TokenType::Lte => l <= r,
                    TokenType::Gt => l > r,
                    TokenType::Gte => l >= r,
                    _ => {
                        return Err(EvaluationError::internal(format!(
                            "unexpected comparator {op:?}"
                        )));
                    }
                };
                Ok(Value::Bool(result))
            }

            Node::ArithmeticExpression { op, left, right } => {
                let left = self.evaluate(left, value, bindings)?;
                let right = self.evaluate(right, value, bindings)?;
                let (Some(l), Some(r)) = (as_number(&left), as_number(&right)) else {
                    return Ok(Value::Null);
                };
                let result = match op {
                    TokenType::Plus => l + r,
                    TokenType::Minus => l - r,
                    TokenType::Multiply | TokenType::Star => l * r,
                    TokenType::Divide => l / r,
                    TokenType::Modulo => l % r,
                    TokenType::Div => (l / r).floor(),
                    _ => {
                        return Err(EvaluationError::internal(format!(
                            "unexpected arithmetic operator {op:?}"
                        )));
                    }
                };
                Ok(number(result))
            }

            Node::ArithmeticUnaryExpression { op, operand } => {
                let operand = self.evaluate(operand, value, bindings)?;
                let Some(n) = as_number(&operand) else {
                    return Ok(Value::Null);
                };
                match op {
                    TokenType::Plus => Ok(number(n)),
                    TokenType::Minus => Ok(number(-n)),
                    _ => Err(EvaluationError::internal(format!(
                        "unexpected unary operator {op:?}"
                    ))),
                }
            }

            Node::OrExpression { left, right } => {
                let matched = self.evaluate(left, value, bindings)?;
                if is_truthy(&matched) {
                    Ok(matched)
                } else {
                    self.evaluate(right, value, bindings)
                }
            }

            Node::AndExpression { left, right } => {
                let matched = self.evaluate(left, value, bindings)?;
                if is_truthy(&matched) {
                    self.evaluate(right, value, bindings)
                } else {
                    Ok(matched)
                }
            }

            Node::NotExpression(child) => {
                let matched = self.evaluate(child, value, bindings)?;
                Ok(Value::Bool(!is_truthy(&matched)))
            }

            Node::FunctionExpression { name, args } => {
                let mut resolved = Vec::with_capacity(args.len());
                for arg in args {
                    match arg {
                        Node::ExpRef(inner) => resolved.push(ArgValue::Expref(ExpRef {
                            node: (**inner).clone(),
                            context: value.clone(),
                            bindings: bindings.clone(),
                        })),
                        other => resolved.push(ArgValue::Value(self.evaluate(
                            other,
                            value,
                            bindings,
                        )?)),
                    }
                }
                self.functions.call(name, resolved, self)
            }

            Node::ExpRef(_) => Err(EvaluationError::type_error(
                "an expression reference can only be passed to a function",
            )),

            Node::Variable(name) => bindings.resolve(name),

            Node::LetExpression {
                bindings: binding_list,
                body,
            } => {
                let Node::Bindings(list) = binding_list.as_ref() else {
                    return Err(EvaluationError::internal("let without a bindings list"));
                };
                let mut scope = bindings.clone();
                for binding in list {
                    let Node::Binding { variable, expr } = binding else {
                        return Err(EvaluationError::internal("malformed let binding"));
                    };
                    let Node::Variable(name) = variable.as_ref() else {
                        return Err(EvaluationError::internal("let binding without a variable"));
                    };
                    let bound = self.evaluate(expr, value, &scope)?;
                    scope = scope.register(name.clone(), bound);
                }
                self.evaluate(body, value, &scope)
            }

            Node::Bindings(_) | Node::Binding { .. } => Err(EvaluationError::internal(format!(
                "binding node evaluated outside a let expression (on {})",
                type_name(value)
            ))),
        }
    }

    /// Applies `expr` to every element, discarding null results.
    fn project(
        &self,
        expr: &Node,
        items: Vec<Value>,
        bindings: &Bindings,
    ) -> Result<Value, EvaluationError> {
        let mut collected = Vec::with_capacity(items.len());
        for item in items {
            let current = self.evaluate(expr, &item, bindings)?;
            if !current.is_null() {
                collected.push(current);
            }
        }
        Ok(Value::Array(collected))
    }
}

impl ExprRuntime for TreeInterpreter<'_> {
    fn call_expression(&self, expref: &ExpRef, value: &Value) -> Result<Value, EvaluationError> {
        self.evaluate(&expref.node, value, &expref.bindings)
    }

    fn call_expression_scoped(
        &self,
        expref: &ExpRef,
        value: &Value,
        scope: &Map<String, Value>,
    ) -> Result<Value, EvaluationError> {
        let mut bindings = expref.bindings.clone();
        for (name, bound) in scope {
            bindings = bindings.register(name.clone(), bound.clone());
        }
        self.evaluate(&expref.node, value, &bindings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use serde_json::json;

    fn eval(expression: &str, data: &Value) -> Result<Value, EvaluationError> {
        let node = parse(expression).unwrap();
        let functions = FunctionRegistry::default();
        let interpreter = TreeInterpreter::new(data, &functions);
        interpreter.evaluate(&node, data, &Bindings::new())
    }

    fn eval_ok(expression: &str, data: Value) -> Value {
        match eval(expression, &data) {
            Ok(value) => value,
            Err(e) => panic!("{expression} failed: {e}"),
        }
    }

    #[test]
    fn identity_and_root() {
        assert_eq!(eval_ok("@", json!({"a": 1})), json!({"a": 1}));
        assert_eq!(eval_ok("`null`", json!(42)), json!(null));
        assert_eq!(eval_ok("a.b | $", json!({"a": {"b": 1}})), json!({"a": {"b": 1}}));
    }

    #[test]
    fn field_lookups() {
        let data = json!({"foo": {"bar": {"baz": [0, 1, 2, 3, 4]}}});
        assert_eq!(eval_ok("foo.bar.baz[2]", data.clone()), json!(2));
        assert_eq!(eval_ok("foo.missing", data.clone()), json!(null));
        assert_eq!(eval_ok("missing.anything.at.all", data), json!(null));
    }

    #[test]
    fn quoted_field_lookup() {
        let data = json!({"a b": 1, "✓": 2});
        assert_eq!(eval_ok("\"a b\"", data.clone()), json!(1));
        assert_eq!(eval_ok("\"\\u2713\"", data), json!(2));
    }

    #[test]
    fn field_on_non_object_is_null() {
        assert_eq!(eval_ok("a", json!([1, 2])), json!(null));
        assert_eq!(eval_ok("a", json!("string")), json!(null));
    }

    #[test]
    fn negative_and_out_of_range_indexes() {
        let data = json!([0, 1, 2]);
        assert_eq!(eval_ok("[0]", data.clone()), json!(0));
        assert_eq!(eval_ok("[-1]", data.clone()), json!(2));
        assert_eq!(eval_ok("[-4]", data.clone()), json!(null));
        assert_eq!(eval_ok("[5]", data), json!(null));
        assert_eq!(eval_ok("[0]", json!("not an array")), json!(null));
    }

    #[test]
    fn projection_drops_nulls() {
        let data = json!({"a": [{"b": 1}, {"c": 2}, {"b": 3}]});
        assert_eq!(eval_ok("a[*].b", data), json!([1, 3]));
    }

    #[test]
    fn projection_on_non_array_is_null() {
        assert_eq!(eval_ok("[*].x", json!({"a": 1})), json!(null));
        assert_eq!(eval_ok("a[*]", json!({"a": 42})), json!(null));
    }

    #[test]
    fn pipe_stops_projection() {
        let data = json!({"a": [{"b": 1}, {"b": 2}]});
        assert_eq!(eval_ok("a[*].b | [0]", data.clone()), json!(1));
        // Without the pipe the index applies per element.
        assert_eq!(eval_ok("a[*].b[0]", data), json!([]));
    }

    #[test]
    fn flatten_one_level() {
        let data = json!([[0, 1], 2, [3, [4, 5]]]);
        assert_eq!(eval_ok("[]", data), json!([0, 1, 2, 3, [4, 5]]));
        assert_eq!(eval_ok("[]", json!(42)), json!(null));
    }

    #[test]
    fn flatten_projects_over_result() {
        let data = json!({"a": [[{"b": 1}], [{"b": 2}]]});
        assert_eq!(eval_ok("a[].b", data), json!([1, 2]));
    }

    #[test]
    fn value_projection_over_object_values() {
        let data = json!({"ops": {"x": {"n": 1}, "y": {"n": 2}}});
        let result = eval_ok("ops.*.n", data);
        let mut items = result.as_array().unwrap().clone();
        items.sort_by_key(|v| v.as_i64());
        assert_eq!(items, vec![json!(1), json!(2)]);
        assert_eq!(eval_ok("a.*", json!({"a": [1]})), json!(null));
    }

    #[test]
    fn filter_projection() {
        let data = json!([{"a": 5, "b": "x"}, {"a": 10, "b": "y"}, {"a": 20, "b": "z"}]);
        assert_eq!(eval_ok("[?a >= `10`].b", data), json!(["y", "z"]));
    }

    #[test]
    fn filter_condition_truthiness() {
        let data = json!([{"n": ""}, {"n": "x"}, {"n": []}, {"n": [1]}]);
        assert_eq!(eval_ok("[?n].n", data), json!(["x", [1]]));
    }

    #[test]
    fn slices_on_arrays_and_strings() {
        let data = json!([0, 1, 2, 3, 4]);
        assert_eq!(eval_ok("[1:3]", data.clone()), json!([1, 2]));
        assert_eq!(eval_ok("[::2]", data.clone()), json!([0, 2, 4]));
        assert_eq!(eval_ok("[::-1]", data), json!([4, 3, 2, 1, 0]));
        assert_eq!(eval_ok("[::-1]", json!("héllo")), json!("olléh"));
        assert_eq!(eval_ok("[1:3]", json!("héllo")), json!("él"));
    }

    #[test]
    fn slice_step_zero_errors() {
        assert!(eval("[::0]", &json!([1, 2])).is_err());
        assert!(eval("[::0]", &json!("abc")).is_err());
    }

    #[test]
    fn multi_select_list_and_hash() {
        let data = json!({"a": 1, "b": 2});
        assert_eq!(eval_ok("[a, b]", data.clone()), json!([1, 2]));
        assert_eq!(eval_ok("{x: a, y: b}", data), json!({"x": 1, "y": 2}));
        // A null receiver produces null, not a structure of nulls.
        assert_eq!(eval_ok("missing.[a, b]", json!({})), json!(null));
        assert_eq!(eval_ok("missing.{x: a}", json!({})), json!(null));
    }

    #[test]
    fn comparators() {
        let data = json!({"a": 1, "b": 2});
        assert_eq!(eval_ok("a == a", data.clone()), json!(true));
        assert_eq!(eval_ok("a != b", data.clone()), json!(true));
        assert_eq!(eval_ok("a < b", data.clone()), json!(true));
        // Ordering a non-number yields null.
        assert_eq!(eval_ok("a < `\"x\"`", data.clone()), json!(null));
        assert_eq!(eval_ok("`[0]` == `[0]`", data), json!(true));
    }

    #[test]
    fn arithmetic() {
        let data = json!({"a": 7, "b": 2});
        assert_eq!(eval_ok("a + b", data.clone()), json!(9));
        assert_eq!(eval_ok("a - b", data.clone()), json!(5));
        assert_eq!(eval_ok("a * b", data.clone()), json!(14));
        assert_eq!(eval_ok("a / b", data.clone()), json!(3.5));
        assert_eq!(eval_ok("a % b", data.clone()), json!(1));
        assert_eq!(eval_ok("a // b", data.clone()), json!(3));
        assert_eq!(eval_ok("-a", data.clone()), json!(-7));
        assert_eq!(eval_ok("+a", data.clone()), json!(7));
        assert_eq!(eval_ok("a \u{00d7} b", data.clone()), json!(14));
        assert_eq!(eval_ok("a \u{00f7} b", data), json!(3.5));
    }

    #[test]
    fn arithmetic_on_non_numbers_is_null() {
        let data = json!({"a": "x", "b": 2});
        assert_eq!(eval_ok("a + b", data.clone()), json!(null));
        assert_eq!(eval_ok("-a", data), json!(null));
    }

    #[test]
    fn division_by_zero_has_no_json_representation() {
        assert_eq!(eval_ok("`1` / `0`", json!(null)), json!(null));
    }

    #[test]
    fn or_and_not() {
        assert_eq!(eval_ok("`[]` || `1`", json!(null)), json!(1));
        assert_eq!(eval_ok("`2` || `1`", json!(null)), json!(2));
        assert_eq!(eval_ok("`2` && `1`", json!(null)), json!(1));
        assert_eq!(eval_ok("`\"\"` && `1`", json!(null)), json!(""));
        assert_eq!(eval_ok("!`\"\"`", json!(null)), json!(true));
        assert_eq!(eval_ok("!`5`", json!(null)), json!(false));
    }

    #[test]
    fn function_calls_resolve_arguments_left_to_right() {
        let data = json!({"s": "héllo"});
        assert_eq!(eval_ok("length(s)", data), json!(5));
    }

    #[test]
    fn unknown_function_errors() {
        assert!(matches!(
            eval("foo()", &json!(null)),
            Err(EvaluationError::UnknownFunction { .. })
        ));
    }

    #[test]
    fn bare_expref_is_a_type_error() {
        assert!(matches!(
            eval("&a", &json!(null)),
            Err(EvaluationError::Type { .. })
        ));
    }

    #[test]
    fn let_bindings_scope_and_restore() {
        let data = json!(1);
        assert_eq!(
            eval_ok(
                "let $x = @ in {a: $x, b: let $x = `2` in $x, c: $x}",
                data
            ),
            json!({"a": 1, "b": 2, "c": 1})
        );
    }

    #[test]
    fn let_binding_sees_earlier_bindings() {
        assert_eq!(
            eval_ok("let $a = `1`, $b = $a + `1` in $b", json!(null)),
            json!(2)
        );
    }

    #[test]
    fn let_root_capture() {
        let data = json!({"a": 42});
        assert_eq!(eval_ok("let $r = @ in $r.a", data), json!(42));
    }

    #[test]
    fn undefined_variable_errors() {
        assert!(matches!(
            eval("$nope", &json!(null)),
            Err(EvaluationError::UndefinedVariable { .. })
        ));
    }

    #[test]
    fn variables_are_not_fields() {
        // A field named like the variable does not leak into `$` lookups.
        let data = json!({"x": 1});
        assert!(eval("$x", &data).is_err());
    }

    #[test]
    fn expref_captures_bindings() {
        let data = json!([{"n": 1}, {"n": 2}]);
        assert_eq!(
            eval_ok("let $d = `10` in map(&(n + $d), @)", data),
            json!([11, 12])
        );
    }

    #[test]
    fn root_node_inside_projection() {
        let data = json!({"base": 10, "items": [{"n": 1}, {"n": 2}]});
        assert_eq!(eval_ok("items[*].[n, $.base]", data), json!([[1, 10], [2, 10]]));
    }

    #[test]
    fn sliced_string_passes_through_projection() {
        assert_eq!(eval_ok("[0:3]", json!("hello")), json!("hel"));
        assert_eq!(eval_ok("[1:]", json!("hello")), json!("ello"));
    }

    #[test]
    fn errors_propagate_out_of_projections() {
        let data = json!([{"a": 1}]);
        assert!(eval("[?$missing == `1`]", &data).is_err());
    }
}
