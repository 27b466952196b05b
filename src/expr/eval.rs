// ============================================================================
// spark-bind - Expression Interpreter
// Walks an AST against a Scope
// ============================================================================
//
// Identifiers resolve through `Scope::get`, so evaluating inside an effect
// subscribes to exactly the names read. Writes go through `Scope::set`: a
// nested write such as `user.name = x` or `items.push(x)` rebuilds the
// top-level value and assigns it back, which is what notifies readers.
// ============================================================================

use serde_json::{Map, Value};

use super::ast::{AssignOp, BinaryOp, Expr, LogicalOp, UnaryOp};
use super::builtins::{call_global, call_math, call_method, is_global};
use super::value::{add, compare, kind_name, loose_eq, number, strict_eq, to_display, to_number, truthy, type_of};
use crate::error::EvaluationError;
use crate::primitives::scope::Scope;

/// Evaluate an expression to a value.
pub fn eval(expr: &Expr, scope: &Scope) -> Result<Value, EvaluationError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Array(items) => items
            .iter()
            .map(|item| eval(item, scope))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expr::Object(entries) => {
            let mut map = Map::new();
            for (key, value) in entries {
                map.insert(key.clone(), eval(value, scope)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Identifier(name) => lookup(name, scope),
        Expr::Member { object, property } => {
            let receiver = eval(object, scope)?;
            read_property(&receiver, property)
        }
        Expr::Index { object, index } => {
            let receiver = eval(object, scope)?;
            let key = eval(index, scope)?;
            read_index(&receiver, &key)
        }
        Expr::Call { callee, args } => call(callee, args, scope),
        Expr::Unary { op, operand } => {
            let value = eval(operand, scope)?;
            Ok(match op {
                UnaryOp::Not => Value::Bool(!truthy(&value)),
                UnaryOp::Minus => number(-to_number(&value)),
                UnaryOp::Plus => number(to_number(&value)),
                UnaryOp::TypeOf => Value::String(type_of(&value).to_string()),
            })
        }
        Expr::Binary { op, left, right } => {
            let left = eval(left, scope)?;
            let right = eval(right, scope)?;
            Ok(binary(*op, &left, &right))
        }
        Expr::Logical { op, left, right } => {
            let left = eval(left, scope)?;
            let short_circuit = match op {
                LogicalOp::And => !truthy(&left),
                LogicalOp::Or => truthy(&left),
                LogicalOp::Nullish => !left.is_null(),
            };
            if short_circuit {
                Ok(left)
            } else {
                eval(right, scope)
            }
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => {
            if truthy(&eval(test, scope)?) {
                eval(consequent, scope)
            } else {
                eval(alternate, scope)
            }
        }
        Expr::Assign { op, target, value } => {
            let rhs = eval(value, scope)?;
            let result = match op {
                AssignOp::Assign => rhs,
                compound => {
                    let current = eval(target, scope)?;
                    let op = match compound {
                        AssignOp::Add => BinaryOp::Add,
                        AssignOp::Sub => BinaryOp::Sub,
                        AssignOp::Mul => BinaryOp::Mul,
                        _ => BinaryOp::Div,
                    };
                    binary(op, &current, &rhs)
                }
            };
            assign(target, result.clone(), scope)?;
            Ok(result)
        }
        Expr::Update {
            increment,
            prefix,
            target,
        } => {
            let old = to_number(&eval(target, scope)?);
            let new = if *increment { old + 1.0 } else { old - 1.0 };
            assign(target, number(new), scope)?;
            Ok(number(if *prefix { new } else { old }))
        }
        Expr::Chain(items) => {
            let mut last = Value::Null;
            for item in items {
                last = eval(item, scope)?;
            }
            Ok(last)
        }
    }
}

fn lookup(name: &str, scope: &Scope) -> Result<Value, EvaluationError> {
    if let Some(value) = scope.get(name) {
        return Ok(value);
    }
    if scope.function(name).is_some() || is_global(name) {
        return Err(EvaluationError::Type(format!("`{name}` is a function and must be called")));
    }
    Err(EvaluationError::Undefined(name.to_string()))
}

// =============================================================================
// PROPERTY ACCESS
// =============================================================================

fn read_property(receiver: &Value, property: &str) -> Result<Value, EvaluationError> {
    match receiver {
        Value::Null => Err(EvaluationError::InvalidAccess {
            receiver: "null",
            property: property.to_string(),
        }),
        Value::Object(map) => Ok(map.get(property).cloned().unwrap_or(Value::Null)),
        Value::Array(items) if property == "length" => Ok(number(items.len() as f64)),
        Value::String(s) if property == "length" => Ok(number(s.chars().count() as f64)),
        _ => Ok(Value::Null),
    }
}

/// Largest usable array position
const MAX_ARRAY_INDEX: f64 = (u32::MAX - 1) as f64;

/// How far past the end an indexed write may extend an array
const MAX_ARRAY_GROWTH: usize = 1024;

/// Array position for an index value, if it is a non-negative integer.
fn array_position(key: &Value) -> Option<usize> {
    let n = match key {
        Value::Number(_) | Value::String(_) => to_number(key),
        _ => return None,
    };
    (n >= 0.0 && n <= MAX_ARRAY_INDEX && n.fract() == 0.0).then_some(n as usize)
}

fn read_index(receiver: &Value, key: &Value) -> Result<Value, EvaluationError> {
    match receiver {
        Value::Array(items) => match array_position(key) {
            Some(i) => Ok(items.get(i).cloned().unwrap_or(Value::Null)),
            None => read_property(receiver, &to_display(key)),
        },
        Value::String(s) => match array_position(key) {
            Some(i) => Ok(s
                .chars()
                .nth(i)
                .map(|c| Value::String(c.to_string()))
                .unwrap_or(Value::Null)),
            None => read_property(receiver, &to_display(key)),
        },
        _ => read_property(receiver, &to_display(key)),
    }
}

// =============================================================================
// OPERATORS
// =============================================================================

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    let arithmetic = |f: fn(f64, f64) -> f64| number(f(to_number(left), to_number(right)));
    let ordering = |accept: fn(std::cmp::Ordering) -> bool| {
        Value::Bool(compare(left, right).is_some_and(accept))
    };

    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => arithmetic(|a, b| a - b),
        BinaryOp::Mul => arithmetic(|a, b| a * b),
        BinaryOp::Div => arithmetic(|a, b| a / b),
        BinaryOp::Rem => arithmetic(|a, b| a % b),
        BinaryOp::Lt => ordering(|o| o.is_lt()),
        BinaryOp::Gt => ordering(|o| o.is_gt()),
        BinaryOp::Le => ordering(|o| o.is_le()),
        BinaryOp::Ge => ordering(|o| o.is_ge()),
        BinaryOp::Eq => Value::Bool(loose_eq(left, right)),
        BinaryOp::NotEq => Value::Bool(!loose_eq(left, right)),
        BinaryOp::StrictEq => Value::Bool(strict_eq(left, right)),
        BinaryOp::StrictNotEq => Value::Bool(!strict_eq(left, right)),
    }
}

// =============================================================================
// CALLS
// =============================================================================

fn eval_args(args: &[Expr], scope: &Scope) -> Result<Vec<Value>, EvaluationError> {
    args.iter().map(|arg| eval(arg, scope)).collect()
}

fn call(callee: &Expr, args: &[Expr], scope: &Scope) -> Result<Value, EvaluationError> {
    match callee {
        Expr::Identifier(name) => {
            let args = eval_args(args, scope)?;
            if let Some(f) = scope.function(name) {
                return f(scope, &args);
            }
            if let Some(value) = call_global(name, &args) {
                return Ok(value);
            }
            if scope.contains(name) {
                Err(EvaluationError::NotCallable(name.clone()))
            } else {
                Err(EvaluationError::Undefined(name.clone()))
            }
        }

        Expr::Member { object, property }
            if matches!(object.as_ref(), Expr::Identifier(name) if name == "Math" && !scope.contains("Math")) =>
        {
            let args = eval_args(args, scope)?;
            call_math(property, &args)
        }

        Expr::Member { object, property } => {
            let mut receiver = eval(object, scope)?;
            if let Value::Object(map) = &receiver {
                if map.contains_key(property.as_str()) {
                    return Err(EvaluationError::NotCallable(callee.to_string()));
                }
            }
            let args = eval_args(args, scope)?;
            let result = call_method(&mut receiver, property, &args)?;
            if result.mutated {
                if !object.is_assignable() {
                    return Err(EvaluationError::NotAssignable(object.to_string()));
                }
                assign(object, receiver, scope)?;
            }
            Ok(result.value)
        }

        other => Err(EvaluationError::NotCallable(other.to_string())),
    }
}

// =============================================================================
// ASSIGNMENT
// =============================================================================

/// Write `value` to the place `target` names.
pub fn assign(target: &Expr, value: Value, scope: &Scope) -> Result<(), EvaluationError> {
    match target {
        Expr::Identifier(name) => scope.set(name, value),

        Expr::Member { object, property } => {
            let mut container = eval(object, scope)?;
            write_key(&mut container, &Value::String(property.clone()), value)?;
            assign(object, container, scope)
        }

        Expr::Index { object, index } => {
            let key = eval(index, scope)?;
            let mut container = eval(object, scope)?;
            write_key(&mut container, &key, value)?;
            assign(object, container, scope)
        }

        other => Err(EvaluationError::NotAssignable(other.to_string())),
    }
}

fn write_key(container: &mut Value, key: &Value, value: Value) -> Result<(), EvaluationError> {
    match container {
        Value::Object(map) => {
            map.insert(to_display(key), value);
            Ok(())
        }
        Value::Array(items) => match array_position(key) {
            Some(i) if i < items.len() => {
                items[i] = value;
                Ok(())
            }
            Some(i) if i - items.len() <= MAX_ARRAY_GROWTH => {
                items.resize(i, Value::Null);
                items.push(value);
                Ok(())
            }
            Some(i) => Err(EvaluationError::Type(format!(
                "index {i} is too far past the end of an array of length {}",
                items.len()
            ))),
            None => Err(EvaluationError::Type(format!(
                "cannot use {} as an array index",
                to_display(key)
            ))),
        },
        Value::Null => Err(EvaluationError::InvalidAccess {
            receiver: "null",
            property: to_display(key),
        }),
        other => Err(EvaluationError::Type(format!(
            "cannot set `{}` on {}",
            to_display(key),
            kind_name(other)
        ))),
    }
}

// =============================================================================
// TESTS
// =============================================================================
