// ============================================================================
// spark-bind - Built-in Functions and Methods
// ============================================================================
//
// The small standard library expressions can call without the host
// registering anything: the `String`, `Number` and `Boolean` conversions,
// a handful of `Math` functions, and common string, array and number
// methods.
// ============================================================================

use serde_json::Value;

use super::value::{number, strict_eq, to_display, to_number, truthy};
use crate::error::EvaluationError;

/// Global conversion functions, `None` if `name` is not one.
pub fn call_global(name: &str, args: &[Value]) -> Option<Value> {
    let first = args.first().unwrap_or(&Value::Null);
    match name {
        "String" => Some(Value::String(match first {
            Value::Null if args.is_empty() => String::new(),
            Value::Null => "null".to_string(),
            other => to_display(other),
        })),
        "Number" => Some(number(to_number(first))),
        "Boolean" => Some(Value::Bool(truthy(first))),
        _ => None,
    }
}

pub fn is_global(name: &str) -> bool {
    matches!(name, "String" | "Number" | "Boolean" | "Math")
}

/// `Math.<name>(args)`
pub fn call_math(name: &str, args: &[Value]) -> Result<Value, EvaluationError> {
    let arg = |i: usize| args.get(i).map(to_number).unwrap_or(f64::NAN);
    let result = match name {
        "abs" => arg(0).abs(),
        "floor" => arg(0).floor(),
        "ceil" => arg(0).ceil(),
        // Halves round towards +Infinity
        "round" => (arg(0) + 0.5).floor(),
        "min" => args.iter().map(to_number).fold(f64::INFINITY, f64::min),
        "max" => args.iter().map(to_number).fold(f64::NEG_INFINITY, f64::max),
        _ => return Err(EvaluationError::NotCallable(format!("Math.{name}"))),
    };
    Ok(number(result))
}

/// Resolve a possibly negative index against `len` the way `slice` does.
fn relative_index(value: Option<&Value>, len: usize, default: usize) -> usize {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return default;
    };
    let n = to_number(value);
    if n.is_nan() {
        return 0;
    }
    let n = n.trunc();
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

/// Outcome of a method call
pub struct MethodResult {
    pub value: Value,
    /// The receiver was modified in place and must be written back
    pub mutated: bool,
}

impl MethodResult {
    fn pure(value: Value) -> Self {
        Self {
            value,
            mutated: false,
        }
    }

    fn mutating(value: Value) -> Self {
        Self {
            value,
            mutated: true,
        }
    }
}

/// Call `receiver.method(args)`.
pub fn call_method(
    receiver: &mut Value,
    method: &str,
    args: &[Value],
) -> Result<MethodResult, EvaluationError> {
    if method == "toString" {
        return Ok(MethodResult::pure(Value::String(to_display(receiver))));
    }

    match receiver {
        Value::String(s) => string_method(s, method, args).map(MethodResult::pure),
        Value::Array(items) => array_method(items, method, args),
        Value::Number(n) if method == "toFixed" => {
            let digits = args.first().map(to_number).unwrap_or(0.0).clamp(0.0, 100.0) as usize;
            let n = n.as_f64().unwrap_or(f64::NAN);
            Ok(MethodResult::pure(Value::String(format!("{n:.digits$}"))))
        }
        Value::Null => Err(EvaluationError::InvalidAccess {
            receiver: "null",
            property: method.to_string(),
        }),
        _ => Err(EvaluationError::NotCallable(method.to_string())),
    }
}

fn string_method(s: &str, method: &str, args: &[Value]) -> Result<Value, EvaluationError> {
    let arg_text = |i: usize| args.get(i).map(to_display).unwrap_or_default();

    Ok(match method {
        "toUpperCase" => Value::String(s.to_uppercase()),
        "toLowerCase" => Value::String(s.to_lowercase()),
        "trim" => Value::String(s.trim().to_string()),
        "includes" => Value::Bool(s.contains(&arg_text(0))),
        "startsWith" => Value::Bool(s.starts_with(&arg_text(0))),
        "endsWith" => Value::Bool(s.ends_with(&arg_text(0))),
        "indexOf" => {
            let needle = arg_text(0);
            number(match s.find(&needle) {
                Some(byte) => s[..byte].chars().count() as f64,
                None => -1.0,
            })
        }
        "slice" => {
            let chars: Vec<char> = s.chars().collect();
            let start = relative_index(args.first(), chars.len(), 0);
            let end = relative_index(args.get(1), chars.len(), chars.len());
            Value::String(chars.get(start..end.max(start)).unwrap_or(&[]).iter().collect())
        }
        "split" => {
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::Null) => vec![Value::String(s.to_string())],
                Some(sep) => {
                    let sep = to_display(sep);
                    if sep.is_empty() {
                        s.chars().map(|c| Value::String(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(|p| Value::String(p.to_string())).collect()
                    }
                }
            };
            Value::Array(parts)
        }
        _ => return Err(EvaluationError::NotCallable(method.to_string())),
    })
}

fn array_method(
    items: &mut Vec<Value>,
    method: &str,
    args: &[Value],
) -> Result<MethodResult, EvaluationError> {
    let len = items.len();

    Ok(match method {
        "push" => {
            items.extend(args.iter().cloned());
            MethodResult::mutating(number(items.len() as f64))
        }
        "pop" => MethodResult::mutating(items.pop().unwrap_or(Value::Null)),
        "shift" => {
            let first = if items.is_empty() {
                Value::Null
            } else {
                items.remove(0)
            };
            MethodResult::mutating(first)
        }
        "unshift" => {
            items.splice(0..0, args.iter().cloned());
            MethodResult::mutating(number(items.len() as f64))
        }
        "splice" => {
            let start = relative_index(args.first(), len, len);
            let delete = match args.get(1) {
                None => len - start,
                Some(count) => (to_number(count).max(0.0) as usize).min(len - start),
            };
            let inserted = args.iter().skip(2).cloned();
            let removed: Vec<Value> = items.splice(start..start + delete, inserted).collect();
            MethodResult::mutating(Value::Array(removed))
        }
        "includes" => {
            let needle = args.first().unwrap_or(&Value::Null);
            MethodResult::pure(Value::Bool(items.iter().any(|v| strict_eq(v, needle))))
        }
        "indexOf" => {
            let needle = args.first().unwrap_or(&Value::Null);
            let index = items.iter().position(|v| strict_eq(v, needle));
            MethodResult::pure(number(index.map_or(-1.0, |i| i as f64)))
        }
        "join" => {
            let sep = match args.first() {
                None | Some(Value::Null) => ",".to_string(),
                Some(sep) => to_display(sep),
            };
            let parts: Vec<String> = items.iter().map(to_display).collect();
            MethodResult::pure(Value::String(parts.join(&sep)))
        }
        "slice" => {
            let start = relative_index(args.first(), len, 0);
            let end = relative_index(args.get(1), len, len);
            let slice = items.get(start..end.max(start)).unwrap_or(&[]).to_vec();
            MethodResult::pure(Value::Array(slice))
        }
        "concat" => {
            let mut out = items.clone();
            for arg in args {
                match arg {
                    Value::Array(more) => out.extend(more.iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            MethodResult::pure(Value::Array(out))
        }
        _ => return Err(EvaluationError::NotCallable(method.to_string())),
    })
}

// =============================================================================
// TESTS
// =============================================================================
