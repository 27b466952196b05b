// ============================================================================
// spark-bind - Value Semantics
// Script-style coercions over serde_json::Value
// ============================================================================
//
// `null` stands in for both `null` and `undefined`. Numbers that are
// mathematically integral are stored as integers so that `1 + 1` and `2`
// compare and print the same. Non-finite results (NaN, Infinity) have no
// JSON form and become null.
// ============================================================================

use serde_json::{Number, Value};

/// Truthiness: null, false, 0, NaN and "" are falsy.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Build a number value, preferring the integer representation.
pub fn number(n: f64) -> Value {
    if !n.is_finite() {
        return Value::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        return Value::from(n as i64);
    }
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

/// Numeric conversion (`Number(x)`), NaN when there is none.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Array(items) => match items.as_slice() {
            [] => 0.0,
            [single] => to_number(&Value::String(to_display(single))),
            _ => f64::NAN,
        },
        Value::Object(_) => f64::NAN,
    }
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        n.to_string()
    }
}

/// Text conversion used for interpolation and attribute values.
///
/// null is the empty string, integral numbers print without a fraction,
/// arrays join their elements with `,` and objects print as JSON.
pub fn to_display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.as_f64().map(format_number).unwrap_or_else(|| n.to_string()),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(to_display).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// `typeof`, with null reporting "undefined".
pub fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "undefined",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) | Value::Object(_) => "object",
    }
}

/// Article-prefixed type name for messages.
pub fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// `===`: numbers compare numerically, everything else structurally.
pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// `==`: like `===` but coerces between numbers, strings and booleans.
/// null only equals null.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(_), Value::String(_)) => a == b,
        (Value::Number(_) | Value::Bool(_) | Value::String(_), Value::Number(_) | Value::Bool(_) | Value::String(_)) => {
            to_number(a) == to_number(b)
        }
        (Value::Array(_) | Value::Object(_), Value::String(s))
        | (Value::String(s), Value::Array(_) | Value::Object(_)) => {
            let other = if a.is_string() { b } else { a };
            to_display(other) == *s
        }
        _ => strict_eq(a, b),
    }
}

/// `+`: string concatenation when either side is not numeric-like.
pub fn add(a: &Value, b: &Value) -> Value {
    let numeric = |v: &Value| matches!(v, Value::Null | Value::Bool(_) | Value::Number(_));
    if numeric(a) && numeric(b) {
        number(to_number(a) + to_number(b))
    } else {
        Value::String(to_display(a) + &to_display(b))
    }
}

/// Relational comparison; strings compare lexically, anything else
/// numerically. `None` when unordered (NaN involved).
pub fn compare(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => to_number(a).partial_cmp(&to_number(b)),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness() {
        for falsy in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            assert!(!truthy(&falsy), "{falsy} should be falsy");
        }
        for truthy_value in [json!(true), json!(-1), json!("0"), json!([]), json!({})] {
            assert!(truthy(&truthy_value), "{truthy_value} should be truthy");
        }
    }

    #[test]
    fn display_conversion() {
        assert_eq!(to_display(&json!(null)), "");
        assert_eq!(to_display(&json!(3.0)), "3");
        assert_eq!(to_display(&json!(2.5)), "2.5");
        assert_eq!(to_display(&json!([1, "a", null])), "1,a,");
        assert_eq!(to_display(&json!({ "a": 1 })), r#"{"a":1}"#);
    }

    #[test]
    fn integral_results_are_integers() {
        assert_eq!(number(4.0), json!(4));
        assert_eq!(number(0.5), json!(0.5));
        assert_eq!(number(f64::NAN), json!(null));
        assert_eq!(add(&json!(0.5), &json!(0.5)), json!(1));
    }

    #[test]
    fn addition_concatenates_strings() {
        assert_eq!(add(&json!("a"), &json!(1)), json!("a1"));
        assert_eq!(add(&json!(1), &json!("1")), json!("11"));
        assert_eq!(add(&json!(true), &json!(1)), json!(2));
    }

    #[test]
    fn equality_flavours() {
        assert!(strict_eq(&json!(1), &json!(1.0)));
        assert!(!strict_eq(&json!(1), &json!("1")));
        assert!(loose_eq(&json!(1), &json!("1")));
        assert!(loose_eq(&json!(true), &json!(1)));
        assert!(!loose_eq(&json!(null), &json!(0)));
        assert!(loose_eq(&json!([1, 2]), &json!("1,2")));
    }

    #[test]
    fn numeric_conversion() {
        assert_eq!(to_number(&json!(" 42 ")), 42.0);
        assert!(to_number(&json!("abc")).is_nan());
        assert_eq!(to_number(&json!([7])), 7.0);
        assert_eq!(to_number(&json!(null)), 0.0);
    }
}
