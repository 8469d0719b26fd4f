//! Type coercion rules.
//!
//! `null` and the empty string coerce to the zero value of the target type,
//! strings are parsed, and anything else that has no sensible conversion is a [`CoercionError`].

use indexmap::IndexSet;

use crate::error::CoercionError;
use crate::value::{Value, ValueType};

fn coercion_error(value: &Value, to: &'static str) -> CoercionError {
    CoercionError {
        value: value.to_string(),
        from: value.type_name(),
        to,
    }
}

/// Coerces a value to a boolean.
pub fn to_boolean(value: &Value) -> Result<bool, CoercionError> {
    match value {
        Value::Null => Ok(false),
        Value::Boolean(value) => Ok(*value),
        Value::String(text) => Ok(text.eq_ignore_ascii_case("true")),
        other => Err(coercion_error(other, "boolean")),
    }
}

/// Coerces a value to a string. `null` becomes the empty string.
pub fn to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Coerces a value to a long. Doubles are truncated towards zero.
pub fn to_long(value: &Value) -> Result<i64, CoercionError> {
    match value {
        Value::Null => Ok(0),
        Value::Long(value) => Ok(*value),
        Value::Double(value) => Ok(*value as i64),
        Value::String(text) if text.is_empty() => Ok(0),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| coercion_error(value, "long")),
        other => Err(coercion_error(other, "long")),
    }
}

/// Coerces a value to a double.
pub fn to_double(value: &Value) -> Result<f64, CoercionError> {
    match value {
        Value::Null => Ok(0.0),
        Value::Long(value) => Ok(*value as f64),
        Value::Double(value) => Ok(*value),
        Value::String(text) if text.is_empty() => Ok(0.0),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| coercion_error(value, "double")),
        other => Err(coercion_error(other, "double")),
    }
}

/// Coerces a value to a number, keeping longs and doubles apart.
///
/// Strings that look like floating point literals become doubles, other strings longs.
pub fn to_number(value: &Value) -> Result<Value, CoercionError> {
    match value {
        Value::Long(_) | Value::Double(_) => Ok(value.clone()),
        _ if is_floating(value) => to_double(value).map(Value::Double),
        _ => to_long(value).map(Value::Long),
    }
}

/// Returns whether arithmetic on this operand has to be done in floating point: the
/// value is a double, or a string containing `.`, `e` or `E`.
pub fn is_floating(value: &Value) -> bool {
    match value {
        Value::Double(_) => true,
        Value::String(text) => text.contains(['.', 'e', 'E']),
        _ => false,
    }
}

/// Converts a value to the target type.
///
/// Scalar targets use the coercion rules above (so `null` becomes `false`, `0`, `0.0`
/// or `""`). Collection and callable targets accept `null` and values that already
/// have the type; lists and sets convert into each other.
pub fn convert_to_type(value: Value, target: ValueType) -> Result<Value, CoercionError> {
    match target {
        ValueType::Any => Ok(value),
        ValueType::Boolean => to_boolean(&value).map(Value::Boolean),
        ValueType::Long => to_long(&value).map(Value::Long),
        ValueType::Double => to_double(&value).map(Value::Double),
        ValueType::String => Ok(Value::String(to_string(&value))),
        ValueType::Null => match value {
            Value::Null => Ok(Value::Null),
            other => Err(coercion_error(&other, target.name())),
        },
        _ if value.is_null() || value.value_type() == target => Ok(value),
        ValueType::List => match value {
            Value::Set(items) => Ok(Value::List(items.into_iter().collect())),
            other => Err(coercion_error(&other, target.name())),
        },
        ValueType::Set => match value {
            Value::List(items) => Ok(Value::Set(items.into_iter().collect::<IndexSet<_>>())),
            other => Err(coercion_error(&other, target.name())),
        },
        _ => Err(coercion_error(&value, target.name())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_and_empty_coerce_to_zero_values() {
        assert!(!to_boolean(&Value::Null).unwrap());
        assert_eq!(to_long(&Value::Null).unwrap(), 0);
        assert_eq!(to_long(&Value::from("")).unwrap(), 0);
        assert_eq!(to_double(&Value::from("")).unwrap(), 0.0);
        assert_eq!(to_string(&Value::Null), "");
    }

    #[test]
    fn strings_parse_as_numbers() {
        assert_eq!(to_number(&Value::from("42")).unwrap(), Value::Long(42));
        assert_eq!(to_number(&Value::from("4.5")).unwrap(), Value::Double(4.5));
        assert_eq!(to_number(&Value::from("1e3")).unwrap(), Value::Double(1000.0));
        assert!(to_number(&Value::from("abc")).is_err());
    }

    #[test]
    fn booleans_do_not_coerce_to_numbers() {
        let err = to_long(&Value::Boolean(true)).unwrap_err();
        assert_eq!(err.from, "boolean");
        assert_eq!(err.to, "long");
    }

    #[test]
    fn string_to_boolean_is_case_insensitive() {
        assert!(to_boolean(&Value::from("TRUE")).unwrap());
        assert!(!to_boolean(&Value::from("yes")).unwrap());
        assert!(to_boolean(&Value::Long(1)).is_err());
    }

    #[test]
    fn convert_between_collections() {
        let list = Value::list([1, 2, 2]);
        let set = convert_to_type(list, ValueType::Set).unwrap();
        assert!(matches!(&set, Value::Set(items) if items.len() == 2));
        assert_eq!(
            convert_to_type(Value::Null, ValueType::Map).unwrap(),
            Value::Null
        );
        assert!(convert_to_type(Value::Long(1), ValueType::Map).is_err());
    }

    #[test]
    fn doubles_truncate_to_long() {
        assert_eq!(to_long(&Value::Double(-2.7)).unwrap(), -2);
        assert_eq!(
            convert_to_type(Value::Double(3.9), ValueType::Long).unwrap(),
            Value::Long(3)
        );
    }
}
