//! Arithmetic, comparison and string operators on [`Value`]s.
//!
//! Operands are coerced following the Unified EL rules:
//!
//! - `+ - * %`: both null is `0`. Double arithmetic if either operand is a double or
//!   a string that looks like a floating point literal, long arithmetic otherwise.
//! - `/`: both null is `0`, otherwise always double arithmetic.
//! - `== !=`: doubles before longs before booleans before strings, then structural
//!   equality.
//! - `< <= > >=`: false if either side is null, numbers compare numerically, strings
//!   lexically.

use std::cmp::Ordering;

use regex::Regex;

use crate::ast::{BinaryOperator, CompareOperator};
use crate::coerce::{self, is_floating, to_boolean, to_double, to_long, to_string};
use crate::error::{CoercionError, ElError, ElResult};
use crate::value::Value;

/// Applies an arithmetic operator.
pub fn arithmetic(op: BinaryOperator, left: &Value, right: &Value) -> ElResult<Value> {
    if left.is_null() && right.is_null() {
        return Ok(Value::Long(0));
    }

    if is_floating(left) || is_floating(right) || op == BinaryOperator::Div {
        let (a, b) = (to_double(left)?, to_double(right)?);
        let result = match op {
            BinaryOperator::Add => a + b,
            BinaryOperator::Sub => a - b,
            BinaryOperator::Mul => a * b,
            BinaryOperator::Div => a / b,
            BinaryOperator::Mod => a % b,
        };
        return Ok(Value::Double(result));
    }

    let (a, b) = (to_long(left)?, to_long(right)?);
    let result = match op {
        BinaryOperator::Add => a.wrapping_add(b),
        BinaryOperator::Sub => a.wrapping_sub(b),
        BinaryOperator::Mul => a.wrapping_mul(b),
        BinaryOperator::Mod if b == 0 => {
            return Err(ElError::Arithmetic(format!("{a} % 0: division by zero")));
        }
        BinaryOperator::Mod => a.wrapping_rem(b),
        BinaryOperator::Div => return Ok(Value::Double(a as f64 / b as f64)),
    };
    Ok(Value::Long(result))
}

/// Unary minus. Null negates to `0`, strings are parsed as numbers first.
pub fn negate(value: &Value) -> ElResult<Value> {
    let number = match value {
        Value::Null => return Ok(Value::Long(0)),
        Value::Long(_) | Value::Double(_) => value.clone(),
        Value::String(_) => coerce::to_number(value)?,
        other => {
            return Err(ElError::Coercion(CoercionError {
                value: other.to_string(),
                from: other.type_name(),
                to: "number",
            }));
        }
    };
    Ok(match number {
        Value::Double(d) => Value::Double(-d),
        Value::Long(l) => Value::Long(l.wrapping_neg()),
        other => other,
    })
}

/// Applies a comparison operator.
pub fn compare(op: CompareOperator, left: &Value, right: &Value) -> ElResult<bool> {
    match op {
        CompareOperator::Eq => equals(left, right),
        CompareOperator::Ne => equals(left, right).map(|equal| !equal),
        CompareOperator::Lt => Ok(ordering(left, right)?.is_some_and(Ordering::is_lt)),
        CompareOperator::Le => Ok(ordering(left, right)?.is_some_and(Ordering::is_le)),
        CompareOperator::Gt => Ok(ordering(left, right)?.is_some_and(Ordering::is_gt)),
        CompareOperator::Ge => Ok(ordering(left, right)?.is_some_and(Ordering::is_ge)),
        CompareOperator::Matches => matches(left, right),
    }
}

/// Equality with operand coercion.
pub fn equals(left: &Value, right: &Value) -> ElResult<bool> {
    if left == right {
        return Ok(true);
    }
    if left.is_null() || right.is_null() {
        return Ok(false);
    }

    let either = |check: fn(&Value) -> bool| check(left) || check(right);

    if either(|v| matches!(v, Value::Double(_))) {
        Ok(to_double(left)? == to_double(right)?)
    } else if either(|v| matches!(v, Value::Long(_))) {
        Ok(to_long(left)? == to_long(right)?)
    } else if either(|v| matches!(v, Value::Boolean(_))) {
        Ok(to_boolean(left)? == to_boolean(right)?)
    } else if either(|v| matches!(v, Value::String(_))) {
        Ok(to_string(left) == to_string(right))
    } else {
        Ok(false)
    }
}

/// Ordering for the relational operators. `None` if either side is null or the
/// numbers are unordered (NaN).
fn ordering(left: &Value, right: &Value) -> ElResult<Option<Ordering>> {
    if left.is_null() || right.is_null() {
        return Ok(None);
    }

    let either = |check: fn(&Value) -> bool| check(left) || check(right);

    match (left, right) {
        _ if either(|v| matches!(v, Value::Double(_))) => {
            Ok(to_double(left)?.partial_cmp(&to_double(right)?))
        }
        _ if either(|v| matches!(v, Value::Long(_))) => {
            Ok(Some(to_long(left)?.cmp(&to_long(right)?)))
        }
        (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
        (Value::Boolean(a), Value::Boolean(b)) => Ok(Some(a.cmp(b))),
        _ => {
            let culprit = if matches!(left, Value::String(_) | Value::Boolean(_)) {
                right
            } else {
                left
            };
            Err(ElError::Coercion(CoercionError {
                value: culprit.to_string(),
                from: culprit.type_name(),
                to: "comparable",
            }))
        }
    }
}

/// Full match of the left operand's string form against the right operand as a
/// regular expression.
fn matches(left: &Value, right: &Value) -> ElResult<bool> {
    let pattern = to_string(right);
    let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| {
        ElError::InvalidPattern {
            pattern: pattern.clone(),
            source,
        }
    })?;
    Ok(regex.is_match(&to_string(left)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_and_floating_arithmetic() {
        let long = |v: i64| Value::Long(v);
        assert_eq!(
            arithmetic(BinaryOperator::Add, &long(2), &long(3)).unwrap(),
            Value::Long(5)
        );
        assert_eq!(
            arithmetic(BinaryOperator::Add, &long(2), &Value::Double(0.5)).unwrap(),
            Value::Double(2.5)
        );
        assert_eq!(
            arithmetic(BinaryOperator::Div, &long(7), &long(2)).unwrap(),
            Value::Double(3.5)
        );
        assert_eq!(
            arithmetic(BinaryOperator::Mul, &Value::from("1.5"), &long(2)).unwrap(),
            Value::Double(3.0)
        );
        assert_eq!(
            arithmetic(BinaryOperator::Add, &Value::from("4"), &long(2)).unwrap(),
            Value::Long(6)
        );
    }

    #[test]
    fn null_operands() {
        assert_eq!(
            arithmetic(BinaryOperator::Sub, &Value::Null, &Value::Null).unwrap(),
            Value::Long(0)
        );
        assert_eq!(
            arithmetic(BinaryOperator::Add, &Value::Null, &Value::Long(4)).unwrap(),
            Value::Long(4)
        );
        assert_eq!(negate(&Value::Null).unwrap(), Value::Long(0));
    }

    #[test]
    fn modulo_by_zero() {
        let err = arithmetic(BinaryOperator::Mod, &Value::Long(1), &Value::Long(0)).unwrap_err();
        assert!(matches!(err, ElError::Arithmetic(_)));

        let nan = arithmetic(BinaryOperator::Mod, &Value::Double(1.0), &Value::Long(0)).unwrap();
        assert!(matches!(nan, Value::Double(d) if d.is_nan()));
    }

    #[test]
    fn booleans_are_not_numbers() {
        let err = arithmetic(BinaryOperator::Add, &Value::Boolean(true), &Value::Long(1));
        assert!(matches!(err, Err(ElError::Coercion(_))));
        assert!(negate(&Value::Boolean(false)).is_err());
    }

    #[test]
    fn equality_coerces() {
        assert!(equals(&Value::Long(1), &Value::Double(1.0)).unwrap());
        assert!(equals(&Value::from("1"), &Value::Long(1)).unwrap());
        assert!(equals(&Value::from("true"), &Value::Boolean(true)).unwrap());
        assert!(!equals(&Value::Null, &Value::Long(0)).unwrap());
        assert!(equals(&Value::list([1, 2]), &Value::list([1, 2])).unwrap());
        assert!(equals(&Value::from("abc"), &Value::Long(1)).is_err());
    }

    #[test]
    fn ordering_rules() {
        assert!(compare(CompareOperator::Lt, &Value::Long(1), &Value::Double(1.5)).unwrap());
        assert!(compare(CompareOperator::Ge, &Value::from("b"), &Value::from("a")).unwrap());
        assert!(!compare(CompareOperator::Lt, &Value::Null, &Value::Long(1)).unwrap());
        assert!(!compare(CompareOperator::Gt, &Value::Double(f64::NAN), &Value::Long(1)).unwrap());
        assert!(compare(CompareOperator::Lt, &Value::list([1]), &Value::Long(1)).is_err());
    }

    #[test]
    fn regex_matches_whole_string() {
        let text = Value::from("abc123");
        assert!(compare(CompareOperator::Matches, &text, &Value::from("[a-z]+\\d+")).unwrap());
        assert!(!compare(CompareOperator::Matches, &text, &Value::from("\\d+")).unwrap());

        let err = compare(CompareOperator::Matches, &text, &Value::from("(")).unwrap_err();
        assert!(matches!(err, ElError::InvalidPattern { .. }));
    }
}
