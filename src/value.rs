use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::Error;

/// A single field value. Dynamically typed, matching the engine's treatment
/// of record fields as opaque except where a component coerces them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Coerces this value to a float for use inside a numeric aggregate.
    /// Mirrors `parse_number`: strings are parsed, bools and null are
    /// rejected.
    pub fn parse_number(&self) -> Result<f64, Error> {
        match self {
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            Value::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| Error::runtime(format!("Unable to parse number from '{s}'"))),
            other => Err(Error::runtime(format!("Unable to parse number from {other:?}"))),
        }
    }

    /// Canonical, deterministic encoding used as a group key or uniqueness
    /// key. `Value` has no unordered-map variant, so plain JSON
    /// serialization is already a total, deterministic order — except that
    /// JSON has no representation for non-finite floats, so a `NaN` or
    /// infinite value (reachable from legitimate RBQL arithmetic, e.g.
    /// `a1/a2` with a zero divisor) is reported as a `RuntimeError` rather
    /// than encoded.
    pub fn to_canonical_key(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|err| {
            Error::runtime(format!(
                "Unable to compute a GROUP BY/DISTINCT key for a non-finite value (NaN or Infinity): {err}"
            ))
        })
    }

    /// Elementwise comparison used by sort-key arrays. Cross-type operands
    /// fall back to comparing their `Display` rendering, giving a total
    /// order without a typed coercion error; unlike `to_canonical_key` this
    /// never fails, since `Display` has a defined rendering for every
    /// `Value` including non-finite floats.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Int(a), Value::Float(b)) => {
                (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Value::Float(a), Value::Int(b)) => {
                a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
            }
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            _ => self.to_string().cmp(&other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Array(items) => {
                let rendered: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_key_is_stable_across_equal_values() {
        let a = Value::Array(vec![Value::Str("x".into()), Value::Int(1)]);
        let b = Value::Array(vec![Value::Str("x".into()), Value::Int(1)]);
        assert_eq!(a.to_canonical_key().unwrap(), b.to_canonical_key().unwrap());
    }

    #[test]
    fn canonical_key_rejects_non_finite_float_instead_of_panicking() {
        let v = Value::Float(f64::NAN);
        let err = v.to_canonical_key().unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Runtime);

        let v = Value::Float(f64::INFINITY);
        assert!(v.to_canonical_key().is_err());
    }

    #[test]
    fn parse_number_rejects_non_numeric_string() {
        let v = Value::Str("abc".into());
        assert!(v.parse_number().is_err());
    }

    #[test]
    fn compare_orders_null_before_everything() {
        assert_eq!(Value::Null.compare(&Value::Int(0)), Ordering::Less);
    }

    #[test]
    fn compare_cross_type_fallback_never_panics_on_non_finite_float() {
        let ord = Value::Float(f64::NAN).compare(&Value::Str("x".into()));
        assert_ne!(ord, Ordering::Equal);
    }
}
