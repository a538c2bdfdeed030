//! Typed values produced by expression evaluation

use std::cmp::Ordering;
use std::fmt;

use crate::errors::EvalError;
use crate::geometry::Geometry;

/// Result of evaluating an expression, or an attribute value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Geometry(Geometry),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Geometry(_) => "geometry",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Truthiness used by boolean operators and `if()`. NULL is false.
    pub fn to_bool(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Geometry(_) => true,
        }
    }

    /// Numeric view: numbers, booleans and numeric strings convert.
    pub fn to_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse().ok(),
            Value::Null | Value::Geometry(_) => None,
        }
    }

    /// Numeric view that reports a type mismatch instead of `None`.
    pub fn expect_number(&self, context: &str) -> Result<f64, EvalError> {
        self.to_number().ok_or_else(|| EvalError::TypeMismatch {
            context: context.to_string(),
            expected: "number",
            got: self.type_name(),
        })
    }

    pub fn expect_geometry(&self, context: &str) -> Result<&Geometry, EvalError> {
        match self {
            Value::Geometry(g) => Ok(g),
            other => Err(EvalError::TypeMismatch {
                context: context.to_string(),
                expected: "geometry",
                got: other.type_name(),
            }),
        }
    }

    /// Consume the value, returning its geometry if it holds one.
    pub fn into_geometry(self) -> Option<Geometry> {
        match self {
            Value::Geometry(g) => Some(g),
            _ => None,
        }
    }

    /// Ordering used by comparison operators. Numbers compare numerically
    /// when both sides convert, otherwise the text forms compare.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        if self.is_null() || other.is_null() {
            return None;
        }
        match (self.to_number(), other.to_number()) {
            (Some(a), Some(b)) if !matches!((self, other), (Value::String(_), Value::String(_))) => {
                a.partial_cmp(&b)
            }
            _ => Some(self.to_string().cmp(&other.to_string())),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Geometry(g) => write!(f, "{}", g),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Geometry> for Value {
    fn from(g: Geometry) -> Self {
        Value::Geometry(g)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}
