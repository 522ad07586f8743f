use std::borrow::Cow;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::RenderError;

/// Insertion-ordered mapping used for parameter sets and mapping values.
pub type Map = IndexMap<String, Value>;

/// Every shape a parameter (or anything computed from one) may take.
///
/// Integers and floats are kept apart so that `3` and `3.0` render
/// differently. Values deserialize untagged, so a YAML or JSON document maps
/// directly onto this type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Seq(Vec<Value>),
    Map(Map),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
        }
    }

    /// Null, `false`, zero and empty containers are falsy; everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Seq(items) => !items.is_empty(),
            Value::Map(map) => !map.is_empty(),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Canonical text of a scalar as it appears in rendered output.
    ///
    /// Sequences and mappings have no direct text form and fail with a
    /// `TypeError`.
    pub fn to_output(&self) -> Result<Cow<'_, str>, RenderError> {
        match self {
            Value::String(s) => Ok(Cow::Borrowed(s)),
            Value::Null => Ok(Cow::Borrowed("None")),
            Value::Bool(true) => Ok(Cow::Borrowed("True")),
            Value::Bool(false) => Ok(Cow::Borrowed("False")),
            Value::Int(i) => Ok(Cow::Owned(i.to_string())),
            Value::Float(f) => Ok(Cow::Owned(format_float(*f))),
            Value::Seq(_) | Value::Map(_) => {
                Err(RenderError::type_error("output", self.kind()))
            }
        }
    }

    /// Number with comma-separated groups of three integer digits.
    pub fn format_thousands(&self) -> Result<String, RenderError> {
        match self {
            Value::Int(i) => {
                let digits = group_thousands(&i.unsigned_abs().to_string());
                Ok(if *i < 0 { format!("-{digits}") } else { digits })
            }
            Value::Float(f) if !f.is_finite() => Ok(format_float(*f)),
            Value::Float(f) => {
                let text = format_float(f.abs());
                let (int_part, frac_part) = match text.split_once('.') {
                    Some((int_part, frac_part)) => (int_part, Some(frac_part)),
                    None => (text.as_str(), None),
                };
                let mut out = String::new();
                if f.is_sign_negative() && *f != 0.0 {
                    out.push('-');
                }
                out.push_str(&group_thousands(int_part));
                if let Some(frac_part) = frac_part {
                    out.push('.');
                    out.push_str(frac_part);
                }
                Ok(out)
            }
            other => Err(RenderError::type_error("thousands formatting", other.kind())),
        }
    }
}

/// Shortest round-trip decimal form; integral floats keep a trailing `.0`.
pub(crate) fn format_float(f: f64) -> String {
    if f.is_nan() {
        "nan".to_string()
    } else if f.is_infinite() {
        let text = if f > 0.0 { "inf" } else { "-inf" };
        text.to_string()
    } else if f.fract() == 0.0 {
        // `Display` never uses exponent form, so integral values have no `.`.
        format!("{f}.0")
    } else {
        f.to_string()
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Used by the CLI listing; containers are shown as JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Seq(_) | Value::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
            scalar => match scalar.to_output() {
                Ok(text) => f.write_str(&text),
                Err(_) => Err(fmt::Error),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        i64::try_from(n).map_or(Value::Float(n as f64), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
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

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Seq(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}
