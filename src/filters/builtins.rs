use std::ops::RangeInclusive;

use itertools::Itertools;

use super::Filter;
use crate::errors::RenderError;
use crate::value::Value;

fn expect_str<'a>(operation: &str, value: &'a Value) -> Result<&'a str, RenderError> {
    value
        .as_str()
        .ok_or_else(|| RenderError::type_error(operation, value.kind()))
}

fn expect_seq(operation: &str, value: Value) -> Result<Vec<Value>, RenderError> {
    match value {
        Value::Seq(items) => Ok(items),
        other => Err(RenderError::type_error(operation, other.kind())),
    }
}

/// `join(sep)` concatenates a sequence of strings.
pub struct Join;
impl Filter for Join {
    fn name(&self) -> &'static str { "join" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=1 }
    fn apply(&self, input: Value, args: &[Value]) -> Result<Value, RenderError> {
        let sep = match args.first() {
            Some(sep) => expect_str("join separator", sep)?,
            None => "",
        };
        let items = expect_seq("join", input)?;
        let parts = items
            .iter()
            .map(|item| expect_str("join", item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Value::String(parts.into_iter().join(sep)))
    }
}

/// Backs the `:,` suffix.
pub struct Thousands;
impl Filter for Thousands {
    fn name(&self) -> &'static str { "thousands" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
    fn apply(&self, input: Value, _args: &[Value]) -> Result<Value, RenderError> {
        input.format_thousands().map(Value::String)
    }
}

pub struct Upper;
impl Filter for Upper {
    fn name(&self) -> &'static str { "upper" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
    fn apply(&self, input: Value, _args: &[Value]) -> Result<Value, RenderError> {
        Ok(Value::String(expect_str("upper", &input)?.to_uppercase()))
    }
}

pub struct Lower;
impl Filter for Lower {
    fn name(&self) -> &'static str { "lower" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
    fn apply(&self, input: Value, _args: &[Value]) -> Result<Value, RenderError> {
        Ok(Value::String(expect_str("lower", &input)?.to_lowercase()))
    }
}

/// Uppercases the first letter of every word, lowercases the rest.
pub struct Title;
impl Filter for Title {
    fn name(&self) -> &'static str { "title" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
    fn apply(&self, input: Value, _args: &[Value]) -> Result<Value, RenderError> {
        let s = expect_str("title", &input)?;
        let mut out = String::with_capacity(s.len());
        let mut word_start = true;
        for c in s.chars() {
            if c.is_alphanumeric() {
                if word_start {
                    out.extend(c.to_uppercase());
                } else {
                    out.extend(c.to_lowercase());
                }
                word_start = false;
            } else {
                out.push(c);
                word_start = true;
            }
        }
        Ok(Value::String(out))
    }
}

pub struct Capitalize;
impl Filter for Capitalize {
    fn name(&self) -> &'static str { "capitalize" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
    fn apply(&self, input: Value, _args: &[Value]) -> Result<Value, RenderError> {
        let s = expect_str("capitalize", &input)?;
        let mut chars = s.chars();
        let out = match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => String::new(),
        };
        Ok(Value::String(out))
    }
}

pub struct Trim;
impl Filter for Trim {
    fn name(&self) -> &'static str { "trim" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
    fn apply(&self, input: Value, _args: &[Value]) -> Result<Value, RenderError> {
        Ok(Value::String(expect_str("trim", &input)?.trim().to_string()))
    }
}

pub struct Replace;
impl Filter for Replace {
    fn name(&self) -> &'static str { "replace" }
    fn arity(&self) -> RangeInclusive<usize> { 2..=2 }
    fn apply(&self, input: Value, args: &[Value]) -> Result<Value, RenderError> {
        let s = expect_str("replace", &input)?;
        let from = expect_str("replace pattern", &args[0])?;
        let to = expect_str("replace replacement", &args[1])?;
        Ok(Value::String(s.replace(from, to)))
    }
}

pub struct Length;
impl Filter for Length {
    fn name(&self) -> &'static str { "length" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
    fn apply(&self, input: Value, _args: &[Value]) -> Result<Value, RenderError> {
        let len = match &input {
            Value::String(s) => s.chars().count(),
            Value::Seq(items) => items.len(),
            Value::Map(map) => map.len(),
            other => return Err(RenderError::type_error("length", other.kind())),
        };
        Ok(Value::from(len))
    }
}

pub struct First;
impl Filter for First {
    fn name(&self) -> &'static str { "first" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
    fn apply(&self, input: Value, _args: &[Value]) -> Result<Value, RenderError> {
        Ok(expect_seq("first", input)?.into_iter().next().unwrap_or_default())
    }
}

pub struct Last;
impl Filter for Last {
    fn name(&self) -> &'static str { "last" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
    fn apply(&self, input: Value, _args: &[Value]) -> Result<Value, RenderError> {
        Ok(expect_seq("last", input)?.pop().unwrap_or_default())
    }
}

/// Drops repeated elements, keeping the first occurrence.
pub struct Unique;
impl Filter for Unique {
    fn name(&self) -> &'static str { "unique" }
    fn arity(&self) -> RangeInclusive<usize> { 0..=0 }
    fn apply(&self, input: Value, _args: &[Value]) -> Result<Value, RenderError> {
        let dedup = expect_seq("unique", input)?
            .into_iter()
            .unique_by(|x| serde_json::to_string(x).unwrap_or_default())
            .collect::<Vec<_>>();
        Ok(Value::Seq(dedup))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn join_requires_strings() {
        let ok = Join
            .apply(Value::from(vec!["Go", "Rust"]), &[Value::from(", ")])
            .unwrap();
        assert_eq!(ok, Value::from("Go, Rust"));

        let err = Join
            .apply(Value::Seq(vec![Value::from("a"), Value::Int(1)]), &[])
            .unwrap_err();
        assert_eq!(err, RenderError::type_error("join", "int"));
    }

    #[test]
    fn title_and_capitalize() {
        assert_eq!(
            Title.apply(Value::from("hello wORLD-wide"), &[]).unwrap(),
            Value::from("Hello World-Wide")
        );
        assert_eq!(
            Capitalize.apply(Value::from("hELLO"), &[]).unwrap(),
            Value::from("Hello")
        );
    }

    #[test]
    fn unique_keeps_first_occurrence() {
        let out = Unique.apply(Value::from(vec![3, 1, 3, 2, 1]), &[]).unwrap();
        assert_eq!(out, Value::from(vec![3, 1, 2]));
    }

    #[test]
    fn first_and_last_of_empty_are_none() {
        assert_eq!(First.apply(Value::Seq(vec![]), &[]).unwrap(), Value::Null);
        assert_eq!(Last.apply(Value::Seq(vec![]), &[]).unwrap(), Value::Null);
    }
}
