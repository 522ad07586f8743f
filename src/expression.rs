// src/expression.rs
use std::borrow::Cow;

use tracing::trace;

use crate::ast::{Expr, Method, Path, Segment};
use crate::comparison;
use crate::context::{Context, Scope};
use crate::errors::RenderError;
use crate::filters;
use crate::value::Value;

/// Evaluate an expression against a context's base frame.
pub fn evaluate(expr: &Expr, context: &Context) -> Result<Value, RenderError> {
    eval(expr, &Scope::new(context))
}

/// Evaluate AST expression → Value, stopping at the first failure.
pub(crate) fn eval(expr: &Expr, scope: &Scope<'_>) -> Result<Value, RenderError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Path(path) => resolve(path, scope),
        Expr::Filter { target, call } => filters::apply(call, eval(target, scope)?),
        Expr::Compare { op, lhs, rhs } => {
            let (lhs, rhs) = (eval(lhs, scope)?, eval(rhs, scope)?);
            comparison::compare(*op, &lhs, &rhs).map(Value::Bool)
        }
        Expr::Contains {
            needle,
            haystack,
            negated,
        } => {
            let (needle, haystack) = (eval(needle, scope)?, eval(haystack, scope)?);
            let found = comparison::contains(&needle, &haystack)?;
            Ok(Value::Bool(found != *negated))
        }
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, scope)?.is_truthy())),
        Expr::And(lhs, rhs) => {
            let result = eval(lhs, scope)?.is_truthy() && eval(rhs, scope)?.is_truthy();
            Ok(Value::Bool(result))
        }
        Expr::Or(lhs, rhs) => {
            let result = eval(lhs, scope)?.is_truthy() || eval(rhs, scope)?.is_truthy();
            Ok(Value::Bool(result))
        }
    }
}

/// Resolve a dotted/indexed path. Fails with `Undefined` naming the path up to
/// the first missing segment; nothing is returned for a partial match.
pub(crate) fn resolve(path: &Path, scope: &Scope<'_>) -> Result<Value, RenderError> {
    let root = scope
        .lookup(&path.root)
        .ok_or_else(|| RenderError::undefined(&path.root))?;
    let mut current = Cow::Borrowed(root);
    for (i, segment) in path.segments.iter().enumerate() {
        current = match descend(current, segment)? {
            Some(next) => next,
            None => {
                let missing = path.display_prefix(i + 1);
                trace!(path = %missing, "undefined path segment");
                return Err(RenderError::undefined(missing));
            }
        };
    }
    Ok(current.into_owned())
}

fn descend<'a>(current: Cow<'a, Value>, segment: &Segment) -> Result<Option<Cow<'a, Value>>, RenderError> {
    if let Segment::Method(method) = segment {
        return call_method(*method, &current).map(|v| Some(Cow::Owned(v)));
    }
    Ok(match current {
        Cow::Borrowed(value) => lookup(value, segment).map(Cow::Borrowed),
        Cow::Owned(value) => lookup(&value, segment).cloned().map(Cow::Owned),
    })
}

/// Mapping key first, then sequence index; any other shape is a miss.
fn lookup<'v>(value: &'v Value, segment: &Segment) -> Option<&'v Value> {
    match (value, segment) {
        (Value::Map(map), Segment::Key(key)) => map.get(key),
        (Value::Map(map), Segment::Index(index)) => map.get(&index.to_string()),
        (Value::Seq(items), Segment::Key(key)) => {
            key.parse::<i64>().ok().and_then(|index| nth(items, index))
        }
        (Value::Seq(items), Segment::Index(index)) => nth(items, *index),
        _ => None,
    }
}

/// Negative indexes count from the end.
fn nth(items: &[Value], index: i64) -> Option<&Value> {
    let len = i64::try_from(items.len()).ok()?;
    let index = if index < 0 { len + index } else { index };
    usize::try_from(index).ok().and_then(|i| items.get(i))
}

fn call_method(method: Method, value: &Value) -> Result<Value, RenderError> {
    let Value::Map(map) = value else {
        return Err(RenderError::type_error(method.as_str(), value.kind()));
    };
    Ok(match method {
        Method::Items => map
            .iter()
            .map(|(k, v)| Value::Seq(vec![Value::String(k.clone()), v.clone()]))
            .collect::<Vec<_>>()
            .into(),
        Method::Keys => map.keys().map(|k| Value::String(k.clone())).collect::<Vec<_>>().into(),
        Method::Values => map.values().cloned().collect::<Vec<_>>().into(),
    })
}
