use std::cmp::Ordering;

use crate::ast::CmpOp;
use crate::errors::RenderError;
use crate::value::Value;

/// Apply a comparison operator.
///
/// Numbers compare with numbers (integers and floats mix freely) and strings
/// with strings. `==`/`!=` additionally accept two values of the same kind.
/// Anything else is a `TypeError`.
pub fn compare(op: CmpOp, a: &Value, b: &Value) -> Result<bool, RenderError> {
    let ord = match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (x, y) if x.is_number() && y.is_number() => {
            match (x.as_f64(), y.as_f64()) {
                (Some(fx), Some(fy)) => fx.partial_cmp(&fy),
                _ => None,
            }
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ if matches!(op, CmpOp::Eq | CmpOp::Ne) && a.kind() == b.kind() => {
            let equal = values_equal(a, b);
            return Ok(if op == CmpOp::Eq { equal } else { !equal });
        }
        _ => return Err(mismatch(op, a, b)),
    };
    // NaN compares unequal to everything.
    Ok(match ord {
        Some(ord) => pred_on_ord(op, ord),
        None => op == CmpOp::Ne,
    })
}

fn pred_on_ord(op: CmpOp, ord: Ordering) -> bool {
    match op {
        CmpOp::Eq => ord == Ordering::Equal,
        CmpOp::Ne => ord != Ordering::Equal,
        CmpOp::Lt => ord == Ordering::Less,
        CmpOp::Le => ord != Ordering::Greater,
        CmpOp::Gt => ord == Ordering::Greater,
        CmpOp::Ge => ord != Ordering::Less,
    }
}

fn mismatch(op: CmpOp, a: &Value, b: &Value) -> RenderError {
    RenderError::type_error(
        format!("comparison `{}`", op.as_str()),
        format!("{} and {}", a.kind(), b.kind()),
    )
}

/// Structural equality where `1 == 1.0`.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => x == y,
        (x, y) if x.is_number() && y.is_number() => x.as_f64() == y.as_f64(),
        (Value::Seq(xs), Value::Seq(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Map(xs), Value::Map(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| values_equal(x, y)))
        }
        _ => a == b,
    }
}

/// `needle in haystack`: sequence element, mapping key or substring.
pub fn contains(needle: &Value, haystack: &Value) -> Result<bool, RenderError> {
    match (haystack, needle) {
        (Value::Seq(items), _) => Ok(items.iter().any(|item| values_equal(item, needle))),
        (Value::Map(map), Value::String(key)) => Ok(map.contains_key(key)),
        (Value::String(s), Value::String(sub)) => Ok(s.contains(sub.as_str())),
        _ => Err(RenderError::type_error(
            "membership test `in`",
            format!("{} in {}", needle.kind(), haystack.kind()),
        )),
    }
}
