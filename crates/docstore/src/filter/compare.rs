//! Equality and ordering between values.
//!
//! Numbers compare by mathematical value regardless of representation: a
//! negative signed integer is below every unsigned integer, and integers
//! compare exactly against floats even beyond 2^53.

use std::cmp::Ordering;

use crate::value::{Document, Value};

/// Deep equality between two values.
///
/// Numbers are equal when their mathematical values are equal, whatever
/// their representation. Arrays compare element-wise, documents key-wise.
/// Values of different categories are never equal.
#[must_use]
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Document(xs), Value::Document(ys)) => {
            xs.len() == ys.len() && xs.iter().all(|(key, x)| entry_equal(ys, key, x))
        }
        _ if a.is_number() && b.is_number() => compare_numbers(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

fn entry_equal(doc: &Document, key: &str, x: &Value) -> bool {
    doc.get(key).is_some_and(|y| values_equal(x, y))
}

/// Order two numeric values by mathematical value.
///
/// Returns `None` when either side is not a number or a float is NaN.
#[must_use]
pub fn compare_numbers(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x.cmp(y)),
        (Value::UInt(x), Value::UInt(y)) => Some(x.cmp(y)),
        (Value::Int(x), Value::UInt(y)) => Some(i128::from(*x).cmp(&i128::from(*y))),
        (Value::UInt(x), Value::Int(y)) => Some(i128::from(*x).cmp(&i128::from(*y))),
        (Value::Float(x), Value::Float(y)) => x.partial_cmp(y),
        (Value::Float(x), Value::Int(y)) => cmp_float_int(*x, i128::from(*y)),
        (Value::Float(x), Value::UInt(y)) => cmp_float_int(*x, i128::from(*y)),
        (Value::Int(x), Value::Float(y)) => {
            cmp_float_int(*y, i128::from(*x)).map(Ordering::reverse)
        }
        (Value::UInt(x), Value::Float(y)) => {
            cmp_float_int(*y, i128::from(*x)).map(Ordering::reverse)
        }
        _ => None,
    }
}

// 2^127 as f64; every i64/u64 lies strictly inside (-BOUND, BOUND).
const I128_BOUND: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;

/// Compare a float against an integer without rounding the integer.
fn cmp_float_int(f: f64, i: i128) -> Option<Ordering> {
    if f.is_nan() {
        return None;
    }
    if f >= I128_BOUND {
        return Some(Ordering::Greater);
    }
    if f < -I128_BOUND {
        return Some(Ordering::Less);
    }

    // In range, so the truncation is exact on the integer part.
    #[allow(clippy::cast_possible_truncation)]
    let whole = f.trunc() as i128;
    match whole.cmp(&i) {
        Ordering::Equal => {
            let fraction = f - f.trunc();
            Some(fraction.partial_cmp(&0.0).unwrap_or(Ordering::Equal))
        }
        other => Some(other),
    }
}
