//! Document-level comparison shared by in-process evaluation.
//!
//! These functions define the reference semantics for conditions and
//! ordering. The memory backend and hub matching evaluate with them
//! directly; engine backends translate to native syntax that must agree.
//!
//! Instants compare at millisecond precision, rounded half up.

use std::cmp::Ordering;

use chrono::SubsecRound;
use serde_json::Value;

use crate::types::{Condition, FieldValue, parse_datetime};

/// Resolves a dotted path through nested objects.
///
/// Arrays are not traversed; a path through an array resolves to nothing.
pub fn resolve_path<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(doc, |current, segment| current.as_object()?.get(segment))
}

/// Returns true if the value at a path satisfies the condition.
pub fn condition_matches(actual: Option<&Value>, condition: &Condition) -> bool {
    match condition {
        Condition::Eq(expected) => value_equals(actual, expected),
        Condition::Ne(expected) => !value_equals(actual, expected),
        Condition::In(expected) => expected.iter().any(|v| value_equals(actual, v)),
        Condition::Gt(bound) => range_cmp(actual, bound).is_some_and(Ordering::is_gt),
        Condition::Gte(bound) => range_cmp(actual, bound).is_some_and(Ordering::is_ge),
        Condition::Lt(bound) => range_cmp(actual, bound).is_some_and(Ordering::is_lt),
        Condition::Lte(bound) => range_cmp(actual, bound).is_some_and(Ordering::is_le),
    }
}

/// Returns true if every condition on every path holds for the document.
pub fn document_matches<'a, I>(doc: &Value, criteria: I) -> bool
where
    I: IntoIterator<Item = (&'a String, &'a Vec<Condition>)>,
{
    criteria.into_iter().all(|(path, conditions)| {
        let actual = resolve_path(doc, path);
        conditions.iter().all(|c| condition_matches(actual, c))
    })
}

fn value_equals(actual: Option<&Value>, expected: &FieldValue) -> bool {
    let actual = actual.filter(|v| !v.is_null());
    match (actual, expected) {
        (None, FieldValue::Null) => true,
        (None, _) | (Some(_), FieldValue::Null) => false,
        (Some(v), expected) => range_cmp(Some(v), expected) == Some(Ordering::Equal),
    }
}

/// Compares a stored value with a condition operand of a compatible type.
///
/// Returns `None` when the types are not comparable, which makes every
/// operator except `Ne` fail.
fn range_cmp(actual: Option<&Value>, bound: &FieldValue) -> Option<Ordering> {
    let actual = actual?;
    match (actual, bound) {
        (Value::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), FieldValue::Integer(_) | FieldValue::Float(_)) => {
            a.as_f64()?.partial_cmp(&bound.as_f64()?)
        }
        (Value::String(a), FieldValue::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::String(a), FieldValue::DateTime(b)) => Some(
            parse_datetime(a)?
                .round_subsecs(3)
                .cmp(&b.round_subsecs(3)),
        ),
        _ => None,
    }
}

/// Rank of a value class in sort order.
fn sort_class(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Bool(_)) | Some(Value::Number(_)) => 1,
        Some(Value::String(_)) | Some(Value::Array(_)) | Some(Value::Object(_)) => 2,
    }
}

fn sort_number(value: &Value) -> f64 {
    match value {
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn sort_text(value: &Value) -> std::borrow::Cow<'_, str> {
    match value {
        Value::String(s) => std::borrow::Cow::Borrowed(s.as_str()),
        other => std::borrow::Cow::Owned(other.to_string()),
    }
}

/// Total ascending order used for sorting.
///
/// Missing and null sort first, then booleans and numbers (booleans as 0/1),
/// then text by byte order. Arrays and objects sort as their JSON text.
pub fn sort_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let (class_a, class_b) = (sort_class(a), sort_class(b));
    if class_a != class_b {
        return class_a.cmp(&class_b);
    }
    match (a, b) {
        (Some(x), Some(y)) if class_a == 1 => sort_number(x)
            .partial_cmp(&sort_number(y))
            .unwrap_or(Ordering::Equal),
        (Some(x), Some(y)) if class_a == 2 => sort_text(x).cmp(&sort_text(y)),
        _ => Ordering::Equal,
    }
}
