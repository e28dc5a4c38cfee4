//! Union helpers used when two descriptions of the same field are combined.

use std::cmp::Ordering;

use serde_json::Value as JsonValue;

use crate::constraint::{numeric_value, Constraint};

/// Deduplicate `values` and sort them ascending.
///
/// The sort is numeric when every remaining value reads as a number (JSON
/// numbers or numeric strings such as ports), and lexicographic on the text
/// form otherwise.
///
/// ```
/// use apiflow_core::parameter::merge_values;
/// use serde_json::json;
///
/// let merged = merge_values(["443", "80", "443", "8080"].map(|p| json!(p)));
/// assert_eq!(merged, vec![json!("80"), json!("443"), json!("8080")]);
/// ```
pub fn merge_values<I>(values: I) -> Vec<JsonValue>
where
    I: IntoIterator<Item = JsonValue>,
{
    let mut merged = union_preserving_order(values);
    let numeric = merged.iter().all(|v| numeric_value(v).is_some());

    if numeric {
        merged.sort_by(|a, b| {
            let (a, b) = (numeric_value(a), numeric_value(b));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        });
    } else {
        merged.sort_by(|a, b| text_of(a).cmp(&text_of(b)));
    }
    merged
}

/// Deduplicate `values`, keeping the first occurrence of each
pub fn union_preserving_order<I>(values: I) -> Vec<JsonValue>
where
    I: IntoIterator<Item = JsonValue>,
{
    let mut merged: Vec<JsonValue> = Vec::new();
    for value in values {
        if !merged.contains(&value) {
            merged.push(value);
        }
    }
    merged
}

fn text_of(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Merge two constraint lists.
///
/// All `Enum` members (plus `extra_members`) collapse into a single sorted
/// `Enum` placed first; every other constraint is kept once, left side first.
pub(crate) fn merge_constraints(
    left: &[Constraint],
    right: &[Constraint],
    extra_members: Vec<JsonValue>,
) -> Vec<Constraint> {
    let mut members = Vec::new();
    let mut has_enum = false;
    let mut rest: Vec<Constraint> = Vec::new();

    for constraint in left.iter().chain(right) {
        match constraint {
            Constraint::Enum(values) => {
                has_enum = true;
                members.extend(values.iter().cloned());
            }
            other => {
                if !rest.contains(other) {
                    rest.push(other.clone());
                }
            }
        }
    }

    let mut merged = Vec::with_capacity(rest.len() + 1);
    if has_enum || !extra_members.is_empty() {
        members.extend(extra_members);
        merged.push(Constraint::Enum(merge_values(members)));
    }
    merged.extend(rest);
    merged
}
