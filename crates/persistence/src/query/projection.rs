//! Field projection.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

/// Returns the document reduced to the projected fields.
///
/// An empty projection returns the whole document. A dotted field copies the
/// nested sub-tree at that path, keeping its parents. Fields the document
/// does not have are skipped.
pub fn project(doc: &Value, projection: &BTreeSet<String>) -> Value {
    if projection.is_empty() {
        return doc.clone();
    }
    let Some(source) = doc.as_object() else {
        return doc.clone();
    };

    let mut out = Map::new();
    for field in projection {
        let segments: Vec<&str> = field.split('.').collect();
        copy_path(source, &mut out, &segments);
    }
    Value::Object(out)
}

fn copy_path(source: &Map<String, Value>, target: &mut Map<String, Value>, segments: &[&str]) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    let Some(value) = source.get(*first) else {
        return;
    };

    if rest.is_empty() {
        target.insert((*first).to_string(), value.clone());
        return;
    }

    let Some(nested_source) = value.as_object() else {
        return;
    };
    // A shorter projected path may already have copied the whole parent.
    let entry = target
        .entry((*first).to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(nested_target) = entry {
        copy_path(nested_source, nested_target, rest);
    }
}
