//! Mapping bookkeeping for the in-memory store: strict field checks, mapping
//! merges and nested-path visibility.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::errors::StoreError;

/// Types that hold sub-properties rather than values.
const CONTAINER_TYPES: [&str; 2] = ["object", "nested"];

/// Leaf path -> declared type, for every mapped field.
pub(crate) fn mapped_fields(mapping: &Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    collect_mapped(mapping, "", &mut out);
    out
}

fn collect_mapped(mapping: &Value, prefix: &str, out: &mut BTreeMap<String, String>) {
    let Some(properties) = mapping.get("properties").and_then(Value::as_object) else {
        return;
    };

    for (name, definition) in properties {
        let path = join(prefix, name);
        let field_type = definition
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("object");

        if CONTAINER_TYPES.contains(&field_type) || definition.get("properties").is_some() {
            out.insert(path.clone(), field_type.to_string());
            collect_mapped(definition, &path, out);
        } else {
            out.insert(path, field_type.to_string());
        }
    }
}

/// Nested paths whose elements are not visible from the parent document.
pub(crate) fn hidden_nested_paths(mapping: &Value) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    collect_hidden(mapping, "", &mut out);
    out
}

fn collect_hidden(mapping: &Value, prefix: &str, out: &mut BTreeSet<String>) {
    let Some(properties) = mapping.get("properties").and_then(Value::as_object) else {
        return;
    };

    for (name, definition) in properties {
        let path = join(prefix, name);
        let is_nested = definition.get("type").and_then(Value::as_str) == Some("nested");
        let in_parent = definition
            .get("include_in_parent")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if is_nested && !in_parent {
            out.insert(path.clone());
        }
        collect_hidden(definition, &path, out);
    }
}

/// True when the mapping rejects unmapped fields.
pub(crate) fn is_strict(mapping: &Value) -> bool {
    match mapping.get("dynamic") {
        Some(Value::String(s)) => s == "strict",
        _ => false,
    }
}

/// Check a document source against a strict mapping.
pub(crate) fn validate_document(mapping: &Value, source: &Value) -> Result<(), String> {
    if !is_strict(mapping) {
        return Ok(());
    }

    let mapped = mapped_fields(mapping);
    let mut leaves = BTreeSet::new();
    document_leaves(source, "", &mut leaves);

    for leaf in leaves {
        match mapped.get(&leaf) {
            Some(field_type) if !CONTAINER_TYPES.contains(&field_type.as_str()) => {}
            _ => {
                return Err(format!(
                    "strict_dynamic_mapping_exception: mapping set to strict, dynamic introduction of [{}] is not allowed",
                    leaf
                ))
            }
        }
    }

    Ok(())
}

fn document_leaves(value: &Value, prefix: &str, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                document_leaves(child, &join(prefix, key), out);
            }
        }
        Value::Array(items) => {
            for item in items {
                document_leaves(item, prefix, out);
            }
        }
        Value::Null => {}
        _ => {
            if !prefix.is_empty() {
                out.insert(prefix.to_string());
            }
        }
    }
}

/// Merge `update` into `existing`, failing when a field changes type.
pub(crate) fn merge_mapping(existing: &Value, update: &Value) -> Result<Value, StoreError> {
    let current = mapped_fields(existing);
    for (path, field_type) in mapped_fields(update) {
        if let Some(previous) = current.get(&path) {
            if *previous != field_type {
                return Err(StoreError::mapping_conflict(format!(
                    "mapper [{}] cannot be changed from type [{}] to [{}]",
                    path, previous, field_type
                )));
            }
        }
    }

    let mut merged = existing.clone();
    deep_merge(&mut merged, update);
    Ok(merged)
}

fn deep_merge(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target), Value::Object(update)) => {
            for (key, value) in update {
                match target.get_mut(key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, update) => *target = update.clone(),
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Tokens produced by a named analyzer declared in index settings.
///
/// Models the tokenizer choice (`keyword`, `whitespace`, anything else splits
/// on non-alphanumerics) and the `lowercase` filter. Other filters are not
/// applied.
pub(crate) fn analyze(settings: &Value, analyzer: &str, text: &str) -> Result<Vec<String>, StoreError> {
    let definition = match analyzer {
        "standard" => serde_json::json!({ "tokenizer": "standard", "filter": ["lowercase"] }),
        "keyword" => serde_json::json!({ "tokenizer": "keyword" }),
        "whitespace" => serde_json::json!({ "tokenizer": "whitespace" }),
        name => settings
            .pointer("/settings/analysis/analyzer")
            .and_then(|analyzers| analyzers.get(name))
            .cloned()
            .ok_or_else(|| StoreError::request(format!("failed to find analyzer [{}]", name)))?,
    };

    let tokenizer = definition
        .get("tokenizer")
        .and_then(Value::as_str)
        .unwrap_or("standard");
    let lowercase = definition
        .get("filter")
        .and_then(Value::as_array)
        .map(|filters| filters.iter().any(|f| f.as_str() == Some("lowercase")))
        .unwrap_or(false);

    let tokens: Vec<String> = match tokenizer {
        "keyword" => vec![text.to_string()],
        "whitespace" => text.split_whitespace().map(str::to_string).collect(),
        _ => tokenize(text),
    };

    Ok(tokens
        .into_iter()
        .filter(|token| !token.is_empty())
        .map(|token| if lowercase { token.to_lowercase() } else { token })
        .collect())
}

/// Split on anything that is not alphanumeric.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lower-cased tokens, as stored for analyzed text.
pub(crate) fn text_tokens(text: &str) -> Vec<String> {
    tokenize(text).into_iter().map(|t| t.to_lowercase()).collect()
}

/// Empty object mapping, used when a type has none yet.
pub(crate) fn empty_mapping() -> Value {
    Value::Object(Map::new())
}
