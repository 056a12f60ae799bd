//! Conversions between Terraform dynamic values and plain Rust collections

use std::collections::HashMap;
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

/// List of strings from a dynamic list; null elements become empty strings
///
/// Anything that is not a list (null, unknown, a scalar) yields an empty vec.
pub fn expand_string_list(value: &Dynamic) -> Vec<String> {
    match value {
        Dynamic::List(items) => items
            .iter()
            .map(|item| item.as_str().unwrap_or_default().to_string())
            .collect(),
        _ => Vec::new(),
    }
}

/// Dynamic list from an optional slice; `None` becomes an empty list, never null
pub fn flatten_string_list(input: Option<&[String]>) -> Dynamic {
    Dynamic::List(
        input
            .unwrap_or_default()
            .iter()
            .map(|s| Dynamic::String(s.clone()))
            .collect(),
    )
}

/// String map from a dynamic map; non-string values are skipped
pub fn expand_string_map(value: &Dynamic) -> HashMap<String, String> {
    match value {
        Dynamic::Map(entries) => entries
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect(),
        _ => HashMap::new(),
    }
}

pub fn flatten_string_map(input: Option<&HashMap<String, String>>) -> Dynamic {
    Dynamic::Map(
        input
            .map(|m| {
                m.iter()
                    .map(|(k, v)| (k.clone(), Dynamic::String(v.clone())))
                    .collect()
            })
            .unwrap_or_default(),
    )
}

/// Known, non-null value at `path`, if any
pub fn get_known<'a>(value: &'a DynamicValue, path: &AttributePath) -> Option<&'a Dynamic> {
    value.get(path).ok().filter(|v| v.is_known_value())
}

pub fn get_optional_string(value: &DynamicValue, path: &AttributePath) -> Option<String> {
    get_known(value, path).and_then(|v| v.as_str().map(str::to_string))
}

pub fn get_optional_number(value: &DynamicValue, path: &AttributePath) -> Option<f64> {
    get_known(value, path).and_then(Dynamic::as_number)
}

pub fn get_optional_bool(value: &DynamicValue, path: &AttributePath) -> Option<bool> {
    get_known(value, path).and_then(Dynamic::as_bool)
}

/// String list at `path`; absent or null is an empty list
pub fn get_string_list(value: &DynamicValue, path: &AttributePath) -> Vec<String> {
    get_known(value, path)
        .map(expand_string_list)
        .unwrap_or_default()
}

pub fn get_string_map(value: &DynamicValue, path: &AttributePath) -> HashMap<String, String> {
    get_known(value, path)
        .map(expand_string_map)
        .unwrap_or_default()
}

/// Nested block elements at `path` (list and set blocks are both lists here)
pub fn get_blocks<'a>(value: &'a DynamicValue, path: &AttributePath) -> &'a [Dynamic] {
    get_known(value, path)
        .and_then(Dynamic::as_list)
        .unwrap_or_default()
}
