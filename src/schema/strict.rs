//! Strict mode: object schemas default to `additionalProperties: false`.

use serde_json::{Map, Value};

const OBJECT_KEYWORDS: [&str; 5] = [
    "properties",
    "patternProperties",
    "additionalProperties",
    "required",
    "dependencies",
];

pub(crate) fn apply(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if is_object_schema(map) && !map.contains_key("additionalProperties") {
                map.insert("additionalProperties".to_owned(), Value::Bool(false));
            }
            recurse_children(map);
        }
        Value::Array(items) => items.iter_mut().for_each(apply),
        _ => {}
    }
}

fn recurse_children(map: &mut Map<String, Value>) {
    for key in ["properties", "patternProperties", "definitions", "$defs"] {
        if let Some(Value::Object(children)) = map.get_mut(key) {
            children.values_mut().for_each(apply);
        }
    }
    for key in ["additionalProperties", "items", "additionalItems", "not"] {
        if let Some(child) = map.get_mut(key) {
            apply(child);
        }
    }
    for key in ["allOf", "anyOf", "oneOf"] {
        if let Some(Value::Array(children)) = map.get_mut(key) {
            children.iter_mut().for_each(apply);
        }
    }
}

fn is_object_schema(map: &Map<String, Value>) -> bool {
    match map.get("type") {
        Some(Value::String(kind)) => kind == "object",
        Some(Value::Array(kinds)) => kinds.iter().any(|k| k.as_str() == Some("object")),
        _ => OBJECT_KEYWORDS.iter().any(|keyword| map.contains_key(*keyword)),
    }
}
