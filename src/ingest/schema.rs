//! JSON Schema helpers shared by the `OpenAPI` and Swagger parsers

use adapter_core::{ParamLocation, ParamType, Parameter};
use serde_json::{Map, Value};
use tracing::debug;

/// Maximum `$ref` hops followed before giving up on a cyclic schema
const MAX_REF_DEPTH: usize = 16;

/// Resolves local `$ref` pointers against the whole document
pub(crate) struct RefResolver<'a> {
    root: &'a Value,
}

impl<'a> RefResolver<'a> {
    pub(crate) fn new(root: &'a Value) -> Self {
        Self { root }
    }

    /// Follow `$ref` chains and flatten `allOf` into a single object schema
    pub(crate) fn resolve(&self, value: &Value) -> Value {
        self.resolve_depth(value, 0)
    }

    fn resolve_depth(&self, value: &Value, depth: usize) -> Value {
        if depth > MAX_REF_DEPTH {
            debug!("Giving up on deeply nested $ref chain");
            return Value::Object(Map::new());
        }

        if let Some(reference) = value.get("$ref").and_then(Value::as_str) {
            return match self.lookup(reference) {
                Some(target) => self.resolve_depth(target, depth + 1),
                None => {
                    debug!(reference = %reference, "Unresolvable $ref");
                    Value::Object(Map::new())
                }
            };
        }

        if let Some(parts) = value.get("allOf").and_then(Value::as_array) {
            let mut merged = Map::new();
            let mut properties = Map::new();
            let mut required: Vec<Value> = Vec::new();
            for part in parts {
                let part = self.resolve_depth(part, depth + 1);
                if let Some(props) = part.get("properties").and_then(Value::as_object) {
                    for (k, v) in props {
                        properties.insert(k.clone(), v.clone());
                    }
                }
                if let Some(req) = part.get("required").and_then(Value::as_array) {
                    for r in req {
                        if !required.contains(r) {
                            required.push(r.clone());
                        }
                    }
                }
            }
            if let Some(obj) = value.as_object() {
                for (k, v) in obj {
                    if k != "allOf" {
                        merged.insert(k.clone(), v.clone());
                    }
                }
            }
            merged.insert("type".to_string(), Value::String("object".to_string()));
            merged.insert("properties".to_string(), Value::Object(properties));
            merged.insert("required".to_string(), Value::Array(required));
            return Value::Object(merged);
        }

        value.clone()
    }

    /// Only local pointers (`#/...`) are supported
    fn lookup(&self, reference: &str) -> Option<&'a Value> {
        let pointer = reference.strip_prefix('#')?;
        self.root.pointer(pointer)
    }
}

/// Semantic type of a (resolved) schema
pub(crate) fn schema_type(schema: &Value) -> ParamType {
    match schema.get("type") {
        Some(Value::String(t)) => ParamType::from_schema_type(t),
        // OpenAPI 3.1 allows `type: [string, "null"]`
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null")
            .map_or(ParamType::String, ParamType::from_schema_type),
        _ if schema.get("properties").is_some() => ParamType::Object,
        _ if schema.get("items").is_some() => ParamType::Array,
        _ => ParamType::String,
    }
}

/// Example value from `example`, `default`, `examples[0]` or the first `enum` entry
pub(crate) fn schema_example(schema: &Value) -> Option<Value> {
    schema
        .get("example")
        .or_else(|| schema.get("default"))
        .or_else(|| schema.get("examples").and_then(|e| e.get(0)))
        .or_else(|| schema.get("enum").and_then(|e| e.get(0)))
        .cloned()
}

/// Non-empty string field
pub(crate) fn text(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Expand a request-body schema into body parameters.
///
/// Object schemas contribute one parameter per property, required per the
/// schema's `required` list. Anything else becomes a single `body` parameter.
pub(crate) fn body_parameters(
    resolver: &RefResolver<'_>,
    schema: &Value,
    body_required: bool,
) -> Vec<Parameter> {
    let schema = resolver.resolve(schema);

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        let param_type = schema_type(&schema);
        let mut param = Parameter::new("body", ParamLocation::Body, param_type)
            .with_required(body_required)
            .with_description(text(&schema, "description").unwrap_or_default());
        if let Some(example) = schema_example(&schema) {
            param = param.with_example(example);
        }
        return vec![param];
    };

    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, prop)| {
            let prop = resolver.resolve(prop);
            let mut param = Parameter::new(name.clone(), ParamLocation::Body, schema_type(&prop))
                .with_required(required.contains(&name.as_str()))
                .with_description(text(&prop, "description").unwrap_or_default());
            if let Some(example) = schema_example(&prop) {
                param = param.with_example(example);
            }
            param
        })
        .collect()
}

/// Replace `base` entries with `overrides` that share name and location, then
/// append the remaining overrides.
pub(crate) fn merge_parameters(base: Vec<Parameter>, overrides: Vec<Parameter>) -> Vec<Parameter> {
    let mut merged: Vec<Parameter> = base
        .into_iter()
        .filter(|b| {
            !overrides
                .iter()
                .any(|o| o.name == b.name && o.location == b.location)
        })
        .collect();
    merged.extend(overrides);
    merged
}
