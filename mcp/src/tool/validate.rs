//! Argument validation against a tool's input schema.
//!
//! Supports the schema subset the translator emits plus the common keywords
//! found in hand-written raw schemas: `type` (string or union array),
//! `required`, `enum`, `properties`, `items`, `additionalProperties: false`,
//! `minimum`/`maximum` and `minLength`/`maxLength`. Unknown keywords are
//! ignored. All violations are collected rather than stopping at the first.

use std::fmt;

use rmcp::model::JsonObject;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path to the offending value, empty for the root
    pub path: String,
    pub message: String,
}

impl Violation {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Validate call arguments against an object schema.
pub fn validate_arguments(schema: &JsonObject, args: &JsonObject) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();
    check_object(schema, args, "", &mut violations);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Render violations as a single message.
pub fn describe(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn check(schema: &Value, value: &Value, path: &str, out: &mut Vec<Violation>) {
    // `true` and non-object schemas accept anything.
    let Some(schema) = schema.as_object() else {
        return;
    };

    if let Some(allowed) = declared_types(schema) {
        if !allowed.iter().any(|t| matches_type(t, value)) {
            out.push(Violation::new(
                path,
                format!("expected {}, got {}", allowed.join(" or "), type_name(value)),
            ));
            return;
        }
    }

    if let Some(Value::Array(options)) = schema.get("enum") {
        if !options.contains(value) {
            let rendered: Vec<String> = options.iter().map(Value::to_string).collect();
            out.push(Violation::new(
                path,
                format!("must be one of {}", rendered.join(", ")),
            ));
        }
    }

    match value {
        Value::Object(map) => check_object(schema, map, path, out),
        Value::Array(items) => {
            if let Some(item_schema) = schema.get("items") {
                for (i, item) in items.iter().enumerate() {
                    check(item_schema, item, &format!("{path}[{i}]"), out);
                }
            }
        }
        Value::String(s) => {
            let len = s.chars().count() as u64;
            if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
                if len < min {
                    out.push(Violation::new(path, format!("must be at least {min} characters")));
                }
            }
            if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
                if len > max {
                    out.push(Violation::new(path, format!("must be at most {max} characters")));
                }
            }
        }
        Value::Number(n) => {
            let Some(n) = n.as_f64() else {
                return;
            };
            if let Some(min) = schema.get("minimum").and_then(Value::as_f64) {
                if n < min {
                    out.push(Violation::new(path, format!("must be >= {min}")));
                }
            }
            if let Some(max) = schema.get("maximum").and_then(Value::as_f64) {
                if n > max {
                    out.push(Violation::new(path, format!("must be <= {max}")));
                }
            }
        }
        _ => {}
    }
}

fn check_object(schema: &JsonObject, map: &JsonObject, path: &str, out: &mut Vec<Violation>) {
    if let Some(Value::Array(required)) = schema.get("required") {
        for key in required.iter().filter_map(Value::as_str) {
            if !map.contains_key(key) {
                out.push(Violation::new(&join(path, key), "is required"));
            }
        }
    }

    let properties = schema.get("properties").and_then(Value::as_object);
    let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));

    for (key, value) in map {
        match properties.and_then(|props| props.get(key)) {
            Some(node) => check(node, value, &join(path, key), out),
            None if closed => out.push(Violation::new(&join(path, key), "is not allowed")),
            None => {}
        }
    }
}

fn declared_types(schema: &JsonObject) -> Option<Vec<&str>> {
    let types: Vec<&str> = match schema.get("type")? {
        Value::String(t) => vec![t.as_str()],
        Value::Array(types) => types.iter().filter_map(Value::as_str).collect(),
        _ => return None,
    };
    (!types.is_empty()).then_some(types)
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => match value {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        },
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}
