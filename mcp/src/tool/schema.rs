//! Descriptor to registration-payload translation.
//!
//! Everything here is a pure function of the descriptor, so the same descriptor
//! always yields byte-identical schemas and descriptions.

use rmcp::model::JsonObject;
use serde_json::{json, Value};

use super::descriptor::ToolDescriptor;

const SKIPPED_RAW_KEYS: [&str; 3] = ["type", "properties", "required"];

/// Build the input schema: one node per parameter, then the raw schema merged
/// over it.
///
/// Raw properties override same-named parameter nodes and may add new ones. Raw
/// `required` entries are unioned in. Nothing declared by a parameter is removed.
pub fn build_input_schema(descriptor: &ToolDescriptor) -> JsonObject {
    let mut properties = JsonObject::new();
    let mut required: Vec<String> = Vec::new();

    for param in &descriptor.parameters {
        properties.insert(param.name.clone(), param.to_schema());
        if param.required {
            required.push(param.name.clone());
        }
    }

    let mut schema = JsonObject::new();

    if let Some(Value::Object(raw)) = &descriptor.input_schema {
        if let Some(Value::Object(raw_props)) = raw.get("properties") {
            for (name, node) in raw_props {
                properties.insert(name.clone(), node.clone());
            }
        }

        if let Some(Value::Array(raw_required)) = raw.get("required") {
            for name in raw_required.iter().filter_map(Value::as_str) {
                if !required.iter().any(|r| r == name) {
                    required.push(name.to_string());
                }
            }
        }

        for (key, value) in raw {
            if !SKIPPED_RAW_KEYS.contains(&key.as_str()) {
                schema.insert(key.clone(), value.clone());
            }
        }
    }

    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), json!(required));
    }
    schema
}

/// Output schemas are enforced only when they describe an object.
pub fn normalize_output_schema(schema: Option<&Value>) -> Option<JsonObject> {
    match schema {
        Some(Value::Object(map)) if map.get("type").and_then(Value::as_str) == Some("object") => {
            Some(map.clone())
        }
        _ => None,
    }
}

/// Render the human-readable description.
///
/// Section order is fixed: summary, Parameters, Output Description, Use Cases,
/// Examples, Hints. Empty sections are omitted.
pub fn build_description(descriptor: &ToolDescriptor) -> String {
    let mut sections: Vec<String> = Vec::new();

    if !descriptor.summary.trim().is_empty() {
        sections.push(descriptor.summary.trim().to_string());
    }

    let param_lines = parameter_lines(descriptor);
    if !param_lines.is_empty() {
        sections.push(format!("Parameters:\n{}", param_lines.join("\n")));
    }

    if let Some(output) = descriptor
        .output_description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        sections.push(format!("Output Description:\n{output}"));
    }

    if !descriptor.use_cases.is_empty() {
        sections.push(format!("Use Cases:\n{}", numbered(&descriptor.use_cases)));
    }

    if !descriptor.examples.is_empty() {
        let rendered: Vec<String> = descriptor
            .examples
            .iter()
            .enumerate()
            .map(|(i, example)| {
                let params = serde_json::to_string_pretty(&example.parameters)
                    .unwrap_or_else(|_| example.parameters.to_string());
                format!(
                    "{}. {}\n   Parameters:\n{}\n   Expected Output: {}",
                    i + 1,
                    example.description,
                    indent(&params, "   "),
                    example.expected_output
                )
            })
            .collect();
        sections.push(format!("Examples:\n{}", rendered.join("\n\n")));
    }

    if !descriptor.hints.is_empty() {
        sections.push(format!("Hints:\n{}", numbered(&descriptor.hints)));
    }

    sections.join("\n\n")
}

fn parameter_lines(descriptor: &ToolDescriptor) -> Vec<String> {
    if !descriptor.parameters.is_empty() {
        return descriptor
            .parameters
            .iter()
            .map(|param| {
                let mut line = format!(
                    "- {} ({}{})",
                    param.name,
                    param.param_type.label(),
                    if param.required { ", required" } else { "" }
                );
                if let Some(description) = &param.description {
                    line.push_str(": ");
                    line.push_str(description);
                }
                if !param.constraints.is_empty() {
                    line.push_str(&format!("\n  Constraints: {}", param.constraints.join("; ")));
                }
                if !param.examples.is_empty() {
                    let examples: Vec<String> =
                        param.examples.iter().map(Value::to_string).collect();
                    line.push_str(&format!("\n  Examples: {}", examples.join(", ")));
                }
                line
            })
            .collect();
    }

    // No declared parameters: introspect the raw schema instead.
    let Some(Value::Object(raw)) = &descriptor.input_schema else {
        return Vec::new();
    };
    let Some(Value::Object(props)) = raw.get("properties") else {
        return Vec::new();
    };
    let required: Vec<&str> = raw
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    props
        .iter()
        .map(|(name, node)| {
            let mut line = format!(
                "- {} ({}{})",
                name,
                schema_type_label(node),
                if required.contains(&name.as_str()) {
                    ", required"
                } else {
                    ""
                }
            );
            if let Some(description) = node.get("description").and_then(Value::as_str) {
                line.push_str(": ");
                line.push_str(description);
            }
            line
        })
        .collect()
}

fn schema_type_label(node: &Value) -> String {
    match node.get("type") {
        Some(Value::String(t)) => t.clone(),
        Some(Value::Array(types)) => {
            let names: Vec<&str> = types.iter().filter_map(Value::as_str).collect();
            names.join(" | ")
        }
        _ => "any".to_string(),
    }
}

fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{prefix}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
