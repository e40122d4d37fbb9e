//! Declarative tool descriptions.
//!
//! A [`ToolDescriptor`] is plain data: everything needed to derive a tool's
//! registration payload (name, description, schemas, annotations) without
//! running it.

use serde_json::{json, Value};

use crate::annotations::AnnotationHints;

/// Type of a single tool parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Array(Box<ParamType>),
    Object,
    /// String restricted to a fixed set of values.
    Enum(Vec<String>),
    Any,
}

impl ParamType {
    pub fn array_of(item: ParamType) -> Self {
        ParamType::Array(Box::new(item))
    }

    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ParamType::Enum(values.into_iter().map(Into::into).collect())
    }

    /// Structural schema node for this type, without description or examples.
    pub fn to_schema(&self) -> Value {
        match self {
            ParamType::String => json!({ "type": "string" }),
            ParamType::Number => json!({ "type": "number" }),
            ParamType::Integer => json!({ "type": "integer" }),
            ParamType::Boolean => json!({ "type": "boolean" }),
            ParamType::Array(item) => json!({ "type": "array", "items": item.to_schema() }),
            ParamType::Object => json!({ "type": "object" }),
            ParamType::Enum(values) => json!({ "type": "string", "enum": values }),
            ParamType::Any => json!({}),
        }
    }

    /// Short label used in generated descriptions.
    pub fn label(&self) -> String {
        match self {
            ParamType::String => "string".to_string(),
            ParamType::Number => "number".to_string(),
            ParamType::Integer => "integer".to_string(),
            ParamType::Boolean => "boolean".to_string(),
            ParamType::Array(item) => format!("array of {}", item.label()),
            ParamType::Object => "object".to_string(),
            ParamType::Enum(values) => format!("one of: {}", values.join(", ")),
            ParamType::Any => "any".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub param_type: ParamType,
    pub required: bool,
    pub description: Option<String>,
    /// Free-text constraints ("must be positive", "ISO 8601 date")
    pub constraints: Vec<String>,
    pub examples: Vec<Value>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: false,
            description: None,
            constraints: Vec::new(),
            examples: Vec::new(),
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    #[must_use]
    pub fn with_example(mut self, example: impl Into<Value>) -> Self {
        self.examples.push(example.into());
        self
    }

    /// Schema node: type, then description and examples when present.
    pub fn to_schema(&self) -> Value {
        let mut node = self.param_type.to_schema();
        if let Value::Object(map) = &mut node {
            if let Some(description) = &self.description {
                map.insert("description".to_string(), Value::String(description.clone()));
            }
            if !self.examples.is_empty() {
                map.insert("examples".to_string(), Value::Array(self.examples.clone()));
            }
        }
        node
    }
}

/// A worked example rendered into the tool description.
#[derive(Debug, Clone, PartialEq)]
pub struct Example {
    pub description: String,
    pub parameters: Value,
    pub expected_output: String,
}

impl Example {
    pub fn new(
        description: impl Into<String>,
        parameters: Value,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            parameters,
            expected_output: expected_output.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolDescriptor {
    pub title: String,
    pub summary: String,
    pub purpose: String,
    pub use_cases: Vec<String>,
    pub parameters: Vec<Parameter>,
    pub examples: Vec<Example>,
    pub hints: Vec<String>,
    pub output_schema: Option<Value>,
    pub output_description: Option<String>,
    /// Raw structural schema merged over the parameter-derived one
    pub input_schema: Option<Value>,
    pub annotations: AnnotationHints,
}

impl ToolDescriptor {
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        purpose: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            purpose: purpose.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_use_case(mut self, use_case: impl Into<String>) -> Self {
        self.use_cases.push(use_case.into());
        self
    }

    #[must_use]
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    #[must_use]
    pub fn with_example(mut self, example: Example) -> Self {
        self.examples.push(example);
        self
    }

    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    #[must_use]
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    #[must_use]
    pub fn with_output_description(mut self, description: impl Into<String>) -> Self {
        self.output_description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = Some(schema);
        self
    }

    #[must_use]
    pub fn with_annotations(mut self, hints: AnnotationHints) -> Self {
        self.annotations = hints;
        self
    }

    /// Completeness problems, empty when the descriptor can be registered.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for (field, value) in [
            ("title", &self.title),
            ("summary", &self.summary),
            ("purpose", &self.purpose),
        ] {
            if value.trim().is_empty() {
                problems.push(format!("{field} is empty"));
            }
        }

        let mut seen = std::collections::HashSet::new();
        for param in &self.parameters {
            if param.name.trim().is_empty() {
                problems.push("parameter with empty name".to_string());
            } else if !seen.insert(param.name.as_str()) {
                problems.push(format!("duplicate parameter '{}'", param.name));
            }
        }

        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_schema_node() {
        let param = Parameter::new("build_id", ParamType::Integer)
            .required()
            .with_description("Build number")
            .with_example(42);

        assert_eq!(
            param.to_schema(),
            json!({ "type": "integer", "description": "Build number", "examples": [42] })
        );
    }

    #[test]
    fn test_nested_types() {
        let ty = ParamType::array_of(ParamType::one_of(["open", "closed"]));
        assert_eq!(
            ty.to_schema(),
            json!({ "type": "array", "items": { "type": "string", "enum": ["open", "closed"] } })
        );
        assert_eq!(ty.label(), "array of one of: open, closed");
        assert_eq!(ParamType::Any.to_schema(), json!({}));
    }

    #[test]
    fn test_problems() {
        let ok = ToolDescriptor::new("Get Build", "Fetch a build", "Inspect CI results");
        assert!(ok.problems().is_empty());

        let bad = ToolDescriptor::new("", "  ", "x")
            .with_parameter(Parameter::new("id", ParamType::String))
            .with_parameter(Parameter::new("id", ParamType::Integer));
        let problems = bad.problems();
        assert!(problems.contains(&"title is empty".to_string()));
        assert!(problems.contains(&"summary is empty".to_string()));
        assert!(problems.contains(&"duplicate parameter 'id'".to_string()));
    }
}
