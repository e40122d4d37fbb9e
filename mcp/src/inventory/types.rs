//! Core types for the tool inventory.

use std::sync::Arc;

use rmcp::model::{JsonObject, Prompt, PromptArgument, RawResource};
use serde_json::Value;

use crate::tool::RegisteredTool;

/// A registered tool and the client that owns it.
#[derive(Debug, Clone)]
pub struct ToolEntry {
    pub client: String,
    pub tool: Arc<RegisteredTool>,
}

impl ToolEntry {
    pub fn new(client: impl Into<String>, tool: Arc<RegisteredTool>) -> Self {
        Self {
            client: client.into(),
            tool,
        }
    }

    pub fn name(&self) -> &str {
        self.tool.name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptArg {
    pub name: String,
    pub description: Option<String>,
    pub required: bool,
}

impl PromptArg {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: false,
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
}

/// A fixed prompt template.
///
/// `{{arg}}` placeholders are substituted from the request arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPrompt {
    pub name: String,
    pub description: Option<String>,
    pub arguments: Vec<PromptArg>,
    pub template: String,
}

impl StaticPrompt {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            arguments: Vec::new(),
            template: template.into(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_argument(mut self, arg: PromptArg) -> Self {
        self.arguments.push(arg);
        self
    }

    /// Protocol listing record under the registered name.
    pub fn to_rmcp(&self, registered_name: &str) -> Prompt {
        let arguments = (!self.arguments.is_empty()).then(|| {
            self.arguments
                .iter()
                .map(|arg| PromptArgument {
                    name: arg.name.clone(),
                    title: None,
                    description: arg.description.clone(),
                    required: Some(arg.required),
                })
                .collect()
        });

        Prompt {
            name: registered_name.to_string(),
            title: None,
            description: self.description.clone(),
            arguments,
            icons: None,
        }
    }

    /// Substitute arguments into the template.
    ///
    /// Fails when a required argument is missing. Non-string values are
    /// inserted as JSON.
    pub fn render(&self, args: Option<&JsonObject>) -> Result<String, String> {
        let mut text = self.template.clone();

        for arg in &self.arguments {
            let value = args.and_then(|a| a.get(&arg.name));
            let rendered = match value {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None if arg.required => {
                    return Err(format!("missing required argument '{}'", arg.name));
                }
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            };
            text = text.replace(&format!("{{{{{}}}}}", arg.name), &rendered);
        }

        Ok(text)
    }
}

/// A static text resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextResource {
    pub uri: String,
    pub name: String,
    pub description: Option<String>,
    pub mime_type: String,
    pub text: String,
}

impl TextResource {
    pub fn new(uri: impl Into<String>, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: "text/plain".to_string(),
            text: text.into(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn to_rmcp(&self) -> RawResource {
        RawResource {
            uri: self.uri.clone(),
            name: self.name.clone(),
            title: None,
            description: self.description.clone(),
            mime_type: Some(self.mime_type.clone()),
            size: u32::try_from(self.text.len()).ok(),
            icons: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PromptEntry {
    pub client: String,
    pub prompt: StaticPrompt,
}

#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub client: String,
    pub resource: TextResource,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn triage() -> StaticPrompt {
        StaticPrompt::new("triage", "Triage issue {{issue_id}} in {{project}}.")
            .with_description("Triage an issue")
            .with_argument(PromptArg::new("issue_id").required())
            .with_argument(PromptArg::new("project"))
    }

    #[test]
    fn test_prompt_render() {
        let args = json!({ "issue_id": 42, "project": "web" });
        let text = triage().render(args.as_object()).unwrap();
        assert_eq!(text, "Triage issue 42 in web.");
    }

    #[test]
    fn test_prompt_render_optional_missing() {
        let args = json!({ "issue_id": "ABC-1" });
        let text = triage().render(args.as_object()).unwrap();
        assert_eq!(text, "Triage issue ABC-1 in .");
    }

    #[test]
    fn test_prompt_render_required_missing() {
        let err = triage().render(None).unwrap_err();
        assert_eq!(err, "missing required argument 'issue_id'");
    }

    #[test]
    fn test_prompt_to_rmcp() {
        let prompt = triage().to_rmcp("issues_triage");
        assert_eq!(prompt.name, "issues_triage");
        let args = prompt.arguments.unwrap();
        assert_eq!(args.len(), 2);
        assert_eq!(args[0].required, Some(true));
    }

    #[test]
    fn test_resource_to_rmcp() {
        let resource = TextResource::new("docs://guide", "Guide", "hello")
            .with_mime_type("text/markdown")
            .to_rmcp();
        assert_eq!(resource.uri, "docs://guide");
        assert_eq!(resource.mime_type.as_deref(), Some("text/markdown"));
        assert_eq!(resource.size, Some(5));
    }
}
