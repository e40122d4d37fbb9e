//! Execution wrapper.
//!
//! [`RegisteredTool`] pairs a [`Tool`] with its derived registration payload and
//! enforces the invocation contract:
//!
//! 1. Arguments are validated against the input schema. Failures become an
//!    expected-error result and the handler is not called.
//! 2. The handler runs.
//! 3. `ToolError` becomes an expected-error result and is never reported.
//! 4. Any other handler error is reported once, then propagated unchanged.
//! 5. A non-empty result from a tool with an output schema must carry
//!    structured content.
//! 6. Structured content without a text block gets one mirrored from it.

use std::{borrow::Cow, sync::Arc, time::Instant};

use rmcp::model::{CallToolResult, Content, JsonObject, Tool as RmcpTool};
use tracing::{debug, error};

use super::{
    handler::{Tool, ToolContext},
    schema::{build_description, build_input_schema, normalize_output_schema},
    validate::{describe, validate_arguments},
};
use crate::{
    annotations::ToolAnnotations,
    core::{
        metrics::{CallOutcome, ToolMetrics},
        reporter::{Incident, IncidentReporter},
    },
    error::{HandlerError, InvocationError},
};

/// Lower-case a title and collapse each whitespace run into `_`.
pub fn slug(title: &str) -> String {
    title
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// Registered name for a tool: `<prefix>_<local name>`.
pub fn tool_name(prefix: &str, local_name: &str) -> String {
    format!("{prefix}_{local_name}")
}

/// The result shape for an expected failure.
pub fn expected_error_result(title: &str, message: &str) -> CallToolResult {
    CallToolResult::error(vec![Content::text(format!(
        "Error executing {title}: {message}"
    ))])
}

/// Collaborators every wrapped tool reports to.
#[derive(Clone)]
pub struct ExecutionHooks {
    pub reporter: Arc<dyn IncidentReporter>,
    pub metrics: Arc<ToolMetrics>,
}

pub struct RegisteredTool {
    name: String,
    title: String,
    client_name: String,
    definition: RmcpTool,
    input_schema: Arc<JsonObject>,
    has_output_schema: bool,
    annotations: ToolAnnotations,
    tool: Arc<dyn Tool>,
    hooks: ExecutionHooks,
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("name", &self.name)
            .field("client", &self.client_name)
            .finish_non_exhaustive()
    }
}

impl RegisteredTool {
    /// Derive the registration payload for `tool` as owned by the given client.
    pub fn new(
        client_prefix: &str,
        client_name: &str,
        tool: Arc<dyn Tool>,
        hooks: ExecutionHooks,
    ) -> Self {
        let descriptor = tool.descriptor();
        let name = tool_name(client_prefix, &tool.name());
        let title = descriptor.title.clone();
        let annotations = ToolAnnotations::infer(&descriptor.annotations);
        let input_schema = Arc::new(build_input_schema(descriptor));
        let output_schema =
            normalize_output_schema(descriptor.output_schema.as_ref()).map(Arc::new);

        let definition = RmcpTool {
            name: Cow::Owned(name.clone()),
            title: Some(format!("{client_name}: {title}")),
            description: Some(Cow::Owned(build_description(descriptor))),
            input_schema: Arc::clone(&input_schema),
            output_schema: output_schema.clone(),
            annotations: Some(annotations.to_rmcp(&title)),
            icons: None,
        };

        Self {
            name,
            title,
            client_name: client_name.to_string(),
            definition,
            input_schema,
            has_output_schema: output_schema.is_some(),
            annotations,
            tool,
            hooks,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn client_name(&self) -> &str {
        &self.client_name
    }

    /// The registration record handed to the host.
    pub fn definition(&self) -> &RmcpTool {
        &self.definition
    }

    pub fn annotations(&self) -> &ToolAnnotations {
        &self.annotations
    }

    pub fn has_output_schema(&self) -> bool {
        self.has_output_schema
    }

    /// Invoke the tool through the full contract.
    pub async fn invoke(
        &self,
        args: JsonObject,
        ctx: ToolContext,
    ) -> Result<CallToolResult, InvocationError> {
        let start = Instant::now();
        self.hooks.metrics.record_call_start(&self.name);

        let (outcome, result) = self.run(args, ctx).await;

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.hooks
            .metrics
            .record_call_end(&self.name, outcome, duration_ms);
        result
    }

    async fn run(
        &self,
        args: JsonObject,
        ctx: ToolContext,
    ) -> (CallOutcome, Result<CallToolResult, InvocationError>) {
        if let Err(violations) = validate_arguments(&self.input_schema, &args) {
            let message = format!("Invalid arguments: {}", describe(&violations));
            debug!(tool = %self.name, %message, "Rejected tool arguments");
            return (
                CallOutcome::ValidationFailure,
                Ok(expected_error_result(&self.title, &message)),
            );
        }

        let mut result = match self.tool.execute(args, ctx).await {
            Ok(result) => result,
            Err(HandlerError::Tool(err)) => {
                debug!(tool = %self.name, error = %err, "Tool returned expected error");
                return (
                    CallOutcome::ExpectedError,
                    Ok(expected_error_result(&self.title, &err.message)),
                );
            }
            Err(HandlerError::Unexpected(err)) => {
                self.report(&err);
                return (CallOutcome::UnexpectedError, Err(InvocationError::Unexpected(err)));
            }
        };

        if result.is_error == Some(true) {
            return (CallOutcome::ExpectedError, Ok(result));
        }

        let is_empty = result.content.is_empty() && result.structured_content.is_none();
        if self.has_output_schema && !is_empty && result.structured_content.is_none() {
            let err = InvocationError::OutputContract {
                tool_name: self.name.clone(),
            };
            error!(tool = %self.name, client = %self.client_name, "{err}");
            self.report(&anyhow::anyhow!(err.to_string()));
            return (CallOutcome::ContractViolation, Err(err));
        }

        if let Some(structured) = &result.structured_content {
            let has_text = result.content.iter().any(|c| c.as_text().is_some());
            if !has_text {
                let text = serde_json::to_string_pretty(structured)
                    .unwrap_or_else(|_| structured.to_string());
                result.content.push(Content::text(text));
            }
        }

        (CallOutcome::Success, Ok(result))
    }

    fn report(&self, err: &anyhow::Error) {
        let incident = Incident::new(&self.name, &self.client_name, err);
        self.hooks.reporter.report(&incident, err);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    use super::*;
    use crate::{
        cache::ToolCache,
        error::ToolError,
        tool::descriptor::{ParamType, Parameter, ToolDescriptor},
    };

    #[derive(Default)]
    struct RecordingReporter {
        incidents: Mutex<Vec<Incident>>,
    }

    impl IncidentReporter for RecordingReporter {
        fn report(&self, incident: &Incident, _error: &anyhow::Error) {
            self.incidents.lock().push(incident.clone());
        }
    }

    enum Behavior {
        Text,
        Structured,
        TextOnly,
        Empty,
        Expected,
        Unexpected,
    }

    struct GetBuild {
        descriptor: ToolDescriptor,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl GetBuild {
        fn new(behavior: Behavior, output_schema: bool) -> Self {
            let mut descriptor = ToolDescriptor::new("Get Build", "Fetch a build.", "CI triage")
                .with_parameter(Parameter::new("build_id", ParamType::Integer).required());
            if output_schema {
                descriptor = descriptor.with_output_schema(json!({
                    "type": "object",
                    "properties": { "id": { "type": "integer" } }
                }));
            }
            Self {
                descriptor,
                behavior,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Tool for GetBuild {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.descriptor
        }

        async fn execute(
            &self,
            args: JsonObject,
            _ctx: ToolContext,
        ) -> Result<CallToolResult, HandlerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Text => Ok(CallToolResult::success(vec![Content::text("ok")])),
                Behavior::Structured => {
                    let mut result = CallToolResult::success(Vec::new());
                    result.structured_content = Some(json!({ "id": args["build_id"] }));
                    Ok(result)
                }
                Behavior::TextOnly => Ok(CallToolResult::success(vec![Content::text("{}")])),
                Behavior::Empty => Ok(CallToolResult::success(Vec::new())),
                Behavior::Expected => Err(ToolError::new("Build not found").into()),
                Behavior::Unexpected => Err(anyhow::anyhow!("network down").into()),
            }
        }
    }

    fn wrap(tool: Arc<GetBuild>) -> (RegisteredTool, Arc<RecordingReporter>, Arc<ToolMetrics>) {
        let reporter = Arc::new(RecordingReporter::default());
        let metrics = Arc::new(ToolMetrics::new());
        let hooks = ExecutionHooks {
            reporter: reporter.clone(),
            metrics: metrics.clone(),
        };
        (RegisteredTool::new("ci", "CI", tool, hooks), reporter, metrics)
    }

    fn ctx() -> ToolContext {
        ToolContext::new("ci_get_build", Arc::new(ToolCache::disabled()))
    }

    fn args(value: Value) -> JsonObject {
        value.as_object().cloned().unwrap()
    }

    fn first_text(result: &CallToolResult) -> String {
        result.content[0].as_text().unwrap().text.clone()
    }

    #[test]
    fn test_slug_and_name() {
        assert_eq!(slug("Get Build"), "get_build");
        assert_eq!(slug("  List   Open\tIssues "), "list_open_issues");
        assert_eq!(tool_name("ci", &slug("Get Build")), "ci_get_build");
    }

    #[test]
    fn test_registration_payload() {
        let (wrapped, _, _) = wrap(Arc::new(GetBuild::new(Behavior::Text, true)));
        let def = wrapped.definition();

        assert_eq!(def.name, "ci_get_build");
        assert_eq!(def.title.as_deref(), Some("CI: Get Build"));
        assert!(def.description.as_deref().unwrap().starts_with("Fetch a build."));
        assert_eq!(def.input_schema["required"], json!(["build_id"]));
        assert!(def.output_schema.is_some());

        let ann = def.annotations.as_ref().unwrap();
        assert_eq!(ann.title.as_deref(), Some("Get Build"));
        assert_eq!(ann.read_only_hint, Some(true));
    }

    #[tokio::test]
    async fn test_success_invokes_handler_once() {
        let tool = Arc::new(GetBuild::new(Behavior::Text, false));
        let (wrapped, reporter, metrics) = wrap(tool.clone());

        let result = wrapped
            .invoke(args(json!({ "build_id": 7 })), ctx())
            .await
            .unwrap();

        assert_eq!(first_text(&result), "ok");
        assert_eq!(tool.calls.load(Ordering::SeqCst), 1);
        assert!(reporter.incidents.lock().is_empty());
        assert_eq!(metrics.snapshot().successful_calls, 1);
    }

    #[tokio::test]
    async fn test_invalid_arguments_skip_handler() {
        let tool = Arc::new(GetBuild::new(Behavior::Text, false));
        let (wrapped, reporter, metrics) = wrap(tool.clone());

        let result = wrapped.invoke(JsonObject::new(), ctx()).await.unwrap();

        assert_eq!(result.is_error, Some(true));
        assert_eq!(
            first_text(&result),
            "Error executing Get Build: Invalid arguments: build_id: is required"
        );
        assert_eq!(tool.calls.load(Ordering::SeqCst), 0);
        assert!(reporter.incidents.lock().is_empty());
        assert_eq!(metrics.snapshot().validation_failures, 1);
    }

    #[tokio::test]
    async fn test_tool_error_is_not_reported() {
        let (wrapped, reporter, _) = wrap(Arc::new(GetBuild::new(Behavior::Expected, false)));

        let result = wrapped
            .invoke(args(json!({ "build_id": 7 })), ctx())
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(true));
        assert_eq!(first_text(&result), "Error executing Get Build: Build not found");
        assert!(reporter.incidents.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unexpected_error_reported_once_and_propagated() {
        let (wrapped, reporter, metrics) =
            wrap(Arc::new(GetBuild::new(Behavior::Unexpected, false)));

        let err = wrapped
            .invoke(args(json!({ "build_id": 7 })), ctx())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "network down");
        assert_eq!(err.as_unexpected().unwrap().to_string(), "network down");

        let incidents = reporter.incidents.lock();
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].tool_name, "ci_get_build");
        assert_eq!(incidents[0].client, "CI");
        assert_eq!(metrics.snapshot().unexpected_errors, 1);
    }

    #[tokio::test]
    async fn test_output_contract_violation() {
        let (wrapped, reporter, _) = wrap(Arc::new(GetBuild::new(Behavior::TextOnly, true)));

        let err = wrapped
            .invoke(args(json!({ "build_id": 7 })), ctx())
            .await
            .unwrap_err();

        assert!(matches!(err, InvocationError::OutputContract { .. }));
        assert_eq!(reporter.incidents.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_result_skips_contract_check() {
        let (wrapped, _, _) = wrap(Arc::new(GetBuild::new(Behavior::Empty, true)));

        let result = wrapped
            .invoke(args(json!({ "build_id": 7 })), ctx())
            .await
            .unwrap();
        assert!(result.content.is_empty());
    }

    #[tokio::test]
    async fn test_structured_content_is_mirrored() {
        let (wrapped, _, _) = wrap(Arc::new(GetBuild::new(Behavior::Structured, true)));

        let result = wrapped
            .invoke(args(json!({ "build_id": 7 })), ctx())
            .await
            .unwrap();

        assert_eq!(result.structured_content, Some(json!({ "id": 7 })));
        assert_eq!(first_text(&result), "{\n  \"id\": 7\n}");
    }
}
