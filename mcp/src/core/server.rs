//! Tool server: the registration target for clients and the host-facing
//! `rmcp::ServerHandler`.

use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rmcp::{
    model::{
        AnnotateAble, CallToolRequestParam, CallToolResult, GetPromptRequestParam,
        GetPromptResult, JsonObject, ListPromptsResult, ListResourcesResult, ListToolsResult,
        PaginatedRequestParam, Prompt, PromptMessage, PromptMessageRole, RawResource,
        ReadResourceRequestParam, ReadResourceResult, RequestId, ResourceContents,
        ServerCapabilities, ServerInfo, Tool as RmcpTool,
    },
    service::RequestContext,
    RoleServer, ServerHandler,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{
    config::{BridgeConfig, ToolFilterConfig},
    metrics::ToolMetrics,
    reporter::{IncidentReporter, TracingReporter},
};
use crate::{
    cache::ToolCache,
    clients::{Client, Registrar},
    error::{BridgeError, BridgeResult, InvocationError},
    inventory::{ToolEntry, ToolInventory},
    tool::{tool_name, ExecutionHooks, RegisteredTool, ToolContext},
};

/// A client that activated, with what it registered.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveClient {
    pub name: String,
    pub prefix: String,
    pub tool_count: usize,
    pub prompt_count: usize,
    pub resource_count: usize,
    pub activated_at: DateTime<Utc>,
}

struct ServerInner {
    name: String,
    instructions: Option<String>,
    inventory: ToolInventory,
    cache: Arc<ToolCache>,
    tool_filter: ToolFilterConfig,
    hooks: ExecutionHooks,
    active: RwLock<Vec<ActiveClient>>,
    /// Keeps client-owned state alive for the server's lifetime
    clients: RwLock<Vec<Arc<dyn Client>>>,
    /// Serializes client registration so batch collision checks hold
    registration: Mutex<()>,
}

#[derive(Clone)]
pub struct ToolServer {
    inner: Arc<ServerInner>,
}

/// Non-owning handle to the server, for clients that call back into it.
#[derive(Clone)]
pub struct HostHandle {
    inner: Weak<ServerInner>,
}

impl HostHandle {
    /// `None` once the server has been dropped.
    pub fn upgrade(&self) -> Option<ToolServer> {
        self.inner.upgrade().map(|inner| ToolServer { inner })
    }
}

impl ToolServer {
    pub fn new(config: &BridgeConfig) -> Self {
        Self::with_reporter(config, Arc::new(TracingReporter))
    }

    pub fn with_reporter(config: &BridgeConfig, reporter: Arc<dyn IncidentReporter>) -> Self {
        Self {
            inner: Arc::new(ServerInner {
                name: config.server.name.clone(),
                instructions: config.server.instructions.clone(),
                inventory: ToolInventory::new(),
                cache: Arc::new(ToolCache::from_config(&config.cache)),
                tool_filter: config.tools.clone(),
                hooks: ExecutionHooks {
                    reporter,
                    metrics: Arc::new(ToolMetrics::new()),
                },
                active: RwLock::new(Vec::new()),
                clients: RwLock::new(Vec::new()),
                registration: Mutex::new(()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn cache(&self) -> Arc<ToolCache> {
        Arc::clone(&self.inner.cache)
    }

    /// Configured exclude list, applied to every client's tools.
    pub fn tool_filter(&self) -> &ToolFilterConfig {
        &self.inner.tool_filter
    }

    pub fn metrics(&self) -> &ToolMetrics {
        &self.inner.hooks.metrics
    }

    pub fn inventory(&self) -> &ToolInventory {
        &self.inner.inventory
    }

    pub fn host_handle(&self) -> HostHandle {
        HostHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Register everything `client` owns and mark it active.
    ///
    /// Tools matched by the exclude list are dropped first. The rest are
    /// committed as one batch: on any collision nothing from this client is
    /// registered. Returns the number of tools registered.
    pub fn add_client(&self, client: Arc<dyn Client>) -> BridgeResult<usize> {
        let _guard = self.inner.registration.lock();

        let client_name = client.name().to_string();
        let prefix = client.prefix().to_string();

        if self.is_client_active(&client_name) {
            return Err(BridgeError::Config(format!(
                "client '{client_name}' is already active"
            )));
        }

        let mut registrar = Registrar::new();
        client.register_tools(&mut registrar)?;
        client.register_prompts(&mut registrar);
        client.register_resources(&mut registrar);
        let (tools, prompts, resources) = registrar.into_parts();

        let entries: Vec<ToolEntry> = tools
            .into_iter()
            .filter(|tool| {
                let local = tool.name();
                let registered = tool_name(&prefix, &local);
                let excluded = self.inner.tool_filter.is_excluded(&local, Some(&registered));
                if excluded {
                    debug!(
                        client = %client_name,
                        tool = %registered,
                        "Tool excluded by configuration"
                    );
                }
                !excluded
            })
            .map(|tool| {
                let wrapped =
                    RegisteredTool::new(&prefix, &client_name, tool, self.inner.hooks.clone());
                ToolEntry::new(client_name.clone(), Arc::new(wrapped))
            })
            .collect();
        let tool_count = entries.len();
        self.inner.inventory.insert_tools(entries)?;

        let prompt_count = prompts
            .into_iter()
            .filter(|prompt| {
                self.inner.inventory.insert_prompt(
                    tool_name(&prefix, &prompt.name),
                    client_name.clone(),
                    prompt.clone(),
                )
            })
            .count();

        let resource_count = resources
            .into_iter()
            .filter(|resource| {
                self.inner
                    .inventory
                    .insert_resource(client_name.clone(), resource.clone())
            })
            .count();

        info!(
            client = %client_name,
            prefix = %prefix,
            tool_count,
            prompt_count,
            resource_count,
            "Client activated"
        );

        self.inner.active.write().push(ActiveClient {
            name: client_name,
            prefix,
            tool_count,
            prompt_count,
            resource_count,
            activated_at: Utc::now(),
        });
        self.inner.clients.write().push(client);

        Ok(tool_count)
    }

    /// Activated clients in activation order.
    pub fn active_clients(&self) -> Vec<ActiveClient> {
        self.inner.active.read().clone()
    }

    pub fn is_client_active(&self, name: &str) -> bool {
        self.inner.active.read().iter().any(|c| c.name == name)
    }

    pub fn tool(&self, name: &str) -> Option<Arc<RegisteredTool>> {
        self.inner.inventory.get_tool(name)
    }

    /// Registration records for every tool, sorted by name.
    pub fn tool_definitions(&self) -> Vec<RmcpTool> {
        self.inner
            .inventory
            .list_tools()
            .iter()
            .map(|tool| tool.definition().clone())
            .collect()
    }

    /// Invoke a tool by registered name.
    pub async fn invoke_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
        cancellation: CancellationToken,
        request_id: Option<String>,
    ) -> Result<CallToolResult, InvocationError> {
        let tool = self
            .tool(name)
            .ok_or_else(|| InvocationError::UnknownTool(name.to_string()))?;

        let mut ctx = ToolContext::new(name, self.cache()).with_cancellation(cancellation);
        if let Some(request_id) = request_id {
            ctx = ctx.with_request_id(request_id);
        }

        debug!(tool = %name, "Invoking tool");
        tool.invoke(arguments.unwrap_or_default(), ctx).await
    }

    pub fn prompt_definitions(&self) -> Vec<Prompt> {
        self.inner
            .inventory
            .list_prompts()
            .iter()
            .map(|(name, entry)| entry.prompt.to_rmcp(name))
            .collect()
    }

    /// Render a prompt with the given arguments.
    pub fn render_prompt(
        &self,
        name: &str,
        arguments: Option<&JsonObject>,
    ) -> Result<GetPromptResult, rmcp::ErrorData> {
        let entry = self.inner.inventory.get_prompt(name).ok_or_else(|| {
            rmcp::ErrorData::invalid_params(format!("Unknown prompt: {name}"), None)
        })?;

        let text = entry
            .prompt
            .render(arguments)
            .map_err(|msg| rmcp::ErrorData::invalid_params(msg, None))?;

        Ok(GetPromptResult {
            description: entry.prompt.description.clone(),
            messages: vec![PromptMessage::new_text(PromptMessageRole::User, text)],
        })
    }

    pub fn resource_definitions(&self) -> Vec<RawResource> {
        self.inner
            .inventory
            .list_resources()
            .iter()
            .map(|entry| entry.resource.to_rmcp())
            .collect()
    }

    pub fn resource_contents(&self, uri: &str) -> Result<ReadResourceResult, rmcp::ErrorData> {
        let entry = self.inner.inventory.get_resource(uri).ok_or_else(|| {
            rmcp::ErrorData::resource_not_found(format!("Unknown resource: {uri}"), None)
        })?;

        let mut contents = ResourceContents::text(entry.resource.text.clone(), uri);
        if let ResourceContents::TextResourceContents { mime_type, .. } = &mut contents {
            *mime_type = Some(entry.resource.mime_type.clone());
        }

        Ok(ReadResourceResult {
            contents: vec![contents],
        })
    }
}

fn request_id_string(id: &RequestId) -> String {
    match id {
        RequestId::String(s) => s.to_string(),
        RequestId::Number(n) => n.to_string(),
    }
}

impl ServerHandler for ToolServer {
    fn get_info(&self) -> ServerInfo {
        let mut info = ServerInfo::default();
        info.capabilities = ServerCapabilities::builder()
            .enable_tools()
            .enable_prompts()
            .enable_resources()
            .build();
        info.server_info.name = self.inner.name.clone();
        info.server_info.version = env!("CARGO_PKG_VERSION").to_string();
        info.instructions = self.inner.instructions.clone();
        info
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::ErrorData> {
        Ok(ListToolsResult::with_all_items(self.tool_definitions()))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::ErrorData> {
        let request_id = request_id_string(&context.id);
        self.invoke_tool(
            &request.name,
            request.arguments,
            context.ct.clone(),
            Some(request_id),
        )
        .await
        .map_err(rmcp::ErrorData::from)
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListPromptsResult, rmcp::ErrorData> {
        Ok(ListPromptsResult::with_all_items(self.prompt_definitions()))
    }

    async fn get_prompt(
        &self,
        request: GetPromptRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<GetPromptResult, rmcp::ErrorData> {
        self.render_prompt(&request.name, request.arguments.as_ref())
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, rmcp::ErrorData> {
        let resources = self
            .resource_definitions()
            .into_iter()
            .map(|raw| raw.no_annotation())
            .collect();
        Ok(ListResourcesResult::with_all_items(resources))
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, rmcp::ErrorData> {
        self.resource_contents(&request.uri)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::{
        error::HandlerError,
        inventory::{PromptArg, StaticPrompt, TextResource},
        tool::{ParamType, Parameter, Tool, ToolDescriptor},
    };

    struct Echo(ToolDescriptor);

    #[async_trait]
    impl Tool for Echo {
        fn descriptor(&self) -> &ToolDescriptor {
            &self.0
        }

        async fn execute(
            &self,
            args: JsonObject,
            ctx: ToolContext,
        ) -> Result<CallToolResult, HandlerError> {
            let text = format!(
                "{} {} {}",
                ctx.tool_name,
                ctx.request_id.unwrap_or_default(),
                args["message"]
            );
            Ok(CallToolResult::success(vec![rmcp::model::Content::text(text)]))
        }
    }

    struct TestClient {
        prefix: &'static str,
        name: &'static str,
        titles: Vec<&'static str>,
    }

    impl TestClient {
        fn new(prefix: &'static str, name: &'static str, titles: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                prefix,
                name,
                titles,
            })
        }
    }

    #[async_trait]
    impl Client for TestClient {
        fn prefix(&self) -> &str {
            self.prefix
        }

        fn name(&self) -> &str {
            self.name
        }

        fn register_tools(&self, registrar: &mut Registrar) -> BridgeResult<()> {
            for title in &self.titles {
                let descriptor = ToolDescriptor::new(*title, "Echo a message.", "Testing")
                    .with_parameter(Parameter::new("message", ParamType::String).required());
                registrar.tool(Arc::new(Echo(descriptor)));
            }
            Ok(())
        }

        fn register_prompts(&self, registrar: &mut Registrar) {
            registrar.prompt(
                StaticPrompt::new("summarize", "Summarize {{topic}}.")
                    .with_argument(PromptArg::new("topic").required()),
            );
        }

        fn register_resources(&self, registrar: &mut Registrar) {
            registrar.resource(TextResource::new(
                format!("{}://readme", self.prefix),
                "Readme",
                "hello",
            ));
        }
    }

    fn server() -> ToolServer {
        ToolServer::new(&BridgeConfig::default())
    }

    #[test]
    fn test_add_client_registers_everything() {
        let server = server();
        let count = server
            .add_client(TestClient::new("ci", "CI", vec!["Get Build", "List Builds"]))
            .unwrap();

        assert_eq!(count, 2);
        let names: Vec<String> = server
            .tool_definitions()
            .iter()
            .map(|t| t.name.to_string())
            .collect();
        assert_eq!(names, vec!["ci_get_build", "ci_list_builds"]);

        assert_eq!(server.prompt_definitions()[0].name, "ci_summarize");
        assert_eq!(server.resource_definitions()[0].uri, "ci://readme");

        let active = server.active_clients();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "CI");
        assert_eq!(active[0].tool_count, 2);
        assert_eq!(active[0].prompt_count, 1);
    }

    #[test]
    fn test_collision_rejects_whole_client() {
        let server = server();
        server
            .add_client(TestClient::new("ci", "CI", vec!["Get Build"]))
            .unwrap();

        let err = server
            .add_client(TestClient::new("ci", "CI Mirror", vec!["Run", "Get Build"]))
            .unwrap_err();

        assert!(err.is_fatal());
        assert!(server.tool("ci_run").is_none());
        assert!(!server.is_client_active("CI Mirror"));
    }

    #[test]
    fn test_excluded_tools_not_registered() {
        let mut config = BridgeConfig::default();
        config.tools.exclude = vec!["ci_delete_build".to_string(), "list_builds".to_string()];
        let server = ToolServer::new(&config);

        let count = server
            .add_client(TestClient::new(
                "ci",
                "CI",
                vec!["Get Build", "Delete Build", "List Builds"],
            ))
            .unwrap();

        assert_eq!(count, 1);
        assert!(server.tool("ci_get_build").is_some());
        assert!(server.tool("ci_delete_build").is_none());
        assert!(server.tool("ci_list_builds").is_none());
        assert_eq!(server.active_clients()[0].tool_count, 1);
    }

    #[test]
    fn test_same_client_twice_rejected() {
        let server = server();
        server
            .add_client(TestClient::new("ci", "CI", vec!["Get Build"]))
            .unwrap();
        let err = server
            .add_client(TestClient::new("ci2", "CI", vec!["Other"]))
            .unwrap_err();
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_invoke_tool() {
        let server = server();
        server
            .add_client(TestClient::new("ci", "CI", vec!["Echo"]))
            .unwrap();

        let args = json!({ "message": "hi" }).as_object().cloned();
        let result = server
            .invoke_tool("ci_echo", args, CancellationToken::new(), Some("7".to_string()))
            .await
            .unwrap();

        let text = result.content[0].as_text().unwrap().text.clone();
        assert_eq!(text, "ci_echo 7 \"hi\"");
        assert_eq!(server.metrics().snapshot().successful_calls, 1);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = server()
            .invoke_tool("nope", None, CancellationToken::new(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationError::UnknownTool(_)));
    }

    #[test]
    fn test_prompts_and_resources() {
        let server = server();
        server
            .add_client(TestClient::new("docs", "Docs", vec![]))
            .unwrap();

        let args = json!({ "topic": "the API" });
        let prompt = server
            .render_prompt("docs_summarize", args.as_object())
            .unwrap();
        assert_eq!(prompt.messages.len(), 1);

        assert!(server.render_prompt("docs_summarize", None).is_err());
        assert!(server.render_prompt("missing", None).is_err());

        let contents = server.resource_contents("docs://readme").unwrap();
        assert_eq!(contents.contents.len(), 1);
        assert!(server.resource_contents("docs://missing").is_err());
    }

    #[test]
    fn test_host_handle() {
        let server = server();
        let handle = server.host_handle();
        assert_eq!(handle.upgrade().unwrap().name(), "toolbridge");

        drop(server);
        assert!(handle.upgrade().is_none());
    }

    #[test]
    fn test_get_info() {
        let mut config = BridgeConfig::default();
        config.server.name = "bridge".to_string();
        config.server.instructions = Some("Use ci_ tools for builds.".to_string());

        let info = ToolServer::new(&config).get_info();
        assert_eq!(info.server_info.name, "bridge");
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.prompts.is_some());
        assert_eq!(info.instructions.as_deref(), Some("Use ci_ tools for builds."));
    }
}
