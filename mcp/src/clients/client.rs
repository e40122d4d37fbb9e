//! Client trait and the registration callback surface.

use std::sync::Arc;

use async_trait::async_trait;

use super::registry::ConfigValues;
use crate::{
    cache::ToolCache,
    core::{config::ToolFilterConfig, server::HostHandle},
    error::BridgeResult,
    inventory::{StaticPrompt, TextResource},
    tool::Tool,
};

/// A logical grouping of tools talking to one upstream backend.
#[async_trait]
pub trait Client: Send + Sync {
    /// Prepended to every tool name this client registers
    fn prefix(&self) -> &str;

    /// Display name, used in tool titles and logs
    fn name(&self) -> &str;

    /// Hand every owned tool to the registrar.
    fn register_tools(&self, registrar: &mut Registrar) -> BridgeResult<()>;

    fn register_prompts(&self, _registrar: &mut Registrar) {}

    fn register_resources(&self, _registrar: &mut Registrar) {}

    /// Async setup, run once before registration for entries that ask for it.
    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Everything a client factory receives.
#[derive(Clone)]
pub struct ClientContext {
    pub config: ConfigValues,
    pub cache: Arc<ToolCache>,
    /// Configured exclude list, for clients that discover tools through a
    /// [`ToolFactory`](crate::tool::ToolFactory)
    pub tool_filter: ToolFilterConfig,
    /// Present only for entries registered with a host handle
    pub host: Option<HostHandle>,
}

/// Collects what a client registers so the server can commit it as one batch.
pub struct Registrar {
    tools: Vec<Arc<dyn Tool>>,
    prompts: Vec<StaticPrompt>,
    resources: Vec<TextResource>,
}

impl Registrar {
    pub(crate) fn new() -> Self {
        Self {
            tools: Vec::new(),
            prompts: Vec::new(),
            resources: Vec::new(),
        }
    }

    pub fn tool(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        self.tools.push(tool);
        self
    }

    pub fn tools<I>(&mut self, tools: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn Tool>>,
    {
        self.tools.extend(tools);
        self
    }

    pub fn prompt(&mut self, prompt: StaticPrompt) -> &mut Self {
        self.prompts.push(prompt);
        self
    }

    pub fn resource(&mut self, resource: TextResource) -> &mut Self {
        self.resources.push(resource);
        self
    }

    pub(crate) fn into_parts(self) -> (Vec<Arc<dyn Tool>>, Vec<StaticPrompt>, Vec<TextResource>) {
        (self.tools, self.prompts, self.resources)
    }
}
