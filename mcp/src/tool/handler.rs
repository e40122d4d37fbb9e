//! The behavior every tool implements.

use std::sync::Arc;

use async_trait::async_trait;
use rmcp::model::{CallToolResult, JsonObject};
use tokio_util::sync::CancellationToken;

use super::{descriptor::ToolDescriptor, wrapper::slug};
use crate::{cache::ToolCache, error::HandlerError};

/// Per-invocation context handed to a tool.
#[derive(Clone)]
pub struct ToolContext {
    /// Registered (prefixed) tool name
    pub tool_name: String,
    /// Cancelled when the caller abandons the request. Handlers decide whether
    /// and when to observe it.
    pub cancellation: CancellationToken,
    pub cache: Arc<ToolCache>,
    pub request_id: Option<String>,
}

impl ToolContext {
    pub fn new(tool_name: impl Into<String>, cache: Arc<ToolCache>) -> Self {
        Self {
            tool_name: tool_name.into(),
            cancellation: CancellationToken::new(),
            cache,
            request_id: None,
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

/// A tool implementation.
///
/// Return [`ToolError`](crate::error::ToolError) (via `HandlerError::Tool`) for
/// failures the caller can act on. Any other error is treated as a bug: it is
/// reported once and propagated to the host unchanged.
#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    /// Unprefixed tool name; the owning client's prefix is prepended at
    /// registration.
    fn name(&self) -> String {
        slug(&self.descriptor().title)
    }

    async fn execute(
        &self,
        args: JsonObject,
        ctx: ToolContext,
    ) -> Result<CallToolResult, HandlerError>;
}
