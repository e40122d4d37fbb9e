//! Error types.
//!
//! Two families live here:
//! - [`BridgeError`]: startup and configuration failures (registration, discovery,
//!   client activation). These abort the operation that raised them.
//! - The invocation taxonomy: [`ToolError`] for expected, user-facing failures,
//!   [`HandlerError`] for what a tool handler returns, and [`InvocationError`]
//!   for what the execution wrapper propagates to the host.

use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Tool name collision: '{tool_name}' is already registered by client '{existing_client}'")]
    ToolCollision {
        tool_name: String,
        existing_client: String,
    },

    #[error("Invalid tool '{candidate}': {reason}")]
    InvalidTool { candidate: String, reason: String },

    #[error("Failed to construct tool '{candidate}': {source}")]
    ToolConstruction {
        candidate: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Client '{client}' failed to activate: {source}")]
    ClientActivation {
        client: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl BridgeError {
    /// Programming errors (name collisions, incomplete tools) abort startup.
    /// Everything else only skips the client that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::ToolCollision { .. } | BridgeError::InvalidTool { .. }
        )
    }
}

/// An expected, user-actionable failure (bad input, not found, permission denied,
/// upstream response the handler already normalized).
///
/// Surfaced to the host as an `isError` result and never reported as an incident.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ToolError {
    pub message: String,
    pub tool_name: Option<String>,
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tool_name: None,
            cause: None,
        }
    }

    #[must_use]
    pub fn with_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    #[must_use]
    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

/// Error returned by a tool handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn unexpected(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        HandlerError::Unexpected(anyhow::Error::new(err))
    }

    pub fn is_expected(&self) -> bool {
        matches!(self, HandlerError::Tool(_))
    }
}

/// Error propagated out of the execution wrapper.
///
/// Expected failures never show up here; they are converted into results.
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("Tool '{tool_name}' declares an output schema but returned no structured content")]
    OutputContract { tool_name: String },

    /// The handler's own error, unchanged.
    #[error(transparent)]
    Unexpected(anyhow::Error),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

impl InvocationError {
    /// The original handler error, when this wraps one.
    pub fn as_unexpected(&self) -> Option<&anyhow::Error> {
        match self {
            InvocationError::Unexpected(err) => Some(err),
            _ => None,
        }
    }
}

impl From<InvocationError> for rmcp::ErrorData {
    fn from(err: InvocationError) -> Self {
        match err {
            InvocationError::UnknownTool(name) => {
                rmcp::ErrorData::invalid_params(format!("Unknown tool: {name}"), None)
            }
            other => rmcp::ErrorData::internal_error(other.to_string(), None),
        }
    }
}
