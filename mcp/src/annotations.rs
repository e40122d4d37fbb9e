//! Side-effect annotations for registered tools.
//!
//! Tool authors declare hints as `Option<bool>`; anything left unset falls back to
//! the safe assumption: read-only, non-destructive, idempotent, closed-world.

use rmcp::model::ToolAnnotations as RmcpToolAnnotations;
use serde::{Deserialize, Serialize};

/// Explicit hints a tool author may set on a descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destructive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_world: Option<bool>,
}

impl AnnotationHints {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_read_only(mut self, v: bool) -> Self {
        self.read_only = Some(v);
        self
    }

    #[must_use]
    pub fn with_destructive(mut self, v: bool) -> Self {
        self.destructive = Some(v);
        self
    }

    #[must_use]
    pub fn with_idempotent(mut self, v: bool) -> Self {
        self.idempotent = Some(v);
        self
    }

    #[must_use]
    pub fn with_open_world(mut self, v: bool) -> Self {
        self.open_world = Some(v);
        self
    }
}

/// Resolved tool behavior hints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolAnnotations {
    pub read_only: bool,
    pub destructive: bool,
    pub idempotent: bool,
    pub open_world: bool,
}

impl Default for ToolAnnotations {
    fn default() -> Self {
        Self::infer(&AnnotationHints::default())
    }
}

impl ToolAnnotations {
    /// Resolve explicit hints, filling gaps with the safe defaults.
    pub fn infer(hints: &AnnotationHints) -> Self {
        Self {
            read_only: hints.read_only.unwrap_or(true),
            destructive: hints.destructive.unwrap_or(false),
            idempotent: hints.idempotent.unwrap_or(true),
            open_world: hints.open_world.unwrap_or(false),
        }
    }

    /// Convert into the protocol representation, always fully populated.
    pub fn to_rmcp(&self, title: &str) -> RmcpToolAnnotations {
        RmcpToolAnnotations {
            title: Some(title.to_string()),
            read_only_hint: Some(self.read_only),
            destructive_hint: Some(self.destructive),
            idempotent_hint: Some(self.idempotent),
            open_world_hint: Some(self.open_world),
        }
    }
}
