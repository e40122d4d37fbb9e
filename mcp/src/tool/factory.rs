//! Static tool discovery.
//!
//! Tools are listed explicitly as named constructors. Discovery builds each
//! constructor at most once, validates the result, deduplicates by name, and
//! applies the configured exclude list.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::handler::Tool;
use crate::{
    core::config::ToolFilterConfig,
    error::{BridgeError, BridgeResult},
};

pub type ToolConstructor = fn() -> anyhow::Result<Arc<dyn Tool>>;

#[derive(Default)]
pub struct ToolFactory {
    constructors: Vec<(&'static str, ToolConstructor)>,
    /// Constructed instances keyed by constructor name
    instances: DashMap<&'static str, Arc<dyn Tool>>,
    discovered: RwLock<Vec<Arc<dyn Tool>>>,
}

impl ToolFactory {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tool(
        mut self,
        constructor_name: &'static str,
        constructor: ToolConstructor,
    ) -> Self {
        self.constructors.push((constructor_name, constructor));
        self
    }

    /// Construct, validate and filter every listed tool.
    ///
    /// Fails on the first constructor that errors or yields an invalid tool; the
    /// error names that constructor. Already-built instances are reused.
    pub fn discover(&self, filter: &ToolFilterConfig) -> BridgeResult<Vec<Arc<dyn Tool>>> {
        let mut tools: Vec<Arc<dyn Tool>> = Vec::with_capacity(self.constructors.len());

        for &(constructor_name, constructor) in &self.constructors {
            let tool = self.instantiate(constructor_name, constructor)?;
            validate_tool(constructor_name, tool.as_ref())?;

            let name = tool.name();
            if tools.iter().any(|t| t.name() == name) {
                warn!(
                    tool = %name,
                    constructor = constructor_name,
                    "Duplicate tool name, keeping first"
                );
                continue;
            }
            tools.push(tool);
        }

        let before = tools.len();
        tools.retain(|tool| !filter.is_excluded(&tool.name(), None));
        if tools.len() != before {
            debug!(excluded = before - tools.len(), "Applied tool exclude list");
        }

        info!(count = tools.len(), "Discovered tools");
        *self.discovered.write() = tools.clone();
        Ok(tools)
    }

    fn instantiate(
        &self,
        constructor_name: &'static str,
        constructor: ToolConstructor,
    ) -> BridgeResult<Arc<dyn Tool>> {
        if let Some(existing) = self.instances.get(constructor_name) {
            return Ok(Arc::clone(existing.value()));
        }

        let tool = constructor().map_err(|source| BridgeError::ToolConstruction {
            candidate: constructor_name.to_string(),
            source,
        })?;
        self.instances.insert(constructor_name, Arc::clone(&tool));
        Ok(tool)
    }

    /// Look up a discovered tool by its unprefixed name.
    pub fn create_tool(&self, name: &str) -> BridgeResult<Arc<dyn Tool>> {
        self.discovered
            .read()
            .iter()
            .find(|tool| tool.name() == name)
            .cloned()
            .ok_or_else(|| BridgeError::ToolNotFound(name.to_string()))
    }

    pub fn is_tool_available(&self, name: &str) -> bool {
        self.discovered.read().iter().any(|tool| tool.name() == name)
    }

    pub fn tool_count(&self) -> usize {
        self.discovered.read().len()
    }

    /// Drop cached instances and the discovered set. Intended for tests.
    pub fn reset(&self) {
        self.instances.clear();
        self.discovered.write().clear();
    }
}

/// Reject tools that cannot produce a complete registration payload.
pub fn validate_tool(candidate: &str, tool: &dyn Tool) -> BridgeResult<()> {
    let mut problems = Vec::new();
    if tool.name().trim().is_empty() {
        problems.push("name is empty".to_string());
    }
    problems.extend(tool.descriptor().problems());

    if problems.is_empty() {
        Ok(())
    } else {
        Err(BridgeError::InvalidTool {
            candidate: candidate.to_string(),
            reason: problems.join(", "),
        })
    }
}
