//! Tool index with per-client lookup.
//!
//! Thread-safe store for everything clients register:
//! - Tools by registered name (unique; collisions are rejected)
//! - Tool names by client (for bulk removal)
//! - Prompts by registered name and resources by URI

use std::{collections::HashSet, sync::Arc};

use dashmap::{mapref::entry::Entry, DashMap};
use tracing::warn;

use super::types::{PromptEntry, ResourceEntry, StaticPrompt, TextResource, ToolEntry};
use crate::{
    error::{BridgeError, BridgeResult},
    tool::RegisteredTool,
};

pub struct ToolInventory {
    tools: DashMap<String, ToolEntry>,
    tools_by_client: DashMap<String, HashSet<String>>,
    prompts: DashMap<String, PromptEntry>,
    resources: DashMap<String, ResourceEntry>,
}

impl ToolInventory {
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
            tools_by_client: DashMap::new(),
            prompts: DashMap::new(),
            resources: DashMap::new(),
        }
    }
}

impl Default for ToolInventory {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolInventory {
    pub fn get_tool(&self, tool_name: &str) -> Option<Arc<RegisteredTool>> {
        self.tools.get(tool_name).map(|entry| Arc::clone(&entry.tool))
    }

    pub fn has_tool(&self, tool_name: &str) -> bool {
        self.tools.contains_key(tool_name)
    }

    /// Owning client of a tool.
    pub fn tool_client(&self, tool_name: &str) -> Option<String> {
        self.tools.get(tool_name).map(|entry| entry.client.clone())
    }

    /// Insert a single tool, rejecting a name that is already taken.
    pub fn insert_tool(&self, entry: ToolEntry) -> BridgeResult<()> {
        let name = entry.name().to_string();
        let client = entry.client.clone();

        match self.tools.entry(name.clone()) {
            Entry::Occupied(existing) => {
                return Err(BridgeError::ToolCollision {
                    tool_name: name,
                    existing_client: existing.get().client.clone(),
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
        }

        self.tools_by_client.entry(client).or_default().insert(name);
        Ok(())
    }

    /// Insert a batch of tools all-or-nothing.
    ///
    /// Names are checked against the index and against each other before
    /// anything is inserted. Concurrent batches must be serialized by the
    /// caller for the check to hold.
    pub fn insert_tools(&self, entries: Vec<ToolEntry>) -> BridgeResult<()> {
        let mut batch_names: HashSet<&str> = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if let Some(existing) = self.tools.get(entry.name()) {
                return Err(BridgeError::ToolCollision {
                    tool_name: entry.name().to_string(),
                    existing_client: existing.client.clone(),
                });
            }
            if !batch_names.insert(entry.name()) {
                return Err(BridgeError::ToolCollision {
                    tool_name: entry.name().to_string(),
                    existing_client: entry.client.clone(),
                });
            }
        }

        for entry in entries {
            self.insert_tool(entry)?;
        }
        Ok(())
    }

    /// All tools, sorted by name.
    pub fn list_tools(&self) -> Vec<Arc<RegisteredTool>> {
        let mut tools: Vec<Arc<RegisteredTool>> = self
            .tools
            .iter()
            .map(|entry| Arc::clone(&entry.value().tool))
            .collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }

    /// Tool names registered by one client, sorted.
    pub fn client_tools(&self, client: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .tools_by_client
            .get(client)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Insert a prompt. An already-registered name keeps its first owner.
    pub fn insert_prompt(&self, name: String, client: String, prompt: StaticPrompt) -> bool {
        match self.prompts.entry(name) {
            Entry::Occupied(existing) => {
                warn!(
                    prompt = %existing.key(),
                    existing_client = %existing.get().client,
                    client = %client,
                    "Prompt name collision, keeping first"
                );
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(PromptEntry { client, prompt });
                true
            }
        }
    }

    pub fn get_prompt(&self, name: &str) -> Option<PromptEntry> {
        self.prompts.get(name).map(|entry| entry.clone())
    }

    pub fn has_prompt(&self, name: &str) -> bool {
        self.prompts.contains_key(name)
    }

    /// All prompts as (registered name, entry), sorted by name.
    pub fn list_prompts(&self) -> Vec<(String, PromptEntry)> {
        let mut prompts: Vec<(String, PromptEntry)> = self
            .prompts
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        prompts.sort_by(|a, b| a.0.cmp(&b.0));
        prompts
    }

    /// Insert a resource. An already-registered URI keeps its first owner.
    pub fn insert_resource(&self, client: String, resource: TextResource) -> bool {
        match self.resources.entry(resource.uri.clone()) {
            Entry::Occupied(existing) => {
                warn!(
                    uri = %existing.key(),
                    existing_client = %existing.get().client,
                    client = %client,
                    "Resource URI collision, keeping first"
                );
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(ResourceEntry { client, resource });
                true
            }
        }
    }

    pub fn get_resource(&self, uri: &str) -> Option<ResourceEntry> {
        self.resources.get(uri).map(|entry| entry.clone())
    }

    pub fn has_resource(&self, uri: &str) -> bool {
        self.resources.contains_key(uri)
    }

    /// All resources, sorted by URI.
    pub fn list_resources(&self) -> Vec<ResourceEntry> {
        let mut resources: Vec<ResourceEntry> =
            self.resources.iter().map(|entry| entry.value().clone()).collect();
        resources.sort_by(|a, b| a.resource.uri.cmp(&b.resource.uri));
        resources
    }

    /// Remove everything a client registered.
    pub fn clear_client(&self, client: &str) {
        if let Some((_, tool_names)) = self.tools_by_client.remove(client) {
            for tool_name in tool_names {
                self.tools.remove(&tool_name);
            }
        }

        self.prompts.retain(|_, entry| entry.client != client);
        self.resources.retain(|_, entry| entry.client != client);
    }

    pub fn clear_all(&self) {
        self.tools.clear();
        self.tools_by_client.clear();
        self.prompts.clear();
        self.resources.clear();
    }

    pub fn counts(&self) -> IndexCounts {
        IndexCounts {
            tools: self.tools.len(),
            clients: self.tools_by_client.len(),
            prompts: self.prompts.len(),
            resources: self.resources.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexCounts {
    pub tools: usize,
    pub clients: usize,
    pub prompts: usize,
    pub resources: usize,
}
