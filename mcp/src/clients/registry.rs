//! Client registry.
//!
//! Each entry maps a client identity to its configuration keys and a factory.
//! [`ClientRegistry::configure`] resolves configuration for every entry,
//! instantiates the clients that have what they need, and adds them to the
//! server. One entry failing never stops the others; only fatal errors (a tool
//! name collision or an incomplete tool) abort configuration.

use std::{collections::HashMap, sync::Arc};

use http::HeaderMap;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use super::{
    client::{Client, ClientContext},
    resolver::ConfigResolver,
};
use crate::{core::server::ToolServer, error::BridgeResult};

pub type ClientFactory =
    Arc<dyn Fn(ClientContext) -> anyhow::Result<Box<dyn Client>> + Send + Sync>;

pub type HeaderExtractor = Arc<dyn Fn(&HeaderMap) -> ConfigValues + Send + Sync>;

/// Resolved configuration for one client, keyed by schema key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigValues(HashMap<String, String>);

impl ConfigValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Like [`get`](Self::get), for keys a factory cannot work without.
    pub fn require(&self, key: &str) -> anyhow::Result<&str> {
        self.get(key)
            .ok_or_else(|| anyhow::anyhow!("missing configuration key '{key}'"))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigKey {
    pub key: String,
    pub required: bool,
    pub description: String,
}

impl ConfigKey {
    pub fn required(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            required: true,
            description: description.into(),
        }
    }

    pub fn optional(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            required: false,
            description: description.into(),
        }
    }
}

pub struct ClientRegistryEntry {
    pub name: String,
    /// Prefix for environment variable names (`<CONFIG_PREFIX>_<KEY>`)
    pub config_prefix: String,
    pub config_schema: Vec<ConfigKey>,
    pub factory: ClientFactory,
    pub needs_host_handle: bool,
    pub async_init: bool,
    /// Set when the client can be configured from request headers
    pub from_headers: Option<HeaderExtractor>,
}

impl std::fmt::Debug for ClientRegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistryEntry")
            .field("name", &self.name)
            .field("config_prefix", &self.config_prefix)
            .field("config_schema", &self.config_schema)
            .field("needs_host_handle", &self.needs_host_handle)
            .field("async_init", &self.async_init)
            .field("from_headers", &self.from_headers.is_some())
            .finish()
    }
}

impl ClientRegistryEntry {
    pub fn new<F>(name: impl Into<String>, config_prefix: impl Into<String>, factory: F) -> Self
    where
        F: Fn(ClientContext) -> anyhow::Result<Box<dyn Client>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            config_prefix: config_prefix.into(),
            config_schema: Vec::new(),
            factory: Arc::new(factory),
            needs_host_handle: false,
            async_init: false,
            from_headers: None,
        }
    }

    #[must_use]
    pub fn with_key(mut self, key: ConfigKey) -> Self {
        self.config_schema.push(key);
        self
    }

    #[must_use]
    pub fn with_host_handle(mut self) -> Self {
        self.needs_host_handle = true;
        self
    }

    #[must_use]
    pub fn with_async_init(mut self) -> Self {
        self.async_init = true;
        self
    }

    /// Accept configuration from request headers via a custom extractor.
    #[must_use]
    pub fn with_header_extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&HeaderMap) -> ConfigValues + Send + Sync + 'static,
    {
        self.from_headers = Some(Arc::new(extractor));
        self
    }

    /// Accept configuration from request headers, one header per key.
    #[must_use]
    pub fn with_header_keys<I, H, K>(self, mapping: I) -> Self
    where
        I: IntoIterator<Item = (H, K)>,
        H: Into<String>,
        K: Into<String>,
    {
        let mapping: Vec<(String, String)> = mapping
            .into_iter()
            .map(|(h, k)| (h.into(), k.into()))
            .collect();

        self.with_header_extractor(move |headers| {
            mapping
                .iter()
                .filter_map(|(header, key)| {
                    let value = headers.get(header.as_str())?.to_str().ok()?.trim();
                    (!value.is_empty()).then(|| (key.clone(), value.to_string()))
                })
                .collect()
        })
    }

    /// Required keys absent from `values`.
    pub fn missing_required(&self, values: &ConfigValues) -> Vec<&str> {
        self.config_schema
            .iter()
            .filter(|k| k.required && !values.contains(&k.key))
            .map(|k| k.key.as_str())
            .collect()
    }
}

/// Registered client entries in registration order.
#[derive(Default)]
pub struct ClientRegistry {
    entries: RwLock<Vec<Arc<ClientRegistryEntry>>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, entry: ClientRegistryEntry) {
        debug!(client = %entry.name, "Registered client entry");
        self.entries.write().push(Arc::new(entry));
    }

    pub fn entries(&self) -> Vec<Arc<ClientRegistryEntry>> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove every entry. Intended for tests.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Resolve, instantiate and add every configurable client to `server`.
    ///
    /// Returns the number of clients added by this call. Entries already active
    /// on `server` (matched by entry name) are skipped without instantiating
    /// them again. Entries whose required keys do not resolve, whose resolver
    /// strategy they do not support, or whose factory or initialization fails
    /// are logged and skipped. Fatal registration errors are returned.
    pub async fn configure(
        &self,
        server: &ToolServer,
        resolver: &dyn ConfigResolver,
    ) -> BridgeResult<usize> {
        let mut configured = 0;

        for entry in self.entries() {
            if server.is_client_active(&entry.name) {
                debug!(client = %entry.name, "Client already active, skipping");
                continue;
            }

            let Some(values) = resolver.resolve(&entry) else {
                debug!(
                    client = %entry.name,
                    strategy = resolver.strategy(),
                    "Client does not support configuration strategy, skipping"
                );
                continue;
            };

            let missing = entry.missing_required(&values);
            if !missing.is_empty() {
                info!(
                    client = %entry.name,
                    missing = ?missing,
                    "Client not configured, skipping"
                );
                continue;
            }

            let ctx = ClientContext {
                config: values,
                cache: server.cache(),
                tool_filter: server.tool_filter().clone(),
                host: entry.needs_host_handle.then(|| server.host_handle()),
            };

            let client: Arc<dyn Client> = match (entry.factory)(ctx) {
                Ok(client) => Arc::from(client),
                Err(e) => {
                    error!(client = %entry.name, error = %e, "Failed to instantiate client");
                    continue;
                }
            };

            if entry.async_init {
                if let Err(e) = client.initialize().await {
                    error!(client = %entry.name, error = %e, "Client initialization failed");
                    continue;
                }
            }

            match server.add_client(client) {
                Ok(tool_count) => {
                    info!(client = %entry.name, tool_count, "Client configured");
                    configured += 1;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(client = %entry.name, error = %e, "Client registration failed, skipping");
                }
            }
        }

        if configured == 0 {
            warn!(strategy = resolver.strategy(), "No clients configured");
        }
        Ok(configured)
    }
}
