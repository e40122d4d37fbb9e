//! Configuration resolution strategies.

use std::collections::HashMap;

use http::HeaderMap;

use super::registry::{ClientRegistryEntry, ConfigValues};

pub trait ConfigResolver: Send + Sync {
    /// Short strategy name for logs.
    fn strategy(&self) -> &'static str;

    /// Resolve whatever keys are available for `entry`.
    ///
    /// `None` means the entry does not support this strategy and should be
    /// skipped. Missing keys are simply absent from the returned values.
    fn resolve(&self, entry: &ClientRegistryEntry) -> Option<ConfigValues>;
}

/// Environment variable name for a key: `<PREFIX>_<KEY>`, upper-cased, with
/// every non-alphanumeric character replaced by `_`.
pub fn env_var_name(config_prefix: &str, key: &str) -> String {
    format!("{config_prefix}_{key}")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Resolves keys from environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvResolver {
    /// Snapshot to read instead of the process environment
    vars: Option<HashMap<String, String>>,
}

impl EnvResolver {
    pub fn from_process() -> Self {
        Self { vars: None }
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        match &self.vars {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }
}

impl ConfigResolver for EnvResolver {
    fn strategy(&self) -> &'static str {
        "env"
    }

    fn resolve(&self, entry: &ClientRegistryEntry) -> Option<ConfigValues> {
        let values = entry
            .config_schema
            .iter()
            .filter_map(|k| {
                let value = self.lookup(&env_var_name(&entry.config_prefix, &k.key))?;
                let value = value.trim();
                (!value.is_empty()).then(|| (k.key.clone(), value.to_string()))
            })
            .collect();
        Some(values)
    }
}

/// Resolves keys from request headers, for entries that declare header support.
#[derive(Debug, Clone, Default)]
pub struct HeaderResolver {
    headers: HeaderMap,
}

impl HeaderResolver {
    pub fn new(headers: HeaderMap) -> Self {
        Self { headers }
    }
}

impl ConfigResolver for HeaderResolver {
    fn strategy(&self) -> &'static str {
        "headers"
    }

    fn resolve(&self, entry: &ClientRegistryEntry) -> Option<ConfigValues> {
        let extract = entry.from_headers.as_ref()?;
        Some(extract(&self.headers))
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;
    use crate::clients::registry::ConfigKey;

    fn sentry() -> ClientRegistryEntry {
        ClientRegistryEntry::new("Sentry", "sentry", |_| anyhow::bail!("unused"))
            .with_key(ConfigKey::required("auth-token", "API token"))
            .with_key(ConfigKey::optional("org.slug", "Organization"))
    }

    #[test]
    fn test_env_var_name() {
        assert_eq!(env_var_name("sentry", "auth-token"), "SENTRY_AUTH_TOKEN");
        assert_eq!(env_var_name("API_DOCS", "base.url"), "API_DOCS_BASE_URL");
    }

    #[test]
    fn test_env_resolver() {
        let resolver = EnvResolver::from_vars([
            ("SENTRY_AUTH_TOKEN", "abc"),
            ("SENTRY_ORG_SLUG", "   "),
        ]);

        let values = resolver.resolve(&sentry()).unwrap();
        assert_eq!(values.get("auth-token"), Some("abc"));
        assert!(!values.contains("org.slug"));
    }

    #[test]
    #[serial_test::serial]
    fn test_env_resolver_reads_process() {
        std::env::set_var("SENTRY_AUTH_TOKEN", "from-env");

        let values = EnvResolver::from_process().resolve(&sentry()).unwrap();
        assert_eq!(values.get("auth-token"), Some("from-env"));

        std::env::remove_var("SENTRY_AUTH_TOKEN");
    }

    #[test]
    fn test_header_resolver_requires_capability() {
        let mut headers = HeaderMap::new();
        headers.insert("x-token", HeaderValue::from_static("abc"));
        let resolver = HeaderResolver::new(headers);

        assert!(resolver.resolve(&sentry()).is_none());

        let entry = sentry().with_header_keys([("x-token", "auth-token")]);
        let values = resolver.resolve(&entry).unwrap();
        assert_eq!(values.get("auth-token"), Some("abc"));
    }
}
