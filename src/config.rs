//! Collector configuration
//!
//! The host hands the collector a loosely typed configuration bag
//! ([`ConfigMap`]). It is converted into a typed [`KeystoneConfig`] at the
//! boundary so that every missing or mistyped item fails the same way,
//! before any network access.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// =============================================================================
// Configuration Keys
// =============================================================================

pub const ADMIN_ENDPOINT: &str = "admin_endpoint";
pub const ADMIN_USER: &str = "admin_user";
pub const ADMIN_PASSWORD: &str = "admin_password";
pub const ADMIN_TENANT: &str = "admin_tenant";
pub const DOMAIN_NAME: &str = "domain_name";
pub const DOMAIN_ID: &str = "domain_id";

// =============================================================================
// Configuration Bag
// =============================================================================

/// A single value in the host configuration bag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ConfigValue {
    fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Bool(_) => "bool",
            ConfigValue::Int(_) => "integer",
            ConfigValue::Float(_) => "float",
            ConfigValue::Str(_) => "string",
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Str(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Str(s)
    }
}

/// Loosely typed configuration as distributed by the host.
///
/// Ordered so that serialized metric types are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigMap(BTreeMap<String, ConfigValue>);

impl ConfigMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an item.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ConfigValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.0.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        self.0.remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` on top of `self`; keys in `other` win.
    pub fn merge(&mut self, other: ConfigMap) {
        self.0.extend(other.0);
    }

    /// Load a bag from a YAML (or JSON) file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&raw)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
    }

    fn required_str(&self, key: &'static str) -> Result<String> {
        match self.optional_str(key)? {
            Some(value) => Ok(value),
            None => Err(Error::MissingConfig { key }),
        }
    }

    fn optional_str(&self, key: &'static str) -> Result<Option<String>> {
        match self.0.get(key) {
            None => Ok(None),
            Some(ConfigValue::Str(s)) => Ok(Some(s.clone())),
            Some(other) => {
                tracing::debug!(key, found = other.type_name(), "Mistyped configuration item");
                Err(Error::InvalidConfig {
                    key,
                    expected: "string",
                })
            }
        }
    }
}

impl FromIterator<(String, ConfigValue)> for ConfigMap {
    fn from_iter<I: IntoIterator<Item = (String, ConfigValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =============================================================================
// Typed Keystone Configuration
// =============================================================================

/// Scope used for domain-scoped (identity v3) authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainScope {
    Id(String),
    Name(String),
}

/// Credentials and endpoint for the Keystone admin API.
#[derive(Clone, PartialEq, Eq)]
pub struct KeystoneConfig {
    /// Keystone admin endpoint, e.g. `http://keystone:35357`
    pub endpoint: String,
    pub user: String,
    pub password: String,
    pub tenant: String,
    pub domain_name: Option<String>,
    pub domain_id: Option<String>,
}

impl KeystoneConfig {
    /// Extract the typed configuration from a host bag.
    pub fn from_config_map(cfg: &ConfigMap) -> Result<Self> {
        Ok(Self {
            endpoint: cfg.required_str(ADMIN_ENDPOINT)?,
            user: cfg.required_str(ADMIN_USER)?,
            password: cfg.required_str(ADMIN_PASSWORD)?,
            tenant: cfg.required_str(ADMIN_TENANT)?,
            domain_name: cfg.optional_str(DOMAIN_NAME)?,
            domain_id: cfg.optional_str(DOMAIN_ID)?,
        })
    }

    /// Domain scope, if configured. The ID takes precedence over the name.
    pub fn domain_scope(&self) -> Option<DomainScope> {
        match (&self.domain_id, &self.domain_name) {
            (Some(id), _) => Some(DomainScope::Id(id.clone())),
            (None, Some(name)) => Some(DomainScope::Name(name.clone())),
            (None, None) => None,
        }
    }
}

impl fmt::Debug for KeystoneConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeystoneConfig")
            .field("endpoint", &self.endpoint)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("tenant", &self.tenant)
            .field("domain_name", &self.domain_name)
            .field("domain_id", &self.domain_id)
            .finish()
    }
}

// =============================================================================
// HTTP Client Options
// =============================================================================

/// Options for the HTTP client used to talk to Keystone.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,

    /// User-Agent header value
    pub user_agent: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: None,
            user_agent: format!("keystone-collector/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn full_config() -> ConfigMap {
        ConfigMap::new()
            .with(ADMIN_ENDPOINT, "http://keystone:5000")
            .with(ADMIN_USER, "admin")
            .with(ADMIN_PASSWORD, "secret")
            .with(ADMIN_TENANT, "admin")
    }

    #[test]
    fn test_extract_required_items() {
        let cfg = KeystoneConfig::from_config_map(&full_config()).unwrap();

        assert_eq!(cfg.endpoint, "http://keystone:5000");
        assert_eq!(cfg.user, "admin");
        assert_eq!(cfg.password, "secret");
        assert_eq!(cfg.tenant, "admin");
        assert!(cfg.domain_scope().is_none());
    }

    #[test]
    fn test_missing_required_item() {
        let mut map = full_config();
        map.remove(ADMIN_PASSWORD);

        let result = KeystoneConfig::from_config_map(&map);
        assert_matches!(
            result,
            Err(Error::MissingConfig {
                key: "admin_password"
            })
        );
    }

    #[test]
    fn test_mistyped_item() {
        let map = full_config().with(ADMIN_USER, ConfigValue::Int(7));

        let result = KeystoneConfig::from_config_map(&map);
        assert_matches!(
            result,
            Err(Error::InvalidConfig {
                key: "admin_user",
                expected: "string"
            })
        );
    }

    #[test]
    fn test_mistyped_optional_item() {
        let map = full_config().with(DOMAIN_ID, ConfigValue::Bool(true));
        assert!(KeystoneConfig::from_config_map(&map).unwrap_err().is_config());
    }

    #[test]
    fn test_domain_id_wins_over_name() {
        let map = full_config()
            .with(DOMAIN_NAME, "Default")
            .with(DOMAIN_ID, "default");

        let cfg = KeystoneConfig::from_config_map(&map).unwrap();
        assert_eq!(cfg.domain_scope(), Some(DomainScope::Id("default".into())));

        let map = full_config().with(DOMAIN_NAME, "Default");
        let cfg = KeystoneConfig::from_config_map(&map).unwrap();
        assert_eq!(
            cfg.domain_scope(),
            Some(DomainScope::Name("Default".into()))
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let cfg = KeystoneConfig::from_config_map(&full_config()).unwrap();
        let dbg = format!("{:?}", cfg);

        assert!(dbg.contains("<redacted>"));
        assert!(!dbg.contains("secret"));
    }

    #[test]
    fn test_config_map_deserializes_mixed_values() {
        let yaml = r#"
admin_endpoint: "http://keystone:5000"
admin_user: admin
retries: 3
ratio: 0.5
verbose: true
"#;
        let map: ConfigMap = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(map.len(), 5);
        assert_eq!(map.get("retries"), Some(&ConfigValue::Int(3)));
        assert_eq!(map.get("ratio"), Some(&ConfigValue::Float(0.5)));
        assert_eq!(map.get("verbose"), Some(&ConfigValue::Bool(true)));
        assert_eq!(map.get("admin_user"), Some(&ConfigValue::from("admin")));
    }

    #[test]
    fn test_merge_overrides() {
        let mut base = full_config();
        base.merge(ConfigMap::new().with(ADMIN_USER, "operator"));

        assert_eq!(base.get(ADMIN_USER), Some(&ConfigValue::from("operator")));
        assert_eq!(base.len(), 4);
    }

    #[test]
    fn test_client_options_default_has_no_timeout() {
        let opts = ClientOptions::default();
        assert!(opts.request_timeout.is_none());
        assert!(opts.user_agent.starts_with("keystone-collector/"));
    }
}
