//! Plugin metadata advertised to the host

use serde::Serialize;

use super::namespace::PLUGIN_NAME;

pub const PLUGIN_VERSION: u32 = 1;

/// Kind of plugin, as understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    Collector,
}

/// Identity of this plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginMeta {
    pub name: &'static str,
    pub version: u32,
    #[serde(rename = "type")]
    pub plugin_type: PluginType,
}

/// A host-side validation rule for one configuration item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyRule {
    pub key: String,
    pub required: bool,
}

/// Configuration rules the host should enforce before calling the plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigPolicy {
    pub rules: Vec<PolicyRule>,
}

impl ConfigPolicy {
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Plugin metadata.
pub fn meta() -> PluginMeta {
    PluginMeta {
        name: PLUGIN_NAME,
        version: PLUGIN_VERSION,
        plugin_type: PluginType::Collector,
    }
}

/// Configuration policy. Empty: validation happens when the collector
/// extracts its configuration and when it authenticates.
pub fn config_policy() -> ConfigPolicy {
    ConfigPolicy::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta() {
        let meta = meta();
        assert_eq!(meta.name, "keystone");
        assert_eq!(meta.version, 1);

        let json = serde_json::to_string(&meta).unwrap();
        assert!(json.contains("\"type\":\"collector\""));
    }

    #[test]
    fn test_config_policy_is_empty() {
        assert!(config_policy().is_empty());
    }
}
