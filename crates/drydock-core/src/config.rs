use crate::CoreError;
use drydock_runtime::{ProvisionerSettings, ProxySettings, StaticNamespaceRegistry};
use drydock_schema::AuthConfigs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Infrastructure settings shared by every workspace, loaded once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct InfraConfig {
    pub proxy: ProxySettings,
    pub dns: DnsConfig,
    pub build: BuildConfig,
    pub registry: RegistryConfig,
    pub servers: ServersConfig,
    pub namespaces: NamespacesConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DnsConfig {
    pub servers: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub args: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    pub credentials: AuthConfigs,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ServersConfig {
    pub external_host: String,
    pub custom_protocol: Option<String>,
}

impl Default for ServersConfig {
    fn default() -> Self {
        Self {
            external_host: "127.0.0.1".to_owned(),
            custom_protocol: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct NamespacesConfig {
    pub default_template: Option<String>,
    pub available: Vec<String>,
}

impl Default for NamespacesConfig {
    fn default() -> Self {
        Self {
            default_template: Some("<username>-drydock".to_owned()),
            available: Vec::new(),
        }
    }
}

impl InfraConfig {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&content)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))
    }

    /// Load `path` if given, else the default location if it exists, else
    /// built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, CoreError> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self, CoreError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| CoreError::Config(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), CoreError> {
        if self.servers.external_host.trim().is_empty() {
            return Err(CoreError::Config(
                "servers.external_host must not be empty".to_owned(),
            ));
        }
        for registry in self.registry.credentials.configs.keys() {
            if registry.contains('/') && !registry.contains("://") {
                return Err(CoreError::Config(format!(
                    "registry '{registry}' must be a host name or URL"
                )));
            }
        }
        Ok(())
    }

    pub fn custom_protocol(&self) -> Option<&str> {
        self.servers
            .custom_protocol
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn provisioner_settings(&self) -> ProvisionerSettings {
        let mut registry_credentials = AuthConfigs::new();
        registry_credentials.merge(&self.registry.credentials);
        ProvisionerSettings {
            proxy: self.proxy.clone(),
            dns_servers: Some(self.dns.servers.clone()),
            registry_credentials,
            build_args: self.build.args.clone(),
        }
    }

    pub fn namespace_registry(&self) -> StaticNamespaceRegistry {
        StaticNamespaceRegistry::new(
            self.namespaces.default_template.clone(),
            self.namespaces.available.clone(),
        )
    }
}

/// `$XDG_CONFIG_HOME/drydock/config.toml`, falling back to `~/.config`.
pub fn default_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
    Some(base.join("drydock").join("config.toml"))
}
