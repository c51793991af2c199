//! Registry credentials attached to an environment model.
//!
//! `AuthConfigs` serializes as the plain `registry -> {username, password}`
//! JSON object used by container engines.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Canonical key for Docker Hub credentials.
pub const DOCKER_HUB_REGISTRY: &str = "https://index.docker.io/v1/";

const DOCKER_HUB_ALIASES: &[&str] = &["", "docker.io", "index.docker.io", DOCKER_HUB_REGISTRY];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthConfig {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct AuthConfigs {
    pub configs: BTreeMap<String, AuthConfig>,
}

impl AuthConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn insert(&mut self, registry: &str, config: AuthConfig) {
        self.configs.insert(normalize_registry(registry), config);
    }

    /// Merge `other` into `self`; entries of `other` win for the same registry.
    pub fn merge(&mut self, other: &AuthConfigs) {
        for (registry, config) in &other.configs {
            self.insert(registry, config.clone());
        }
    }

    pub fn get(&self, registry: &str) -> Option<&AuthConfig> {
        self.configs.get(&normalize_registry(registry))
    }

    /// Credentials for the registry an image reference would be pulled from.
    pub fn for_image(&self, image: &str) -> Option<&AuthConfig> {
        self.get(registry_of(image))
    }
}

fn normalize_registry(registry: &str) -> String {
    let trimmed = registry.trim();
    if DOCKER_HUB_ALIASES.contains(&trimmed) {
        DOCKER_HUB_REGISTRY.to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// Registry host of an image reference, `""` for Docker Hub images.
pub fn registry_of(image: &str) -> &str {
    match image.split_once('/') {
        Some((first, _))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            first
        }
        _ => "",
    }
}
