use crate::auth::AuthConfigs;
use crate::recipe::RecipeError;
use crate::warning::Warning;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Prefix of the service labels that carry declared server metadata.
pub const SERVER_LABEL_PREFIX: &str = "drydock.server.";

/// Label key for a server attribute (`ref`, `protocol` or `path`) of a normalized port.
///
/// `server_label("8080/tcp", "ref")` is `drydock.server.8080/tcp.ref`.
pub fn server_label(port: &str, attribute: &str) -> String {
    format!("{SERVER_LABEL_PREFIX}{port}.{attribute}")
}

/// Backend-agnostic set of named services parsed from a recipe.
///
/// Created fresh by every parse, then mutated in place by each provisioner
/// before it is handed to exactly one converter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentModel {
    pub services: BTreeMap<String, Service>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_credentials: Option<AuthConfigs>,
}

impl EnvironmentModel {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_service(mut self, name: &str, service: Service) -> Self {
        self.services.insert(name.to_owned(), service);
        self
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }

    pub fn add_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    /// Check that every service has exactly one of `image` and `build`.
    pub fn validate(&self) -> Result<(), RecipeError> {
        for (name, service) in &self.services {
            match (&service.image, &service.build) {
                (Some(_), Some(_)) => {
                    return Err(RecipeError::Malformed(format!(
                        "service '{name}' declares both image and build"
                    )))
                }
                (None, None) => {
                    return Err(RecipeError::Malformed(format!(
                        "service '{name}' declares neither image nor build"
                    )))
                }
                _ => {}
            }
        }
        self.start_order().map(|_| ())
    }

    /// Service names ordered so that every service comes after the services
    /// it names in `depends_on` or `links`. Ties are broken by name.
    pub fn start_order(&self) -> Result<Vec<String>, RecipeError> {
        let mut pending: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (name, service) in &self.services {
            let mut dependencies = BTreeSet::new();
            for dependency in service.dependencies() {
                if !self.services.contains_key(dependency) {
                    return Err(RecipeError::Malformed(format!(
                        "service '{name}' depends on unknown service '{dependency}'"
                    )));
                }
                dependencies.insert(dependency);
            }
            pending.insert(name, dependencies);
        }

        let mut order: Vec<String> = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let ready: Vec<&str> = pending
                .iter()
                .filter(|(_, deps)| deps.iter().all(|d| order.iter().any(|o| o == d)))
                .map(|(name, _)| *name)
                .collect();
            if ready.is_empty() {
                let stuck: Vec<&str> = pending.keys().copied().collect();
                return Err(RecipeError::Malformed(format!(
                    "start order of services cannot be resolved, circular dependency between: {}",
                    stuck.join(", ")
                )));
            }
            for name in ready {
                pending.remove(name);
                order.push(name.to_owned());
            }
        }
        Ok(order)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Service {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entrypoint: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub expose: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mem_limit: Option<u64>,
}

impl Service {
    pub fn from_image(image: &str) -> Self {
        Self {
            image: Some(image.to_owned()),
            ..Self::default()
        }
    }

    pub fn from_build(build: BuildContext) -> Self {
        Self {
            build: Some(build),
            ..Self::default()
        }
    }

    /// Services named by `depends_on` and `links`, with link aliases removed.
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.depends_on.iter().map(String::as_str).chain(
            self.links
                .iter()
                .map(|link| link.split_once(':').map_or(link.as_str(), |(service, _)| service)),
        )
    }

    /// Add a port to `expose` unless it is already there.
    pub fn add_expose(&mut self, port: &str) {
        if !self.expose.iter().any(|p| p == port) {
            self.expose.push(port.to_owned());
        }
    }

    /// Exposed ports with an explicit transport suffix.
    pub fn normalized_expose(&self) -> Vec<String> {
        self.expose
            .iter()
            .map(|p| {
                if p.contains('/') {
                    p.clone()
                } else {
                    format!("{p}/tcp")
                }
            })
            .collect()
    }
}

/// How to build a service's image instead of pulling it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_content: Option<String>,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
}

impl BuildContext {
    pub fn from_context(context: &str) -> Self {
        Self {
            context: Some(context.to_owned()),
            ..Self::default()
        }
    }

    pub fn from_dockerfile_content(content: &str) -> Self {
        Self {
            dockerfile_content: Some(content.to_owned()),
            ..Self::default()
        }
    }
}
