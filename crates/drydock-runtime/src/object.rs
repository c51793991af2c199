//! Backend-native runtime objects produced by the converters.

use drydock_schema::{AuthConfigs, Service, Warning, SERVER_LABEL_PREFIX};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pod annotation naming the backend a pod was converted for.
pub const BACKEND_ANNOTATION: &str = "drydock.io/backend";

/// Prefix of the pod annotations holding the declared servers of a machine
/// as a JSON object of server name to [`DeclaredServer`].
pub const SERVERS_ANNOTATION_PREFIX: &str = "drydock.io/servers.";

const CONTAINER_ANNOTATION_PREFIX: &str = "drydock.io/container.";

/// Annotation mapping a container back to its logical machine.
pub fn machine_name_annotation(container: &str) -> String {
    format!("{CONTAINER_ANNOTATION_PREFIX}{container}.machine-name")
}

pub fn servers_annotation(machine: &str) -> String {
    format!("{SERVERS_ANNOTATION_PREFIX}{machine}")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RuntimeObject {
    Compose(ComposeEnvironment),
    Pod(PodSpec),
}

impl RuntimeObject {
    pub fn warnings(&self) -> &[Warning] {
        match self {
            Self::Compose(c) => &c.warnings,
            Self::Pod(p) => &p.warnings,
        }
    }

    /// Logical machine names in the object, sorted.
    pub fn machine_names(&self) -> Vec<String> {
        let mut names: Vec<String> = match self {
            Self::Compose(c) => c.services.keys().cloned().collect(),
            Self::Pod(p) => p
                .containers
                .iter()
                .filter_map(|c| p.machine_name(&c.name).map(str::to_owned))
                .collect(),
        };
        names.sort();
        names
    }
}

/// Service definitions for a plain container engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComposeEnvironment {
    pub services: BTreeMap<String, Service>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_credentials: Option<AuthConfigs>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PodSpec {
    pub name: String,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    pub containers: Vec<Container>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_nameservers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_pull_credentials: Option<AuthConfigs>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Warning>,
}

impl PodSpec {
    pub fn machine_name(&self, container: &str) -> Option<&str> {
        self.annotations
            .get(&machine_name_annotation(container))
            .map(String::as_str)
    }

    /// Servers declared for `machine`, empty when the annotation is absent
    /// or unreadable.
    pub fn declared_servers(&self, machine: &str) -> BTreeMap<String, DeclaredServer> {
        annotated_servers(&self.annotations, machine)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Container {
    pub name: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<ContainerPort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerPort {
    pub container_port: u16,
    pub protocol: String,
}

/// A server declared on a machine: which port it listens on and how it is
/// reached from outside.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeclaredServer {
    /// Normalized port, e.g. `8080/tcp`.
    pub port: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Name given to an exposed port that has no declared server reference.
pub fn default_server_name(port: &str) -> String {
    match port.split_once('/') {
        Some((number, transport)) => format!("server-{number}-{transport}"),
        None => format!("server-{port}-tcp"),
    }
}

/// Per-port server attributes carried by `drydock.server.<port>.<attr>` labels.
pub fn server_labels_by_port(
    labels: &BTreeMap<String, String>,
) -> BTreeMap<String, BTreeMap<String, String>> {
    let mut by_port: BTreeMap<String, BTreeMap<String, String>> = BTreeMap::new();
    for (key, value) in labels {
        let Some(rest) = key.strip_prefix(SERVER_LABEL_PREFIX) else {
            continue;
        };
        if let Some((port, attribute)) = rest.rsplit_once('.') {
            by_port
                .entry(port.to_owned())
                .or_default()
                .insert(attribute.to_owned(), value.clone());
        }
    }
    by_port
}

/// Servers with an explicit reference in a service's labels, keyed by name.
pub fn declared_servers(labels: &BTreeMap<String, String>) -> BTreeMap<String, DeclaredServer> {
    server_labels_by_port(labels)
        .into_iter()
        .filter_map(|(port, mut attributes)| {
            let name = attributes.remove("ref")?;
            Some((
                name,
                DeclaredServer {
                    port,
                    protocol: attributes.remove("protocol"),
                    path: attributes.remove("path"),
                },
            ))
        })
        .collect()
}

/// Servers declared for `machine` in a set of pod annotations.
pub fn annotated_servers(
    annotations: &BTreeMap<String, String>,
    machine: &str,
) -> BTreeMap<String, DeclaredServer> {
    annotations
        .get(&servers_annotation(machine))
        .and_then(|raw| serde_json::from_str(raw).ok())
        .unwrap_or_default()
}
