use crate::object::RuntimeObject;
use crate::RuntimeError;
use drydock_schema::WorkspaceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortBinding {
    pub host_ip: String,
    pub host_port: u16,
}

/// What the backend reports about one running container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerEndpoints {
    pub machine_name: String,
    pub running: bool,
    /// Host under which published ports are reachable.
    pub host: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Exposed ports (`8080/tcp`) and where they are published, if anywhere.
    #[serde(default)]
    pub ports: BTreeMap<String, Option<PortBinding>>,
}

/// An external route the backend created for a declared server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngressEndpoint {
    pub machine_name: String,
    pub server_name: String,
    pub host: String,
    pub path: String,
    pub tls: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackendEndpoints {
    pub containers: Vec<ContainerEndpoints>,
    #[serde(default)]
    pub ingresses: Vec<IngressEndpoint>,
    /// Annotations of the deployed workload, empty for compose deployments.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl BackendEndpoints {
    pub fn container(&self, machine: &str) -> Option<&ContainerEndpoints> {
        self.containers.iter().find(|c| c.machine_name == machine)
    }
}

/// Client of the infrastructure that actually runs workspace containers.
pub trait RuntimeBackend: Send + Sync {
    fn name(&self) -> &str;

    fn available(&self) -> bool;

    fn deploy(&self, workspace: &WorkspaceId, object: &RuntimeObject) -> Result<(), RuntimeError>;

    /// Current state of a deployed workspace, read fresh on every call.
    fn endpoints(&self, workspace: &WorkspaceId) -> Result<BackendEndpoints, RuntimeError>;

    fn stop(&self, workspace: &WorkspaceId) -> Result<(), RuntimeError>;

    fn destroy(&self, workspace: &WorkspaceId) -> Result<(), RuntimeError>;
}

/// Backend client by name. `external_host` is where the backend publishes
/// workspace ports and routes.
pub fn select_backend(
    name: &str,
    external_host: &str,
) -> Result<Box<dyn RuntimeBackend>, RuntimeError> {
    match name {
        "mock" => Ok(Box::new(
            crate::mock::MockBackend::new().with_external_host(external_host),
        )),
        other => Err(RuntimeError::BackendUnavailable(other.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_valid_backends() {
        let backend = select_backend("mock", "localhost").unwrap();
        assert_eq!(backend.name(), "mock");
        assert!(backend.available());
    }

    #[test]
    fn select_invalid_backend_fails() {
        let err = select_backend("nonexistent", "localhost").err().unwrap();
        assert!(matches!(err, RuntimeError::BackendUnavailable(name) if name == "nonexistent"));
    }

    #[test]
    fn container_lookup_by_machine() {
        let endpoints = BackendEndpoints {
            containers: vec![ContainerEndpoints {
                machine_name: "dev".to_owned(),
                ..ContainerEndpoints::default()
            }],
            ..BackendEndpoints::default()
        };
        assert!(endpoints.container("dev").is_some());
        assert!(endpoints.container("db").is_none());
    }
}
