use crate::backend::{
    BackendEndpoints, ContainerEndpoints, IngressEndpoint, PortBinding, RuntimeBackend,
};
use crate::object::{ComposeEnvironment, PodSpec, RuntimeObject};
use crate::RuntimeError;
use drydock_schema::WorkspaceId;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const FIRST_HOST_PORT: u16 = 32768;

struct MockState {
    workspaces: HashMap<WorkspaceId, BackendEndpoints>,
    next_port: u16,
}

/// In-process backend that records deployments and fabricates endpoints.
///
/// Compose deployments get host ports allocated sequentially from 32768.
/// Pod deployments publish nothing directly and get one ingress per
/// declared server instead.
pub struct MockBackend {
    state: Mutex<MockState>,
    external_host: String,
    tls: bool,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self {
            state: Mutex::new(MockState {
                workspaces: HashMap::new(),
                next_port: FIRST_HOST_PORT,
            }),
            external_host: "127.0.0.1".to_owned(),
            tls: false,
        }
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_external_host(mut self, host: &str) -> Self {
        host.clone_into(&mut self.external_host);
        self
    }

    #[must_use]
    pub fn with_tls(mut self, tls: bool) -> Self {
        self.tls = tls;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, MockState>, RuntimeError> {
        self.state
            .lock()
            .map_err(|e| RuntimeError::Infrastructure(format!("mutex poisoned: {e}")))
    }

    fn compose_endpoints(
        &self,
        state: &mut MockState,
        compose: &ComposeEnvironment,
    ) -> BackendEndpoints {
        let containers = compose
            .services
            .iter()
            .map(|(machine, service)| {
                let ports = service
                    .normalized_expose()
                    .into_iter()
                    .map(|port| {
                        let binding = PortBinding {
                            host_ip: "0.0.0.0".to_owned(),
                            host_port: state.next_port,
                        };
                        state.next_port = state.next_port.wrapping_add(1).max(FIRST_HOST_PORT);
                        (port, Some(binding))
                    })
                    .collect();
                ContainerEndpoints {
                    machine_name: machine.clone(),
                    running: true,
                    host: self.external_host.clone(),
                    labels: service.labels.clone(),
                    ports,
                }
            })
            .collect();
        BackendEndpoints {
            containers,
            ..BackendEndpoints::default()
        }
    }

    fn pod_endpoints(&self, pod: &PodSpec) -> BackendEndpoints {
        let mut containers = Vec::with_capacity(pod.containers.len());
        let mut ingresses = Vec::new();
        for container in &pod.containers {
            let machine = pod
                .machine_name(&container.name)
                .unwrap_or(&container.name)
                .to_owned();
            let ports: BTreeMap<String, Option<PortBinding>> = container
                .ports
                .iter()
                .map(|p| {
                    (
                        format!("{}/{}", p.container_port, p.protocol.to_ascii_lowercase()),
                        None,
                    )
                })
                .collect();
            for server in pod.declared_servers(&machine).into_keys() {
                ingresses.push(IngressEndpoint {
                    path: format!("/{}/{machine}/{server}", pod.name),
                    machine_name: machine.clone(),
                    server_name: server,
                    host: self.external_host.clone(),
                    tls: self.tls,
                });
            }
            containers.push(ContainerEndpoints {
                machine_name: machine,
                running: true,
                host: self.external_host.clone(),
                labels: BTreeMap::new(),
                ports,
            });
        }
        BackendEndpoints {
            containers,
            ingresses,
            annotations: pod.annotations.clone(),
        }
    }
}

impl RuntimeBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn available(&self) -> bool {
        true
    }

    fn deploy(&self, workspace: &WorkspaceId, object: &RuntimeObject) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        if state
            .workspaces
            .get(workspace)
            .is_some_and(|w| w.containers.iter().any(|c| c.running))
        {
            return Err(RuntimeError::AlreadyRunning(workspace.to_string()));
        }
        let endpoints = match object {
            RuntimeObject::Compose(compose) => self.compose_endpoints(&mut state, compose),
            RuntimeObject::Pod(pod) => self.pod_endpoints(pod),
        };
        debug!(
            "mock deployed workspace {workspace} with {} containers",
            endpoints.containers.len()
        );
        state.workspaces.insert(workspace.clone(), endpoints);
        Ok(())
    }

    fn endpoints(&self, workspace: &WorkspaceId) -> Result<BackendEndpoints, RuntimeError> {
        let state = self.lock()?;
        state
            .workspaces
            .get(workspace)
            .cloned()
            .ok_or_else(|| RuntimeError::NotRunning(workspace.to_string()))
    }

    fn stop(&self, workspace: &WorkspaceId) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        let endpoints = state
            .workspaces
            .get_mut(workspace)
            .ok_or_else(|| RuntimeError::NotRunning(workspace.to_string()))?;
        for container in &mut endpoints.containers {
            container.running = false;
        }
        Ok(())
    }

    fn destroy(&self, workspace: &WorkspaceId) -> Result<(), RuntimeError> {
        let mut state = self.lock()?;
        state
            .workspaces
            .remove(workspace)
            .map(|_| ())
            .ok_or_else(|| RuntimeError::NotRunning(workspace.to_string()))
    }
}
