//! One converter per backend, turning a provisioned model into the object the
//! backend runs.

use crate::object::{
    declared_servers, machine_name_annotation, servers_annotation, ComposeEnvironment, Container,
    ContainerPort, PodSpec, RuntimeObject, BACKEND_ANNOTATION,
};
use crate::RuntimeError;
use drydock_schema::{EnvironmentModel, Service};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

const MAX_CONTAINER_NAME: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Docker,
    Kubernetes,
    OpenShift,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Docker, Backend::Kubernetes, Backend::OpenShift];

    pub fn name(self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Kubernetes => "kubernetes",
            Self::OpenShift => "openshift",
        }
    }

    /// Whether the backend runs workspaces as a single pod.
    pub fn is_pod_based(self) -> bool {
        !matches!(self, Self::Docker)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Backend {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.name() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| {
                RuntimeError::Infrastructure(format!(
                    "unknown backend '{s}', expected one of: docker, kubernetes, openshift"
                ))
            })
    }
}

pub trait EnvironmentConverter: Send + Sync {
    fn backend(&self) -> &str;

    /// Consume a provisioned model. Warnings of the model are carried over
    /// to the returned object as they are.
    fn convert(&self, model: EnvironmentModel) -> Result<RuntimeObject, RuntimeError>;
}

/// Picks the converter for `backend`. `single` requests the single-container
/// pod shape and only matters for pod-based backends.
pub fn select_converter(
    backend: Backend,
    workload_name: &str,
    single: bool,
) -> Box<dyn EnvironmentConverter> {
    match backend {
        Backend::Docker => Box::new(ComposeConverter::new(workload_name)),
        pod_backend if single => Box::new(SinglePodConverter::new(pod_backend, workload_name)),
        pod_backend => Box::new(PodConverter::new(pod_backend, workload_name)),
    }
}

fn no_machines() -> RuntimeError {
    RuntimeError::InternalInfrastructure("environment has no machines to convert".to_owned())
}

/// Service definitions for a plain container engine.
pub struct ComposeConverter {
    project: String,
}

impl ComposeConverter {
    pub fn new(project: &str) -> Self {
        Self {
            project: project.to_owned(),
        }
    }
}

impl EnvironmentConverter for ComposeConverter {
    fn backend(&self) -> &'static str {
        Backend::Docker.name()
    }

    fn convert(&self, model: EnvironmentModel) -> Result<RuntimeObject, RuntimeError> {
        if model.services.is_empty() {
            return Err(no_machines());
        }
        let mut taken = BTreeSet::new();
        for (machine, service) in &model.services {
            if let Some(name) = &service.container_name {
                if !taken.insert(name.clone()) {
                    return Err(RuntimeError::Infrastructure(format!(
                        "container name '{name}' of machine '{machine}' is already used by another machine"
                    )));
                }
            }
        }
        let mut services = model.services;
        for (machine, service) in &mut services {
            if service.container_name.is_none() {
                let name = unique_container_name(&format!("{}-{machine}", self.project), &taken);
                taken.insert(name.clone());
                service.container_name = Some(name);
            }
        }
        Ok(RuntimeObject::Compose(ComposeEnvironment {
            services,
            registry_credentials: model.registry_credentials,
            warnings: model.warnings,
        }))
    }
}

/// A pod with one container per machine for Kubernetes and OpenShift.
pub struct PodConverter {
    backend: Backend,
    pod_name: String,
}

impl PodConverter {
    pub fn new(backend: Backend, pod_name: &str) -> Self {
        Self {
            backend,
            pod_name: sanitize_name(pod_name),
        }
    }

    fn container(
        &self,
        machine: &str,
        name: String,
        service: Service,
    ) -> Result<Container, RuntimeError> {
        if service.build.is_some() {
            return Err(RuntimeError::Infrastructure(format!(
                "machine '{machine}' must be built from a recipe, backend '{}' only runs prebuilt images",
                self.backend
            )));
        }
        let Some(image) = service.image.clone() else {
            return Err(RuntimeError::Infrastructure(format!(
                "machine '{machine}' has no image"
            )));
        };
        let ports = service
            .normalized_expose()
            .iter()
            .map(|port| container_port(machine, port))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Container {
            name,
            image,
            command: service.entrypoint,
            args: service.command,
            env: service.environment,
            ports,
            memory_limit: service.mem_limit,
        })
    }
}

impl EnvironmentConverter for PodConverter {
    fn backend(&self) -> &str {
        self.backend.name()
    }

    fn convert(&self, model: EnvironmentModel) -> Result<RuntimeObject, RuntimeError> {
        if model.services.is_empty() {
            return Err(no_machines());
        }

        let mut annotations = BTreeMap::from([(
            BACKEND_ANNOTATION.to_owned(),
            self.backend.name().to_owned(),
        )]);
        let mut containers = Vec::with_capacity(model.services.len());
        let mut taken = BTreeSet::new();
        let mut dns_nameservers: Vec<String> = Vec::new();

        for (machine, service) in model.services {
            let name = unique_container_name(&machine, &taken);
            taken.insert(name.clone());
            for server in &service.dns {
                if !dns_nameservers.contains(server) {
                    dns_nameservers.push(server.clone());
                }
            }
            let servers = declared_servers(&service.labels);
            if !servers.is_empty() {
                let encoded = serde_json::to_string(&servers).map_err(|e| {
                    RuntimeError::InternalInfrastructure(format!(
                        "failed to encode servers of machine '{machine}': {e}"
                    ))
                })?;
                annotations.insert(servers_annotation(&machine), encoded);
            }
            annotations.insert(machine_name_annotation(&name), machine.clone());
            containers.push(self.container(&machine, name, service)?);
        }

        debug!(
            "converted {} machines into pod '{}' for {}",
            containers.len(),
            self.pod_name,
            self.backend
        );
        Ok(RuntimeObject::Pod(PodSpec {
            name: self.pod_name.clone(),
            annotations,
            containers,
            dns_nameservers,
            image_pull_credentials: model.registry_credentials,
            warnings: model.warnings,
        }))
    }
}

/// Single-container pod for single-image recipes.
///
/// Refuses models with zero or several machines instead of picking one.
pub struct SinglePodConverter {
    inner: PodConverter,
}

impl SinglePodConverter {
    pub fn new(backend: Backend, pod_name: &str) -> Self {
        Self {
            inner: PodConverter::new(backend, pod_name),
        }
    }
}

impl EnvironmentConverter for SinglePodConverter {
    fn backend(&self) -> &str {
        self.inner.backend()
    }

    fn convert(&self, model: EnvironmentModel) -> Result<RuntimeObject, RuntimeError> {
        match model.services.len() {
            0 => Err(no_machines()),
            1 => self.inner.convert(model),
            _ => Err(RuntimeError::InternalInfrastructure(format!(
                "single container pod cannot hold machines {}",
                model.service_names().join(", ")
            ))),
        }
    }
}

fn container_port(machine: &str, port: &str) -> Result<ContainerPort, RuntimeError> {
    let (number, transport) = port.split_once('/').unwrap_or((port, "tcp"));
    let container_port = number.trim().parse::<u16>().ok().filter(|p| *p != 0);
    match (container_port, transport.to_ascii_lowercase().as_str()) {
        (Some(container_port), "tcp" | "udp") => Ok(ContainerPort {
            container_port,
            protocol: transport.to_ascii_uppercase(),
        }),
        _ => Err(RuntimeError::Infrastructure(format!(
            "machine '{machine}' exposes invalid port '{port}'"
        ))),
    }
}

/// Lowercase RFC 1123 label: alphanumerics and `-`, at most 63 characters.
pub fn sanitize_name(raw: &str) -> String {
    let mut name: String = raw
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    name.truncate(MAX_CONTAINER_NAME);
    let name = name.trim_matches('-');
    if name.is_empty() {
        "machine".to_owned()
    } else {
        name.to_owned()
    }
}

/// Sanitized `raw`, or the sanitized prefix with an 8-hex blake3 suffix when
/// that is already taken. The digest is rehashed until the name is free.
fn unique_container_name(raw: &str, taken: &BTreeSet<String>) -> String {
    let base = sanitize_name(raw);
    if !taken.contains(&base) {
        return base;
    }
    let mut prefix = base;
    prefix.truncate(MAX_CONTAINER_NAME - 9);
    let prefix = prefix.trim_end_matches('-');
    let mut digest = blake3::hash(raw.as_bytes());
    loop {
        let candidate = format!("{prefix}-{}", &digest.to_hex().as_str()[..8]);
        if !taken.contains(&candidate) {
            return candidate;
        }
        digest = blake3::hash(digest.as_bytes());
    }
}
