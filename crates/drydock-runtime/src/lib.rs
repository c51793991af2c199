//! Provisioning, backend conversion, and server resolution for Drydock workspaces.
//!
//! This crate implements everything between a parsed `EnvironmentModel` and a running
//! workspace: the ordered `ProvisionerChain` of cross-cutting enrichers, one
//! `EnvironmentConverter` per backend producing a `RuntimeObject`, the pluggable
//! `RuntimeBackend` client trait with an in-process mock, the native/declarative
//! `ServerResolver`s, and the `NamespaceRegistry` listing isolated execution scopes.

pub mod backend;
pub mod convert;
pub mod mock;
pub mod namespace;
pub mod object;
pub mod preferences;
pub mod provision;
pub mod server;

pub use backend::{
    select_backend, BackendEndpoints, ContainerEndpoints, IngressEndpoint, PortBinding,
    RuntimeBackend,
};
pub use convert::{
    select_converter, Backend, ComposeConverter, EnvironmentConverter, PodConverter,
    SinglePodConverter,
};
pub use mock::MockBackend;
pub use namespace::{
    evaluate_namespace_template, NamespaceMeta, NamespaceRegistry, StaticNamespaceRegistry,
};
pub use object::{
    ComposeEnvironment, Container, ContainerPort, DeclaredServer, PodSpec, RuntimeObject,
};
pub use preferences::{InMemoryPreferenceStore, PreferenceStore};
pub use provision::{
    ProvisionContext, Provisioner, ProvisionerChain, ProvisionerSettings, ProxySettings,
};
pub use server::{
    build_path, CompositeServerResolver, DeclarativeServerResolver, NativeServerResolver,
    ResolvedServer, ServerResolver, ServerStatus,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
    #[error("internal infrastructure error: {0}")]
    InternalInfrastructure(String),
    #[error("backend '{0}' is not available on this system")]
    BackendUnavailable(String),
    #[error("workspace '{0}' is not running")]
    NotRunning(String),
    #[error("workspace '{0}' is already running")]
    AlreadyRunning(String),
}
