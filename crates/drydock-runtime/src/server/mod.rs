//! Maps the servers of a running workspace to externally reachable URLs.
//!
//! Two strategies compose: [`NativeServerResolver`] reads ports the backend
//! published directly, [`DeclarativeServerResolver`] maps servers declared on
//! the workload onto the routes the backend created for them. When both
//! report the same server name the declarative entry is kept.

pub mod declarative;
pub mod native;

pub use declarative::DeclarativeServerResolver;
pub use native::NativeServerResolver;

use crate::backend::BackendEndpoints;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerStatus {
    Unknown,
    Running,
    Stopped,
}

impl ServerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Running => "RUNNING",
            Self::Stopped => "STOPPED",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedServer {
    pub name: String,
    pub url: String,
    pub status: ServerStatus,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

pub trait ServerResolver: Send + Sync {
    /// Servers of `machine` keyed by name. Unknown machines yield an empty map.
    fn resolve(&self, machine: &str) -> BTreeMap<String, ResolvedServer>;
}

/// Joins two path fragments into one absolute path ending in `/`.
///
/// ```
/// use drydock_runtime::build_path;
/// assert_eq!(build_path("/a", Some("b")), "/a/b/");
/// assert_eq!(build_path("/", None), "/");
/// ```
pub fn build_path(base: &str, sub: Option<&str>) -> String {
    let mut path = String::with_capacity(base.len() + sub.map_or(0, str::len) + 2);
    if !base.starts_with('/') {
        path.push('/');
    }
    path.push_str(base);
    if !path.ends_with('/') {
        path.push('/');
    }
    let sub = sub.unwrap_or_default().trim_start_matches('/');
    if !sub.is_empty() {
        path.push_str(sub);
        if !path.ends_with('/') {
            path.push('/');
        }
    }
    path
}

/// Protocol shown to clients: a configured external protocol replaces `http`.
pub(crate) fn external_protocol(protocol: &str, custom: Option<&str>) -> String {
    match custom.map(str::trim) {
        Some(custom) if protocol == "http" && !custom.is_empty() => custom.to_owned(),
        _ => protocol.to_owned(),
    }
}

/// Native servers overlaid with declarative ones.
pub struct CompositeServerResolver {
    native: Box<dyn ServerResolver>,
    declarative: Box<dyn ServerResolver>,
}

impl CompositeServerResolver {
    pub fn new(native: Box<dyn ServerResolver>, declarative: Box<dyn ServerResolver>) -> Self {
        Self {
            native,
            declarative,
        }
    }

    /// Resolver over one snapshot of backend state.
    pub fn from_endpoints(endpoints: BackendEndpoints, custom_protocol: Option<String>) -> Self {
        let endpoints = Arc::new(endpoints);
        Self::new(
            Box::new(NativeServerResolver::new(
                Arc::clone(&endpoints),
                custom_protocol.clone(),
            )),
            Box::new(DeclarativeServerResolver::new(endpoints, custom_protocol)),
        )
    }
}

impl ServerResolver for CompositeServerResolver {
    fn resolve(&self, machine: &str) -> BTreeMap<String, ResolvedServer> {
        let mut servers = self.native.resolve(machine);
        for (name, server) in self.declarative.resolve(machine) {
            if let Some(replaced) = servers.insert(name, server) {
                debug!(
                    "declared server '{}' of machine {machine} replaces native url {}",
                    replaced.name, replaced.url
                );
            }
        }
        servers
    }
}
