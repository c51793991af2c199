use super::{build_path, external_protocol, ResolvedServer, ServerResolver, ServerStatus};
use crate::backend::BackendEndpoints;
use crate::object::{default_server_name, server_labels_by_port};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Servers discovered from ports the backend published on the host.
///
/// Names and protocols come from the container's server labels; a published
/// port without a declared reference is named `server-<port>-<transport>`.
pub struct NativeServerResolver {
    endpoints: Arc<BackendEndpoints>,
    custom_protocol: Option<String>,
}

impl NativeServerResolver {
    pub fn new(endpoints: Arc<BackendEndpoints>, custom_protocol: Option<String>) -> Self {
        Self {
            endpoints,
            custom_protocol,
        }
    }
}

impl ServerResolver for NativeServerResolver {
    fn resolve(&self, machine: &str) -> BTreeMap<String, ResolvedServer> {
        let Some(container) = self.endpoints.container(machine) else {
            return BTreeMap::new();
        };
        let labels = server_labels_by_port(&container.labels);
        let status = if container.running {
            ServerStatus::Running
        } else {
            ServerStatus::Stopped
        };

        let mut servers = BTreeMap::new();
        for (port, binding) in &container.ports {
            let Some(binding) = binding else {
                continue;
            };
            let attributes = labels.get(port);
            let label = |name: &str| attributes.and_then(|a| a.get(name)).map(String::as_str);

            let name = label("ref").map_or_else(|| default_server_name(port), str::to_owned);
            let protocol = label("protocol").unwrap_or("tcp");
            let url = format!(
                "{}://{}:{}{}",
                external_protocol(protocol, self.custom_protocol.as_deref()),
                container.host,
                binding.host_port,
                build_path("/", label("path"))
            );

            let mut server_attributes = BTreeMap::from([
                ("port".to_owned(), port.clone()),
                ("source".to_owned(), "native".to_owned()),
            ]);
            if let Some(path) = label("path") {
                server_attributes.insert("path".to_owned(), path.to_owned());
            }
            servers.insert(
                name.clone(),
                ResolvedServer {
                    name,
                    url,
                    status,
                    attributes: server_attributes,
                },
            );
        }
        servers
    }
}
