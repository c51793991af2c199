use super::{build_path, external_protocol, ResolvedServer, ServerResolver, ServerStatus};
use crate::backend::BackendEndpoints;
use crate::object::annotated_servers;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Servers declared on the workload, reached through backend ingresses.
///
/// The URL path is the ingress base path joined with the declared server
/// path. TLS ingresses upgrade `http` and `ws` to `https` and `wss`.
pub struct DeclarativeServerResolver {
    endpoints: Arc<BackendEndpoints>,
    custom_protocol: Option<String>,
}

impl DeclarativeServerResolver {
    pub fn new(endpoints: Arc<BackendEndpoints>, custom_protocol: Option<String>) -> Self {
        Self {
            endpoints,
            custom_protocol,
        }
    }
}

fn secure_protocol(protocol: &str) -> &str {
    match protocol {
        "http" => "https",
        "ws" => "wss",
        other => other,
    }
}

impl ServerResolver for DeclarativeServerResolver {
    fn resolve(&self, machine: &str) -> BTreeMap<String, ResolvedServer> {
        let status = match self.endpoints.container(machine) {
            Some(c) if c.running => ServerStatus::Running,
            Some(_) => ServerStatus::Stopped,
            None => ServerStatus::Unknown,
        };

        let mut servers = BTreeMap::new();
        for (name, declared) in annotated_servers(&self.endpoints.annotations, machine) {
            let Some(ingress) = self
                .endpoints
                .ingresses
                .iter()
                .find(|i| i.machine_name == machine && i.server_name == name)
            else {
                debug!("declared server '{name}' of machine {machine} has no ingress");
                continue;
            };

            let protocol = declared.protocol.as_deref().unwrap_or("http");
            let protocol = if ingress.tls {
                secure_protocol(protocol)
            } else {
                protocol
            };
            let url = format!(
                "{}://{}{}",
                external_protocol(protocol, self.custom_protocol.as_deref()),
                ingress.host,
                build_path(&ingress.path, declared.path.as_deref())
            );

            let mut attributes = BTreeMap::from([
                ("port".to_owned(), declared.port.clone()),
                ("source".to_owned(), "declarative".to_owned()),
            ]);
            if let Some(path) = declared.path {
                attributes.insert("path".to_owned(), path);
            }
            servers.insert(
                name.clone(),
                ResolvedServer {
                    name,
                    url,
                    status,
                    attributes,
                },
            );
        }
        servers
    }
}
