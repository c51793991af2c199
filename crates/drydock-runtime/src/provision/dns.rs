use super::{ProvisionContext, Provisioner};
use crate::RuntimeError;
use drydock_schema::EnvironmentModel;
use tracing::debug;

/// Adds resolver addresses to the `dns` list of every service.
///
/// `None`, an empty list, and lists holding only blank entries all mean
/// "no resolvers configured" and leave the model untouched.
pub struct DnsProvisioner {
    servers: Vec<String>,
}

impl DnsProvisioner {
    pub fn new(servers: Option<Vec<String>>) -> Self {
        let servers = servers
            .unwrap_or_default()
            .into_iter()
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
        Self { servers }
    }

    pub fn is_noop(&self) -> bool {
        self.servers.is_empty()
    }
}

impl Provisioner for DnsProvisioner {
    fn name(&self) -> &'static str {
        "dns"
    }

    fn provision(
        &self,
        _ctx: &ProvisionContext,
        model: &mut EnvironmentModel,
    ) -> Result<(), RuntimeError> {
        if self.is_noop() {
            debug!("no DNS resolvers configured");
            return Ok(());
        }
        for service in model.services.values_mut() {
            for server in &self.servers {
                if !service.dns.contains(server) {
                    service.dns.push(server.clone());
                }
            }
        }
        Ok(())
    }
}
