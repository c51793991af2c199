//! Cross-cutting enrichment of an environment model before conversion.
//!
//! Each provisioner is configured once at construction and then only mutates
//! the model it is handed. [`ProvisionerChain::standard`] fixes the order:
//!
//! 1. workspace identity variables
//! 2. proxy variables
//! 3. DNS resolvers
//! 4. registry credentials
//! 5. build arguments
//!
//! Later provisioners see what earlier ones wrote and never remove it.

pub mod build_args;
pub mod dns;
pub mod proxy;
pub mod registry;
pub mod workspace_env;

pub use build_args::BuildArgsProvisioner;
pub use dns::DnsProvisioner;
pub use proxy::{ProxyProvisioner, ProxySettings};
pub use registry::{
    encode_credentials, RegistryCredentialProvisioner, DOCKER_CREDENTIALS_PREFERENCE,
};
pub use workspace_env::WorkspaceEnvProvisioner;

use crate::preferences::PreferenceStore;
use crate::RuntimeError;
use drydock_schema::{AuthConfigs, EnvironmentModel, UserId, WorkspaceId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Who the model is being provisioned for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionContext {
    pub workspace_id: WorkspaceId,
    pub user_id: UserId,
}

impl ProvisionContext {
    pub fn new(workspace_id: impl Into<WorkspaceId>, user_id: impl Into<UserId>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            user_id: user_id.into(),
        }
    }
}

pub trait Provisioner: Send + Sync {
    fn name(&self) -> &str;

    /// Enrich `model` in place. Fails only on unrecoverable configuration
    /// problems, never because there is nothing to do.
    fn provision(
        &self,
        ctx: &ProvisionContext,
        model: &mut EnvironmentModel,
    ) -> Result<(), RuntimeError>;
}

/// Configuration for the standard chain, resolved once at startup.
#[derive(Debug, Clone, Default)]
pub struct ProvisionerSettings {
    pub proxy: ProxySettings,
    pub dns_servers: Option<Vec<String>>,
    pub registry_credentials: AuthConfigs,
    pub build_args: BTreeMap<String, String>,
}

#[derive(Default)]
pub struct ProvisionerChain {
    provisioners: Vec<Box<dyn Provisioner>>,
}

impl ProvisionerChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard(settings: &ProvisionerSettings, prefs: Arc<dyn PreferenceStore>) -> Self {
        Self::new()
            .with(WorkspaceEnvProvisioner)
            .with(ProxyProvisioner::new(settings.proxy.clone()))
            .with(DnsProvisioner::new(settings.dns_servers.clone()))
            .with(RegistryCredentialProvisioner::new(
                prefs,
                settings.registry_credentials.clone(),
            ))
            .with(BuildArgsProvisioner::new(settings.build_args.clone()))
    }

    #[must_use]
    pub fn with(mut self, provisioner: impl Provisioner + 'static) -> Self {
        self.provisioners.push(Box::new(provisioner));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.provisioners.iter().map(|p| p.name()).collect()
    }

    pub fn apply(
        &self,
        ctx: &ProvisionContext,
        model: &mut EnvironmentModel,
    ) -> Result<(), RuntimeError> {
        for provisioner in &self.provisioners {
            debug!(
                "applying provisioner '{}' for workspace {}",
                provisioner.name(),
                ctx.workspace_id
            );
            provisioner.provision(ctx, model)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preferences::InMemoryPreferenceStore;
    use drydock_schema::{BuildContext, Service};

    struct Failing;

    impl Provisioner for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn provision(
            &self,
            _ctx: &ProvisionContext,
            _model: &mut EnvironmentModel,
        ) -> Result<(), RuntimeError> {
            Err(RuntimeError::Infrastructure("broken config".to_owned()))
        }
    }

    fn ctx() -> ProvisionContext {
        ProvisionContext::new("ws1", "alice")
    }

    #[test]
    fn standard_chain_order_is_fixed() {
        let chain = ProvisionerChain::standard(
            &ProvisionerSettings::default(),
            Arc::new(InMemoryPreferenceStore::new()),
        );
        assert_eq!(
            chain.names(),
            vec!["workspace-env", "proxy", "dns", "registry-credentials", "build-args"]
        );
    }

    #[test]
    fn later_provisioners_keep_earlier_variables() {
        let settings = ProvisionerSettings {
            proxy: ProxySettings {
                https_proxy: Some("https://proxy:3128".to_owned()),
                ..ProxySettings::default()
            },
            build_args: BTreeMap::from([("https_proxy".to_owned(), "ignored".to_owned())]),
            ..ProvisionerSettings::default()
        };
        let chain =
            ProvisionerChain::standard(&settings, Arc::new(InMemoryPreferenceStore::new()));
        let mut model = EnvironmentModel::new()
            .with_service("app", Service::from_build(BuildContext::from_context(".")));
        chain.apply(&ctx(), &mut model).unwrap();

        let app = &model.services["app"];
        assert_eq!(app.environment["https_proxy"], "https://proxy:3128");
        assert_eq!(app.environment["DRYDOCK_WORKSPACE_ID"], "ws1");
        assert_eq!(
            app.build.as_ref().unwrap().args["https_proxy"],
            "https://proxy:3128"
        );
    }

    #[test]
    fn chain_stops_on_first_error() {
        let chain = ProvisionerChain::new()
            .with(Failing)
            .with(WorkspaceEnvProvisioner);
        let mut model = EnvironmentModel::new().with_service("dev", Service::from_image("alpine"));
        let err = chain.apply(&ctx(), &mut model).unwrap_err();
        assert!(err.to_string().contains("broken config"));
        assert!(model.services["dev"].environment.is_empty());
    }

    #[test]
    fn standard_chain_is_idempotent() {
        let settings = ProvisionerSettings {
            proxy: ProxySettings {
                http_proxy: Some("http://proxy:3128".to_owned()),
                ..ProxySettings::default()
            },
            dns_servers: Some(vec!["10.0.0.2".to_owned()]),
            ..ProvisionerSettings::default()
        };
        let chain =
            ProvisionerChain::standard(&settings, Arc::new(InMemoryPreferenceStore::new()));
        let mut once = EnvironmentModel::new().with_service("dev", Service::from_image("alpine"));
        chain.apply(&ctx(), &mut once).unwrap();
        let mut twice = once.clone();
        chain.apply(&ctx(), &mut twice).unwrap();
        assert_eq!(once, twice);
    }
}
