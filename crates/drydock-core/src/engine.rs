use crate::config::InfraConfig;
use crate::CoreError;
use drydock_runtime::{
    select_converter, Backend, CompositeServerResolver, NamespaceMeta, NamespaceRegistry,
    PreferenceStore, ProvisionContext, ProvisionerChain, ResolvedServer, RuntimeBackend,
    RuntimeError, RuntimeObject, ServerResolver, StaticNamespaceRegistry,
};
use drydock_schema::{
    EnvironmentModel, EnvironmentParser, RecipeKind, UserId, Warning, WorkspaceEnvironment,
    WorkspaceId,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Central pipeline for Drydock workspaces.
///
/// Parses a workspace recipe, runs the provisioner chain over the resulting
/// model, converts it for the target backend, and resolves the servers of a
/// running workspace. The engine holds no per-workspace state; every call
/// builds its model from scratch.
pub struct Engine {
    config: InfraConfig,
    parser: EnvironmentParser,
    chain: ProvisionerChain,
    namespaces: StaticNamespaceRegistry,
}

/// A converted workspace and the warnings collected on the way.
#[derive(Debug, Clone, Serialize)]
pub struct PreparedRuntime {
    pub workspace_id: WorkspaceId,
    pub backend: Backend,
    pub object: RuntimeObject,
    pub warnings: Vec<Warning>,
}

impl Engine {
    pub fn new(config: InfraConfig, prefs: Arc<dyn PreferenceStore>) -> Self {
        let chain = ProvisionerChain::standard(&config.provisioner_settings(), prefs);
        let namespaces = config.namespace_registry();
        Self {
            config,
            parser: EnvironmentParser::new(),
            chain,
            namespaces,
        }
    }

    pub fn config(&self) -> &InfraConfig {
        &self.config
    }

    pub fn supported_recipe_types(&self) -> Vec<String> {
        self.parser.supported_types()
    }

    /// Parse a workspace environment into a fresh model.
    pub fn parse(&self, env: &WorkspaceEnvironment) -> Result<EnvironmentModel, CoreError> {
        let model = self.parser.parse(env)?;
        for warning in &model.warnings {
            warn!("{warning}");
        }
        Ok(model)
    }

    /// Parse, provision, and convert a workspace for `backend`.
    pub fn prepare(
        &self,
        user: &UserId,
        workspace_id: &WorkspaceId,
        env: &WorkspaceEnvironment,
        backend: Backend,
    ) -> Result<PreparedRuntime, CoreError> {
        info!(
            "preparing workspace {workspace_id} of {user} for {backend} from '{}' recipe",
            env.recipe.recipe_type
        );
        let mut model = self.parse(env)?;

        let ctx = ProvisionContext {
            workspace_id: workspace_id.clone(),
            user_id: user.clone(),
        };
        self.chain.apply(&ctx, &mut model)?;

        let single = backend.is_pod_based()
            && env.recipe.recipe_type.trim() == RecipeKind::DockerImage.type_name();
        let converter = select_converter(backend, workspace_id.as_str(), single);
        let object = converter.convert(model)?;
        let warnings = object.warnings().to_vec();
        debug!(
            "workspace {workspace_id} converted for {} with {} warning(s)",
            converter.backend(),
            warnings.len()
        );

        Ok(PreparedRuntime {
            workspace_id: workspace_id.clone(),
            backend,
            object,
            warnings,
        })
    }

    /// Prepare a workspace and deploy it on `client`.
    pub fn start(
        &self,
        client: &dyn RuntimeBackend,
        user: &UserId,
        workspace_id: &WorkspaceId,
        env: &WorkspaceEnvironment,
        backend: Backend,
    ) -> Result<PreparedRuntime, CoreError> {
        if !client.available() {
            return Err(RuntimeError::BackendUnavailable(client.name().to_owned()).into());
        }
        let prepared = self.prepare(user, workspace_id, env, backend)?;
        client.deploy(workspace_id, &prepared.object)?;
        info!(
            "workspace {workspace_id} started on {} backend ({})",
            client.name(),
            backend
        );
        Ok(prepared)
    }

    /// Servers of one machine, resolved from the backend's current state.
    pub fn servers(
        &self,
        client: &dyn RuntimeBackend,
        workspace_id: &WorkspaceId,
        machine: &str,
    ) -> Result<BTreeMap<String, ResolvedServer>, CoreError> {
        let endpoints = client.endpoints(workspace_id)?;
        let resolver = CompositeServerResolver::from_endpoints(
            endpoints,
            self.config.custom_protocol().map(str::to_owned),
        );
        Ok(resolver.resolve(machine))
    }

    /// Servers of every machine of a workspace, keyed by machine name.
    pub fn all_servers(
        &self,
        client: &dyn RuntimeBackend,
        workspace_id: &WorkspaceId,
    ) -> Result<BTreeMap<String, BTreeMap<String, ResolvedServer>>, CoreError> {
        let endpoints = client.endpoints(workspace_id)?;
        let machines: Vec<String> = endpoints
            .containers
            .iter()
            .map(|c| c.machine_name.clone())
            .collect();
        let resolver = CompositeServerResolver::from_endpoints(
            endpoints,
            self.config.custom_protocol().map(str::to_owned),
        );
        Ok(machines
            .into_iter()
            .map(|machine| {
                let servers = resolver.resolve(&machine);
                (machine, servers)
            })
            .collect())
    }

    pub fn stop(
        &self,
        client: &dyn RuntimeBackend,
        workspace_id: &WorkspaceId,
    ) -> Result<(), CoreError> {
        info!("stopping workspace {workspace_id}");
        client.stop(workspace_id)?;
        Ok(())
    }

    pub fn destroy(
        &self,
        client: &dyn RuntimeBackend,
        workspace_id: &WorkspaceId,
    ) -> Result<(), CoreError> {
        info!("destroying workspace {workspace_id}");
        client.destroy(workspace_id)?;
        Ok(())
    }

    pub fn namespaces(&self, user: &UserId) -> Result<Vec<NamespaceMeta>, CoreError> {
        Ok(self.namespaces.list(user)?)
    }
}
