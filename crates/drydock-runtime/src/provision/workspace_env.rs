use super::{ProvisionContext, Provisioner};
use crate::RuntimeError;
use drydock_schema::EnvironmentModel;

pub const WORKSPACE_ID_VARIABLE: &str = "DRYDOCK_WORKSPACE_ID";
pub const MACHINE_NAME_VARIABLE: &str = "DRYDOCK_MACHINE_NAME";

/// Tells each container which workspace and machine it belongs to.
pub struct WorkspaceEnvProvisioner;

impl Provisioner for WorkspaceEnvProvisioner {
    fn name(&self) -> &'static str {
        "workspace-env"
    }

    fn provision(
        &self,
        ctx: &ProvisionContext,
        model: &mut EnvironmentModel,
    ) -> Result<(), RuntimeError> {
        for (machine, service) in &mut model.services {
            service.environment.insert(
                WORKSPACE_ID_VARIABLE.to_owned(),
                ctx.workspace_id.to_string(),
            );
            service
                .environment
                .insert(MACHINE_NAME_VARIABLE.to_owned(), machine.clone());
        }
        Ok(())
    }
}
