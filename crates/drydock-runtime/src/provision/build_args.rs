use super::{ProvisionContext, Provisioner};
use crate::RuntimeError;
use drydock_schema::EnvironmentModel;
use std::collections::BTreeMap;

/// Adds configured build arguments to every service that is built.
///
/// Arguments already present, whether from the recipe or an earlier
/// provisioner, are left as they are.
pub struct BuildArgsProvisioner {
    args: BTreeMap<String, String>,
}

impl BuildArgsProvisioner {
    pub fn new(args: BTreeMap<String, String>) -> Self {
        Self { args }
    }
}

impl Provisioner for BuildArgsProvisioner {
    fn name(&self) -> &'static str {
        "build-args"
    }

    fn provision(
        &self,
        _ctx: &ProvisionContext,
        model: &mut EnvironmentModel,
    ) -> Result<(), RuntimeError> {
        let builds = model
            .services
            .values_mut()
            .filter_map(|s| s.build.as_mut());
        for build in builds {
            for (key, value) in &self.args {
                build
                    .args
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }
        Ok(())
    }
}
