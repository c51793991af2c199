use super::{ProvisionContext, Provisioner};
use crate::preferences::PreferenceStore;
use crate::RuntimeError;
use base64::{engine::general_purpose, Engine as _};
use drydock_schema::{AuthConfigs, EnvironmentModel, UserId};
use std::sync::Arc;
use tracing::{debug, warn};

/// Preference key holding a user's base64-encoded registry credentials.
pub const DOCKER_CREDENTIALS_PREFERENCE: &str = "dockerCredentials";

/// Attaches registry credentials to the model.
///
/// Static credentials from configuration are merged with the ones the user
/// stored as a preference; user entries win for the same registry. A missing
/// or undecodable preference means anonymous pulls, never an error.
pub struct RegistryCredentialProvisioner {
    prefs: Arc<dyn PreferenceStore>,
    static_credentials: AuthConfigs,
}

impl RegistryCredentialProvisioner {
    pub fn new(prefs: Arc<dyn PreferenceStore>, static_credentials: AuthConfigs) -> Self {
        Self {
            prefs,
            static_credentials,
        }
    }

    /// Credentials the user stored, or `None` when absent or unreadable.
    pub fn user_credentials(&self, user: &UserId) -> Option<AuthConfigs> {
        match self.stored_credentials(user) {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!("ignoring registry credentials of user {user}: {e}");
                None
            }
        }
    }

    /// Like [`Self::user_credentials`] but reports a stored value that cannot
    /// be read instead of treating it as absent.
    pub fn stored_credentials(&self, user: &UserId) -> Result<Option<AuthConfigs>, RuntimeError> {
        let prefs = self.prefs.find(user, DOCKER_CREDENTIALS_PREFERENCE)?;
        let Some(encoded) = prefs.get(DOCKER_CREDENTIALS_PREFERENCE) else {
            return Ok(None);
        };
        decode_credentials(encoded).map(Some).map_err(|reason| {
            RuntimeError::Infrastructure(format!(
                "stored registry credentials of user {user} are unreadable: {reason}"
            ))
        })
    }
}

/// Encodes credentials the way they are stored as a preference.
pub fn encode_credentials(credentials: &AuthConfigs) -> Result<String, RuntimeError> {
    let json = serde_json::to_vec(credentials).map_err(|e| {
        RuntimeError::InternalInfrastructure(format!("failed to encode credentials: {e}"))
    })?;
    Ok(general_purpose::STANDARD.encode(json))
}

fn decode_credentials(encoded: &str) -> Result<AuthConfigs, String> {
    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| format!("invalid base64: {e}"))?;
    serde_json::from_slice(&bytes).map_err(|e| format!("invalid JSON: {e}"))
}

impl Provisioner for RegistryCredentialProvisioner {
    fn name(&self) -> &'static str {
        "registry-credentials"
    }

    fn provision(
        &self,
        ctx: &ProvisionContext,
        model: &mut EnvironmentModel,
    ) -> Result<(), RuntimeError> {
        let mut credentials = model.registry_credentials.take().unwrap_or_default();
        credentials.merge(&self.static_credentials);
        if let Some(user) = self.user_credentials(&ctx.user_id) {
            credentials.merge(&user);
        }
        if credentials.is_empty() {
            debug!("no registry credentials for workspace {}", ctx.workspace_id);
        } else {
            debug!(
                "attaching credentials for {} registries to workspace {}",
                credentials.configs.len(),
                ctx.workspace_id
            );
            model.registry_credentials = Some(credentials);
        }
        Ok(())
    }
}
