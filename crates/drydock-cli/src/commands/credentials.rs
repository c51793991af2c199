use super::{json_pretty, Context, EXIT_SUCCESS};
use console::Style;
use drydock_runtime::provision::{
    encode_credentials, RegistryCredentialProvisioner, DOCKER_CREDENTIALS_PREFERENCE,
};
use drydock_schema::{AuthConfig, AuthConfigs};
use std::sync::Arc;

pub struct NewCredential<'a> {
    pub registry: &'a str,
    pub username: &'a str,
    pub password: &'a str,
}

/// Adds or replaces one registry entry in the user's stored credentials.
///
/// Stored credentials that cannot be decoded are only overwritten with `force`.
pub fn run(
    ctx: &Context,
    entry: &NewCredential<'_>,
    force: bool,
    json: bool,
) -> Result<u8, String> {
    let reader =
        RegistryCredentialProvisioner::new(Arc::new(ctx.prefs.clone()), AuthConfigs::new());
    let mut credentials = match reader.stored_credentials(&ctx.user) {
        Ok(stored) => stored.unwrap_or_default(),
        Err(e) if force => {
            eprintln!(
                "{} {e}; replacing them",
                Style::new().yellow().apply_to("warning:")
            );
            AuthConfigs::new()
        }
        Err(e) => return Err(format!("{e}; rerun with --force to replace them")),
    };
    credentials.insert(
        entry.registry,
        AuthConfig {
            username: entry.username.to_owned(),
            password: entry.password.to_owned(),
        },
    );

    let encoded = encode_credentials(&credentials).map_err(|e| e.to_string())?;
    ctx.prefs
        .set(&ctx.user, DOCKER_CREDENTIALS_PREFERENCE, &encoded)
        .map_err(|e| e.to_string())?;

    let registries: Vec<&String> = credentials.configs.keys().collect();
    if json {
        println!("{}", json_pretty(&registries)?);
    } else {
        println!(
            "stored credentials for {} registr{} of user {}",
            registries.len(),
            if registries.len() == 1 { "y" } else { "ies" },
            ctx.user
        );
    }
    Ok(EXIT_SUCCESS)
}
