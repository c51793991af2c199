//! Recipe dialects and the dispatcher that selects one per workspace.
//!
//! The set of dialects is closed: each is a [`RecipeKind`] variant with its own
//! parsing module, and [`EnvironmentParser`] holds an explicit table from recipe
//! type to variant. Adding a dialect means one variant, one module, one table entry.

pub mod compose;
pub mod dockerfile;
pub mod dockerimage;

use crate::model::{server_label, EnvironmentModel};
use crate::recipe::{RecipeError, WorkspaceEnvironment};
use std::collections::BTreeMap;
use tracing::debug;

/// Machine attribute holding the memory limit in bytes.
pub const MEMORY_LIMIT_ATTRIBUTE: &str = "memoryLimitBytes";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecipeKind {
    DockerImage,
    Dockerfile,
    Compose,
}

impl RecipeKind {
    pub const ALL: [RecipeKind; 3] = [
        RecipeKind::DockerImage,
        RecipeKind::Dockerfile,
        RecipeKind::Compose,
    ];

    pub fn type_name(self) -> &'static str {
        match self {
            Self::DockerImage => dockerimage::RECIPE_TYPE,
            Self::Dockerfile => dockerfile::RECIPE_TYPE,
            Self::Compose => compose::RECIPE_TYPE,
        }
    }

    /// Parse with this dialect only; fails if the recipe declares another type.
    pub fn parse(self, env: &WorkspaceEnvironment) -> Result<EnvironmentModel, RecipeError> {
        match self {
            Self::DockerImage => dockerimage::parse(env),
            Self::Dockerfile => dockerfile::parse(env),
            Self::Compose => compose::parse(env),
        }
    }
}

/// Dispatches a workspace environment to the dialect matching its recipe type.
#[derive(Debug, Clone)]
pub struct EnvironmentParser {
    dialects: BTreeMap<&'static str, RecipeKind>,
}

impl Default for EnvironmentParser {
    fn default() -> Self {
        Self::with_kinds(&RecipeKind::ALL)
    }
}

impl EnvironmentParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// A dispatcher that only accepts the given dialects.
    pub fn with_kinds(kinds: &[RecipeKind]) -> Self {
        Self {
            dialects: kinds.iter().map(|k| (k.type_name(), *k)).collect(),
        }
    }

    pub fn supported_types(&self) -> Vec<String> {
        self.dialects.keys().map(|t| (*t).to_owned()).collect()
    }

    pub fn parse(&self, env: &WorkspaceEnvironment) -> Result<EnvironmentModel, RecipeError> {
        let recipe = &env.recipe;
        let recipe_type = recipe.recipe_type.trim();
        let Some(kind) = self.dialects.get(recipe_type).copied() else {
            return Err(RecipeError::UnsupportedType {
                received: recipe_type.to_owned(),
                supported: self.supported_types(),
            });
        };
        if recipe.content().is_none() && recipe.location().is_none() {
            return Err(RecipeError::Malformed(
                "recipe must contain a location or content".to_owned(),
            ));
        }

        let mut model = kind.parse(env)?;
        apply_machine_declarations(env, &mut model)?;
        model.validate()?;
        debug!(
            "parsed '{}' recipe into {} service(s), {} warning(s)",
            recipe_type,
            model.services.len(),
            model.warnings.len()
        );
        Ok(model)
    }
}

pub(crate) fn ensure_type(env: &WorkspaceEnvironment, expected: &str) -> Result<(), RecipeError> {
    if env.recipe.recipe_type.trim() == expected {
        Ok(())
    } else {
        Err(RecipeError::UnsupportedType {
            received: env.recipe.recipe_type.clone(),
            supported: vec![expected.to_owned()],
        })
    }
}

/// Name of the only machine of a single-container recipe.
pub(crate) fn single_machine(
    env: &WorkspaceEnvironment,
    recipe_type: &str,
) -> Result<String, RecipeError> {
    let mut names = env.machines.keys();
    match (names.next(), names.next()) {
        (Some(name), None) => Ok(name.clone()),
        _ => Err(RecipeError::UnsupportedMachineCount {
            recipe_type: recipe_type.to_owned(),
            machines: env.machine_names(),
        }),
    }
}

/// Project declared servers and attributes of each machine onto its service.
fn apply_machine_declarations(
    env: &WorkspaceEnvironment,
    model: &mut EnvironmentModel,
) -> Result<(), RecipeError> {
    for (machine_name, machine) in &env.machines {
        let Some(service) = model.services.get_mut(machine_name) else {
            return Err(RecipeError::Malformed(format!(
                "machine '{machine_name}' is declared but the recipe has no such service"
            )));
        };

        for (server_ref, server) in &machine.servers {
            server.validate(machine_name, server_ref)?;
            let port = server.normalized_port();
            service.add_expose(&port);
            service
                .labels
                .insert(server_label(&port, "ref"), server_ref.clone());
            if let Some(protocol) = &server.protocol {
                service
                    .labels
                    .insert(server_label(&port, "protocol"), protocol.clone());
            }
            if let Some(path) = &server.path {
                service
                    .labels
                    .insert(server_label(&port, "path"), path.clone());
            }
        }

        if let Some(raw) = machine.attributes.get(MEMORY_LIMIT_ATTRIBUTE) {
            let limit = raw.trim().parse::<u64>().map_err(|_| {
                RecipeError::Malformed(format!(
                    "value of attribute '{MEMORY_LIMIT_ATTRIBUTE}' of machine '{machine_name}' is illegal: '{raw}'"
                ))
            })?;
            service.mem_limit = Some(limit);
        }
    }
    Ok(())
}
