//! Workspace recipes, the normalized environment model, and recipe parsing for Drydock.
//!
//! This crate defines the schema layer: workspace environment files (`WorkspaceEnvironment`)
//! carrying a `Recipe` and machine declarations, the backend-agnostic `EnvironmentModel`
//! every recipe dialect is parsed into, non-fatal `Warning`s, registry `AuthConfigs`, and
//! the `EnvironmentParser` dispatcher with one parser per supported recipe dialect.

pub mod auth;
pub mod model;
pub mod parser;
pub mod recipe;
pub mod types;
pub mod warning;

pub use auth::{AuthConfig, AuthConfigs, DOCKER_HUB_REGISTRY};
pub use model::{server_label, BuildContext, EnvironmentModel, Service, SERVER_LABEL_PREFIX};
pub use parser::{EnvironmentParser, RecipeKind};
pub use recipe::{
    parse_workspace_file, parse_workspace_str, MachineDeclaration, Recipe, RecipeError,
    ServerConfig, WorkspaceEnvironment,
};
pub use types::{UserId, WorkspaceId};
pub use warning::Warning;
