//! Workspace pipeline orchestration for Drydock.
//!
//! This crate ties recipe parsing, provisioning, backend conversion, and server
//! resolution together into the `Engine`, the central API for preparing and
//! starting workspaces and querying their servers. It also owns the TOML
//! `InfraConfig` loaded once at startup and a file-backed preference store.

pub mod config;
pub mod engine;
pub mod preferences;

pub use config::InfraConfig;
pub use engine::{Engine, PreparedRuntime};
pub use preferences::JsonFilePreferenceStore;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("recipe error: {0}")]
    Recipe(#[from] drydock_schema::RecipeError),
    #[error("runtime error: {0}")]
    Runtime(#[from] drydock_runtime::RuntimeError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    pub fn is_recipe_error(&self) -> bool {
        matches!(self, Self::Recipe(_))
    }

    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}
