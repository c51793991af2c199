pub mod completions;
pub mod convert;
pub mod credentials;
pub mod namespaces;
pub mod parse;
pub mod up;

use drydock_core::{CoreError, Engine, InfraConfig, JsonFilePreferenceStore};
use drydock_schema::{parse_workspace_file, UserId, Warning, WorkspaceEnvironment};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_RECIPE_ERROR: u8 = 2;
pub const EXIT_CONFIG_ERROR: u8 = 3;

/// Everything a command needs, built once from the global flags.
pub struct Context {
    pub engine: Engine,
    pub prefs: JsonFilePreferenceStore,
    pub user: UserId,
}

impl Context {
    pub fn load(config: Option<&Path>, prefs_dir: &Path, user: &str) -> Result<Self, String> {
        let config = InfraConfig::load_or_default(config).map_err(|e| e.to_string())?;
        let prefs = JsonFilePreferenceStore::new(prefs_dir);
        let engine = Engine::new(config, Arc::new(prefs.clone()));
        debug!(
            "user {user}, preferences in {}, recipe types: {}",
            prefs_dir.display(),
            engine.supported_recipe_types().join(", ")
        );
        Ok(Self {
            engine,
            prefs,
            user: UserId::new(user),
        })
    }
}

pub fn load_workspace(path: &Path) -> Result<WorkspaceEnvironment, String> {
    parse_workspace_file(path)
        .map_err(|e| format!("{} ({})", CoreError::from(e), path.display()))
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn print_warnings(warnings: &[Warning]) {
    use console::Style;
    let style = Style::new().yellow();
    for warning in warnings {
        eprintln!("{} {warning}", style.apply_to("warning:"));
    }
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .expect("valid template")
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    pb.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
    pb.finish_with_message(format!("✗ {msg}"));
}

pub fn colorize_status(status: &str) -> String {
    use console::Style;
    match status {
        "RUNNING" => Style::new().green().apply_to(status).to_string(),
        "STOPPED" => Style::new().red().apply_to(status).to_string(),
        "UNKNOWN" => Style::new().yellow().apply_to(status).to_string(),
        other => other.to_owned(),
    }
}
