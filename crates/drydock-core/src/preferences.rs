use drydock_runtime::preferences::filter_prefs;
use drydock_runtime::{PreferenceStore, RuntimeError};
use drydock_schema::UserId;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Preferences stored as one JSON object per user in `<dir>/<user>.json`.
#[derive(Debug, Clone)]
pub struct JsonFilePreferenceStore {
    dir: PathBuf,
}

impl JsonFilePreferenceStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn user_file(&self, user: &UserId) -> Result<PathBuf, RuntimeError> {
        let name = user.as_str();
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(RuntimeError::Infrastructure(format!(
                "invalid user id '{name}'"
            )));
        }
        Ok(self.dir.join(format!("{name}.json")))
    }

    fn read(&self, user: &UserId) -> Result<Option<BTreeMap<String, String>>, RuntimeError> {
        let path = self.user_file(user)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        serde_json::from_str(&content).map(Some).map_err(|e| {
            RuntimeError::Infrastructure(format!(
                "invalid preferences in {}: {e}",
                path.display()
            ))
        })
    }

    pub fn set(&self, user: &UserId, key: &str, value: &str) -> Result<(), RuntimeError> {
        let mut prefs = self.read(user)?.unwrap_or_default();
        prefs.insert(key.to_owned(), value.to_owned());
        let content = serde_json::to_string_pretty(&prefs).map_err(|e| {
            RuntimeError::InternalInfrastructure(format!("failed to encode preferences: {e}"))
        })?;
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.user_file(user)?, content)?;
        Ok(())
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn find(
        &self,
        user: &UserId,
        key_filter: &str,
    ) -> Result<BTreeMap<String, String>, RuntimeError> {
        Ok(filter_prefs(self.read(user)?.as_ref(), key_filter))
    }
}
