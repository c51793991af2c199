use crate::RuntimeError;
use drydock_schema::UserId;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

/// User-scoped key/value preferences owned by an external service.
pub trait PreferenceStore: Send + Sync {
    /// Preferences of `user` whose key starts with `key_filter`.
    ///
    /// Returns an empty map when nothing is stored.
    fn find(
        &self,
        user: &UserId,
        key_filter: &str,
    ) -> Result<BTreeMap<String, String>, RuntimeError>;
}

#[derive(Default)]
pub struct InMemoryPreferenceStore {
    prefs: RwLock<HashMap<UserId, BTreeMap<String, String>>>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, user: &UserId, key: &str, value: &str) -> Result<(), RuntimeError> {
        let mut prefs = self
            .prefs
            .write()
            .map_err(|e| RuntimeError::Infrastructure(format!("preference lock poisoned: {e}")))?;
        prefs
            .entry(user.clone())
            .or_default()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

impl PreferenceStore for InMemoryPreferenceStore {
    fn find(
        &self,
        user: &UserId,
        key_filter: &str,
    ) -> Result<BTreeMap<String, String>, RuntimeError> {
        let prefs = self
            .prefs
            .read()
            .map_err(|e| RuntimeError::Infrastructure(format!("preference lock poisoned: {e}")))?;
        Ok(filter_prefs(prefs.get(user), key_filter))
    }
}

pub fn filter_prefs(
    prefs: Option<&BTreeMap<String, String>>,
    key_filter: &str,
) -> BTreeMap<String, String> {
    prefs
        .map(|p| {
            p.iter()
                .filter(|(k, _)| k.starts_with(key_filter))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .unwrap_or_default()
}
