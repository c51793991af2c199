//! Isolated execution scopes a user's workspaces may run in.

use crate::RuntimeError;
use drydock_schema::{UserId, WorkspaceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_ATTRIBUTE: &str = "default";
pub const PHASE_ATTRIBUTE: &str = "phase";
pub const ACTIVE_PHASE: &str = "Active";

const USERNAME_PLACEHOLDER: &str = "<username>";
const USERID_PLACEHOLDER: &str = "<userid>";
const WORKSPACEID_PLACEHOLDER: &str = "<workspaceid>";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NamespaceMeta {
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl NamespaceMeta {
    pub fn is_default(&self) -> bool {
        self.attributes.get(DEFAULT_ATTRIBUTE).is_some_and(|v| v == "true")
    }
}

pub trait NamespaceRegistry: Send + Sync {
    /// Namespaces `user` may run workspaces in.
    fn list(&self, user: &UserId) -> Result<Vec<NamespaceMeta>, RuntimeError>;
}

/// Fills the placeholders of a namespace template.
///
/// `<workspaceid>` is left as is when no workspace is given.
pub fn evaluate_namespace_template(
    template: &str,
    user: &UserId,
    workspace: Option<&WorkspaceId>,
) -> String {
    let name = template
        .replace(USERNAME_PLACEHOLDER, user.as_str())
        .replace(USERID_PLACEHOLDER, user.as_str());
    match workspace {
        Some(ws) => name.replace(WORKSPACEID_PLACEHOLDER, ws.as_str()),
        None => name,
    }
}

/// Namespaces known from configuration.
///
/// Configured namespaces are reported as active. The default namespace
/// derived from the template is only listed when it does not depend on the
/// workspace, since it cannot be named before a workspace exists.
#[derive(Debug, Clone, Default)]
pub struct StaticNamespaceRegistry {
    default_template: Option<String>,
    available: Vec<String>,
}

impl StaticNamespaceRegistry {
    pub fn new(default_template: Option<String>, available: Vec<String>) -> Self {
        Self {
            default_template: default_template.filter(|t| !t.trim().is_empty()),
            available,
        }
    }
}

impl NamespaceRegistry for StaticNamespaceRegistry {
    fn list(&self, user: &UserId) -> Result<Vec<NamespaceMeta>, RuntimeError> {
        let mut namespaces: Vec<NamespaceMeta> = Vec::new();
        let configured = self
            .available
            .iter()
            .map(String::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty());
        for name in configured {
            if namespaces.iter().any(|n| n.name == name) {
                continue;
            }
            namespaces.push(NamespaceMeta {
                name: name.to_owned(),
                attributes: BTreeMap::from([(
                    PHASE_ATTRIBUTE.to_owned(),
                    ACTIVE_PHASE.to_owned(),
                )]),
            });
        }

        let Some(template) = &self.default_template else {
            return Ok(namespaces);
        };
        if template.contains(WORKSPACEID_PLACEHOLDER) {
            return Ok(namespaces);
        }
        let name = evaluate_namespace_template(template, user, None).to_ascii_lowercase();
        match namespaces.iter_mut().find(|n| n.name == name) {
            Some(existing) => {
                existing
                    .attributes
                    .insert(DEFAULT_ATTRIBUTE.to_owned(), "true".to_owned());
            }
            None => namespaces.insert(
                0,
                NamespaceMeta {
                    name,
                    attributes: BTreeMap::from([(
                        DEFAULT_ATTRIBUTE.to_owned(),
                        "true".to_owned(),
                    )]),
                },
            ),
        }
        Ok(namespaces)
    }
}
