use serde::{Deserialize, Serialize};
use std::fmt;

/// A recipe field that drydock does not translate was present and got dropped.
pub const WARNING_UNSUPPORTED_RECIPE_FIELD: u32 = 4100;
/// Both `content` and `location` were set; `location` was used.
pub const WARNING_RECIPE_CONTENT_IGNORED: u32 = 4101;

/// Non-fatal notice produced while parsing or provisioning.
///
/// Warnings are data: they ride along with the environment model into the
/// runtime object and are reported next to a successful result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Warning {
    pub code: u32,
    pub message: String,
}

impl Warning {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn unsupported_field(scope: &str, field: &str) -> Self {
        Self::new(
            WARNING_UNSUPPORTED_RECIPE_FIELD,
            format!("{scope} declares unsupported field '{field}', it is ignored"),
        )
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}
