use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecipeError {
    #[error("failed to read workspace file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse workspace file: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error(
        "environment type '{received}' is not supported, supported environment types: {}",
        .supported.join(", ")
    )]
    UnsupportedType {
        received: String,
        supported: Vec<String>,
    },
    #[error(
        "environment of type '{recipe_type}' must contain exactly one machine, found: [{}]",
        .machines.join(", ")
    )]
    UnsupportedMachineCount {
        recipe_type: String,
        machines: Vec<String>,
    },
    #[error(
        "content type '{received}' of '{recipe_type}' recipe is not supported, supported: {}",
        .supported.join(", ")
    )]
    UnsupportedContentType {
        recipe_type: String,
        received: String,
        supported: Vec<String>,
    },
    #[error("failed to parse compose recipe: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
    #[error("malformed recipe: {0}")]
    Malformed(String),
}

impl RecipeError {
    /// The recipe type or the machine-count precondition of a dialect was violated.
    pub fn is_unsupported(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedType { .. } | Self::UnsupportedMachineCount { .. }
        )
    }

    /// The workspace file could not be read at all.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// The recipe content could not be decoded or is invalid.
    pub fn is_malformed(&self) -> bool {
        !self.is_unsupported() && !self.is_io()
    }
}

/// Declarative input describing how to build or run a workspace's containers.
///
/// Exactly one of `content` and `location` is meaningful for a given type.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Recipe {
    #[serde(rename = "type")]
    pub recipe_type: String,
    #[serde(default)]
    pub content_type: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl Recipe {
    pub fn new(recipe_type: &str, content_type: &str) -> Self {
        Self {
            recipe_type: recipe_type.to_owned(),
            content_type: content_type.to_owned(),
            content: None,
            location: None,
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: &str) -> Self {
        self.content = Some(content.to_owned());
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_owned());
        self
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref().filter(|l| !l.trim().is_empty())
    }
}

/// A server a machine exposes, keyed by its reference name in [`MachineDeclaration::servers`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// `8080` or `8080/udp`; a bare port means tcp.
    pub port: String,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
}

impl ServerConfig {
    pub fn new(port: &str, protocol: Option<&str>, path: Option<&str>) -> Self {
        Self {
            port: port.to_owned(),
            protocol: protocol.map(str::to_owned),
            path: path.map(str::to_owned),
        }
    }

    /// Checks `port` against `<1-65535>[/tcp|/udp]` without leading zeros and
    /// `protocol`, when given, against `[a-z][a-z0-9+.-]*`.
    pub fn validate(&self, machine: &str, server_ref: &str) -> Result<(), RecipeError> {
        if !is_valid_port(&self.port) {
            return Err(RecipeError::Malformed(format!(
                "machine '{machine}' contains server '{server_ref}' with invalid port '{}'",
                self.port
            )));
        }
        if let Some(protocol) = &self.protocol {
            if !is_valid_protocol(protocol) {
                return Err(RecipeError::Malformed(format!(
                    "machine '{machine}' contains server '{server_ref}' with invalid protocol '{protocol}'"
                )));
            }
        }
        Ok(())
    }

    /// Port with an explicit transport suffix.
    pub fn normalized_port(&self) -> String {
        let port = self.port.trim();
        if port.contains('/') {
            port.to_owned()
        } else {
            format!("{port}/tcp")
        }
    }
}

fn is_valid_port(port: &str) -> bool {
    let (number, transport) = match port.split_once('/') {
        Some((number, transport)) => (number, transport),
        None => (port, "tcp"),
    };
    matches!(transport, "tcp" | "udp")
        && !number.starts_with('0')
        && number.bytes().all(|b| b.is_ascii_digit())
        && number.parse::<u16>().is_ok_and(|p| p != 0)
}

fn is_valid_protocol(protocol: &str) -> bool {
    let mut chars = protocol.chars();
    chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "+.-".contains(c))
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MachineDeclaration {
    #[serde(default)]
    pub servers: BTreeMap<String, ServerConfig>,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// One recipe plus the named machines it is expected to produce.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WorkspaceEnvironment {
    pub recipe: Recipe,
    #[serde(default)]
    pub machines: BTreeMap<String, MachineDeclaration>,
}

impl WorkspaceEnvironment {
    pub fn new(recipe: Recipe) -> Self {
        Self {
            recipe,
            machines: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_machine(mut self, name: &str, machine: MachineDeclaration) -> Self {
        self.machines.insert(name.to_owned(), machine);
        self
    }

    pub fn machine_names(&self) -> Vec<String> {
        self.machines.keys().cloned().collect()
    }
}

pub fn parse_workspace_str(input: &str) -> Result<WorkspaceEnvironment, RecipeError> {
    Ok(toml::from_str(input)?)
}

pub fn parse_workspace_file(path: impl AsRef<Path>) -> Result<WorkspaceEnvironment, RecipeError> {
    let content = fs::read_to_string(path)?;
    parse_workspace_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_workspace() {
        let input = r#"
[recipe]
type = "compose"
content_type = "application/x-yaml"
content = """
services:
  dev:
    image: eclipse/ubuntu_jdk8
"""

[machines.dev.attributes]
memoryLimitBytes = "2147483648"

[machines.dev.servers.tomcat]
port = "8080"
protocol = "http"
path = "/api"
"#;
        let ws = parse_workspace_str(input).expect("should parse");
        assert_eq!(ws.recipe.recipe_type, "compose");
        assert_eq!(ws.recipe.content_type, "application/x-yaml");
        assert!(ws.recipe.content().is_some());
        assert!(ws.recipe.location().is_none());
        let dev = &ws.machines["dev"];
        assert_eq!(dev.attributes["memoryLimitBytes"], "2147483648");
        assert_eq!(dev.servers["tomcat"].protocol.as_deref(), Some("http"));
    }

    #[test]
    fn parses_minimal_workspace() {
        let input = r#"
[recipe]
type = "dockerimage"
location = "eclipse/ubuntu_jdk8"
"#;
        let ws = parse_workspace_str(input).expect("should parse");
        assert!(ws.machines.is_empty());
        assert_eq!(ws.recipe.content_type, "");
        assert_eq!(ws.recipe.location(), Some("eclipse/ubuntu_jdk8"));
    }

    #[test]
    fn rejects_unknown_recipe_fields() {
        let input = r#"
[recipe]
type = "dockerimage"
location = "eclipse/ubuntu_jdk8"
tag = "latest"
"#;
        assert!(parse_workspace_str(input).is_err());
    }

    #[test]
    fn blank_content_counts_as_absent() {
        let recipe = Recipe::new("dockerfile", "text/x-dockerfile").with_content("   ");
        assert!(recipe.content().is_none());
    }

    #[test]
    fn normalizes_server_ports() {
        assert_eq!(ServerConfig::new("8080", None, None).normalized_port(), "8080/tcp");
        assert_eq!(
            ServerConfig::new("8080/udp", None, None).normalized_port(),
            "8080/udp"
        );
    }

    #[test]
    fn error_classification() {
        let unsupported = RecipeError::UnsupportedType {
            received: "helm".to_owned(),
            supported: vec!["compose".to_owned()],
        };
        assert!(unsupported.is_unsupported());
        assert!(unsupported.to_string().contains("'helm'"));
        assert!(unsupported.to_string().contains("compose"));

        let malformed = RecipeError::Malformed("bad".to_owned());
        assert!(malformed.is_malformed());
        assert!(!malformed.is_io());

        let missing = RecipeError::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(missing.is_io());
        assert!(!missing.is_malformed());
        assert!(!missing.is_unsupported());
    }

    #[test]
    fn server_ports_must_be_well_formed() {
        for port in ["8080", "8080/tcp", "9090/udp", "1", "65535/tcp"] {
            assert!(
                ServerConfig::new(port, None, None).validate("dev", "ref").is_ok(),
                "{port} should be accepted"
            );
        }
        for port in [
            "0", "0123", "012/tcp", "8080/pct", "8080/pdu", "/tcp", "tcp", "", "8080/tcp1",
            "8080/tcpp", "8080tcp", "8080/tc", "8080/ud", "8080/udpp", "8080/udp/", "8080/tcp/",
            "8080/tcp/udp", "8080/tcp/tcp", "8080/tcp/8080", "65536", "+80",
        ] {
            let err = ServerConfig::new(port, None, None)
                .validate("machine1", "ref")
                .unwrap_err();
            assert!(err.is_malformed());
            assert!(
                err.to_string().contains("machine 'machine1'"),
                "{port} should be rejected"
            );
        }
    }

    #[test]
    fn server_protocols_must_be_well_formed() {
        for protocol in ["http", "https", "protocol", "ws", "svn+ssh", "a1.b-c"] {
            assert!(ServerConfig::new("8080/tcp", Some(protocol), None)
                .validate("dev", "ref")
                .is_ok());
        }
        for protocol in ["", "http!", "2http", "http:", "HTTP"] {
            let err = ServerConfig::new("8080/tcp", Some(protocol), None)
                .validate("dev", "ref")
                .unwrap_err();
            assert!(err.to_string().contains("invalid protocol"));
        }
    }

    #[test]
    fn reads_workspace_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("workspace.toml");
        fs::write(
            &path,
            "[recipe]\ntype = \"dockerimage\"\nlocation = \"alpine\"\n",
        )
        .unwrap();
        let ws = parse_workspace_file(&path).unwrap();
        assert_eq!(ws.recipe.location(), Some("alpine"));
    }
}
