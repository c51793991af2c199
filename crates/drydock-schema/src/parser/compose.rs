//! Multi-service compose descriptor.
//!
//! Decoding is lenient about fields drydock does not translate: each one is
//! dropped with a warning instead of failing the parse.

use super::ensure_type;
use crate::model::{BuildContext, EnvironmentModel, Service};
use crate::recipe::{RecipeError, WorkspaceEnvironment};
use crate::warning::Warning;
use serde::Deserialize;
use serde_yaml_ng::Value;
use std::collections::BTreeMap;

pub const RECIPE_TYPE: &str = "compose";
pub const CONTENT_TYPES: &[&str] = &["application/x-yaml", "text/yaml", "text/x-yaml"];

/// Top-level keys that are accepted and silently ignored.
const IGNORED_TOP_LEVEL: &[&str] = &["version"];

#[derive(Debug, Deserialize)]
struct ComposeFile {
    #[serde(default)]
    services: BTreeMap<String, ComposeService>,
    #[serde(flatten)]
    other: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ComposeService {
    image: Option<String>,
    build: Option<ComposeBuild>,
    container_name: Option<String>,
    command: Option<StringOrList>,
    entrypoint: Option<StringOrList>,
    environment: Option<ListOrMap>,
    #[serde(default)]
    links: Vec<String>,
    depends_on: Option<ListOrKeys>,
    #[serde(default)]
    ports: Vec<Scalar>,
    #[serde(default)]
    volumes: Vec<String>,
    #[serde(default)]
    expose: Vec<Scalar>,
    labels: Option<ListOrMap>,
    mem_limit: Option<Scalar>,
    #[serde(flatten)]
    other: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ComposeBuild {
    Context(String),
    Block(ComposeBuildBlock),
}

#[derive(Debug, Deserialize)]
struct ComposeBuildBlock {
    context: Option<String>,
    dockerfile: Option<String>,
    args: Option<ListOrMap>,
    #[serde(flatten)]
    other: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Flag(b) => b.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrList {
    Text(String),
    List(Vec<String>),
}

impl StringOrList {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::Text(s) => s.split_whitespace().map(str::to_owned).collect(),
            Self::List(v) => v,
        }
    }
}

/// `KEY=VALUE` list or mapping, as used by `environment`, `labels` and `args`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListOrMap {
    List(Vec<String>),
    Map(BTreeMap<String, Option<Scalar>>),
}

impl ListOrMap {
    fn into_map(self) -> BTreeMap<String, String> {
        match self {
            Self::List(entries) => entries
                .into_iter()
                .map(|entry| match entry.split_once('=') {
                    Some((k, v)) => (k.to_owned(), v.to_owned()),
                    None => (entry, String::new()),
                })
                .collect(),
            Self::Map(map) => map
                .into_iter()
                .map(|(k, v)| (k, v.map(Scalar::into_string).unwrap_or_default()))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListOrKeys {
    List(Vec<String>),
    Map(BTreeMap<String, Value>),
}

impl ListOrKeys {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::List(v) => v,
            Self::Map(m) => m.into_keys().collect(),
        }
    }
}

pub fn parse(env: &WorkspaceEnvironment) -> Result<EnvironmentModel, RecipeError> {
    ensure_type(env, RECIPE_TYPE)?;

    let recipe = &env.recipe;
    let content_type = recipe.content_type.trim();
    if !CONTENT_TYPES.contains(&content_type) {
        return Err(RecipeError::UnsupportedContentType {
            recipe_type: RECIPE_TYPE.to_owned(),
            received: recipe.content_type.clone(),
            supported: CONTENT_TYPES.iter().map(|t| (*t).to_owned()).collect(),
        });
    }
    let Some(content) = recipe.content() else {
        return Err(RecipeError::Malformed(format!(
            "compose recipe must be provided as content, location '{}' has to be fetched first",
            recipe.location().unwrap_or_default()
        )));
    };

    let file: ComposeFile = serde_yaml_ng::from_str(content)?;
    if file.services.is_empty() {
        return Err(RecipeError::Malformed(
            "compose recipe declares no services".to_owned(),
        ));
    }

    let mut model = EnvironmentModel::new();
    for key in file.other.keys() {
        if !IGNORED_TOP_LEVEL.contains(&key.as_str()) {
            model.add_warning(Warning::unsupported_field("compose recipe", key));
        }
    }
    for (name, raw) in file.services {
        let service = convert_service(&name, raw, &mut model.warnings)?;
        model.services.insert(name, service);
    }
    Ok(model)
}

fn convert_service(
    name: &str,
    raw: ComposeService,
    warnings: &mut Vec<Warning>,
) -> Result<Service, RecipeError> {
    let scope = format!("service '{name}'");
    for key in raw.other.keys() {
        warnings.push(Warning::unsupported_field(&scope, key));
    }

    let build = match raw.build {
        None => None,
        Some(ComposeBuild::Context(context)) => Some(BuildContext::from_context(&context)),
        Some(ComposeBuild::Block(block)) => {
            for key in block.other.keys() {
                warnings.push(Warning::unsupported_field(&format!("build of {scope}"), key));
            }
            let Some(context) = block.context.filter(|c| !c.trim().is_empty()) else {
                return Err(RecipeError::Malformed(format!(
                    "build of {scope} must declare a context"
                )));
            };
            Some(BuildContext {
                context: Some(context),
                dockerfile: block.dockerfile,
                dockerfile_content: None,
                args: block.args.map(ListOrMap::into_map).unwrap_or_default(),
            })
        }
    };

    Ok(Service {
        image: raw.image,
        build,
        container_name: raw.container_name,
        command: raw.command.map(StringOrList::into_vec).unwrap_or_default(),
        entrypoint: raw.entrypoint.map(StringOrList::into_vec).unwrap_or_default(),
        environment: raw.environment.map(ListOrMap::into_map).unwrap_or_default(),
        links: raw.links,
        depends_on: raw.depends_on.map(ListOrKeys::into_vec).unwrap_or_default(),
        ports: raw.ports.into_iter().map(Scalar::into_string).collect(),
        volumes: raw.volumes,
        expose: raw.expose.into_iter().map(Scalar::into_string).collect(),
        labels: raw.labels.map(ListOrMap::into_map).unwrap_or_default(),
        dns: Vec::new(),
        mem_limit: raw
            .mem_limit
            .map(|limit| memory_limit(&scope, limit))
            .transpose()?,
    })
}

/// `mem_limit` as bytes, from an integer or a size such as `512m` or `1.5g`.
fn memory_limit(scope: &str, raw: Scalar) -> Result<u64, RecipeError> {
    let invalid = |value: &str| {
        RecipeError::Malformed(format!(
            "mem_limit of {scope} is not a byte size: '{value}'"
        ))
    };
    match raw {
        Scalar::Integer(bytes) => u64::try_from(bytes).map_err(|_| invalid(&bytes.to_string())),
        Scalar::Text(text) => parse_byte_size(&text).ok_or_else(|| invalid(&text)),
        other => Err(invalid(&other.into_string())),
    }
}

fn parse_byte_size(text: &str) -> Option<u64> {
    let lower = text.trim().to_ascii_lowercase();
    let unit_start = lower
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(lower.len());
    let (number, unit) = lower.split_at(unit_start);
    let multiplier: u64 = match unit.trim() {
        "" | "b" => 1,
        "k" | "kb" => 1 << 10,
        "m" | "mb" => 1 << 20,
        "g" | "gb" => 1 << 30,
        _ => return None,
    };
    if let Ok(whole) = number.parse::<u64>() {
        return whole.checked_mul(multiplier);
    }
    let fractional = number.parse::<f64>().ok().filter(|n| n.is_finite())?;
    let bytes = (fractional * multiplier as f64).round();
    (bytes >= 0.0 && bytes < u64::MAX as f64).then_some(bytes as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::EnvironmentParser;
    use crate::recipe::Recipe;
    use crate::warning::WARNING_UNSUPPORTED_RECIPE_FIELD;

    fn env(content: &str) -> WorkspaceEnvironment {
        WorkspaceEnvironment::new(Recipe::new(RECIPE_TYPE, "application/x-yaml").with_content(content))
    }

    #[test]
    fn parses_image_and_build_services() {
        let model = parse(&env(
            r#"
services:
  db:
    image: postgres:16
    environment:
      POSTGRES_PASSWORD: secret
    expose:
      - 5432
  app:
    build:
      context: ./app
      dockerfile: Dockerfile.dev
      args:
        RELEASE: "1"
    depends_on:
      - db
    command: ["cargo", "run"]
    ports:
      - "8080:8080"
"#,
        ))
        .unwrap();

        assert_eq!(model.services.len(), 2);
        let db = &model.services["db"];
        assert_eq!(db.image.as_deref(), Some("postgres:16"));
        assert!(db.build.is_none());
        assert_eq!(db.environment["POSTGRES_PASSWORD"], "secret");
        assert_eq!(db.expose, vec!["5432"]);

        let app = &model.services["app"];
        assert!(app.image.is_none());
        let build = app.build.as_ref().unwrap();
        assert_eq!(build.context.as_deref(), Some("./app"));
        assert_eq!(build.dockerfile.as_deref(), Some("Dockerfile.dev"));
        assert_eq!(build.args["RELEASE"], "1");
        assert_eq!(app.depends_on, vec!["db"]);
        assert_eq!(app.command, vec!["cargo", "run"]);
        assert_eq!(app.ports, vec!["8080:8080"]);
        assert!(model.warnings.is_empty());
    }

    #[test]
    fn build_without_args_yields_empty_map() {
        let model = parse(&env(
            r"
services:
  app:
    build:
      context: .
",
        ))
        .unwrap();
        let build = model.services["app"].build.as_ref().unwrap();
        assert!(build.args.is_empty());
    }

    #[test]
    fn args_are_not_shared_between_services() {
        let model = parse(&env(
            r"
services:
  first:
    build:
      context: ./first
      args:
        - ONLY_FIRST=yes
  second:
    build:
      context: ./second
",
        ))
        .unwrap();
        assert_eq!(
            model.services["first"].build.as_ref().unwrap().args["ONLY_FIRST"],
            "yes"
        );
        assert!(model.services["second"]
            .build
            .as_ref()
            .unwrap()
            .args
            .is_empty());
    }

    #[test]
    fn build_as_plain_string_is_context() {
        let model = parse(&env("services:\n  app:\n    build: ./app\n")).unwrap();
        let build = model.services["app"].build.as_ref().unwrap();
        assert_eq!(build.context.as_deref(), Some("./app"));
    }

    #[test]
    fn environment_list_form_and_string_command() {
        let model = parse(&env(
            r"
services:
  dev:
    image: alpine
    environment:
      - MODE=dev
      - EMPTY
    command: tail -f /dev/null
    depends_on:
      cache:
        condition: service_started
",
        ))
        .unwrap();
        let dev = &model.services["dev"];
        assert_eq!(dev.environment["MODE"], "dev");
        assert_eq!(dev.environment["EMPTY"], "");
        assert_eq!(dev.command, vec!["tail", "-f", "/dev/null"]);
        assert_eq!(dev.depends_on, vec!["cache"]);
    }

    #[test]
    fn unsupported_fields_become_warnings() {
        let model = parse(&env(
            r"
version: '3'
networks:
  default: {}
services:
  dev:
    image: alpine
    healthcheck:
      test: ['CMD', 'true']
",
        ))
        .unwrap();
        assert_eq!(model.warnings.len(), 2);
        assert!(model
            .warnings
            .iter()
            .all(|w| w.code == WARNING_UNSUPPORTED_RECIPE_FIELD));
        assert!(model.warnings.iter().any(|w| w.message.contains("networks")));
        assert!(model
            .warnings
            .iter()
            .any(|w| w.message.contains("healthcheck") && w.message.contains("'dev'")));
    }

    #[test]
    fn invalid_yaml_is_malformed() {
        let err = parse(&env("services: [unclosed")).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn unsupported_content_type_lists_supported() {
        let mut e = env("services: {}");
        e.recipe.content_type = "text/x-dockerfile".to_owned();
        let err = parse(&e).unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("application/x-yaml"));
    }

    #[test]
    fn location_only_recipe_is_malformed() {
        let e = WorkspaceEnvironment::new(
            Recipe::new(RECIPE_TYPE, "application/x-yaml").with_location("https://host/compose.yml"),
        );
        let err = parse(&e).unwrap_err();
        assert!(err.to_string().contains("https://host/compose.yml"));
    }

    #[test]
    fn mem_limit_accepts_byte_sizes() {
        let model = parse(&env(
            "services:\n  a:\n    image: alpine\n    mem_limit: 512m\n  b:\n    image: alpine\n    mem_limit: 1073741824\n  c:\n    image: alpine\n    mem_limit: 1.5G\n",
        ))
        .unwrap();
        assert_eq!(model.services["a"].mem_limit, Some(512 * 1024 * 1024));
        assert_eq!(model.services["b"].mem_limit, Some(1_073_741_824));
        assert_eq!(model.services["c"].mem_limit, Some(1_610_612_736));
    }

    #[test]
    fn unreadable_mem_limit_names_the_field() {
        let err = parse(&env(
            "services:\n  db:\n    image: postgres\n    mem_limit: lots\n",
        ))
        .unwrap_err();
        assert!(err.is_malformed());
        assert!(err.to_string().contains("mem_limit of service 'db'"));
        assert!(err.to_string().contains("'lots'"));
    }

    #[test]
    fn byte_size_units() {
        assert_eq!(parse_byte_size("100"), Some(100));
        assert_eq!(parse_byte_size("100b"), Some(100));
        assert_eq!(parse_byte_size("2k"), Some(2048));
        assert_eq!(parse_byte_size("3MB"), Some(3 * 1024 * 1024));
        assert_eq!(parse_byte_size("1g"), Some(1 << 30));
        assert_eq!(parse_byte_size("12t"), None);
        assert_eq!(parse_byte_size("m"), None);
        assert_eq!(parse_byte_size(""), None);
    }

    #[test]
    fn empty_services_is_malformed() {
        assert!(parse(&env("version: '2'\n")).unwrap_err().is_malformed());
    }

    #[test]
    fn build_block_without_context_is_malformed() {
        let err = parse(&env("services:\n  app:\n    build:\n      dockerfile: Dockerfile\n"))
            .unwrap_err();
        assert!(err.to_string().contains("must declare a context"));
    }

    #[test]
    fn dispatcher_rejects_service_with_both_image_and_build() {
        let err = EnvironmentParser::new()
            .parse(&env(
                "services:\n  app:\n    image: alpine\n    build: .\n",
            ))
            .unwrap_err();
        assert!(err.to_string().contains("both image and build"));
    }
}
