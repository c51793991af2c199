//! Bare image reference: one machine running a prebuilt image.

use super::{ensure_type, single_machine};
use crate::model::{EnvironmentModel, Service};
use crate::recipe::{RecipeError, WorkspaceEnvironment};
use crate::warning::{Warning, WARNING_RECIPE_CONTENT_IGNORED};

pub const RECIPE_TYPE: &str = "dockerimage";

pub fn parse(env: &WorkspaceEnvironment) -> Result<EnvironmentModel, RecipeError> {
    ensure_type(env, RECIPE_TYPE)?;
    let machine = single_machine(env, RECIPE_TYPE)?;

    let recipe = &env.recipe;
    let mut model = EnvironmentModel::new();
    let image = match (recipe.location(), recipe.content()) {
        (Some(location), content) => {
            if content.is_some() {
                model.add_warning(Warning::new(
                    WARNING_RECIPE_CONTENT_IGNORED,
                    "image recipe declares both location and content, location is used",
                ));
            }
            location.trim()
        }
        (None, Some(content)) => content.trim(),
        (None, None) => {
            return Err(RecipeError::Malformed(
                "image recipe must reference an image".to_owned(),
            ))
        }
    };

    model.services.insert(machine, Service::from_image(image));
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::{MachineDeclaration, Recipe};

    fn env_with(machines: &[&str]) -> WorkspaceEnvironment {
        let mut env = WorkspaceEnvironment::new(
            Recipe::new(RECIPE_TYPE, "").with_location("eclipse/ubuntu_jdk8"),
        );
        for m in machines {
            env = env.with_machine(m, MachineDeclaration::default());
        }
        env
    }

    #[test]
    fn single_machine_gets_image() {
        let model = parse(&env_with(&["dev-machine"])).unwrap();
        assert_eq!(model.services.len(), 1);
        let service = &model.services["dev-machine"];
        assert_eq!(service.image.as_deref(), Some("eclipse/ubuntu_jdk8"));
        assert!(service.build.is_none());
    }

    #[test]
    fn zero_machines_is_unsupported() {
        let err = parse(&env_with(&[])).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn two_machines_is_unsupported_and_names_them() {
        let err = parse(&env_with(&["machine1", "machine2"])).unwrap_err();
        assert!(err.is_unsupported());
        let msg = err.to_string();
        assert!(msg.contains("machine1"));
        assert!(msg.contains("machine2"));
    }

    #[test]
    fn other_type_is_unsupported() {
        let mut env = env_with(&["dev"]);
        env.recipe.recipe_type = "compose".to_owned();
        assert!(parse(&env).unwrap_err().is_unsupported());
    }

    #[test]
    fn content_is_used_when_location_is_absent() {
        let env = WorkspaceEnvironment::new(Recipe::new(RECIPE_TYPE, "").with_content(" alpine \n"))
            .with_machine("dev", MachineDeclaration::default());
        let model = parse(&env).unwrap();
        assert_eq!(model.services["dev"].image.as_deref(), Some("alpine"));
        assert!(model.warnings.is_empty());
    }

    #[test]
    fn both_location_and_content_warns() {
        let mut env = env_with(&["dev"]);
        env.recipe.content = Some("busybox".to_owned());
        let model = parse(&env).unwrap();
        assert_eq!(
            model.services["dev"].image.as_deref(),
            Some("eclipse/ubuntu_jdk8")
        );
        assert_eq!(model.warnings.len(), 1);
        assert_eq!(model.warnings[0].code, WARNING_RECIPE_CONTENT_IGNORED);
    }
}
