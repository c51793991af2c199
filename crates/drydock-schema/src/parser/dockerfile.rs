//! Single Dockerfile: one machine whose image is built from the recipe.

use super::{ensure_type, single_machine};
use crate::model::{BuildContext, EnvironmentModel, Service};
use crate::recipe::{RecipeError, WorkspaceEnvironment};
use crate::warning::{Warning, WARNING_RECIPE_CONTENT_IGNORED};

pub const RECIPE_TYPE: &str = "dockerfile";
pub const CONTENT_TYPE: &str = "text/x-dockerfile";

pub fn parse(env: &WorkspaceEnvironment) -> Result<EnvironmentModel, RecipeError> {
    ensure_type(env, RECIPE_TYPE)?;

    let recipe = &env.recipe;
    if recipe.content_type.trim() != CONTENT_TYPE {
        return Err(RecipeError::UnsupportedContentType {
            recipe_type: RECIPE_TYPE.to_owned(),
            received: recipe.content_type.clone(),
            supported: vec![CONTENT_TYPE.to_owned()],
        });
    }
    let machine = single_machine(env, RECIPE_TYPE)?;

    let mut model = EnvironmentModel::new();
    let build = match (recipe.location(), recipe.content()) {
        (Some(location), content) => {
            if content.is_some() {
                model.add_warning(Warning::new(
                    WARNING_RECIPE_CONTENT_IGNORED,
                    "dockerfile recipe declares both location and content, location is used",
                ));
            }
            BuildContext::from_context(location)
        }
        (None, Some(content)) => BuildContext::from_dockerfile_content(content),
        (None, None) => {
            return Err(RecipeError::Malformed(
                "dockerfile recipe must contain a location or content".to_owned(),
            ))
        }
    };

    model.services.insert(machine, Service::from_build(build));
    Ok(model)
}
