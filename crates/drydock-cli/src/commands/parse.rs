use super::{json_pretty, load_workspace, print_warnings, Context, EXIT_SUCCESS};
use std::path::Path;

pub fn run(ctx: &Context, workspace: &Path, json: bool) -> Result<u8, String> {
    let env = load_workspace(workspace)?;
    let model = ctx.engine.parse(&env).map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&model)?);
        return Ok(EXIT_SUCCESS);
    }

    println!("recipe:   {}", env.recipe.recipe_type);
    println!("{:<20} {:<8} SOURCE", "MACHINE", "KIND");
    for (name, service) in &model.services {
        let (kind, source) = match (&service.image, &service.build) {
            (Some(image), _) => ("image", image.clone()),
            (None, Some(build)) => (
                "build",
                build
                    .context
                    .clone()
                    .unwrap_or_else(|| "(inline Dockerfile)".to_owned()),
            ),
            (None, None) => ("-", String::new()),
        };
        println!("{name:<20} {kind:<8} {source}");
    }
    print_warnings(&model.warnings);
    Ok(EXIT_SUCCESS)
}
