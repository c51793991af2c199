use super::{json_pretty, load_workspace, print_warnings, Context, EXIT_SUCCESS};
use drydock_runtime::{Backend, RuntimeObject};
use drydock_schema::WorkspaceId;
use std::path::Path;

pub fn run(
    ctx: &Context,
    workspace: &Path,
    backend: Backend,
    workspace_id: &str,
    json: bool,
) -> Result<u8, String> {
    let env = load_workspace(workspace)?;
    let prepared = ctx
        .engine
        .prepare(&ctx.user, &WorkspaceId::new(workspace_id), &env, backend)
        .map_err(|e| e.to_string())?;

    if json {
        println!("{}", json_pretty(&prepared)?);
        return Ok(EXIT_SUCCESS);
    }

    match &prepared.object {
        RuntimeObject::Compose(compose) => {
            println!("compose services for {backend}:");
            for (machine, service) in &compose.services {
                println!(
                    "  {machine:<20} container={}",
                    service.container_name.as_deref().unwrap_or("-")
                );
            }
        }
        RuntimeObject::Pod(pod) => {
            println!("pod '{}' for {backend}:", pod.name);
            for container in &pod.containers {
                println!(
                    "  {:<20} image={} machine={}",
                    container.name,
                    container.image,
                    pod.machine_name(&container.name).unwrap_or("-")
                );
            }
        }
    }
    print_warnings(&prepared.warnings);
    Ok(EXIT_SUCCESS)
}
