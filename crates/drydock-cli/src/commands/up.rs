use super::{
    colorize_status, json_pretty, load_workspace, print_warnings, spin_fail, spin_ok, spinner,
    Context, EXIT_SUCCESS,
};
use drydock_runtime::{select_backend, Backend, ResolvedServer};
use drydock_schema::{Warning, WorkspaceId};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Serialize)]
struct UpReport<'a> {
    workspace_id: &'a WorkspaceId,
    backend: Backend,
    runtime: &'a str,
    servers: BTreeMap<String, BTreeMap<String, ResolvedServer>>,
    warnings: &'a [Warning],
}

pub fn run(
    ctx: &Context,
    workspace: &Path,
    backend: Backend,
    workspace_id: &str,
    runtime: &str,
    json: bool,
) -> Result<u8, String> {
    let env = load_workspace(workspace)?;
    let workspace_id = WorkspaceId::new(workspace_id);
    let client = select_backend(runtime, &ctx.engine.config().servers.external_host)
        .map_err(|e| e.to_string())?;

    let pb = (!json).then(|| spinner(&format!("starting workspace {workspace_id}...")));
    let started = ctx
        .engine
        .start(client.as_ref(), &ctx.user, &workspace_id, &env, backend);
    let prepared = match started {
        Ok(prepared) => {
            if let Some(pb) = &pb {
                spin_ok(pb, &format!("workspace {workspace_id} started on {runtime}"));
            }
            prepared
        }
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, &format!("workspace {workspace_id} failed to start"));
            }
            return Err(e.to_string());
        }
    };

    let servers = ctx
        .engine
        .all_servers(client.as_ref(), &workspace_id)
        .map_err(|e| e.to_string())?;

    if json {
        let report = UpReport {
            workspace_id: &workspace_id,
            backend,
            runtime,
            servers,
            warnings: &prepared.warnings,
        };
        println!("{}", json_pretty(&report)?);
        return Ok(EXIT_SUCCESS);
    }

    println!("{:<16} {:<20} {:<8} URL", "MACHINE", "SERVER", "STATUS");
    for (machine, machine_servers) in &servers {
        for (name, server) in machine_servers {
            println!(
                "{machine:<16} {name:<20} {:<8} {}",
                colorize_status(server.status.as_str()),
                server.url
            );
        }
    }
    print_warnings(&prepared.warnings);
    Ok(EXIT_SUCCESS)
}
