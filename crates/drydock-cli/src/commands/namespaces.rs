use super::{json_pretty, Context, EXIT_SUCCESS};
use drydock_runtime::namespace::PHASE_ATTRIBUTE;

pub fn run(ctx: &Context, json: bool) -> Result<u8, String> {
    let namespaces = ctx.engine.namespaces(&ctx.user).map_err(|e| e.to_string())?;
    if json {
        println!("{}", json_pretty(&namespaces)?);
    } else if namespaces.is_empty() {
        println!("no namespaces available");
    } else {
        println!("{:<32} {:<10} DEFAULT", "NAME", "PHASE");
        for ns in &namespaces {
            let phase = ns.attributes.get(PHASE_ATTRIBUTE).map_or("-", String::as_str);
            let default = if ns.is_default() { "yes" } else { "" };
            println!("{:<32} {phase:<10} {default}", ns.name);
        }
    }
    Ok(EXIT_SUCCESS)
}
