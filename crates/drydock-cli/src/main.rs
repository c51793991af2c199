mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{Context, EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_RECIPE_ERROR};
use drydock_runtime::Backend;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "drydock",
    version,
    about = "Recipe-driven workspace provisioning for container engines and Kubernetes"
)]
struct Cli {
    /// Infrastructure config file (defaults to ~/.config/drydock/config.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding per-user preference files.
    #[arg(long, default_value = "~/.local/share/drydock/prefs", global = true)]
    prefs: String,

    /// User the workspace is provisioned for.
    #[arg(long, default_value = "developer", global = true)]
    user: String,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Parse a workspace file and show the normalized environment.
    Parse {
        /// Path to workspace TOML file.
        #[arg(default_value = "workspace.toml")]
        workspace: PathBuf,
    },
    /// Provision and convert a workspace for a backend without deploying it.
    Convert {
        /// Path to workspace TOML file.
        #[arg(default_value = "workspace.toml")]
        workspace: PathBuf,
        /// Target backend: docker, kubernetes, or openshift.
        #[arg(long, default_value = "docker")]
        backend: Backend,
        /// Workspace identifier.
        #[arg(long, default_value = "workspace")]
        workspace_id: String,
    },
    /// Deploy a workspace and print its resolved servers.
    Up {
        /// Path to workspace TOML file.
        #[arg(default_value = "workspace.toml")]
        workspace: PathBuf,
        /// Target backend: docker, kubernetes, or openshift.
        #[arg(long, default_value = "docker")]
        backend: Backend,
        /// Workspace identifier.
        #[arg(long, default_value = "workspace")]
        workspace_id: String,
        /// Backend client that runs the workspace.
        #[arg(long, default_value = "mock")]
        runtime: String,
    },
    /// List namespaces the user may run workspaces in.
    Namespaces,
    /// Store registry credentials in the user's preferences.
    Credentials {
        /// Registry host, e.g. quay.io (empty or docker.io for Docker Hub).
        registry: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Replace stored credentials that cannot be read instead of failing.
        #[arg(long)]
        force: bool,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("DRYDOCK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;
    let result = if let Commands::Completions { shell } = cli.command {
        commands::completions::run::<Cli>(shell)
    } else {
        Context::load(cli.config.as_deref(), &expand_tilde(&cli.prefs), &cli.user)
            .and_then(|ctx| dispatch(&ctx, cli.command, json_output))
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("recipe error:") {
                EXIT_RECIPE_ERROR
            } else if msg.starts_with("configuration error:") {
                EXIT_CONFIG_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

fn dispatch(ctx: &Context, command: Commands, json_output: bool) -> Result<u8, String> {
    match command {
        Commands::Parse { workspace } => commands::parse::run(ctx, &workspace, json_output),
        Commands::Convert {
            workspace,
            backend,
            workspace_id,
        } => commands::convert::run(ctx, &workspace, backend, &workspace_id, json_output),
        Commands::Up {
            workspace,
            backend,
            workspace_id,
            runtime,
        } => commands::up::run(
            ctx,
            &workspace,
            backend,
            &workspace_id,
            &runtime,
            json_output,
        ),
        Commands::Namespaces => commands::namespaces::run(ctx, json_output),
        Commands::Credentials {
            registry,
            username,
            password,
            force,
        } => commands::credentials::run(
            ctx,
            &commands::credentials::NewCredential {
                registry: &registry,
                username: &username,
                password: &password,
            },
            force,
            json_output,
        ),
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
