mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::bootstrap::BootstrapArgs;
use cmd::config::ConfigSubcommand;
use cmd::service::RuntimeArgs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "siteboot",
    about = "Bootstrap and operate a containerized multi-tenant web platform",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from siteboot.yaml or .git/)
    #[arg(long, global = true, env = "SITEBOOT_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scaffold siteboot.yaml and the sites/apps directories
    Init {
        /// Site name to seed the config with
        #[arg(long)]
        site: Option<String>,
    },

    /// Wait for dependencies and shared config, then provision and reconcile
    Bootstrap(BootstrapArgs),

    /// Show the persisted bootstrap report
    Status,

    /// Validate or display the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Start a service
    Start {
        service: String,
        #[command(flatten)]
        runtime: RuntimeArgs,
    },

    /// Stop a service
    Stop {
        service: String,
        #[command(flatten)]
        runtime: RuntimeArgs,
    },

    /// Restart a service
    Restart {
        service: String,
        #[command(flatten)]
        runtime: RuntimeArgs,
    },

    /// Run a command inside a running service
    Exec {
        service: String,
        /// Command and arguments to run
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
        #[command(flatten)]
        runtime: RuntimeArgs,
    },

    /// Print (or follow) a service's logs
    Logs {
        service: String,
        #[arg(long, short = 'F')]
        follow: bool,
        #[command(flatten)]
        runtime: RuntimeArgs,
    },

    /// Report a service's health state
    Health {
        service: String,
        #[command(flatten)]
        runtime: RuntimeArgs,
    },
}

fn main() {
    let cli = Cli::parse();

    // Bootstrap narrates its stages; everything else stays quiet by default.
    let default_level = match &cli.command {
        Commands::Bootstrap(_) => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        // Keep stdout clean for --json consumers.
        .with_writer(std::io::stderr)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init { site } => cmd::init::run(&root, site.as_deref()),
        Commands::Bootstrap(args) => cmd::bootstrap::run(&root, args, cli.json),
        Commands::Status => cmd::status::run(&root, cli.json),
        Commands::Config { subcommand } => cmd::config::run(&root, subcommand, cli.json),
        Commands::Start { service, runtime } => cmd::service::start(&root, &runtime, &service),
        Commands::Stop { service, runtime } => cmd::service::stop(&root, &runtime, &service),
        Commands::Restart { service, runtime } => cmd::service::restart(&root, &runtime, &service),
        Commands::Exec {
            service,
            args,
            runtime,
        } => cmd::service::exec(&root, &runtime, &service, &args),
        Commands::Logs {
            service,
            follow,
            runtime,
        } => cmd::service::logs(&root, &runtime, &service, follow),
        Commands::Health { service, runtime } => {
            cmd::service::health(&root, &runtime, &service, cli.json)
        }
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
