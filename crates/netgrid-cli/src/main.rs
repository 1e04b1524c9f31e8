use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "netgrid",
    about = "netgrid — cluster network configuration gate and rollout orchestrator",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Operator settings file (TOML). Built-in defaults when omitted.
    #[arg(long, global = true)]
    settings: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a network spec and list every error found
    Validate {
        /// Proposed network spec (JSON)
        #[arg(long)]
        spec: String,
        /// Bootstrap snapshot (JSON)
        #[arg(long)]
        snapshot: String,
        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
    /// Run validate, default, and change-safety checks; print the applied spec.
    ///
    /// Without --previous the spec is treated as a first install.
    Check {
        #[arg(long)]
        spec: String,
        /// Previously applied spec (JSON)
        #[arg(long)]
        previous: Option<String>,
        #[arg(long)]
        snapshot: String,
        /// Write the applied spec here instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Decide which rollout units may update this pass
    Rollout {
        /// Applied network spec (JSON)
        #[arg(long)]
        spec: String,
        #[arg(long)]
        snapshot: String,
    },
    /// Print the effective operator settings as TOML
    Settings,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("netgrid=info".parse()?)
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = commands::load_settings(cli.settings.as_deref())?;

    match cli.command {
        Commands::Validate { spec, snapshot, format } => {
            commands::validate::validate(&spec, &snapshot, &settings, &format)
        }
        Commands::Check { spec, previous, snapshot, output } => {
            commands::check::check(&spec, previous.as_deref(), &snapshot, &settings, output.as_deref())
        }
        Commands::Rollout { spec, snapshot } => {
            commands::rollout::rollout(&spec, &snapshot, &settings)
        }
        Commands::Settings => commands::settings::print(&settings),
    }
}
