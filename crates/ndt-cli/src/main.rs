use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::SourceArgs;

#[derive(Parser)]
#[command(name = "ndt")]
#[command(about = "DVS / Neutron port consistency tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> switch...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Report DVS ports sharing a name. Reads the DVS snapshot only.
    Dupes {
        /// DVS snapshot (JSON export)
        #[arg(long)]
        dvs: PathBuf,
    },

    /// Run every consistency check. Read-only.
    Report {
        #[command(flatten)]
        sources: SourceArgs,
    },

    /// Run the checks, then rename/move/disconnect DVS ports to match Neutron.
    /// Guardrail: refuses unless --yes is provided.
    Align {
        #[command(flatten)]
        sources: SourceArgs,

        /// Acknowledge that DVS ports will be changed (disconnects are VM-visible).
        #[arg(long, default_value_t = false)]
        yes: bool,

        /// Write the converged DVS snapshot here.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let loaded = ndt_config::load_layered_yaml(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Dupes { dvs } => commands::report::run_dupes(&dvs)?,

        Commands::Report { sources } => commands::report::run(&sources)?,

        Commands::Align { sources, yes, out } => {
            commands::align::run(&sources, yes, out.as_deref())?
        }
    }

    Ok(())
}

/// Logs go to stderr; stdout carries only the staged report.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
