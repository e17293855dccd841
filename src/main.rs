mod api;
mod client;
mod commands;
mod config;
mod domain;
mod error;
mod monitor;
mod server;
mod source;

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::Overrides;

#[derive(Parser)]
#[command(
    name = "nodewatch",
    version,
    about = "Cluster node version-compatibility monitor"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor daemon (polling loop + REST + GraphQL)
    Watch {
        #[command(flatten)]
        monitor: MonitorArgs,

        /// HTTP listen address (overrides config)
        #[arg(long)]
        http_addr: Option<String>,

        /// Log level (overrides config)
        #[arg(long)]
        log_level: Option<String>,
    },

    /// Poll the cluster once and print the compatibility verdict
    Check {
        #[command(flatten)]
        monitor: MonitorArgs,

        /// Output format (table, json or yaml)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Evaluate a node version against an application version offline
    Compat {
        /// Version reported by the node
        #[arg(long)]
        node_version: String,

        /// Application version to check against
        #[arg(long)]
        app_version: String,

        /// Version strictness (strict or major_only)
        #[arg(long, default_value = "major_only")]
        strictness: String,

        /// Output format (table, json or yaml)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Query a nodewatch daemon's REST API
    Query {
        /// Daemon base URL
        #[arg(long, global = true, default_value = client::DEFAULT_BASE_URL)]
        url: String,

        /// Output format (table, json or yaml)
        #[arg(long, global = true, default_value = "table")]
        format: String,

        #[command(subcommand)]
        command: commands::query::QueryCommands,
    },
}

#[derive(Args)]
struct MonitorArgs {
    /// Path to config file (default: ~/.config/nodewatch/config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cluster base URL (overrides config)
    #[arg(long)]
    source_url: Option<String>,

    /// Application version to check nodes against (overrides config)
    #[arg(long)]
    app_version: Option<String>,

    /// Report incompatible nodes without failing the verdict (true/false, overrides config)
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    ignore_version_mismatch: Option<bool>,

    /// Version strictness: strict or major_only (overrides config)
    #[arg(long)]
    strictness: Option<String>,
}

impl MonitorArgs {
    fn into_parts(self, http_addr: Option<String>, log_level: Option<String>) -> (Option<PathBuf>, Overrides) {
        let overrides = Overrides {
            source_url: self.source_url,
            application_version: self.app_version,
            ignore_version_mismatch: self.ignore_version_mismatch,
            version_strictness: self.strictness,
            http_addr,
            log_level,
        };
        (self.config, overrides)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Watch {
            monitor,
            http_addr,
            log_level,
        } => {
            let (config, overrides) = monitor.into_parts(http_addr, log_level);
            commands::watch::run(config, overrides)
        }
        Commands::Check { monitor, format } => {
            let (config, overrides) = monitor.into_parts(None, None);
            commands::check::run(config, overrides, &format)
        }
        Commands::Compat {
            node_version,
            app_version,
            strictness,
            format,
        } => commands::compat::run(&node_version, &app_version, &strictness, &format),
        Commands::Query {
            url,
            format,
            command,
        } => commands::query::run(&url, &format, &command),
    }
}
