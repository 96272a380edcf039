// SPDX-FileCopyrightText: 2026 Switchboard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Switchboard - human handoff and presence orchestration.
//!
//! This is the binary entry point. `serve` runs the presence and abandonment
//! sweeps until interrupted; the other subcommands are one-shot operator
//! tools over the same database.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;
mod queue;
mod serve;
mod shutdown;
mod sweep;

use clap::{Parser, Subcommand};
use switchboard_config::model::SwitchboardConfig;
use switchboard_core::SwitchboardError;

/// Switchboard - human handoff and presence orchestration.
#[derive(Parser, Debug)]
#[command(name = "switchboard", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the presence and abandonment sweeps until SIGINT/SIGTERM.
    Serve,
    /// Run both sweeps once and print what they did.
    Sweep,
    /// Print a tenant's waiting queue in FIFO order.
    Queue {
        /// Tenant whose queue to print.
        #[arg(long)]
        tenant: String,
        /// Emit JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Print the resolved configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match switchboard_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            switchboard_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    serve::init_tracing(&config.service.log_level);

    if let Err(e) = run(cli.command, config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, config: SwitchboardConfig) -> Result<(), SwitchboardError> {
    match command {
        Commands::Serve => serve::run_serve(config).await,
        Commands::Sweep => sweep::run_sweep(config).await,
        Commands::Queue { tenant, json } => queue::run_queue(config, &tenant, json).await,
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| SwitchboardError::Internal(format!("failed to render config: {e}")))?;
            print!("{rendered}");
            Ok(())
        }
    }
}
