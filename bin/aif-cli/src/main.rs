// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # aif
//!
//! Command-line interface for the inference request scheduler.
//!
//! ## Usage
//! ```bash
//! # Drive 32 concurrent requests of 10 items through 3 synthetic lanes
//! aif run --requests 32 --items 10 --batch-size 3 --native-batch 1
//!
//! # Show how 10 items are spread over 3 lanes
//! aif plan --items 10 --batch-size 3 --native-batch 1
//!
//! # Print the effective configuration
//! aif --config server.toml config
//! ```

mod commands;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "aif",
    about = "Serialized inference scheduler with multi-lane batch execution",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve concurrent synthetic requests and print the metrics snapshot.
    Run {
        /// Number of concurrent requests.
        #[arg(short, long, default_value_t = 16)]
        requests: usize,

        /// Items per request (forced to 1 in latency mode).
        #[arg(short, long, default_value_t = 8)]
        items: usize,

        /// Execution mode: latency | throughput (overrides the config file).
        #[arg(short, long)]
        mode: Option<String>,

        /// Execution batch size (overrides the config file).
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Native batch of each synthetic lane.
        #[arg(short, long, default_value_t = 4)]
        native_batch: usize,

        /// Features per item.
        #[arg(long, default_value_t = 8)]
        width: usize,

        /// Simulated accelerator time per call, in milliseconds.
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,

        /// Return the k best classes instead of raw outputs.
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Print the batch plan for a request.
    Plan {
        /// Items in the request.
        #[arg(short, long)]
        items: usize,

        /// Execution batch size (overrides the config file).
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Native batch of each lane.
        #[arg(short, long, default_value_t = 1)]
        native_batch: usize,

        /// Lane count; defaults to ceil(batch_size / native_batch).
        #[arg(short, long)]
        lanes: Option<usize>,
    },

    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            requests,
            items,
            mode,
            batch_size,
            native_batch,
            width,
            delay_ms,
            top_k,
        } => {
            let options = commands::run::RunOptions {
                requests,
                items,
                mode,
                batch_size,
                native_batch,
                width,
                delay_ms,
                top_k,
            };
            commands::run::execute(config, options).await
        }
        Commands::Plan {
            items,
            batch_size,
            native_batch,
            lanes,
        } => commands::plan::execute(config, items, batch_size, native_batch, lanes),
        Commands::Config => commands::config::execute(&config),
    }
}
