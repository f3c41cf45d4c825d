// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};

mod cli;

#[derive(Parser)]
#[command(name = "camera-timelapse")]
#[command(about = "Timelapse controller for network cameras")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the local network for cameras
    Search {
        /// Search duration in seconds (default from config)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Print one JSON object per device
        #[arg(long)]
        json: bool,
    },

    /// Run a timelapse on a camera
    Shoot {
        /// Camera id to use (from 'camera-timelapse search')
        #[arg(short, long, default_value = "0")]
        device: u32,

        /// Seconds between pictures (default from config)
        #[arg(short, long)]
        period: Option<u32>,

        /// Number of pictures (default from config)
        #[arg(short, long)]
        repeats: Option<u32>,

        /// Focus mode to apply after connecting (e.g. AF-S, MF)
        #[arg(short, long)]
        focus_mode: Option<String>,

        /// Search duration in seconds (default from config)
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// List the remote operations a camera accepts
    Capabilities {
        /// Camera id to use (from 'camera-timelapse search')
        #[arg(short, long, default_value = "0")]
        device: u32,

        /// Search duration in seconds (default from config)
        #[arg(short, long)]
        timeout: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=camera_timelapse=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Search { timeout, json } => cli::search_cameras(timeout, json),
        Commands::Shoot {
            device,
            period,
            repeats,
            focus_mode,
            timeout,
        } => cli::shoot(device, period, repeats, focus_mode, timeout),
        Commands::Capabilities { device, timeout } => cli::list_capabilities(device, timeout),
    }
}
