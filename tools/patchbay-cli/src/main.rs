//! Patchbay CLI — Command-line interface for shared-memory video channels.
//!
//! Usage:
//!   patchbay send <CHANNEL>        Publish a synthetic pattern to a channel
//!   patchbay probe <CHANNEL>       Attach to a channel and report its stream
//!   patchbay composite -o <OUT>    Composite input channels into one output
//!   patchbay check                 Run a shared-memory self-test

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "patchbay",
    about = "Live video routing and compositing over shared memory",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a synthetic test pattern to a channel
    Send {
        /// Channel name to create
        channel: String,

        /// Frame width
        #[arg(long, default_value = "640")]
        width: u32,

        /// Frame height
        #[arg(long, default_value = "480")]
        height: u32,

        /// Publish rate
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Pattern: bars, gradient, or solid
        #[arg(long, default_value = "bars")]
        pattern: String,

        /// Stop after this many frames (default: run until killed)
        #[arg(long)]
        frames: Option<u64>,

        /// Reclaim the channel name if a stale region exists
        #[arg(long)]
        replace: bool,
    },

    /// Attach to a channel and report geometry and frame rate
    Probe {
        /// Channel name to attach to
        channel: String,

        /// How long to sample the stream
        #[arg(long, default_value = "5.0")]
        seconds: f64,
    },

    /// Composite input channels into one output channel
    Composite {
        /// Input channel name (repeatable; tiled in order)
        #[arg(long = "input", required = true)]
        inputs: Vec<String>,

        /// Output channel name
        #[arg(short, long)]
        output: String,

        /// Output width
        #[arg(long, default_value = "1280")]
        width: u32,

        /// Output height
        #[arg(long, default_value = "720")]
        height: u32,

        /// Compositing tick rate
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Safe-area border in pixels
        #[arg(long, default_value = "0")]
        margin: u32,

        /// Stop after this many ticks (default: run until killed)
        #[arg(long)]
        frames: Option<u64>,

        /// Reclaim the output channel name if a stale region exists
        #[arg(long)]
        replace: bool,
    },

    /// Verify shared-memory channels work on this system
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    patchbay_common::logging::init_logging(&patchbay_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Send {
            channel,
            width,
            height,
            fps,
            pattern,
            frames,
            replace,
        } => commands::send::run(channel, width, height, fps, pattern, frames, replace),
        Commands::Probe { channel, seconds } => commands::probe::run(channel, seconds),
        Commands::Composite {
            inputs,
            output,
            width,
            height,
            fps,
            margin,
            frames,
            replace,
        } => commands::composite::run(
            inputs, output, width, height, fps, margin, frames, replace,
        ),
        Commands::Check => commands::check::run(),
    }
}
