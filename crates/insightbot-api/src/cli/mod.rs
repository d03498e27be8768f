//! CLI command definitions for the `insightbot` binary.
//!
//! Uses clap derive macros for argument parsing. `serve` runs the webhook
//! service; the other commands are operator tools that reuse the same wiring.

pub mod ask;
pub mod config;
pub mod insights;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use insightbot_observe::tracing_setup::LogFormat;

/// Business insights chat bot for customer and sales data.
#[derive(Parser)]
#[command(name = "insightbot", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(
        long,
        global = true,
        env = "INSIGHTBOT_CONFIG",
        default_value = "insightbot.toml"
    )]
    pub config: PathBuf,

    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log output format: pretty or json.
    #[arg(long, global = true, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the messaging webhook and health endpoint.
    Serve {
        /// Bind address (overrides [server].host).
        #[arg(long, env = "HOST")]
        host: Option<String>,

        /// Listen port (overrides [server].port).
        #[arg(long, env = "PORT")]
        port: Option<u16>,
    },

    /// Ask one question locally and print the bot's answer.
    Ask {
        /// The question, as a user would type it.
        question: String,
    },

    /// Show resolved settings with secrets masked.
    Config {
        /// Also send a tiny completion to verify the LLM credentials.
        #[arg(long)]
        check_llm: bool,
    },

    /// Compute a sales insights report from the data API.
    Insights {
        /// First day to include (YYYY-MM-DD).
        #[arg(long)]
        start_date: Option<String>,

        /// Last day to include (YYYY-MM-DD).
        #[arg(long)]
        end_date: Option<String>,

        /// Restrict to one region.
        #[arg(long)]
        region: Option<String>,
    },
}

impl Commands {
    /// Log filter used when neither `RUST_LOG` nor `-v` asks for more.
    pub fn default_filter(&self, verbose: u8) -> &'static str {
        match (self, verbose) {
            (Commands::Serve { .. }, 0) => "info",
            (_, 0) => "warn",
            (_, 1) => "debug",
            _ => "trace",
        }
    }
}
