//! CLI argument definitions using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Stream Bridge - forwards a filtered push stream to Kafka
#[derive(Parser, Debug)]
#[command(
    name = "stream-bridge",
    author,
    version,
    about = "Forward a filtered push stream to a Kafka topic",
    long_about = "Connects to a push stream filtered by track terms, relays every line \n\
                  through a bounded in-memory queue and produces it to a Kafka topic.\n\n\
                  Ctrl+C or SIGTERM closes the stream; queued and in-flight messages \n\
                  are delivered before exit."
)]
pub struct Cli {
    /// Path to the configuration file (.properties, .toml or .json)
    #[arg(value_name = "PROPERTIES", env = "STREAM_BRIDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, env = "STREAM_BRIDGE_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        env = "STREAM_BRIDGE_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Validate configuration and exit without connecting
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "STREAM_BRIDGE_METRICS_PORT")]
    pub metrics_port: u16,
}

impl Cli {
    /// Default log level from -v/-q
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "warn";
        }
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Metrics port, None when disabled or in dry-run mode
    pub fn metrics_port(&self) -> Option<u16> {
        (self.metrics_port != 0 && !self.dry_run).then_some(self.metrics_port)
    }
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}
