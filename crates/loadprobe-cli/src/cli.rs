//! CLI argument parsing definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Load and stress test a single HTTP endpoint",
    long_about = None
)]
pub struct Cli {
    /// Per-request timeout in seconds
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 30,
        global = true,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: u64,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(long, value_name = "PATH", global = true)]
    pub output: Option<PathBuf>,

    /// Accept invalid TLS certificates
    #[arg(long, global = true)]
    pub insecure: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a fixed number of equally sized rounds
    Load {
        /// Target URL
        url: String,

        /// Concurrent requests per round
        #[arg(long, value_name = "N")]
        group_size: u32,

        /// Number of rounds
        #[arg(long, value_name = "N")]
        group_count: u32,

        /// Pause between rounds in milliseconds
        #[arg(long, value_name = "MS", default_value_t = 0)]
        delay_ms: u64,

        /// Also save the configuration used to this path
        #[arg(long, value_name = "PATH")]
        save_config: Option<PathBuf>,
    },

    /// Escalate concurrency every round until the success rate drops
    Stress {
        /// Target URL
        url: String,

        /// Concurrent requests in the first round
        #[arg(long, value_name = "N")]
        initial_group_size: u32,

        /// Requests added every round
        #[arg(long, value_name = "N")]
        increment: u32,

        /// Pause between rounds in milliseconds
        #[arg(long, value_name = "MS", default_value_t = 0)]
        delay_ms: u64,

        /// Stop once a round's success rate is below this fraction
        #[arg(long, value_name = "FRACTION")]
        failure_threshold: Option<f64>,

        /// Stop after this many rounds even without a breach
        #[arg(long, value_name = "N")]
        max_rounds: Option<u32>,

        /// Also save the configuration used to this path
        #[arg(long, value_name = "PATH")]
        save_config: Option<PathBuf>,
    },

    /// Run a test described by a JSON configuration file
    Run {
        /// Path to the configuration file
        #[arg(long, value_name = "PATH")]
        config: PathBuf,
    },

    /// Render a previously saved run in another format
    Report {
        /// Path to a run saved with `--format json --output`
        #[arg(long, value_name = "PATH")]
        run: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}
