pub mod credentials;
pub mod settings;
pub mod toml_config;

pub use settings::{AppConfig, ConfigOverrides};

#[cfg(feature = "cli")]
use crate::domain::model::ListingStatus;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "licitaciones-etl")]
#[command(about = "Download Mercado Público listings and export them to CSV and SQLite")]
pub struct CliConfig {
    /// Listing date, ddmmyyyy (e.g. 04102025). Takes precedence over --estado
    #[arg(long)]
    pub fecha: Option<String>,

    /// Listing status to query when no date is given
    #[arg(long, value_enum)]
    pub estado: Option<ListingStatus>,

    /// API ticket (overrides config file and environment)
    #[arg(long)]
    pub ticket: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Attempts before giving up on 429/5xx/network errors
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Base of the exponential backoff, in seconds
    #[arg(long)]
    pub backoff_base: Option<f64>,

    /// HTTP timeout per attempt, in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Directory for raw/, clean/ and the SQLite database
    #[arg(long)]
    pub output_dir: Option<String>,

    /// Skip the SQLite export
    #[arg(long)]
    pub no_sqlite: bool,

    /// Fall back to a placeholder ticket when none is configured (local testing only)
    #[arg(long)]
    pub allow_insecure_ticket: bool,

    /// Print the resolved configuration before running
    #[arg(long)]
    pub show_config: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl From<&CliConfig> for ConfigOverrides {
    fn from(cli: &CliConfig) -> Self {
        Self {
            fecha: cli.fecha.clone(),
            estado: cli.estado,
            ticket: cli.ticket.clone(),
            max_retries: cli.max_retries,
            backoff_base: cli.backoff_base,
            timeout_secs: cli.timeout_secs,
            output_dir: cli.output_dir.clone(),
            no_sqlite: cli.no_sqlite,
            allow_insecure_ticket: cli.allow_insecure_ticket,
        }
    }
}
