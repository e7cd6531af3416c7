use crate::config::credentials::resolve_ticket_with;
use crate::config::toml_config::TomlConfig;
use crate::core::fetcher::{FetcherSettings, RetryPolicy};
use crate::core::fields::REQUESTED_FIELDS;
use crate::domain::model::{ListingStatus, QueryParameters, DATE_PARAM, TICKET_PARAM};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_at_least, validate_between, validate_http_url, validate_listing_date, validate_text,
    Validate,
};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_OUTPUT_DIR: &str = "data";
pub const DEFAULT_SQLITE_DB: &str = "mp.sqlite";

/// Values that take precedence over the config file, normally from the CLI.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub fecha: Option<String>,
    pub estado: Option<ListingStatus>,
    pub ticket: Option<String>,
    pub max_retries: Option<u32>,
    pub backoff_base: Option<f64>,
    pub timeout_secs: Option<u64>,
    pub output_dir: Option<String>,
    pub no_sqlite: bool,
    pub allow_insecure_ticket: bool,
}

impl ConfigOverrides {
    /// `estado` given alongside `fecha`; the date wins, whatever the status.
    pub fn ignored_estado(&self) -> Option<ListingStatus> {
        self.fecha.as_ref().and(self.estado)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub base_dir: String,
    pub sqlite_enabled: bool,
    pub sqlite_db_name: String,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            base_dir: DEFAULT_OUTPUT_DIR.to_string(),
            sqlite_enabled: true,
            sqlite_db_name: DEFAULT_SQLITE_DB.to_string(),
        }
    }
}

/// Fully resolved settings for one run: defaults, then file, then overrides.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub query: QueryParameters,
    pub fetcher: FetcherSettings,
    pub retry: RetryPolicy,
    pub output: OutputSettings,
    pub required_fields: Vec<String>,
}

impl AppConfig {
    pub fn resolve(file: TomlConfig, overrides: ConfigOverrides) -> Result<Self> {
        Self::resolve_with_env(file, overrides, |name| std::env::var(name).ok())
    }

    pub fn resolve_with_env<F>(
        file: TomlConfig,
        overrides: ConfigOverrides,
        env_lookup: F,
    ) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = FetcherSettings::default();
        let fetcher = FetcherSettings {
            base_url: file.api.base_url.unwrap_or(defaults.base_url),
            user_agent: file.api.user_agent.unwrap_or(defaults.user_agent),
            timeout: overrides
                .timeout_secs
                .or(file.api.timeout_seconds)
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            rate_limit_header: file
                .api
                .rate_limit_header
                .unwrap_or(defaults.rate_limit_header),
        };

        let default_retry = RetryPolicy::default();
        let retry = RetryPolicy::new(
            overrides
                .max_retries
                .or(file.retry.max_retries)
                .unwrap_or(default_retry.max_retries),
            overrides
                .backoff_base
                .or(file.retry.backoff_base)
                .unwrap_or(default_retry.backoff_base),
        );

        let default_output = OutputSettings::default();
        let output = OutputSettings {
            base_dir: overrides
                .output_dir
                .clone()
                .or(file.output.base_dir)
                .unwrap_or(default_output.base_dir),
            sqlite_enabled: !overrides.no_sqlite
                && file
                    .output
                    .sqlite_enabled
                    .unwrap_or(default_output.sqlite_enabled),
            sqlite_db_name: file
                .output
                .sqlite_db_name
                .unwrap_or(default_output.sqlite_db_name),
        };

        let ticket = resolve_ticket_with(
            overrides.ticket.as_deref(),
            file.api.ticket.as_deref(),
            overrides.allow_insecure_ticket,
            env_lookup,
        )?;

        if let Some(estado) = overrides.ignored_estado() {
            tracing::warn!("⚠️ --fecha given, ignoring --estado {}", estado);
        }
        let query = match overrides.fecha.as_deref() {
            Some(fecha) => QueryParameters::new(&ticket).with_date(fecha)?,
            None => {
                QueryParameters::new(&ticket).with_status(overrides.estado.unwrap_or_default())
            }
        };

        let required_fields = file
            .fields
            .required
            .unwrap_or_else(|| REQUESTED_FIELDS.iter().map(|f| f.to_string()).collect());

        Ok(Self {
            query,
            fetcher,
            retry,
            output,
            required_fields,
        })
    }

    pub fn sqlite_file(&self) -> PathBuf {
        Path::new(&self.output.base_dir).join(&self.output.sqlite_db_name)
    }

    /// Human readable summary, with the ticket masked.
    pub fn summary(&self) -> String {
        let mut lines = vec!["📋 Configuration Summary:".to_string()];
        lines.push(format!("  API: {}", self.fetcher.base_url));
        lines.push(format!("  User-Agent: {}", self.fetcher.user_agent));
        lines.push(format!("  Timeout: {}s", self.fetcher.timeout.as_secs()));
        lines.push(format!(
            "  Retries: {} (backoff base {})",
            self.retry.max_retries, self.retry.backoff_base
        ));
        lines.push(format!("  Query: {:?}", self.query));
        lines.push(format!("  Output: {}", self.output.base_dir));
        if self.output.sqlite_enabled {
            lines.push(format!("  SQLite: {}", self.sqlite_file().display()));
        } else {
            lines.push("  SQLite: disabled".to_string());
        }
        lines.push(format!("  Required fields: {}", self.required_fields.len()));
        lines.join("\n")
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_http_url("api.base_url", &self.fetcher.base_url)?;
        validate_text("api.user_agent", &self.fetcher.user_agent)?;
        validate_text("api.rate_limit_header", &self.fetcher.rate_limit_header)?;
        validate_at_least("api.timeout_seconds", self.fetcher.timeout.as_secs(), 1)?;
        validate_at_least("retry.max_retries", u64::from(self.retry.max_retries), 1)?;
        validate_between("retry.backoff_base", self.retry.backoff_base, 0.001, 60.0)?;
        validate_text("output.base_dir", &self.output.base_dir)?;
        validate_text("output.sqlite_db_name", &self.output.sqlite_db_name)?;
        validate_text(TICKET_PARAM, self.query.get(TICKET_PARAM).unwrap_or_default())?;
        if let Some(fecha) = self.query.get(DATE_PARAM) {
            validate_listing_date(DATE_PARAM, fecha)?;
        }
        Ok(())
    }
}

impl ConfigProvider for AppConfig {
    fn query(&self) -> &QueryParameters {
        &self.query
    }

    fn fetcher_settings(&self) -> &FetcherSettings {
        &self.fetcher
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    fn sqlite_path(&self) -> Option<PathBuf> {
        self.output.sqlite_enabled.then(|| self.sqlite_file())
    }

    fn required_fields(&self) -> &[String] {
        &self.required_fields
    }
}
