use std::time::Duration;
use thiserror::Error;

/// Failures of a single `ResilientFetcher::fetch` call.
///
/// `RateLimited`, `ServerError` and `Network` are transient and absorbed by the
/// retry loop; callers only ever see `ClientError`, `InvalidJson` or
/// `RetriesExhausted`.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP 429 rate limited (retry hint: {})", retry_after.as_deref().unwrap_or("none"))]
    RateLimited { retry_after: Option<String> },

    #[error("HTTP {status} server error")]
    ServerError { status: u16 },

    #[error("Network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("HTTP {status} client error: {body}")]
    ClientError { status: u16, body: String },

    #[error("Response body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

impl FetchError {
    pub fn network<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        FetchError::Network(err.into())
    }

    /// 暫時性錯誤會在 fetch 內部重試
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimited { .. } | FetchError::ServerError { .. } | FetchError::Network(_)
        )
    }

    /// HTTP status carried by this error, looking through `RetriesExhausted`.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::RateLimited { .. } => Some(429),
            FetchError::ServerError { status } | FetchError::ClientError { status, .. } => {
                Some(*status)
            }
            FetchError::RetriesExhausted { last, .. } => last.status(),
            FetchError::Network(_) | FetchError::InvalidJson(_) => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum EtlError {
    #[error(transparent)]
    FetchError(#[from] FetchError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("No API ticket found (tried: {tried})")]
    MissingCredential { tried: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Api,
    Configuration,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::FetchError(FetchError::Network(_)) => ErrorCategory::Network,
            EtlError::FetchError(FetchError::RetriesExhausted { last, .. })
                if matches!(**last, FetchError::Network(_)) =>
            {
                ErrorCategory::Network
            }
            EtlError::FetchError(_) => ErrorCategory::Api,
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingCredential { .. } => ErrorCategory::Configuration,
            EtlError::CsvError(_) | EtlError::IoError(_) | EtlError::SqliteError(_) => {
                ErrorCategory::Storage
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 重試用盡：稍後再跑通常就會成功
            EtlError::FetchError(FetchError::RetriesExhausted { .. }) => ErrorSeverity::Medium,
            EtlError::FetchError(_) => ErrorSeverity::High,
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingCredential { .. } => ErrorSeverity::High,
            EtlError::CsvError(_) | EtlError::IoError(_) | EtlError::SqliteError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::FetchError(FetchError::ClientError { status: 401 | 403, .. }) => {
                "Check that the API ticket is valid and not expired".to_string()
            }
            EtlError::FetchError(FetchError::ClientError { .. }) => {
                "Check the --fecha / --estado parameters and the API base URL".to_string()
            }
            EtlError::FetchError(FetchError::RetriesExhausted { last, .. }) => match **last {
                FetchError::RateLimited { .. } => {
                    "The daily ticket quota may be spent; try again later or raise --max-retries"
                        .to_string()
                }
                FetchError::Network(_) => {
                    "Check your network connection or increase --timeout-secs".to_string()
                }
                _ => "The API is failing; try again later".to_string(),
            },
            EtlError::FetchError(_) => "Inspect the API response and try again".to_string(),
            EtlError::MissingCredential { .. } => {
                "Set MERCADO_PUBLICO_TICKET in the environment or pass --ticket".to_string()
            }
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. } => {
                "Fix the configuration file or command-line arguments".to_string()
            }
            EtlError::IoError(_) | EtlError::CsvError(_) => {
                "Check that the output directory exists and is writable".to_string()
            }
            EtlError::SqliteError(_) => {
                "Check the SQLite database file or run with --no-sqlite".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the procurement API: {}", self),
            ErrorCategory::Api => format!("The procurement API request failed: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Storage => format!("Could not write the output: {}", self),
        }
    }

    /// 根據錯誤嚴重程度決定退出碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

/// Wait chosen by the retry loop, kept here so log lines and errors agree on formatting.
pub(crate) fn format_wait(wait: Duration) -> String {
    format!("{:.1}s", wait.as_secs_f64())
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::ServerError { status: 503 }.is_transient());
        assert!(FetchError::RateLimited { retry_after: None }.is_transient());
        assert!(FetchError::network("connection reset").is_transient());
        assert!(!FetchError::ClientError {
            status: 404,
            body: String::new()
        }
        .is_transient());
    }

    #[test]
    fn test_exhausted_reports_last_status() {
        let err = FetchError::RetriesExhausted {
            attempts: 3,
            last: Box::new(FetchError::ServerError { status: 503 }),
        };
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("3 attempts"));
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_severity_maps_to_exit_code() {
        let exhausted = EtlError::from(FetchError::RetriesExhausted {
            attempts: 6,
            last: Box::new(FetchError::RateLimited { retry_after: None }),
        });
        assert_eq!(exhausted.severity(), ErrorSeverity::Medium);
        assert_eq!(exhausted.exit_code(), 2);
        assert_eq!(exhausted.category(), ErrorCategory::Api);

        let missing = EtlError::MissingCredential {
            tried: "MP_TICKET".to_string(),
        };
        assert_eq!(missing.exit_code(), 1);
        assert_eq!(missing.category(), ErrorCategory::Configuration);

        let io = EtlError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        assert_eq!(io.exit_code(), 3);
    }

    #[test]
    fn test_network_exhaustion_is_network_category() {
        let err = EtlError::from(FetchError::RetriesExhausted {
            attempts: 2,
            last: Box::new(FetchError::network("timed out")),
        });
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.recovery_suggestion().contains("network"));
    }
}
