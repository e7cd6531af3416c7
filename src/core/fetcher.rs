//! HTTP fetch with bounded exponential backoff.

use crate::adapters::http::{ReqwestTransport, TokioSleeper};
use crate::domain::model::QueryParameters;
use crate::domain::ports::{HttpReply, HttpTransport, Sleeper};
use crate::utils::error::{format_wait, FetchError};
use serde_json::Value;
use std::time::Duration;

/// Upper bound for any computed backoff wait.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

pub const DEFAULT_BASE_URL: &str =
    "https://api.mercadopublico.cl/servicios/v1/publico/licitaciones.json";
pub const DEFAULT_USER_AGENT: &str = concat!("licitaciones-etl/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_RATE_LIMIT_HEADER: &str = "Retry-After";

#[derive(Debug, Clone, PartialEq)]
pub struct FetcherSettings {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    /// Header carrying the server's wait hint on 429 responses.
    pub rate_limit_header: String,
}

impl Default for FetcherSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(60),
            rate_limit_header: DEFAULT_RATE_LIMIT_HEADER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    pub backoff_base: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 6,
            backoff_base: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_base: f64) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    /// `min(60s, backoff_base ^ attempt)` for a 1-based attempt number.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.backoff_base.powi(exponent);
        if !secs.is_finite() || secs >= MAX_BACKOFF.as_secs_f64() {
            return MAX_BACKOFF;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// Wait after a 429: the server's integer-seconds hint when it parses,
    /// otherwise the regular backoff.
    pub fn rate_limit_delay(&self, retry_after: Option<&str>, attempt: u32) -> Duration {
        retry_after
            .and_then(|hint| hint.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| self.delay_for_attempt(attempt))
    }
}

/// What the retry loop does with one reply.
enum Verdict {
    Done(Value),
    Retry(FetchError, Duration),
    Fail(FetchError),
}

pub struct ResilientFetcher<T: HttpTransport = ReqwestTransport, S: Sleeper = TokioSleeper> {
    transport: T,
    sleeper: S,
    rate_limit_header: String,
}

impl ResilientFetcher {
    /// Fetcher backed by a single reqwest client and tokio timers.
    pub fn new(settings: &FetcherSettings) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new(settings)?;
        Ok(Self::with_parts(transport, TokioSleeper, settings))
    }
}

impl<T: HttpTransport, S: Sleeper> ResilientFetcher<T, S> {
    pub fn with_parts(transport: T, sleeper: S, settings: &FetcherSettings) -> Self {
        Self {
            transport,
            sleeper,
            rate_limit_header: settings.rate_limit_header.clone(),
        }
    }

    /// Fetches the listings JSON, retrying rate limits, 5xx and network errors.
    ///
    /// Other non-2xx statuses and undecodable 2xx bodies fail at once. After
    /// `policy.max_retries` transient failures the last one is returned inside
    /// `FetchError::RetriesExhausted`. A budget of 0 still makes one attempt.
    pub async fn fetch(
        &self,
        params: &QueryParameters,
        policy: RetryPolicy,
    ) -> Result<Value, FetchError> {
        let max_attempts = policy.max_retries.max(1);
        let mut last_error: Option<FetchError> = None;

        for attempt in 1..=max_attempts {
            tracing::debug!("GET attempt {}/{} with {:?}", attempt, max_attempts, params);

            let verdict = match self.transport.get(params).await {
                Ok(reply) => self.judge(reply, &policy, attempt),
                Err(err) => {
                    let wait = policy.delay_for_attempt(attempt);
                    Verdict::Retry(err, wait)
                }
            };

            match verdict {
                Verdict::Done(payload) => {
                    if attempt > 1 {
                        tracing::info!("✅ Request succeeded on attempt {}", attempt);
                    }
                    return Ok(payload);
                }
                Verdict::Fail(err) => {
                    tracing::error!("❌ Non-retryable failure: {}", err);
                    return Err(err);
                }
                Verdict::Retry(err, wait) => {
                    tracing::warn!(
                        "⚠️ {} -> waiting {} (attempt {}/{})",
                        err,
                        format_wait(wait),
                        attempt,
                        max_attempts
                    );
                    self.sleeper.sleep(wait).await;
                    last_error = Some(err);
                }
            }
        }

        tracing::error!("❌ Max retries reached; check connectivity or ticket quota");
        Err(FetchError::RetriesExhausted {
            attempts: max_attempts,
            last: Box::new(
                last_error.unwrap_or_else(|| FetchError::network("no attempt was made")),
            ),
        })
    }

    fn judge(&self, reply: HttpReply, policy: &RetryPolicy, attempt: u32) -> Verdict {
        match reply.status {
            200..=299 => match serde_json::from_str(&reply.body) {
                Ok(payload) => Verdict::Done(payload),
                Err(err) => Verdict::Fail(FetchError::InvalidJson(err)),
            },
            429 => {
                let retry_after = reply.header(&self.rate_limit_header).map(str::to_string);
                let wait = policy.rate_limit_delay(retry_after.as_deref(), attempt);
                Verdict::Retry(FetchError::RateLimited { retry_after }, wait)
            }
            500..=599 => Verdict::Retry(
                FetchError::ServerError {
                    status: reply.status,
                },
                policy.delay_for_attempt(attempt),
            ),
            status => Verdict::Fail(FetchError::ClientError {
                status,
                body: truncate(&reply.body, 200),
            }),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
