use crate::core::fetcher::{FetcherSettings, RetryPolicy};
use crate::domain::model::{ListingRecord, LoadReport, QueryParameters, Table, TransformResult};
use crate::utils::error::{FetchError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

/// Status, headers and body of one HTTP exchange.
#[derive(Debug, Clone, Default)]
pub struct HttpReply {
    pub status: u16,
    /// Header names are stored lowercased.
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpReply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Issues a single GET. Connection failures and timeouts come back as
/// `FetchError::Network`; every HTTP status, including errors, is a reply.
pub trait HttpTransport: Send + Sync {
    fn get(
        &self,
        params: &QueryParameters,
    ) -> impl Future<Output = std::result::Result<HttpReply, FetchError>> + Send;
}

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

pub trait Storage: Send + Sync {
    /// Writes `table` as CSV to `path` (relative to the storage root) and
    /// returns the full path written.
    fn write_table(
        &self,
        path: &str,
        table: &Table,
    ) -> impl Future<Output = Result<String>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn query(&self) -> &QueryParameters;
    fn fetcher_settings(&self) -> &FetcherSettings;
    fn retry_policy(&self) -> RetryPolicy;
    /// `None` when SQLite export is disabled.
    fn sqlite_path(&self) -> Option<PathBuf>;
    fn required_fields(&self) -> &[String];
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<ListingRecord>>;
    async fn transform(&self, data: Vec<ListingRecord>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<LoadReport>;
}
