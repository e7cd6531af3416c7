pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{LocalStorage, SqliteSink};
pub use app::pipelines::LicitacionesPipeline;
pub use config::{AppConfig, ConfigOverrides};
pub use core::{
    etl::EtlEngine,
    fetcher::{FetcherSettings, ResilientFetcher, RetryPolicy},
    parser::ResponseParser,
};
pub use domain::model::{ListingRecord, ListingStatus, QueryParameters, RunSummary, Ticket};
pub use utils::error::{EtlError, FetchError, Result};
