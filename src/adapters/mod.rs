// Adapters layer: concrete implementations for external systems (http, files, sqlite).

pub mod http;
pub mod sqlite;
pub mod storage;

pub use http::{ReqwestTransport, TokioSleeper};
pub use sqlite::SqliteSink;
pub use storage::LocalStorage;
