pub mod etl;
pub mod fetcher;
pub mod fields;
pub mod flatten;
pub mod inspect;
pub mod parser;

pub use crate::domain::model::{ListingRecord, QueryParameters, Table, TransformResult};
pub use crate::domain::ports::{HttpTransport, Pipeline, Sleeper, Storage};
pub use crate::utils::error::Result;
