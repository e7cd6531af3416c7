pub mod licitaciones_pipeline;

pub use licitaciones_pipeline::LicitacionesPipeline;
