// Application layer: concrete pipelines wiring core logic to adapters.

pub mod pipelines;
