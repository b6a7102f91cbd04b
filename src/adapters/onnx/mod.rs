pub mod metadata;
pub mod model_catalog;
pub mod ort_engine;
pub mod pipeline;
