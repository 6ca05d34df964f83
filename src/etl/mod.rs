//! Core ETL (Extract, Transform, Load) abstractions
//!
//! This module provides the trait definitions sources, transformers and
//! sinks implement, the [`Pipeline`] that chains them, and the [`runner`]
//! entry points that wire the default CSV → adults → Parquet job.

mod extract;
mod load;
mod pipeline;
pub mod runner;
mod transform;

pub use extract::Extractor;
pub use load::Loader;
pub use pipeline::{Pipeline, Rows};
pub use runner::{run, run_from_s3, run_with};
pub use transform::Transformer;
