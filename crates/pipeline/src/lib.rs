//! The per-job processing pipeline.
//!
//! A job moves through fetch, optional conversion to PDF, card generation
//! and persistence. Each external system sits behind a trait so the
//! executor can be driven by fakes in tests:
//!
//! - [`storage::ObjectStore`]: S3 object storage
//! - [`convert::DocumentConverter`]: headless office suite
//! - [`generation::CardGenerator`]: Gemini
//! - [`store::JobStore`]: PostgreSQL

pub mod backoff;
pub mod convert;
pub mod error;
pub mod executor;
pub mod generation;
pub mod storage;
pub mod store;

pub use error::{PipelineError, PipelineStep};
pub use executor::{JobOutcome, PipelineConfig, PipelineExecutor};
