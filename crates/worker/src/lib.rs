//! Supervised pool of pipeline workers.
//!
//! The pool is a library so the API server can host it in-process (and
//! share its notification hub) while the `cuedeck-worker` binary runs it
//! headless.

pub mod config;
pub mod pool;
pub mod setup;

pub use config::WorkerConfig;
pub use pool::{WorkerError, WorkerPool};
