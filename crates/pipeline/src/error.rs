//! Per-step pipeline errors.

use std::fmt;
use std::time::Duration;

use cuedeck_core::error::CoreError;
use cuedeck_core::types::DbId;

use crate::convert::ConvertError;
use crate::generation::GenerationError;
use crate::storage::StorageError;
use crate::store::StoreError;

/// The pipeline step an error or deadline belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStep {
    Lookup,
    Fetch,
    Convert,
    Generate,
    Persist,
}

impl PipelineStep {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lookup => "lookup",
            Self::Fetch => "fetch",
            Self::Convert => "convert",
            Self::Generate => "generate",
            Self::Persist => "persist",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a job was rejected.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid job: {0}")]
    InvalidJob(#[from] CoreError),

    #[error("No file row for {0}")]
    UnknownFile(DbId),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] StorageError),

    #[error("Conversion failed: {0}")]
    Convert(#[from] ConvertError),

    #[error("Generation failed: {0}")]
    Generate(#[from] GenerationError),

    #[error("Persist failed: {0}")]
    Persist(#[from] StoreError),

    #[error("Step '{step}' exceeded its {}s deadline", after.as_secs())]
    Timeout { step: PipelineStep, after: Duration },
}

impl PipelineError {
    pub fn step(&self) -> Option<PipelineStep> {
        match self {
            Self::InvalidJob(_) => None,
            Self::UnknownFile(_) => Some(PipelineStep::Lookup),
            Self::Fetch(_) => Some(PipelineStep::Fetch),
            Self::Convert(_) => Some(PipelineStep::Convert),
            Self::Generate(_) => Some(PipelineStep::Generate),
            Self::Persist(_) => Some(PipelineStep::Persist),
            Self::Timeout { step, .. } => Some(*step),
        }
    }
}
