//! Pipeline error types.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal pipeline errors.
///
/// Per-record problems (bad timestamps, duplicate ids, non-string text) are
/// not errors: they are skip reasons tallied in [`crate::pipeline::AuditCounts`].
/// Everything here aborts the whole analysis with no partial output.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The input file could not be read.
    #[error("failed to read input {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input container is not one of the supported shapes, or is
    /// truncated mid-stream.
    #[error("malformed input container in {path}: {detail}")]
    MalformedInput { path: PathBuf, detail: String },

    /// The input file is empty.
    #[error("input file {path} is empty")]
    EmptyInput { path: PathBuf },

    /// Posterior computation rejected its inputs; indicates an internal
    /// counting bug, since day series are derived from our own aggregates.
    #[error("posterior computation failed")]
    Posterior(#[from] cs_math::posterior::PosteriorError),
}
