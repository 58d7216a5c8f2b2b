// /////////////////////////////////////////////////////////////////////////////
// repodata
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Error kinds shared across the whole workspace (spec §7).
//!
//! One enum, `#[from]` conversions for the underlying library errors, mirroring
//! the teacher's single `PipelineError` rather than a per-module error zoo.

use std::path::PathBuf;

/// All error kinds that can cross a component boundary in this workspace.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("invalid argument `{arg}`: {reason}")]
    BadArgument { arg: String, reason: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown compression type `{0}`")]
    UnknownCompression(String),

    #[error("malformed compressed stream: {0}")]
    MalformedStream(String),

    #[error("unknown checksum algorithm `{0}`")]
    UnknownAlgorithm(String),

    #[error("malformed rpm {path}: {reason}")]
    MalformedRpm { path: PathBuf, reason: String },

    #[error("malformed xml at line {line}: {reason}")]
    MalformedXml { line: usize, reason: String },

    #[error("sqlite error: {0}")]
    Sqlite(String),

    #[error("internal invariant violated: {0}")]
    Assertion(String),
}

impl RepoError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn malformed_rpm(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedRpm { path: path.into(), reason: reason.into() }
    }

    pub fn malformed_xml(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedXml { line, reason: reason.into() }
    }

    pub fn assertion(reason: impl Into<String>) -> Self {
        Self::Assertion(reason.into())
    }

    /// Process exit code the bootstrap layer maps this error to (spec §6:
    /// "Exit code 0 on success, 1 on argument or IO error").
    pub fn exit_code(&self) -> i32 {
        1
    }

    /// Whether this error is worker-local (logged as a warning, package
    /// dropped, cursors still advance) or writer-fatal (pool drained, staging
    /// removed, process exits non-zero). See spec §7 propagation policy.
    pub fn is_writer_fatal(&self) -> bool {
        matches!(self, Self::Sqlite(_) | Self::Assertion(_))
            || matches!(self, Self::Io { .. })
    }
}

pub type RepoResult<T> = Result<T, RepoError>;
