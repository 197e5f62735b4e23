//! Run-level error taxonomy.
//!
//! Two categories matter to the runner:
//!
//! - [`LintError::Io`]: raw input/output failures (unreadable file). These
//!   signal a configuration problem and are fatal to the whole run.
//! - [`LintError::Internal`]: anything else that goes wrong while rendering
//!   or linting one file. These are soft: the file contributes no result,
//!   the failure is reported with its trace, and the run continues.
//!
//! The enum derives serde because failures are shipped across the worker
//! process boundary inside a [`crate::linter::envelope::DelayedFailure`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error raised while rendering or linting a file.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LintError {
    /// Raw input/output failure. Fatal to the run.
    #[error("i/o error on {path}: {message}")]
    Io { path: String, message: String },

    /// Any other per-file failure. Soft; the run continues.
    #[error("{message}")]
    Internal { message: String },
}

impl LintError {
    pub fn io(path: impl Into<String>, source: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Fatal errors abort the run; everything else is handled per file.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}
