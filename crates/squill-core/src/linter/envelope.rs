//! Transport-safe failure envelope.
//!
//! Worker pools must never let a per-file failure crash a worker or the
//! pool. Instead the failure is caught at the point it happens and wrapped
//! in a [`DelayedFailure`]: the original error, the diagnostic trace
//! captured right there, and the file it belongs to. The envelope derives
//! serde end to end — backtraces themselves are not transportable, so the
//! trace is rendered to a string at capture time, which makes the envelope
//! transportable by construction rather than by per-call setup.

use crate::error::LintError;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::backtrace::Backtrace;

/// A failure captured in a worker, delivered to the controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayedFailure {
    fname: String,
    error: LintError,
    trace: String,
}

impl DelayedFailure {
    /// Wraps `error`, capturing the diagnostic trace at the call site.
    ///
    /// Capture is forced, so the trace is non-empty regardless of
    /// `RUST_BACKTRACE`; the env var only controls frame detail.
    pub fn capture(fname: impl Into<String>, error: LintError) -> Self {
        Self {
            fname: fname.into(),
            error,
            trace: Backtrace::force_capture().to_string(),
        }
    }

    /// Wraps a caught panic payload as an internal error.
    pub fn from_panic(fname: impl Into<String>, payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "worker panicked".to_string()
        };
        Self::capture(fname, LintError::internal(format!("panic: {message}")))
    }

    /// The file whose work unit failed.
    pub fn fname(&self) -> &str {
        &self.fname
    }

    /// The diagnostic trace captured at the point of failure.
    pub fn trace(&self) -> &str {
        &self.trace
    }

    /// Whether the wrapped error aborts the whole run.
    pub fn is_fatal(&self) -> bool {
        self.error.is_fatal()
    }

    /// Hands back the original error, identical in kind and message to what
    /// was raised at the point of failure.
    pub fn reraise(self) -> LintError {
        self.error
    }

    /// Decomposes the envelope for reporting.
    pub fn into_parts(self) -> (String, LintError, String) {
        (self.fname, self.error, self.trace)
    }
}
