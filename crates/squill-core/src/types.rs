//! Result types shared between the linter, the runner and consumers.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Machine-readable violation codes.
pub mod violation_codes {
    /// Keyword capitalisation.
    pub const LINT_CP_001: &str = "LINT_CP_001";
    /// Trailing whitespace.
    pub const LINT_LT_001: &str = "LINT_LT_001";
    /// Indentation consistency.
    pub const LINT_LT_002: &str = "LINT_LT_002";
    /// Line length.
    pub const LINT_LT_003: &str = "LINT_LT_003";
    /// Jinja tag padding.
    pub const LINT_JJ_001: &str = "LINT_JJ_001";
    /// Template rendering failed; the file was linted against its raw source.
    pub const TEMPLATE_ERROR: &str = "TEMPLATE_ERROR";
}

/// Byte span within a text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Span {
    /// Byte offset from start of the buffer (inclusive).
    pub start: usize,
    /// Byte offset from start of the buffer (exclusive).
    pub end: usize,
}

impl Span {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A zero-width span at `offset`.
    pub const fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Severity of a lint violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A deterministic rewrite attached to a violation.
///
/// The span is in templated space; it is only applied when it maps cleanly
/// back onto literal source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LintFix {
    pub span: Span,
    pub replacement: String,
}

/// A single lint violation found in one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Severity level.
    pub severity: Severity,

    /// Machine-readable violation code.
    pub code: String,

    /// Human-readable message.
    pub message: String,

    /// Location in the templated text, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,

    /// 1-based source line, filled in once the file's source map is known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_no: Option<usize>,

    /// 1-based source column.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_pos: Option<usize>,

    /// Optional deterministic fix.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<LintFix>,
}

impl Violation {
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, code, message)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, code, message)
    }

    pub fn info(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Info, code, message)
    }

    fn with_severity(
        severity: Severity,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code: code.into(),
            message: message.into(),
            span: None,
            line_no: None,
            line_pos: None,
            fix: None,
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_fix(mut self, fix: LintFix) -> Self {
        self.fix = Some(fix);
        self
    }
}

/// The outcome of linting one file.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileLintResult {
    /// File name (or `<stdin>`).
    pub name: String,

    /// Violations found, sorted by position.
    pub violations: Vec<Violation>,

    /// Patched source text, present when fixing was requested and at least
    /// one fix could be applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_source: Option<String>,
}

impl FileLintResult {
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }

    /// Number of violations carrying an applicable fix.
    pub fn num_fixable(&self) -> usize {
        self.violations.iter().filter(|v| v.fix.is_some()).count()
    }
}
