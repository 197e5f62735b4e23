//! Core SQL linting engine.
//!
//! Two subsystems carry the weight here:
//!
//! - the **segment model** ([`parser`]): parse trees whose nodes hold exact
//!   positions in both source and rendered coordinates, including virtual
//!   nodes — indentation markers and placeholders for text that templating
//!   removed — so no source fidelity is lost between a templated file and
//!   the SQL that is actually linted;
//! - the **runner** ([`linter::runner`]): sequential, thread-parallel and
//!   process-parallel execution of per-file lint work with streaming
//!   results, attributable failures and coordinated cancellation.
//!
//! Around them sit the templater (MiniJinja with a source map), the rule
//! set, and per-directory configuration resolution.

pub mod error;
pub mod linter;
pub mod parser;
pub mod templater;
pub mod types;

// Re-export main types and functions
pub use error::LintError;
pub use linter::config::{KeywordPolicy, LintConfig, CONFIG_FILENAME};
pub use linter::envelope::DelayedFailure;
pub use linter::pool::{run_worker, WorkerSpec, WORKER_FLAG};
pub use linter::rule::{LintContext, LintRule, RuleSet};
pub use linter::runner::{get_runner, interrupt_flag, Runner};
pub use linter::{Formatter, Linter};
pub use parser::lexer::parse_rendered;
pub use parser::marker::PositionMarker;
pub use parser::segment::{MetaKind, Segment, SegmentError};
pub use templater::{
    render_source, RenderedFile, SliceType, TemplateConfig, TemplateError, TemplateMode,
    TemplatedSlice,
};
pub use types::{violation_codes, FileLintResult, LintFix, Severity, Span, Violation};
