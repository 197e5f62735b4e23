//! SQL linter: rendering, rule execution and the concurrent runner.
//!
//! The [`Linter`] owns the base configuration and the optional formatter,
//! and exposes the collaborator surface the runner drives: `render_file`
//! (read + effective config + templating, always on the calling thread),
//! `get_ruleset` (fresh per file) and `lint_rendered` (parse → rules →
//! fixes). Execution strategies live in [`runner`].

pub mod config;
pub mod envelope;
pub(crate) mod pool;
pub mod rule;
pub mod rules;
pub mod runner;

use crate::error::LintError;
use crate::linter::config::LintConfig;
use crate::linter::rule::{LintContext, RuleSet};
use crate::parser::lexer::parse_rendered;
use crate::templater::{self, RenderedFile, SliceType, TemplatedSlice};
use crate::types::{violation_codes, FileLintResult, Span, Violation};
use std::path::Path;
use std::sync::Arc;
use tracing::trace;

const LINTER_TARGET: &str = "squill::linter";

/// Incremental reporting collaborator.
///
/// Owned exclusively by the controller: sequential execution carries it
/// into the work unit, parallel execution dispatches from the collection
/// loop, and it is never handed to worker processes.
pub trait Formatter: Send + Sync {
    /// Reports one file's result as soon as it is available.
    fn dispatch_file_violations(&self, path: &str, result: &FileLintResult, only_fixable: bool);
}

/// The SQL linter, holding the base configuration and optional formatter.
pub struct Linter {
    config: LintConfig,
    formatter: Option<Arc<dyn Formatter>>,
}

impl Linter {
    /// Creates a new linter with the given base configuration.
    pub fn new(config: LintConfig) -> Self {
        Self {
            config,
            formatter: None,
        }
    }

    /// Attaches a formatter for incremental reporting.
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// The base configuration (before per-directory overlays).
    pub fn config(&self) -> &LintConfig {
        &self.config
    }

    pub(crate) fn formatter(&self) -> Option<&dyn Formatter> {
        self.formatter.as_deref()
    }

    /// Reads and renders one file against its effective configuration.
    ///
    /// An unreadable file is a fatal i/o error. Anything after the read —
    /// bad encoding, template failures — is a per-file concern: encoding
    /// errors are internal failures, template errors become violations on
    /// the rendered file and linting proceeds against the raw source.
    pub fn render_file(&self, path: &Path) -> Result<RenderedFile, LintError> {
        let display = path.display().to_string();
        let bytes = std::fs::read(path).map_err(|err| LintError::io(&display, &err))?;
        let source = String::from_utf8(bytes)
            .map_err(|_| LintError::internal(format!("{display} is not valid utf-8")))?;
        let config = self.config.for_path(path);
        Ok(Self::render_string(display, source, config))
    }

    /// Renders in-memory source (stdin, tests) with the given effective
    /// configuration.
    pub fn render_string(name: String, source: String, config: LintConfig) -> RenderedFile {
        match templater::render_source(&source, &config.template) {
            Ok((templated, slices)) => RenderedFile {
                name,
                source,
                templated,
                slices,
                violations: Vec::new(),
                config,
            },
            Err(err) => {
                let violation = Violation::error(violation_codes::TEMPLATE_ERROR, err.to_string());
                let slices = vec![TemplatedSlice {
                    slice_type: SliceType::Literal,
                    source: Span::new(0, source.len()),
                    templated: Span::new(0, source.len()),
                }];
                RenderedFile {
                    name,
                    templated: source.clone(),
                    source,
                    slices,
                    violations: vec![violation],
                    config,
                }
            }
        }
    }

    /// Builds a fresh rule-set for one file's effective configuration.
    pub fn get_ruleset(config: &LintConfig) -> RuleSet {
        RuleSet::new(config)
    }

    /// Lints one rendered file: parse, run the rule-set, optionally apply
    /// fixes. `formatter` is present only when execution happens in the
    /// controlling process.
    pub fn lint_rendered(
        rendered: &RenderedFile,
        rule_set: &RuleSet,
        fix: bool,
        formatter: Option<&dyn Formatter>,
    ) -> Result<FileLintResult, LintError> {
        let tree = parse_rendered(rendered).map_err(|err| {
            LintError::internal(format!("failed to parse {}: {err}", rendered.name))
        })?;
        trace!(
            target: LINTER_TARGET,
            file = %rendered.name,
            tree = %tree.stringify(),
            "parsed segment tree"
        );
        let ctx = LintContext {
            rendered,
            tree: &tree,
            config: &rendered.config,
        };

        let mut violations = rendered.violations.clone();
        violations.extend(rule_set.lint(&ctx));
        position_violations(rendered, &mut violations);

        let fixed_source = if fix {
            apply_fixes(rendered, &violations)
        } else {
            None
        };

        let result = FileLintResult {
            name: rendered.name.clone(),
            violations,
            fixed_source,
        };
        if let Some(formatter) = formatter {
            formatter.dispatch_file_violations(&result.name, &result, fix);
        }
        Ok(result)
    }

    /// Convenience: render and lint a string in one step.
    pub fn lint_string(&self, name: &str, source: &str) -> Result<FileLintResult, LintError> {
        let rendered =
            Self::render_string(name.to_string(), source.to_string(), self.config.clone());
        let rule_set = Self::get_ruleset(&rendered.config);
        Self::lint_rendered(&rendered, &rule_set, false, None)
    }
}

/// Back-fills user-facing source positions from templated-space spans.
fn position_violations(rendered: &RenderedFile, violations: &mut [Violation]) {
    for violation in violations {
        if violation.line_no.is_some() {
            continue;
        }
        let offset = violation.span.map_or(0, |span| span.start);
        let source_offset = rendered.source_offset(offset);
        let (line, col) = line_col_at(&rendered.source, source_offset);
        violation.line_no = Some(line);
        violation.line_pos = Some(col);
    }
}

fn line_col_at(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let prefix = &text.as_bytes()[..offset];
    let line = 1 + prefix.iter().filter(|byte| **byte == b'\n').count();
    let col = offset - prefix.iter().rposition(|byte| *byte == b'\n').map_or(0, |p| p + 1) + 1;
    (line, col)
}

/// Applies fixes whose spans map cleanly onto literal source text, and
/// returns the patched source. Fixes inside templated regions are skipped:
/// rendered output is not source, and rewriting it would corrupt the file.
fn apply_fixes(rendered: &RenderedFile, violations: &[Violation]) -> Option<String> {
    let mut patches: Vec<(Span, &str)> = violations
        .iter()
        .filter_map(|violation| violation.fix.as_ref())
        .filter_map(|fix| {
            rendered
                .source_span_for(fix.span)
                .map(|span| (span, fix.replacement.as_str()))
        })
        .collect();
    if patches.is_empty() {
        return None;
    }
    patches.sort_by_key(|(span, _)| (span.start, span.end));

    let mut patched = String::with_capacity(rendered.source.len());
    let mut cursor = 0usize;
    for (span, replacement) in patches {
        if span.start < cursor {
            // overlapping fix; first one wins
            continue;
        }
        patched.push_str(&rendered.source[cursor..span.start]);
        patched.push_str(replacement);
        cursor = span.end;
    }
    patched.push_str(&rendered.source[cursor..]);
    Some(patched)
}
