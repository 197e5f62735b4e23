//! Lint report rendering: per-file blocks, run summary and JSON output.

use owo_colors::OwoColorize;
use squill_core::{FileLintResult, Severity};
use std::fmt::Write as _;
use std::time::Duration;

/// Renders one file's verdict block.
///
/// ```text
/// FAIL queries/orders.sql
///   L:  2 | P:  1 | LINT_CP_001 | Keyword "from" should be upper case.
/// ```
pub fn format_file_block(result: &FileLintResult, colored: bool) -> String {
    let mut out = String::new();
    let verdict = if result.has_violations() {
        if colored {
            "FAIL".red().bold().to_string()
        } else {
            "FAIL".to_string()
        }
    } else if colored {
        "PASS".green().to_string()
    } else {
        "PASS".to_string()
    };
    let _ = writeln!(out, "{verdict} {}", result.name);

    for violation in &result.violations {
        let line = violation.line_no.unwrap_or(1);
        let pos = violation.line_pos.unwrap_or(1);
        let code = if colored {
            match violation.severity {
                Severity::Error => violation.code.red().to_string(),
                Severity::Warning => violation.code.yellow().to_string(),
                Severity::Info => violation.code.cyan().to_string(),
            }
        } else {
            violation.code.clone()
        };
        let _ = writeln!(
            out,
            "  L:{line:>4} | P:{pos:>3} | {code} | {}",
            violation.message
        );
    }
    out
}

/// Renders the end-of-run summary line.
pub fn format_summary(results: &[FileLintResult], elapsed: Duration) -> String {
    let files = results.len();
    let failed = results.iter().filter(|r| r.has_violations()).count();
    let violations: usize = results.iter().map(|r| r.violations.len()).sum();
    format!(
        "{files} file(s) linted, {failed} failed, {violations} violation(s) [{:.2}s]",
        elapsed.as_secs_f64()
    )
}

/// Renders the whole report at once (used when output is not streamed).
pub fn format_lint_results(
    results: &[FileLintResult],
    colored: bool,
    elapsed: Duration,
) -> String {
    let mut out = String::new();
    for result in results {
        out.push_str(&format_file_block(result, colored));
    }
    out.push_str(&format_summary(results, elapsed));
    out.push('\n');
    out
}

/// Renders results as JSON, sorted by filename for stable output whatever
/// the collection order of the run.
pub fn format_lint_json(results: &[FileLintResult], compact: bool) -> String {
    let mut sorted: Vec<&FileLintResult> = results.iter().collect();
    sorted.sort_by(|left, right| left.name.cmp(&right.name));

    let rendered = if compact {
        serde_json::to_string(&sorted)
    } else {
        serde_json::to_string_pretty(&sorted)
    };
    rendered.unwrap_or_else(|err| format!("{{\"error\":\"{err}\"}}"))
}
