//! LINT_LT_002: Indentation consistency.
//!
//! Expected indentation is derived from the indent/dedent meta segments the
//! lexer synthesizes, via their signed `indent_val`. Meta segments that
//! precede the first token of a line count towards that line's expected
//! level, so a closing bracket's dedent applies to its own line.

use crate::linter::rule::{LintContext, LintRule};
use crate::parser::segment::Segment;
use crate::types::{violation_codes, Violation};

pub struct IndentationConsistency;

impl LintRule for IndentationConsistency {
    fn code(&self) -> &'static str {
        violation_codes::LINT_LT_002
    }

    fn name(&self) -> &'static str {
        "Indentation"
    }

    fn description(&self) -> &'static str {
        "Line indentation should match the bracket nesting level."
    }

    fn check(&self, ctx: &LintContext) -> Vec<Violation> {
        let tab_size = ctx.config.tab_space_size.max(1);
        let mut violations = Vec::new();

        let mut balance: i32 = 0;
        let mut at_line_start = true;
        let mut line_ws: Option<&Segment> = None;

        for segment in ctx.tree.children() {
            if segment.is_meta() {
                balance += i32::from(segment.indent_val());
                continue;
            }
            match segment.seg_type() {
                "newline" => {
                    at_line_start = true;
                    line_ws = None;
                }
                "whitespace" if at_line_start => {
                    line_ws = Some(segment);
                }
                // comment-only lines keep whatever indent they have
                "comment" => {
                    at_line_start = false;
                }
                _ => {
                    if !at_line_start {
                        continue;
                    }
                    at_line_start = false;
                    let span = segment.marker().templated;
                    if ctx.rendered.source_span_for(span).is_none() {
                        continue;
                    }
                    let expected = usize::try_from(balance.max(0)).unwrap_or(0) * tab_size;
                    let actual = line_ws.map_or(0, |ws| indent_width(ws.raw(), tab_size));
                    if actual != expected {
                        let report_span = line_ws.map_or(span, |ws| ws.marker().templated);
                        violations.push(
                            Violation::warning(
                                violation_codes::LINT_LT_002,
                                format!(
                                    "Expected indent of {expected} spaces, found {actual}."
                                ),
                            )
                            .with_span(report_span),
                        );
                    }
                }
            }
        }

        violations
    }
}

fn indent_width(raw: &str, tab_size: usize) -> usize {
    raw.chars()
        .map(|c| if c == '\t' { tab_size } else { 1 })
        .sum()
}
