//! LINT_JJ_001: Jinja tag padding.
//!
//! Checks the *retained source text* of placeholder segments, so it works on
//! the tags exactly as they were written even though they no longer appear
//! in the rendered output.

use crate::linter::rule::{LintContext, LintRule};
use crate::types::{violation_codes, Violation};
use regex::Regex;

pub struct JinjaPadding;

impl LintRule for JinjaPadding {
    fn code(&self) -> &'static str {
        violation_codes::LINT_JJ_001
    }

    fn name(&self) -> &'static str {
        "Jinja padding"
    }

    fn description(&self) -> &'static str {
        "Jinja tags should have a single space of padding inside the delimiters."
    }

    fn check(&self, ctx: &LintContext) -> Vec<Violation> {
        let mut violations = Vec::new();

        for segment in ctx.tree.iter().filter(|s| s.is_type("placeholder")) {
            let Some(source_str) = segment.source_str() else {
                continue;
            };
            if segment.block_type() == Some("comment") {
                continue;
            }
            if is_badly_padded(source_str) {
                violations.push(
                    Violation::info(
                        violation_codes::LINT_JJ_001,
                        format!("Jinja tag {source_str:?} should be padded with single spaces."),
                    )
                    .with_span(segment.marker().templated),
                );
            }
        }

        violations
    }
}

fn is_badly_padded(tag: &str) -> bool {
    has_re(tag, r"^\{\{[^ \n\-+]")
        || has_re(tag, r"[^ \n\-+]\}\}$")
        || has_re(tag, r"^\{%[^ \n\-+]")
        || has_re(tag, r"[^ \n\-+]%\}$")
}

fn has_re(haystack: &str, pattern: &str) -> bool {
    Regex::new(pattern).expect("valid regex").is_match(haystack)
}
