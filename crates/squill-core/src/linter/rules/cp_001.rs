//! LINT_CP_001: Keyword capitalisation.

use crate::linter::config::KeywordPolicy;
use crate::linter::rule::{LintContext, LintRule};
use crate::types::{violation_codes, LintFix, Violation};

pub struct KeywordCapitalisation;

impl LintRule for KeywordCapitalisation {
    fn code(&self) -> &'static str {
        violation_codes::LINT_CP_001
    }

    fn name(&self) -> &'static str {
        "Keyword capitalisation"
    }

    fn description(&self) -> &'static str {
        "Keywords should follow the configured capitalisation policy."
    }

    fn check(&self, ctx: &LintContext) -> Vec<Violation> {
        let mut violations = Vec::new();

        for segment in ctx.tree.iter().filter(|s| s.is_type("keyword")) {
            let span = segment.marker().templated;
            // Keywords produced by templating have no source image and are
            // not ours to police.
            if ctx.rendered.source_span_for(span).is_none() {
                continue;
            }

            let (expected, case_name) = match ctx.config.keyword_policy {
                KeywordPolicy::Upper => (segment.raw().to_ascii_uppercase(), "upper"),
                KeywordPolicy::Lower => (segment.raw().to_ascii_lowercase(), "lower"),
            };
            if segment.raw() != expected {
                violations.push(
                    Violation::warning(
                        violation_codes::LINT_CP_001,
                        format!("Keyword {:?} should be {case_name} case.", segment.raw()),
                    )
                    .with_span(span)
                    .with_fix(LintFix {
                        span,
                        replacement: expected,
                    }),
                );
            }
        }

        violations
    }
}
