//! LINT_LT_001: Trailing whitespace.

use crate::linter::rule::{LintContext, LintRule};
use crate::parser::segment::Segment;
use crate::types::{violation_codes, LintFix, Violation};

pub struct TrailingWhitespace;

impl LintRule for TrailingWhitespace {
    fn code(&self) -> &'static str {
        violation_codes::LINT_LT_001
    }

    fn name(&self) -> &'static str {
        "Trailing whitespace"
    }

    fn description(&self) -> &'static str {
        "Lines should not end in whitespace."
    }

    fn check(&self, ctx: &LintContext) -> Vec<Violation> {
        let leaves: Vec<&Segment> = ctx
            .tree
            .iter()
            .filter(|s| s.children().is_empty() && !s.is_meta())
            .collect();

        let mut violations = Vec::new();
        for (index, segment) in leaves.iter().enumerate() {
            if !segment.is_type("whitespace") {
                continue;
            }
            let at_line_end = leaves
                .get(index + 1)
                .is_none_or(|next| next.is_type("newline"));
            if at_line_end {
                let span = segment.marker().templated;
                violations.push(
                    Violation::warning(
                        violation_codes::LINT_LT_001,
                        "Trailing whitespace at end of line.",
                    )
                    .with_span(span)
                    .with_fix(LintFix {
                        span,
                        replacement: String::new(),
                    }),
                );
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linter::config::LintConfig;
    use crate::linter::Linter;
    use crate::parser::lexer::parse_rendered;

    fn run(sql: &str) -> Vec<Violation> {
        let rendered = Linter::render_string(
            "q.sql".to_string(),
            sql.to_string(),
            LintConfig::default(),
        );
        let tree = parse_rendered(&rendered).unwrap();
        let ctx = LintContext {
            rendered: &rendered,
            tree: &tree,
            config: &rendered.config,
        };
        TrailingWhitespace.check(&ctx)
    }

    #[test]
    fn does_not_flag_clean_lines() {
        assert!(run("SELECT 1\nFROM t\n").is_empty());
    }

    #[test]
    fn flags_whitespace_before_newline() {
        let violations = run("SELECT 1  \nFROM t\n");
        assert_eq!(violations.len(), 1);
        let fix = violations[0].fix.as_ref().unwrap();
        assert_eq!(fix.replacement, "");
        assert_eq!(fix.span.len(), 2);
    }

    #[test]
    fn flags_whitespace_at_end_of_file() {
        let violations = run("SELECT 1   ");
        assert_eq!(violations.len(), 1);
    }

    #[test]
    fn interior_whitespace_is_fine() {
        assert!(run("SELECT  1").is_empty());
    }
}
