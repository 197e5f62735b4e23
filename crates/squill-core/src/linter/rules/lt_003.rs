//! LINT_LT_003: Line length.

use crate::linter::rule::{LintContext, LintRule};
use crate::types::{violation_codes, Span, Violation};

pub struct LineLength;

impl LintRule for LineLength {
    fn code(&self) -> &'static str {
        violation_codes::LINT_LT_003
    }

    fn name(&self) -> &'static str {
        "Line length"
    }

    fn description(&self) -> &'static str {
        "Lines should not exceed the configured maximum length."
    }

    fn check(&self, ctx: &LintContext) -> Vec<Violation> {
        let max = ctx.config.max_line_length;
        if max == 0 {
            return Vec::new();
        }

        let mut violations = Vec::new();
        let mut line_start = 0usize;
        let text = ctx.templated();

        for line in text.split_inclusive('\n') {
            let content = line.trim_end_matches(['\n', '\r']);
            let length = content.chars().count();
            if length > max {
                violations.push(
                    Violation::warning(
                        violation_codes::LINT_LT_003,
                        format!("Line is too long ({length} > {max})."),
                    )
                    .with_span(Span::new(line_start, line_start + content.len())),
                );
            }
            line_start += line.len();
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

    fn run_with_max(sql: &str, max_line_length: usize) -> Vec<Violation> {
        let config = LintConfig {
            max_line_length,
            ..LintConfig::default()
        };
        let rendered = Linter::render_string("q.sql".to_string(), sql.to_string(), config);
        let tree = parse_rendered(&rendered).unwrap();
        let ctx = LintContext {
            rendered: &rendered,
            tree: &tree,
            config: &rendered.config,
        };
        LineLength.check(&ctx)
    }

    #[test]
    fn short_lines_pass() {
        assert!(run_with_max("SELECT 1\nFROM t\n", 80).is_empty());
    }

    #[test]
    fn long_line_is_flagged_once() {
        let violations = run_with_max("SELECT 1 FROM somewhere\n", 10);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].message.contains("23 > 10"));
    }

    #[test]
    fn zero_maximum_disables_the_check() {
        assert!(run_with_max("SELECT 1 FROM somewhere\n", 0).is_empty());
    }
}
