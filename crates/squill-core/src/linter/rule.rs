//! Lint rule trait, context and rule-set construction.

use crate::linter::config::LintConfig;
use crate::linter::rules;
use crate::parser::segment::Segment;
use crate::templater::RenderedFile;
use crate::types::Violation;

/// Context provided to lint rules during a check.
pub struct LintContext<'a> {
    /// The rendered file being linted, including its source map.
    pub rendered: &'a RenderedFile,
    /// The parsed segment tree.
    pub tree: &'a Segment,
    /// The file's effective configuration.
    pub config: &'a LintConfig,
}

impl LintContext<'_> {
    /// The rendered text the tree was parsed from.
    pub fn templated(&self) -> &str {
        &self.rendered.templated
    }
}

/// A single lint rule, checked against one file's segment tree.
pub trait LintRule: Send + Sync {
    /// Machine-readable rule code (e.g., "LINT_CP_001").
    fn code(&self) -> &'static str;

    /// Short human-readable name (e.g., "Keyword capitalisation").
    fn name(&self) -> &'static str;

    /// Longer description of what this rule checks.
    fn description(&self) -> &'static str;

    /// Check the file and return any violations found.
    fn check(&self, ctx: &LintContext) -> Vec<Violation>;
}

/// The set of rules enabled for one file.
///
/// Rule-sets are instantiated fresh per file, per execution: rules never
/// share state with another concurrently running execution.
pub struct RuleSet {
    rules: Vec<Box<dyn LintRule>>,
}

impl RuleSet {
    /// Builds the rule-set enabled by `config`.
    pub fn new(config: &LintConfig) -> Self {
        Self {
            rules: rules::all_rules()
                .into_iter()
                .filter(|rule| config.is_rule_enabled(rule.code()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Runs every rule and returns the combined violations in positional
    /// order.
    pub fn lint(&self, ctx: &LintContext) -> Vec<Violation> {
        let mut violations: Vec<Violation> = self
            .rules
            .iter()
            .flat_map(|rule| rule.check(ctx))
            .collect();
        violations.sort_by(|left, right| {
            let left_key = (left.span.map_or(usize::MAX, |s| s.start), &left.code);
            let right_key = (right.span.map_or(usize::MAX, |s| s.start), &right.code);
            left_key.cmp(&right_key)
        });
        violations
    }
}
