//! Lint rule implementations, one module per rule code.

mod cp_001;
mod jj_001;
mod lt_001;
mod lt_002;
mod lt_003;

use crate::linter::rule::LintRule;

pub use cp_001::KeywordCapitalisation;
pub use jj_001::JinjaPadding;
pub use lt_001::TrailingWhitespace;
pub use lt_002::IndentationConsistency;
pub use lt_003::LineLength;

/// Every rule this crate ships, in code order.
pub fn all_rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(KeywordCapitalisation),
        Box::new(TrailingWhitespace),
        Box::new(IndentationConsistency),
        Box::new(LineLength),
        Box::new(JinjaPadding),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_codes_are_unique() {
        let rules = all_rules();
        let mut codes: Vec<&str> = rules.iter().map(|rule| rule.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), rules.len());
    }
}
