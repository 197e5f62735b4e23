//! Lint report formatting.

pub mod lint;

pub use lint::{format_file_block, format_lint_json, format_lint_results, format_summary};
