//! CLI argument parsing using clap.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// squill - SQL linter and fixer
#[derive(Parser, Debug)]
#[command(name = "squill")]
#[command(about = "Lint and fix SQL files", long_about = None)]
#[command(version)]
pub struct Args {
    /// SQL files or directories to lint (reads from stdin if none provided)
    #[arg(value_name = "PATHS")]
    pub paths: Vec<PathBuf>,

    /// Apply deterministic auto-fixes in place
    #[arg(long)]
    pub fix: bool,

    /// Number of parallel workers (1 = sequential)
    #[arg(short, long, default_value = "1")]
    pub parallel: usize,

    /// Comma-separated list of rule codes to exclude (e.g., LINT_LT_003)
    #[arg(long, value_delimiter = ',')]
    pub exclude_rules: Vec<String>,

    /// Template mode for preprocessing SQL
    #[arg(long, value_enum)]
    pub template: Option<TemplateArg>,

    /// Template variable in KEY=VALUE format (can be repeated)
    #[arg(long = "template-var", value_name = "KEY=VALUE")]
    pub template_vars: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "table", value_enum)]
    pub format: OutputFormat,

    /// Output file (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Suppress warnings and progress on stderr
    #[arg(short, long)]
    pub quiet: bool,

    /// Use threads instead of worker processes for parallel runs
    #[arg(long, hide = true)]
    pub no_process_parallelism: bool,
}

/// Template mode for SQL preprocessing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TemplateArg {
    /// Plain Jinja2 templating
    Jinja,
    /// dbt-style templating with builtin macros
    Dbt,
}

impl From<TemplateArg> for squill_core::TemplateMode {
    fn from(arg: TemplateArg) -> Self {
        match arg {
            TemplateArg::Jinja => squill_core::TemplateMode::Jinja,
            TemplateArg::Dbt => squill_core::TemplateMode::Dbt,
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let args = Args::try_parse_from(["squill", "a.sql"]).unwrap();
        assert_eq!(args.paths, [PathBuf::from("a.sql")]);
        assert_eq!(args.parallel, 1);
        assert_eq!(args.format, OutputFormat::Table);
        assert!(!args.fix);
    }

    #[test]
    fn parses_exclude_rules_as_comma_list() {
        let args =
            Args::try_parse_from(["squill", "--exclude-rules", "LINT_CP_001,LINT_LT_003", "a.sql"])
                .unwrap();
        assert_eq!(args.exclude_rules, ["LINT_CP_001", "LINT_LT_003"]);
    }

    #[test]
    fn parses_parallel_and_template() {
        let args = Args::try_parse_from([
            "squill",
            "-p",
            "4",
            "--template",
            "jinja",
            "--template-var",
            "tbl=users",
            "a.sql",
        ])
        .unwrap();
        assert_eq!(args.parallel, 4);
        assert_eq!(args.template, Some(TemplateArg::Jinja));
        assert_eq!(args.template_vars, ["tbl=users"]);
    }
}
