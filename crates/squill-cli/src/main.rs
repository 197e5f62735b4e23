//! squill - SQL linter and fixer CLI.

use squill_cli::cli::{Args, OutputFormat};
use squill_cli::output::{format_lint_json, format_lint_results, format_summary};
use squill_cli::reporter::CliReporter;
use squill_cli::{input, worker};

use anyhow::{Context, Result};
use clap::Parser;
use is_terminal::IsTerminal;
use squill_core::{
    get_runner, FileLintResult, Formatter, LintConfig, Linter, TemplateConfig, WORKER_FLAG,
};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

/// Lint violations found.
const EXIT_FAILURE: u8 = 1;
/// Configuration error (unreadable input, bad arguments).
const EXIT_CONFIG_ERROR: u8 = 66;

fn main() -> ExitCode {
    // Worker mode bypasses clap entirely: the process pool launches
    // `squill --squill-worker` and owns both ends of the pipe.
    if std::env::args().nth(1).as_deref() == Some(WORKER_FLAG) {
        return worker::run();
    }

    let args = Args::parse();
    init_tracing(args.quiet);

    match run_lint(args) {
        Ok(true) => ExitCode::from(EXIT_FAILURE),
        Ok(false) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("squill: error: {err:#}");
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "error" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run_lint(args: Args) -> Result<bool> {
    let started_at = Instant::now();
    let config = build_config(&args);

    if args.paths.is_empty() {
        return lint_stdin(&args, config, started_at);
    }

    let paths = input::expand_paths(&args.paths)?;
    let colored =
        args.output.is_none() && args.format == OutputFormat::Table && std::io::stdout().is_terminal();
    let streaming = args.format == OutputFormat::Table && args.output.is_none();

    let mut linter = Linter::new(config);
    if streaming {
        let reporter: Arc<dyn Formatter> = Arc::new(CliReporter::new(colored, args.quiet));
        linter = linter.with_formatter(reporter);
    }

    let runner = get_runner(Arc::new(linter), args.parallel, !args.no_process_parallelism);

    let mut results = Vec::new();
    for item in runner.run(&paths, args.fix) {
        results.push(item?);
    }

    if args.fix {
        write_fixes(&results, args.quiet)?;
    }

    let elapsed = started_at.elapsed();
    if streaming {
        if !args.quiet {
            println!("{}", format_summary(&results, elapsed));
        }
    } else {
        let output_str = match args.format {
            OutputFormat::Json => format_lint_json(&results, false),
            OutputFormat::Table => format_lint_results(&results, colored, elapsed),
        };
        write_output(&args.output, &output_str)?;
    }

    Ok(results.iter().any(FileLintResult::has_violations))
}

fn lint_stdin(args: &Args, config: LintConfig, started_at: Instant) -> Result<bool> {
    let source = input::read_stdin()?;
    let rendered = Linter::render_string("<stdin>".to_string(), source, config);
    let rule_set = Linter::get_ruleset(&rendered.config);
    let result = Linter::lint_rendered(&rendered, &rule_set, args.fix, None)
        .map_err(anyhow::Error::new)?;

    if args.fix && result.fixed_source.is_some() && !args.quiet {
        eprintln!("squill: auto-fixes on stdin input affect the report only; no file was written");
    }

    let results = [result];
    let output_str = match args.format {
        OutputFormat::Json => format_lint_json(&results, false),
        OutputFormat::Table => format_lint_results(&results, false, started_at.elapsed()),
    };
    write_output(&args.output, &output_str)?;

    Ok(results[0].has_violations())
}

fn build_config(args: &Args) -> LintConfig {
    LintConfig {
        disabled_rules: args.exclude_rules.clone(),
        template: TemplateConfig {
            mode: args.template.map(Into::into).unwrap_or_default(),
            context: parse_template_vars(&args.template_vars),
        },
        ..LintConfig::default()
    }
}

/// Parses template variables from KEY=VALUE format into a JSON context.
///
/// Values are parsed as JSON when valid, otherwise treated as strings.
fn parse_template_vars(
    vars: &[String],
) -> std::collections::HashMap<String, serde_json::Value> {
    let mut context = std::collections::HashMap::new();

    for var in vars {
        if let Some((key, value)) = var.split_once('=') {
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() {
                continue;
            }
            let json_value = serde_json::from_str(value)
                .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
            context.insert(key.to_string(), json_value);
        }
    }

    context
}

/// Writes patched sources back to disk.
fn write_fixes(results: &[FileLintResult], quiet: bool) -> Result<()> {
    let mut files_modified = 0usize;
    let mut fixes_applied = 0usize;

    for result in results {
        let Some(fixed) = &result.fixed_source else {
            continue;
        };
        std::fs::write(&result.name, fixed)
            .with_context(|| format!("Failed to write fixed SQL to {}", result.name))?;
        files_modified += 1;
        fixes_applied += result.num_fixable();
    }

    if !quiet && files_modified > 0 {
        eprintln!("squill: applied {fixes_applied} auto-fix(es) across {files_modified} file(s)");
    }
    Ok(())
}

fn write_output(path: &Option<PathBuf>, content: &str) -> Result<()> {
    if let Some(path) = path {
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write to {}", path.display()))?;
    } else {
        let mut stdout = std::io::stdout().lock();
        stdout
            .write_all(content.as_bytes())
            .context("Failed to write to stdout")?;
        if !content.ends_with('\n') {
            let _ = stdout.write_all(b"\n");
        }
    }
    Ok(())
}
