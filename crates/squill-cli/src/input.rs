//! Input handling: path expansion and stdin support.

use anyhow::{Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Expands the positional arguments into a flat, ordered list of SQL files.
///
/// Directories are walked recursively; their `.sql` files are collected in
/// sorted order so runs are deterministic. Plain files are taken as given,
/// whatever their extension.
pub fn expand_paths(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut expanded = Vec::new();
    for path in paths {
        if path.is_dir() {
            collect_sql_files(path, &mut expanded)
                .with_context(|| format!("Failed to list directory: {}", path.display()))?;
        } else {
            expanded.push(path.clone());
        }
    }
    Ok(expanded)
}

fn collect_sql_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for entry in entries {
        if entry.is_dir() {
            collect_sql_files(&entry, out)?;
        } else if entry.extension().is_some_and(|ext| ext == "sql") {
            out.push(entry);
        }
    }
    Ok(())
}

/// Reads SQL from stdin.
pub fn read_stdin() -> Result<String> {
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read from stdin")?;
    Ok(content)
}
