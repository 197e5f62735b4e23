//! Linter configuration and per-file effective config resolution.
//!
//! Configuration is not globally uniform: any directory may carry a
//! `.squill.json` overlay, and the effective config for a file is the base
//! config with every ancestor overlay merged over it, nearest directory
//! last. Resolution happens at render time so each work unit is bound to
//! its own file's effective configuration.

use crate::templater::TemplateConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

const CONFIG_TARGET: &str = "squill::config";

/// Name of the per-directory configuration overlay file.
pub const CONFIG_FILENAME: &str = ".squill.json";

/// Capitalisation policy for keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeywordPolicy {
    /// Keywords should be upper case.
    #[default]
    Upper,
    /// Keywords should be lower case.
    Lower,
}

/// Configuration for the SQL linter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LintConfig {
    /// List of rule codes to disable (e.g., ["LINT_LT_003"]).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_rules: Vec<String>,

    /// Keyword capitalisation policy.
    #[serde(default)]
    pub keyword_policy: KeywordPolicy,

    /// Maximum allowed line length.
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,

    /// Spaces per indentation level (a tab counts as one level).
    #[serde(default = "default_tab_space_size")]
    pub tab_space_size: usize,

    /// Template preprocessing settings.
    #[serde(default)]
    pub template: TemplateConfig,
}

impl Default for LintConfig {
    fn default() -> Self {
        Self {
            disabled_rules: Vec::new(),
            keyword_policy: KeywordPolicy::default(),
            max_line_length: default_max_line_length(),
            tab_space_size: default_tab_space_size(),
            template: TemplateConfig::default(),
        }
    }
}

fn default_max_line_length() -> usize {
    80
}

fn default_tab_space_size() -> usize {
    4
}

impl LintConfig {
    /// Returns true if a specific rule is enabled.
    pub fn is_rule_enabled(&self, code: &str) -> bool {
        !self.disabled_rules.iter().any(|rule| rule == code)
    }

    /// Resolves the effective configuration for one file.
    ///
    /// Walks the file's ancestor directories for `.squill.json` overlays and
    /// merges them over this config, outermost first so the nearest
    /// directory wins. Unreadable or malformed overlays are reported and
    /// skipped; they never fail the resolution.
    pub fn for_path(&self, path: &Path) -> LintConfig {
        let full = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let mut overlays = Vec::new();
        let mut dir = full.parent();
        while let Some(current) = dir {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.is_file() {
                overlays.push(candidate);
            }
            dir = current.parent();
        }
        if overlays.is_empty() {
            return self.clone();
        }
        overlays.reverse();

        let mut value = match serde_json::to_value(self) {
            Ok(value) => value,
            Err(_) => return self.clone(),
        };
        for overlay_path in overlays {
            let text = match std::fs::read_to_string(&overlay_path) {
                Ok(text) => text,
                Err(err) => {
                    warn!(
                        target: CONFIG_TARGET,
                        file = %overlay_path.display(),
                        error = %err,
                        "ignoring unreadable config file"
                    );
                    continue;
                }
            };
            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(overlay) => merge_json(&mut value, overlay),
                Err(err) => {
                    warn!(
                        target: CONFIG_TARGET,
                        file = %overlay_path.display(),
                        error = %err,
                        "ignoring malformed config file"
                    );
                }
            }
        }

        serde_json::from_value(value).unwrap_or_else(|err| {
            warn!(
                target: CONFIG_TARGET,
                error = %err,
                "config overlays did not produce a valid configuration; using the base config"
            );
            self.clone()
        })
    }
}

/// Recursive object merge; overlay values win, objects merge key-wise.
fn merge_json(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (&mut *base, overlay) {
        (serde_json::Value::Object(base_map), serde_json::Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => merge_json(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn default_config_enables_all_rules() {
        let config = LintConfig::default();
        assert!(config.is_rule_enabled("LINT_CP_001"));
        assert_eq!(config.max_line_length, 80);
        assert_eq!(config.tab_space_size, 4);
    }

    #[test]
    fn disabled_rule_is_reported_disabled() {
        let config = LintConfig {
            disabled_rules: vec!["LINT_CP_001".to_string()],
            ..LintConfig::default()
        };
        assert!(!config.is_rule_enabled("LINT_CP_001"));
        assert!(config.is_rule_enabled("LINT_LT_001"));
    }

    #[test]
    fn deserialization_fills_defaults() {
        let config: LintConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LintConfig::default());
    }

    #[test]
    fn nearest_directory_overlay_wins() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("models");
        fs::create_dir(&nested).unwrap();
        fs::write(
            dir.path().join(CONFIG_FILENAME),
            r#"{ "maxLineLength": 120, "keywordPolicy": "lower" }"#,
        )
        .unwrap();
        fs::write(
            nested.join(CONFIG_FILENAME),
            r#"{ "maxLineLength": 100 }"#,
        )
        .unwrap();
        let sql_path = nested.join("q.sql");
        fs::write(&sql_path, "SELECT 1").unwrap();

        let effective = LintConfig::default().for_path(&sql_path);
        assert_eq!(effective.max_line_length, 100);
        assert_eq!(effective.keyword_policy, KeywordPolicy::Lower);
        // untouched knobs keep base values
        assert_eq!(effective.tab_space_size, 4);
    }

    #[test]
    fn malformed_overlay_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILENAME), "{ not json").unwrap();
        let sql_path = dir.path().join("q.sql");
        fs::write(&sql_path, "SELECT 1").unwrap();

        let effective = LintConfig::default().for_path(&sql_path);
        assert_eq!(effective, LintConfig::default());
    }
}
