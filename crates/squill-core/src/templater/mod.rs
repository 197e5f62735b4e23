//! SQL template rendering with a source map.
//!
//! Templating is a preprocessing step that runs before lexing:
//!
//! ```text
//! Templated SQL → [templater] → Rendered SQL + source map → [lexer] → segments
//! ```
//!
//! Unlike a plain render, the templater here also aligns the rendered text
//! with the source: the output is sliced into literal runs (which map
//! one-to-one back to source spans) and template constructs (expressions,
//! block tags, comments) whose source text no longer appears in the rendered
//! output. The lexer turns each non-literal slice into a placeholder
//! segment, so nothing the template removed is silently lost.

mod error;
mod jinja;

pub use error::TemplateError;

use crate::linter::config::LintConfig;
use crate::types::{Span, Violation};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration for SQL template preprocessing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct TemplateConfig {
    /// The templating mode to use.
    #[serde(default)]
    pub mode: TemplateMode,

    /// Context variables available to the template.
    ///
    /// For dbt mode, variables under the "vars" key are accessible via `var()`.
    #[serde(default)]
    pub context: HashMap<String, serde_json::Value>,
}

/// Templating mode for SQL preprocessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemplateMode {
    /// No templating - SQL is passed through unchanged.
    #[default]
    Raw,

    /// Standard Jinja2 template rendering.
    ///
    /// Uses strict mode: undefined variables cause an error.
    Jinja,

    /// dbt-style templating with builtin macro stubs.
    Dbt,
}

/// Classification of one slice of the source map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SliceType {
    /// Source text that appears verbatim in the rendered output.
    Literal,
    /// A `{{ ... }}` expression, replaced by its rendered value.
    Templated,
    /// A `{% ... %}` tag opening a block.
    BlockStart,
    /// A `{% end... %}` tag closing a block.
    BlockEnd,
    /// A `{# ... #}` comment, removed entirely.
    Comment,
}

impl SliceType {
    /// The block-type tag recorded on placeholder segments.
    pub fn block_type(self) -> &'static str {
        match self {
            Self::Literal => "literal",
            Self::Templated => "templated",
            Self::BlockStart => "block-start",
            Self::BlockEnd => "block-end",
            Self::Comment => "comment",
        }
    }
}

/// One aligned region of the source map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TemplatedSlice {
    pub slice_type: SliceType,
    /// Span in the source file.
    pub source: Span,
    /// Span in the rendered output.
    pub templated: Span,
}

/// A file that has been read and rendered, ready for lexing and linting.
///
/// Carries the file's effective configuration so work units are
/// self-contained, and serializes cleanly across the worker boundary.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderedFile {
    pub name: String,
    pub source: String,
    pub templated: String,
    pub slices: Vec<TemplatedSlice>,
    /// Violations raised during rendering (e.g. template errors).
    pub violations: Vec<Violation>,
    /// The effective configuration for this file.
    pub config: LintConfig,
}

impl RenderedFile {
    /// Maps a templated-space offset to a source offset via the source map.
    pub fn source_offset(&self, templated_offset: usize) -> usize {
        for slice in &self.slices {
            let templated = slice.templated;
            if templated_offset >= templated.start && templated_offset < templated.end {
                return match slice.slice_type {
                    SliceType::Literal => slice.source.start + (templated_offset - templated.start),
                    _ => slice.source.start,
                };
            }
        }
        self.slices
            .last()
            .map_or(templated_offset, |slice| slice.source.end)
    }

    /// Maps an exclusive templated-space end offset to a source offset.
    pub fn source_offset_end(&self, templated_end: usize) -> usize {
        for slice in &self.slices {
            let templated = slice.templated;
            if templated_end > templated.start && templated_end <= templated.end {
                return match slice.slice_type {
                    SliceType::Literal => slice.source.start + (templated_end - templated.start),
                    _ => slice.source.end,
                };
            }
        }
        self.slices
            .last()
            .map_or(templated_end, |slice| slice.source.end)
    }

    /// Maps a templated-space span back into source space, but only when it
    /// falls entirely within a single literal slice. Spans touching
    /// templated regions have no faithful source image and yield `None`.
    pub fn source_span_for(&self, span: Span) -> Option<Span> {
        self.slices.iter().find_map(|slice| {
            let within = slice.slice_type == SliceType::Literal
                && span.start >= slice.templated.start
                && span.end <= slice.templated.end;
            within.then(|| {
                Span::new(
                    slice.source.start + (span.start - slice.templated.start),
                    slice.source.start + (span.end - slice.templated.start),
                )
            })
        })
    }
}

/// Renders source text and computes its source map.
pub fn render_source(
    source: &str,
    config: &TemplateConfig,
) -> Result<(String, Vec<TemplatedSlice>), TemplateError> {
    match config.mode {
        TemplateMode::Raw => {
            let slices = vec![TemplatedSlice {
                slice_type: SliceType::Literal,
                source: Span::new(0, source.len()),
                templated: Span::new(0, source.len()),
            }];
            Ok((source.to_string(), slices))
        }
        TemplateMode::Jinja => {
            let rendered = jinja::render_jinja(source, &config.context)?;
            let slices = map_slices(source, &rendered);
            Ok((rendered, slices))
        }
        TemplateMode::Dbt => {
            let rendered = jinja::render_dbt(source, &config.context)?;
            let slices = map_slices(source, &rendered);
            Ok((rendered, slices))
        }
    }
}

/// Aligns rendered output with the source by anchoring on literal runs.
///
/// Each literal run between template tags is located in the rendered text by
/// sequential search; the rendered text between two anchored literals is
/// attributed to the tag that separates them. When an anchor cannot be found
/// (a conditional dropped it, or a loop duplicated it) alignment stops and
/// the remainder of the file becomes a single templated slice.
fn map_slices(source: &str, templated: &str) -> Vec<TemplatedSlice> {
    let tags = scan_tags(source);
    if tags.is_empty() {
        return vec![TemplatedSlice {
            slice_type: SliceType::Literal,
            source: Span::new(0, source.len()),
            templated: Span::new(0, templated.len()),
        }];
    }

    let mut slices: Vec<TemplatedSlice> = Vec::new();
    let mut src_cursor = 0usize;
    let mut tpl_cursor = 0usize;

    for (tag_span, slice_type) in tags {
        if tag_span.start > src_cursor {
            let literal = &source[src_cursor..tag_span.start];
            let Some(rel) = templated[tpl_cursor..].find(literal) else {
                slices.push(TemplatedSlice {
                    slice_type: SliceType::Templated,
                    source: Span::new(src_cursor, source.len()),
                    templated: Span::new(tpl_cursor, templated.len()),
                });
                return slices;
            };
            let literal_start = tpl_cursor + rel;
            if rel > 0 {
                extend_last_tag(&mut slices, literal_start);
            }
            slices.push(TemplatedSlice {
                slice_type: SliceType::Literal,
                source: Span::new(src_cursor, tag_span.start),
                templated: Span::new(literal_start, literal_start + literal.len()),
            });
            tpl_cursor = literal_start + literal.len();
        }
        slices.push(TemplatedSlice {
            slice_type,
            source: tag_span,
            templated: Span::point(tpl_cursor),
        });
        src_cursor = tag_span.end;
    }

    if src_cursor < source.len() {
        let literal = &source[src_cursor..];
        let Some(rel) = templated[tpl_cursor..].find(literal) else {
            slices.push(TemplatedSlice {
                slice_type: SliceType::Templated,
                source: Span::new(src_cursor, source.len()),
                templated: Span::new(tpl_cursor, templated.len()),
            });
            return slices;
        };
        let literal_start = tpl_cursor + rel;
        if rel > 0 {
            extend_last_tag(&mut slices, literal_start);
        }
        slices.push(TemplatedSlice {
            slice_type: SliceType::Literal,
            source: Span::new(src_cursor, source.len()),
            templated: Span::new(literal_start, literal_start + literal.len()),
        });
        tpl_cursor = literal_start + literal.len();
    }

    if tpl_cursor < templated.len() {
        extend_last_tag(&mut slices, templated.len());
    }

    slices
}

/// Grows the templated extent of the most recent tag slice up to `new_end`,
/// attributing un-anchored rendered output to the tag that produced it.
fn extend_last_tag(slices: &mut [TemplatedSlice], new_end: usize) {
    if let Some(last) = slices.last_mut() {
        if last.slice_type != SliceType::Literal && new_end > last.templated.end {
            last.templated = Span::new(last.templated.start, new_end);
        }
    }
}

/// Finds all template tags in the source, in order.
fn scan_tags(source: &str) -> Vec<(Span, SliceType)> {
    let mut tags = Vec::new();
    let mut index = 0usize;

    while let Some((open_index, open, close)) = find_next_tag_open(source, index) {
        let body_start = open_index + open.len();
        let Some(close_rel) = source[body_start..].find(close) else {
            // Unterminated tag; the renderer reports it, stop scanning.
            break;
        };
        let close_index = body_start + close_rel + close.len();
        let slice_type = match open {
            "{{" => SliceType::Templated,
            "{#" => SliceType::Comment,
            _ => classify_block(&source[body_start..body_start + close_rel]),
        };
        tags.push((Span::new(open_index, close_index), slice_type));
        index = close_index;
    }

    tags
}

fn find_next_tag_open(source: &str, from: usize) -> Option<(usize, &'static str, &'static str)> {
    let rest = source.get(from..)?;
    [("{{", "}}"), ("{%", "%}"), ("{#", "#}")]
        .into_iter()
        .filter_map(|(open, close)| rest.find(open).map(|offset| (from + offset, open, close)))
        .min_by_key(|(index, _, _)| *index)
}

fn classify_block(body: &str) -> SliceType {
    let trimmed = body.trim();
    let trimmed = trimmed
        .strip_prefix(['-', '+'])
        .map_or(trimmed, str::trim_start);
    let word = trimmed.split_whitespace().next().unwrap_or("");
    if word.starts_with("end") {
        SliceType::BlockEnd
    } else {
        SliceType::BlockStart
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jinja_config() -> TemplateConfig {
        TemplateConfig {
            mode: TemplateMode::Jinja,
            context: HashMap::new(),
        }
    }

    #[test]
    fn raw_mode_passes_through_with_single_literal_slice() {
        let sql = "SELECT * FROM {{ not_a_template }}";
        let (rendered, slices) = render_source(sql, &TemplateConfig::default()).unwrap();

        assert_eq!(rendered, sql);
        assert_eq!(slices.len(), 1);
        assert_eq!(slices[0].slice_type, SliceType::Literal);
        assert_eq!(slices[0].source, Span::new(0, sql.len()));
    }

    #[test]
    fn expression_slice_covers_rendered_value() {
        let sql = "SELECT * FROM {{ tbl }} WHERE x";
        let mut config = jinja_config();
        config
            .context
            .insert("tbl".to_string(), serde_json::json!("users"));

        let (rendered, slices) = render_source(sql, &config).unwrap();
        assert_eq!(rendered, "SELECT * FROM users WHERE x");

        let tag = slices
            .iter()
            .find(|s| s.slice_type == SliceType::Templated)
            .unwrap();
        assert_eq!(&sql[tag.source.start..tag.source.end], "{{ tbl }}");
        assert_eq!(&rendered[tag.templated.start..tag.templated.end], "users");

        // literal runs on both sides map verbatim
        let literals: Vec<_> = slices
            .iter()
            .filter(|s| s.slice_type == SliceType::Literal)
            .collect();
        assert_eq!(literals.len(), 2);
        for literal in literals {
            assert_eq!(
                &sql[literal.source.start..literal.source.end],
                &rendered[literal.templated.start..literal.templated.end],
            );
        }
    }

    #[test]
    fn block_tags_are_classified_and_zero_width() {
        let sql = "SELECT 1{% if true %} + 2{% endif %}";
        let (rendered, slices) = render_source(sql, &jinja_config()).unwrap();
        assert_eq!(rendered, "SELECT 1 + 2");

        let types: Vec<SliceType> = slices.iter().map(|s| s.slice_type).collect();
        assert!(types.contains(&SliceType::BlockStart));
        assert!(types.contains(&SliceType::BlockEnd));

        let end_tag = slices
            .iter()
            .find(|s| s.slice_type == SliceType::BlockEnd)
            .unwrap();
        assert!(end_tag.templated.is_empty());
        assert_eq!(&sql[end_tag.source.start..end_tag.source.end], "{% endif %}");
    }

    #[test]
    fn comment_tags_vanish_from_rendered_output() {
        let sql = "SELECT 1 {# keep me #}FROM t";
        let (rendered, slices) = render_source(sql, &jinja_config()).unwrap();
        assert_eq!(rendered, "SELECT 1 FROM t");

        let comment = slices
            .iter()
            .find(|s| s.slice_type == SliceType::Comment)
            .unwrap();
        assert_eq!(
            &sql[comment.source.start..comment.source.end],
            "{# keep me #}"
        );
        assert!(comment.templated.is_empty());
    }

    #[test]
    fn alignment_falls_back_when_a_literal_is_dropped() {
        let sql = "SELECT 1{% if false %} @dropped@{% endif %}";
        let (rendered, slices) = render_source(sql, &jinja_config()).unwrap();
        assert_eq!(rendered, "SELECT 1");

        // the dropped branch collapses into a templated tail slice
        let last = slices.last().unwrap();
        assert_ne!(last.slice_type, SliceType::Literal);
    }

    #[test]
    fn source_offset_round_trips_through_literal_slices() {
        let sql = "SELECT {{ col }} FROM t";
        let mut config = jinja_config();
        config
            .context
            .insert("col".to_string(), serde_json::json!("id"));

        let (templated, slices) = render_source(sql, &config).unwrap();
        let rendered = RenderedFile {
            name: "q.sql".to_string(),
            source: sql.to_string(),
            templated,
            slices,
            violations: Vec::new(),
            config: LintConfig::default(),
        };

        // "SELECT " maps one-to-one
        assert_eq!(rendered.source_offset(0), 0);
        assert_eq!(rendered.source_offset(6), 6);
        // " FROM t" after the expression maps past the tag
        let from_offset = rendered.templated.find("FROM").unwrap();
        let mapped = rendered.source_offset(from_offset);
        assert_eq!(&sql[mapped..mapped + 4], "FROM");
    }

    #[test]
    fn source_span_for_rejects_templated_regions() {
        let sql = "SELECT {{ col }} FROM t";
        let mut config = jinja_config();
        config
            .context
            .insert("col".to_string(), serde_json::json!("id"));

        let (templated, slices) = render_source(sql, &config).unwrap();
        let rendered = RenderedFile {
            name: "q.sql".to_string(),
            source: sql.to_string(),
            templated: templated.clone(),
            slices,
            violations: Vec::new(),
            config: LintConfig::default(),
        };

        // the rendered "id" sits inside the templated slice: no source image
        let id_offset = templated.find("id").unwrap();
        assert_eq!(
            rendered.source_span_for(Span::new(id_offset, id_offset + 2)),
            None
        );
        // the leading keyword has one
        assert_eq!(
            rendered.source_span_for(Span::new(0, 6)),
            Some(Span::new(0, 6))
        );
    }

    #[test]
    fn config_serialization_round_trips() {
        let config = TemplateConfig {
            mode: TemplateMode::Dbt,
            context: HashMap::new(),
        };

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"mode\":\"dbt\""));

        let parsed: TemplateConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.mode, TemplateMode::Dbt);
    }
}
