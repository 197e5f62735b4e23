//! Parse-tree segments, including meta segments with no literal text.
//!
//! Every node of a parsed file is a [`Segment`]: a type tag, raw text, a
//! [`PositionMarker`] and owned children. Meta segments record structural
//! facts that have no text of their own: indentation points
//! ([`MetaKind::Indent`] / [`MetaKind::Dedent`], one tagged variant with a
//! signed `indent_val` rather than a subtype relationship) and placeholders
//! for source text that templating removed from the rendered output.

use crate::parser::marker::PositionMarker;
use thiserror::Error;

/// Errors raised by segment construction and matching misuse.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum SegmentError {
    /// Meta segments are inserted directly by the engine during parsing; a
    /// grammar that tries to match one is defective. Distinct from an
    /// ordinary no-match outcome.
    #[error("'{seg_type}' segments have no match behaviour, they are only ever inserted directly")]
    MetaMatch { seg_type: String },

    /// A placeholder exists to retain source text that would otherwise be
    /// lost; constructing one without that text defeats its purpose.
    #[error("cannot construct a placeholder segment without retained source text")]
    EmptyPlaceholderSource,
}

/// Structural fact recorded by a meta segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaKind {
    /// A point after which a deeper indentation level is expected.
    Indent,
    /// A point where indentation returns to a shallower level.
    Dedent,
    /// Source text removed by templating, retained verbatim.
    Placeholder {
        source_str: String,
        block_type: String,
    },
}

/// A node in the parsed-structure tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    seg_type: String,
    raw: String,
    marker: PositionMarker,
    meta: Option<MetaKind>,
    children: Vec<Segment>,
}

impl Segment {
    /// A leaf node with literal text.
    pub fn leaf(
        seg_type: impl Into<String>,
        raw: impl Into<String>,
        marker: PositionMarker,
    ) -> Self {
        Self {
            seg_type: seg_type.into(),
            raw: raw.into(),
            marker,
            meta: None,
            children: Vec::new(),
        }
    }

    /// An interior node; its raw text is the concatenation of its children.
    pub fn node(seg_type: impl Into<String>, marker: PositionMarker, children: Vec<Segment>) -> Self {
        let raw = children.iter().map(Segment::raw).collect();
        Self {
            seg_type: seg_type.into(),
            raw,
            marker,
            meta: None,
            children,
        }
    }

    /// An indent marker: empty text, `indent_val = +1`.
    pub fn indent(marker: PositionMarker) -> Self {
        Self::meta_segment("indent", marker, MetaKind::Indent)
    }

    /// A dedent marker: empty text, `indent_val = -1`.
    pub fn dedent(marker: PositionMarker) -> Self {
        Self::meta_segment("dedent", marker, MetaKind::Dedent)
    }

    /// A placeholder for source text that templating elided.
    ///
    /// The retained `source_str` must be non-empty; an empty one is a
    /// construction-time defect in whatever produced the source map.
    pub fn placeholder(
        marker: PositionMarker,
        source_str: impl Into<String>,
        block_type: impl Into<String>,
    ) -> Result<Self, SegmentError> {
        let source_str = source_str.into();
        if source_str.is_empty() {
            return Err(SegmentError::EmptyPlaceholderSource);
        }
        Ok(Self::meta_segment(
            "placeholder",
            marker,
            MetaKind::Placeholder {
                source_str,
                block_type: block_type.into(),
            },
        ))
    }

    fn meta_segment(seg_type: &str, marker: PositionMarker, meta: MetaKind) -> Self {
        Self {
            seg_type: seg_type.to_string(),
            raw: String::new(),
            marker,
            meta: Some(meta),
            children: Vec::new(),
        }
    }

    pub fn seg_type(&self) -> &str {
        &self.seg_type
    }

    pub fn is_type(&self, seg_type: &str) -> bool {
        self.seg_type == seg_type
    }

    /// Literal text content. Always empty for meta segments.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn marker(&self) -> &PositionMarker {
        &self.marker
    }

    pub fn children(&self) -> &[Segment] {
        &self.children
    }

    pub fn is_meta(&self) -> bool {
        self.meta.is_some()
    }

    /// Signed indentation contribution: `+1` for indents, `-1` for dedents,
    /// `0` for every other segment. Indentation-sensitive consumers branch
    /// on the sign, not on segment identity.
    pub fn indent_val(&self) -> i8 {
        match self.meta {
            Some(MetaKind::Indent) => 1,
            Some(MetaKind::Dedent) => -1,
            _ => 0,
        }
    }

    /// The retained source text, for placeholders.
    pub fn source_str(&self) -> Option<&str> {
        match &self.meta {
            Some(MetaKind::Placeholder { source_str, .. }) => Some(source_str),
            _ => None,
        }
    }

    /// The block-type tag, for placeholders.
    pub fn block_type(&self) -> Option<&str> {
        match &self.meta {
            Some(MetaKind::Placeholder { block_type, .. }) => Some(block_type),
            _ => None,
        }
    }

    /// Attempts to match this segment's raw text against the start of
    /// `input`, returning the matched length. `Ok(None)` is the ordinary
    /// no-match outcome. Keywords compare case-insensitively.
    ///
    /// Meta segments are never matched: they are inserted by the engine, so
    /// a match attempt signals a grammar-construction defect and fails with
    /// [`SegmentError::MetaMatch`].
    pub fn match_raw(&self, input: &str) -> Result<Option<usize>, SegmentError> {
        if self.is_meta() {
            return Err(SegmentError::MetaMatch {
                seg_type: self.seg_type.clone(),
            });
        }
        if self.raw.is_empty() {
            return Ok(None);
        }
        let Some(candidate) = input.get(..self.raw.len()) else {
            return Ok(None);
        };
        let matched = if self.seg_type == "keyword" {
            candidate.eq_ignore_ascii_case(&self.raw)
        } else {
            candidate == self.raw
        };
        Ok(matched.then_some(self.raw.len()))
    }

    /// Extra diagnostic output appended when stringifying. Most segments
    /// have nothing to add; a placeholder reports what it stands in for, so
    /// a tree dump alone recovers everything that was elided.
    pub fn suffix(&self) -> String {
        match &self.meta {
            Some(MetaKind::Placeholder {
                source_str,
                block_type,
            }) => format!("[Type: {block_type:?}, Raw: {source_str:?}]"),
            _ => String::new(),
        }
    }

    /// An indented diagnostic dump of the whole subtree.
    pub fn stringify(&self) -> String {
        let mut out = String::new();
        self.stringify_into(0, &mut out);
        out
    }

    fn stringify_into(&self, depth: usize, out: &mut String) {
        let templated = &self.marker.templated;
        out.push_str(&format!(
            "[{:>4}..{:<4}] {:indent$}{}: {:?}",
            templated.start,
            templated.end,
            "",
            self.seg_type,
            self.raw,
            indent = depth * 2,
        ));
        let suffix = self.suffix();
        if !suffix.is_empty() {
            out.push(' ');
            out.push_str(&suffix);
        }
        out.push('\n');
        for child in &self.children {
            child.stringify_into(depth + 1, out);
        }
    }

    /// Depth-first iteration over this segment and all descendants.
    pub fn iter(&self) -> SegmentIter<'_> {
        SegmentIter { stack: vec![self] }
    }
}

/// Pre-order depth-first traversal of a segment tree.
pub struct SegmentIter<'a> {
    stack: Vec<&'a Segment>,
}

impl<'a> Iterator for SegmentIter<'a> {
    type Item = &'a Segment;

    fn next(&mut self) -> Option<Self::Item> {
        let segment = self.stack.pop()?;
        self.stack.extend(segment.children.iter().rev());
        Some(segment)
    }
}
