//! Lexes rendered SQL into a segment tree.
//!
//! The tree is flat: a `file` root whose children are token leaves plus the
//! meta segments synthesized along the way — placeholders for every
//! non-literal slice of the source map, and indent/dedent pairs around
//! bracketed groups. Token markers carry both coordinate spaces, mapped
//! through the rendered file's source map.

use crate::parser::marker::PositionMarker;
use crate::parser::segment::{Segment, SegmentError};
use crate::templater::{RenderedFile, SliceType};
use crate::types::Span;

/// Keywords recognised by the lexer, uppercase.
const KEYWORDS: &[&str] = &[
    "ALL", "AND", "AS", "ASC", "BETWEEN", "BY", "CASE", "CREATE", "CROSS", "DELETE", "DESC",
    "DISTINCT", "DROP", "ELSE", "END", "EXISTS", "FALSE", "FROM", "FULL", "GROUP", "HAVING", "IN",
    "INNER", "INSERT", "INTO", "IS", "JOIN", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "OFFSET",
    "ON", "OR", "ORDER", "OUTER", "RIGHT", "SELECT", "SET", "TABLE", "THEN", "TRUE", "UNION",
    "UPDATE", "VALUES", "VIEW", "WHEN", "WHERE", "WITH",
];

/// Builds the segment tree for a rendered file.
///
/// Fails only on a defective source map (a non-literal slice with no source
/// text to retain), which is a templater bug rather than a property of the
/// input SQL.
pub fn parse_rendered(rendered: &RenderedFile) -> Result<Segment, SegmentError> {
    let text = rendered.templated.as_str();

    let mut placeholders = Vec::new();
    for slice in &rendered.slices {
        if slice.slice_type == SliceType::Literal {
            continue;
        }
        let source_str = &rendered.source[slice.source.start..slice.source.end];
        let marker = PositionMarker {
            source: slice.source,
            templated: Span::point(slice.templated.start),
            working: None,
        };
        placeholders.push((
            slice.templated.start,
            Segment::placeholder(marker, source_str, slice.slice_type.block_type())?,
        ));
    }
    let mut pending = placeholders.into_iter().peekable();

    let mut children = Vec::new();
    let mut pos = 0usize;
    while pos < text.len() {
        while pending.peek().is_some_and(|(at, _)| *at <= pos) {
            if let Some((_, placeholder)) = pending.next() {
                children.push(placeholder);
            }
        }
        let (len, seg_type) = next_token(&text[pos..]);
        let end = pos + len;
        children.push(Segment::leaf(seg_type, &text[pos..end], marker_for(rendered, pos, end)));
        pos = end;
    }
    for (_, placeholder) in pending {
        children.push(placeholder);
    }

    let children = insert_indents(children);
    let root_marker = PositionMarker::new(
        Span::new(0, rendered.source.len()),
        Span::new(0, text.len()),
    );
    Ok(Segment::node("file", root_marker, children))
}

fn marker_for(rendered: &RenderedFile, start: usize, end: usize) -> PositionMarker {
    PositionMarker::new(
        Span::new(rendered.source_offset(start), rendered.source_offset_end(end)),
        Span::new(start, end),
    )
}

/// Synthesizes indent/dedent meta segments around bracketed groups: an
/// indent after each opening bracket, a dedent before its matching close.
/// Unbalanced closing brackets get no dedent.
fn insert_indents(children: Vec<Segment>) -> Vec<Segment> {
    let mut out = Vec::with_capacity(children.len());
    let mut depth = 0usize;
    for segment in children {
        if segment.is_type("start_bracket") {
            let marker = PositionMarker::point(
                segment.marker().source.end,
                segment.marker().templated.end,
            );
            out.push(segment);
            out.push(Segment::indent(marker));
            depth += 1;
        } else if segment.is_type("end_bracket") {
            if depth > 0 {
                let marker = PositionMarker::point(
                    segment.marker().source.start,
                    segment.marker().templated.start,
                );
                out.push(Segment::dedent(marker));
                depth -= 1;
            }
            out.push(segment);
        } else {
            out.push(segment);
        }
    }
    out
}

/// Scans one token at the start of `rest`, returning its byte length and
/// segment type. `rest` is non-empty.
fn next_token(rest: &str) -> (usize, &'static str) {
    if rest.starts_with("\r\n") {
        return (2, "newline");
    }
    if rest.starts_with('\n') {
        return (1, "newline");
    }
    if rest.starts_with("--") {
        let len = rest.find('\n').unwrap_or(rest.len());
        return (len, "comment");
    }

    let Some(first) = rest.chars().next() else {
        // unreachable: callers only pass non-empty input
        return (rest.len(), "symbol");
    };

    match first {
        ' ' | '\t' => (run_len(rest, |c| c == ' ' || c == '\t'), "whitespace"),
        '\'' => (quoted_len(rest, '\''), "quoted_literal"),
        '"' => (quoted_len(rest, '"'), "quoted_identifier"),
        '(' => (1, "start_bracket"),
        ')' => (1, "end_bracket"),
        c if c.is_ascii_digit() => (numeric_len(rest), "numeric_literal"),
        c if c.is_ascii_alphabetic() || c == '_' => {
            let len = run_len(rest, |c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
            let seg_type = if KEYWORDS.contains(&rest[..len].to_ascii_uppercase().as_str()) {
                "keyword"
            } else {
                "word"
            };
            (len, seg_type)
        }
        c => (c.len_utf8(), "symbol"),
    }
}

fn run_len(rest: &str, pred: impl Fn(char) -> bool) -> usize {
    rest.char_indices()
        .find(|(_, c)| !pred(*c))
        .map_or(rest.len(), |(index, _)| index)
}

fn numeric_len(rest: &str) -> usize {
    let digits = run_len(rest, |c| c.is_ascii_digit());
    let tail = &rest[digits..];
    if tail.starts_with('.') {
        let fraction = run_len(&tail[1..], |c| c.is_ascii_digit());
        if fraction > 0 {
            return digits + 1 + fraction;
        }
    }
    digits
}

/// Length of a quoted token including both quotes; a doubled quote escapes.
/// An unterminated quote swallows the rest of the text.
fn quoted_len(rest: &str, quote: char) -> usize {
    let mut iter = rest.char_indices();
    iter.next(); // opening quote
    while let Some((index, c)) = iter.next() {
        if c == quote {
            let after = index + c.len_utf8();
            if rest[after..].starts_with(quote) {
                iter.next();
                continue;
            }
            return after;
        }
    }
    rest.len()
}
