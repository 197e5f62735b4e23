//! Position markers mapping parse nodes across coordinate spaces.
//!
//! A marker ties one tree node to up to three buffers: the original source
//! file, the rendered (templated) text that is actually parsed, and the
//! post-fix working text. Rules report against the templated text; fix
//! application and user-facing positions go through the source coordinates.

use crate::types::Span;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Offset ranges for one parse node across coordinate spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PositionMarker {
    /// Span in the original source file.
    pub source: Span,

    /// Span in the rendered text.
    pub templated: Span,

    /// Span in the working text, once fixes have been applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working: Option<Span>,
}

impl PositionMarker {
    pub const fn new(source: Span, templated: Span) -> Self {
        Self {
            source,
            templated,
            working: None,
        }
    }

    /// A zero-width marker, used for nodes with no literal text.
    pub const fn point(source_offset: usize, templated_offset: usize) -> Self {
        Self::new(Span::point(source_offset), Span::point(templated_offset))
    }

    pub const fn with_working(mut self, span: Span) -> Self {
        self.working = Some(span);
        self
    }
}
