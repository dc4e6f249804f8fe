//! Annotation channel extraction.
//!
//! Reasoning models interleave their chain of thought with the answer,
//! wrapping it in a start/end marker pair (`<think>` … `</think>` by
//! default). This module splits a buffer into the two channels. The buffer
//! may be a completed message or a stream cut at any byte offset; an
//! unterminated start marker means the model is still reasoning and
//! everything after it belongs to the annotation.
//!
//! Marker search is a literal, case-sensitive, first-occurrence match. Only
//! the first start marker is honoured, and the end marker is searched for
//! only after it. An end marker with no preceding start marker is inert and
//! stays in the visible text.

use serde::{Deserialize, Serialize};

/// Default annotation start marker.
pub const DEFAULT_START_MARKER: &str = "<think>";

/// Default annotation end marker.
pub const DEFAULT_END_MARKER: &str = "</think>";

/// Literal start/end marker pair delimiting the annotation channel.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Markers {
    pub start: String,
    pub end: String,
}

impl Markers {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Whether `text` contains either marker literal.
    pub fn appear_in(&self, text: &str) -> bool {
        (!self.start.is_empty() && text.contains(self.start.as_str()))
            || (!self.end.is_empty() && text.contains(self.end.as_str()))
    }
}

impl Default for Markers {
    fn default() -> Self {
        Self::new(DEFAULT_START_MARKER, DEFAULT_END_MARKER)
    }
}

/// Where the buffer stands relative to the annotation region.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationState {
    /// No start marker seen.
    #[default]
    Absent,
    /// Start marker seen, end marker not yet.
    Open,
    /// Both markers seen.
    Closed,
}

/// The two channels of a buffer, both trimmed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Default)]
pub struct ExtractionResult {
    pub annotation: String,
    pub visible: String,
    pub state: AnnotationState,
}

impl ExtractionResult {
    /// True while the model is still inside its reasoning trace.
    pub fn is_reasoning(&self) -> bool {
        self.state == AnnotationState::Open
    }

    pub fn is_empty(&self) -> bool {
        self.annotation.is_empty() && self.visible.is_empty()
    }
}

/// Split `buffer` into its annotation and visible channels.
///
/// Pure and total: any input, including a buffer cut in the middle of a
/// marker, yields a best-effort split. A partial marker (`"<thi"`) is not
/// recognised and shows up as visible text until the rest of it arrives.
pub fn extract(buffer: &str, markers: &Markers) -> ExtractionResult {
    let split = if markers.start.is_empty() {
        None
    } else {
        buffer.split_once(markers.start.as_str())
    };

    let Some((before, after_start)) = split else {
        return ExtractionResult {
            annotation: String::new(),
            visible: buffer.trim().to_string(),
            state: AnnotationState::Absent,
        };
    };

    let closed = if markers.end.is_empty() {
        None
    } else {
        after_start.split_once(markers.end.as_str())
    };

    match closed {
        Some((annotation, after_end)) => {
            let mut visible = String::with_capacity(before.len() + after_end.len());
            visible.push_str(before);
            visible.push_str(after_end);
            ExtractionResult {
                annotation: annotation.trim().to_string(),
                visible: visible.trim().to_string(),
                state: AnnotationState::Closed,
            }
        }
        None => ExtractionResult {
            annotation: after_start.trim().to_string(),
            visible: before.trim().to_string(),
            state: AnnotationState::Open,
        },
    }
}

/// Return only the visible channel of a completed text.
///
/// Used when re-serializing history so a model's earlier reasoning never
/// re-enters its own context. Unlike [`extract`], which follows the first
/// region of a stream still in flight, every closed region is removed; a
/// trailing unterminated region runs to the end of the text.
pub fn strip_annotation(text: &str, markers: &Markers) -> String {
    if markers.start.is_empty() {
        return text.trim().to_string();
    }

    let mut visible = String::with_capacity(text.len());
    let mut rest = text;
    while let Some((before, after_start)) = rest.split_once(markers.start.as_str()) {
        visible.push_str(before);
        let closed = if markers.end.is_empty() {
            None
        } else {
            after_start.split_once(markers.end.as_str())
        };
        match closed {
            Some((_, after_end)) => rest = after_end,
            None => {
                rest = "";
                break;
            }
        }
    }
    visible.push_str(rest);
    visible.trim().to_string()
}
