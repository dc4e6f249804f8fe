//! Incremental handling of a streamed model response.
//!
//! The transport delivers text in arbitrary chunks; a chunk boundary can fall
//! in the middle of a marker or a multi-byte character's worth of text. Each
//! delta is appended to a [`ResponseBuffer`] and the whole buffer is split
//! again, so the UI always gets a consistent [`ExtractionResult`]. Re-scanning
//! the full buffer per chunk is linear in its length, which is fine at chat
//! message scale.
//!
//! [`consume`] drives any `futures::Stream` of [`StreamEvent`]s through a
//! buffer and reports every new split to a callback. Dropping the returned
//! future stops consumption; cancelling the underlying request is the
//! transport's business.

use chrono::{DateTime, Duration, Utc};
use futures::{Stream, StreamExt};
use tracing::{debug, trace};

use crate::annotation::{ExtractionResult, Markers, extract};

/// A single event from a response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An incremental text delta.
    TextDelta(String),
    /// The stream is complete.
    Done,
}

/// Accumulates streamed text and re-splits it on every push.
#[derive(Debug, Clone, Default)]
pub struct ResponseBuffer {
    text: String,
    markers: Markers,
    chunks: usize,
}

impl ResponseBuffer {
    pub fn new(markers: Markers) -> Self {
        Self {
            text: String::new(),
            markers,
            chunks: 0,
        }
    }

    /// Append `delta` and return the split of the whole buffer.
    ///
    /// Empty deltas are not counted as chunks.
    pub fn push(&mut self, delta: &str) -> ExtractionResult {
        if delta.is_empty() {
            return self.snapshot();
        }
        self.text.push_str(delta);
        self.chunks += 1;
        self.snapshot()
    }

    /// Split of the buffer as it stands.
    pub fn snapshot(&self) -> ExtractionResult {
        extract(&self.text, &self.markers)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Number of deltas pushed since the last clear.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.chunks = 0;
    }
}

/// Wall-clock timings for one response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseMetrics {
    pub started_at: Option<DateTime<Utc>>,
    pub first_chunk_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ResponseMetrics {
    /// Metrics with `started_at` set to now.
    pub fn start() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Self::default()
        }
    }

    /// Record the first chunk. Later calls are ignored.
    pub fn mark_first_chunk(&mut self) {
        if self.first_chunk_at.is_none() {
            self.first_chunk_at = Some(Utc::now());
        }
    }

    pub fn mark_complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    pub fn time_to_first_chunk(&self) -> Option<Duration> {
        Some(self.first_chunk_at? - self.started_at?)
    }

    pub fn total_duration(&self) -> Option<Duration> {
        Some(self.completed_at? - self.started_at?)
    }

    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        let ms = |d: Option<Duration>| {
            d.map_or_else(|| "-".to_string(), |d| format!("{}ms", d.num_milliseconds()))
        };
        format!(
            "response: first chunk {}, total {}",
            ms(self.time_to_first_chunk()),
            ms(self.total_duration()),
        )
    }
}

/// Outcome of a fully consumed stream.
#[derive(Debug, Clone)]
pub struct CompletedResponse {
    /// Everything the model sent, markers included.
    pub raw_text: String,
    /// Final split of `raw_text`.
    pub extraction: ExtractionResult,
    /// Number of non-empty deltas received.
    pub chunks: usize,
    pub metrics: ResponseMetrics,
}

/// Drive `stream` to completion, calling `on_update` after every non-empty
/// delta with the split of everything received so far.
///
/// Stops at [`StreamEvent::Done`] or when the stream ends. A source error is
/// returned unchanged; updates already delivered stay delivered.
pub async fn consume<S, E>(
    stream: S,
    markers: &Markers,
    mut on_update: impl FnMut(&ExtractionResult),
) -> Result<CompletedResponse, E>
where
    S: Stream<Item = Result<StreamEvent, E>>,
{
    let mut stream = std::pin::pin!(stream);
    let mut buffer = ResponseBuffer::new(markers.clone());
    let mut metrics = ResponseMetrics::start();

    while let Some(event) = stream.next().await {
        match event? {
            StreamEvent::TextDelta(delta) => {
                if delta.is_empty() {
                    continue;
                }
                metrics.mark_first_chunk();
                let split = buffer.push(&delta);
                trace!(
                    "Chunk {}: {} annotation / {} visible bytes",
                    buffer.chunks(),
                    split.annotation.len(),
                    split.visible.len()
                );
                on_update(&split);
            }
            StreamEvent::Done => break,
        }
    }

    metrics.mark_complete();
    let extraction = buffer.snapshot();
    let chunks = buffer.chunks();
    debug!("Stream completed with {chunks} chunk(s); {}", metrics.to_log_string());

    Ok(CompletedResponse {
        raw_text: buffer.into_text(),
        extraction,
        chunks,
        metrics,
    })
}

/// Assemble a complete text string from a sequence of stream events.
pub fn collect_text(events: &[StreamEvent]) -> String {
    let mut text = String::new();
    for event in events {
        if let StreamEvent::TextDelta(delta) = event {
            text.push_str(delta);
        }
    }
    text
}
