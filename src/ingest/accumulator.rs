//! Session state built from decoded stream events.
//!
//! The accumulator owns the ordered, deduplicated chunk set, the progress
//! percentage, and the session state machine:
//!
//! ```text
//! Idle -> Requesting -> Streaming -> Completed
//!                 \           \---> Failed
//!                  \--------------> Failed
//! ```
//!
//! Transitions only move forward; once terminal, events are ignored.

use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::event::{DecodeFailure, RawChunk, StreamEvent, TextChunk};
use crate::overlay::BBox;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Idle,
    Requesting,
    Streaming,
    Completed,
    Failed,
}

impl SessionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Why a session ended in [`SessionState::Failed`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Failure {
    /// The request was refused before any body was read.
    Request { status: Option<u16>, message: String },
    /// The backend sent an `error` event.
    Backend { message: String },
    /// Reading the body failed before the backend reported completion.
    Transport { message: String, recovered: usize },
    /// The body ended cleanly without the backend reporting completion.
    Incomplete { recovered: usize },
}

impl Failure {
    /// Returns `true` when chunks were recovered before the failure.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        matches!(
            self,
            Self::Transport { recovered, .. } | Self::Incomplete { recovered } if *recovered > 0
        )
    }

    /// Message shown to the consumer.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Request { message, .. } | Self::Backend { message } => message.clone(),
            Self::Transport { message, recovered: 0 } => {
                format!("Connection lost before any text was recovered: {message}")
            }
            Self::Transport { message, recovered } => {
                format!("Connection lost; partial result with {recovered} text blocks recovered: {message}")
            }
            Self::Incomplete { recovered: 0 } => "Stream ended before extraction completed".to_string(),
            Self::Incomplete { recovered } => {
                format!("Stream ended early; partial result with {recovered} text blocks recovered")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// `warning` event from the backend.
    Backend,
    /// A progress update that would have moved backwards.
    ProgressRegression,
    /// A record that failed to decode.
    MalformedRecord,
}

/// Non-fatal diagnostic recorded during a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// What a single [`ChunkAccumulator::apply`] call changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
    /// New chunks appended to the set.
    pub added: usize,
    /// Displayable chunks discarded because their identity was already present.
    pub duplicates: usize,
    /// Chunks failing the displayability check.
    pub rejected: usize,
    /// New progress percentage, if it changed.
    pub progress: Option<u8>,
    /// State entered by this event, if any.
    pub entered: Option<SessionState>,
    /// Reading should stop: the session reached a terminal state.
    pub halt: bool,
}

/// Owned copy of a session's observable state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub generation: u64,
    pub url: String,
    pub state: SessionState,
    pub progress_percent: u8,
    pub chunks: Vec<TextChunk>,
    pub last_error: Option<String>,
    pub failure: Option<Failure>,
    pub notices: Vec<Notice>,
}

impl SessionSnapshot {
    /// Returns `true` when the session failed but kept some chunks.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        self.failure.as_ref().is_some_and(Failure::is_partial)
    }
}

type ChunkKey = (String, u32);

/// Notices kept per session. Later ones are only counted.
pub const MAX_NOTICES: usize = 64;

#[derive(Debug, Default)]
pub struct ChunkAccumulator {
    state: SessionState,
    chunks: IndexMap<ChunkKey, TextChunk>,
    progress: u8,
    failure: Option<Failure>,
    notices: Vec<Notice>,
    dropped_notices: usize,
    malformed: usize,
}

impl ChunkAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn progress_percent(&self) -> u8 {
        self.progress
    }

    /// Chunks in first-seen order.
    pub fn chunks(&self) -> impl ExactSizeIterator<Item = &TextChunk> {
        self.chunks.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks located on one page, in first-seen order.
    pub fn chunks_on_page(&self, page_num: u32) -> impl Iterator<Item = &TextChunk> {
        self.chunks.values().filter(move |c| c.page_num == page_num)
    }

    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        self.failure.as_ref()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.failure.as_ref().map(Failure::message)
    }

    #[must_use]
    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// Notices beyond [`MAX_NOTICES`] that were counted but not kept.
    #[must_use]
    pub fn dropped_notices(&self) -> usize {
        self.dropped_notices
    }

    /// Number of records dropped by the decoder.
    #[must_use]
    pub fn malformed_count(&self) -> usize {
        self.malformed
    }

    fn enter(&mut self, next: SessionState) -> bool {
        if self.state.is_terminal() || next <= self.state {
            return false;
        }
        debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
        true
    }

    /// Mark the request as sent.
    pub fn begin(&mut self) -> bool {
        self.enter(SessionState::Requesting)
    }

    /// Fail the session because the request was refused.
    pub fn reject_request(&mut self, status: Option<u16>, message: impl Into<String>) -> bool {
        self.fail(Failure::Request { status, message: message.into() })
    }

    /// Fail the session because the body stream broke off.
    ///
    /// Chunks gathered so far are kept; the failure records how many.
    pub fn fail_transport(&mut self, message: impl Into<String>) -> bool {
        let recovered = self.chunks.len();
        self.fail(Failure::Transport { message: message.into(), recovered })
    }

    /// Fail the session because the body ended without a completion event.
    pub fn fail_incomplete(&mut self) -> bool {
        let recovered = self.chunks.len();
        self.fail(Failure::Incomplete { recovered })
    }

    fn notice(&mut self, kind: NoticeKind, message: String) {
        if self.notices.len() < MAX_NOTICES {
            self.notices.push(Notice { kind, message });
        } else {
            self.dropped_notices += 1;
        }
    }

    fn fail(&mut self, failure: Failure) -> bool {
        if !self.enter(SessionState::Failed) {
            return false;
        }
        warn!(error = %failure.message(), partial = failure.is_partial(), "extraction failed");
        self.failure = Some(failure);
        true
    }

    /// Record a decoder failure.
    pub fn note_malformed(&mut self, failure: &DecodeFailure) {
        self.malformed += 1;
        warn!(reason = %failure.reason, record = %failure.excerpt(), "dropping malformed record");
        self.notice(NoticeKind::MalformedRecord, failure.to_string());
    }

    /// Apply one decoded event.
    pub fn apply(&mut self, event: StreamEvent) -> Delta {
        let mut delta = Delta::default();
        if self.state.is_terminal() {
            debug!(kind = event.kind(), state = ?self.state, "ignoring event after terminal state");
            delta.halt = true;
            return delta;
        }
        if self.enter(SessionState::Streaming) {
            delta.entered = Some(SessionState::Streaming);
        }

        match event {
            StreamEvent::Progress { processed_pages, total_pages } => {
                self.apply_progress(processed_pages, total_pages, &mut delta);
            }
            StreamEvent::Data { extracted_data, is_complete } => {
                self.merge(extracted_data, &mut delta);
                if is_complete && self.enter(SessionState::Completed) {
                    info!(chunks = self.chunks.len(), "extraction complete");
                    delta.entered = Some(SessionState::Completed);
                    delta.halt = true;
                }
            }
            StreamEvent::Warning { message } => {
                warn!(%message, "backend warning");
                self.notice(NoticeKind::Backend, message);
            }
            StreamEvent::Error { message } => {
                if self.fail(Failure::Backend { message }) {
                    delta.entered = Some(SessionState::Failed);
                }
                delta.halt = true;
            }
        }
        delta
    }

    fn apply_progress(&mut self, processed: u64, total: u64, delta: &mut Delta) {
        if total == 0 {
            debug!(processed, "ignoring progress without a page total");
            return;
        }
        let percent = ((processed as f64 / total as f64) * 100.0).round().clamp(0.0, 100.0) as u8;
        if percent < self.progress {
            warn!(current = self.progress, received = percent, "dropping regressing progress");
            let message = format!("progress {processed}/{total} ({percent}%) is behind {}%", self.progress);
            self.notice(NoticeKind::ProgressRegression, message);
            return;
        }
        if percent != self.progress {
            self.progress = percent;
            delta.progress = Some(percent);
        }
    }

    fn merge(&mut self, incoming: Vec<RawChunk>, delta: &mut Delta) {
        for raw in incoming {
            let Some(chunk) = displayable(raw) else {
                delta.rejected += 1;
                continue;
            };
            match self.chunks.entry((chunk.text.clone(), chunk.page_num)) {
                Entry::Occupied(_) => delta.duplicates += 1,
                Entry::Vacant(slot) => {
                    slot.insert(chunk);
                    delta.added += 1;
                }
            }
        }
        debug!(
            added = delta.added,
            duplicates = delta.duplicates,
            rejected = delta.rejected,
            total = self.chunks.len(),
            "merged data event"
        );
    }

    /// Owned copy of the current state.
    #[must_use]
    pub fn snapshot(&self, generation: u64, url: &str) -> SessionSnapshot {
        SessionSnapshot {
            generation,
            url: url.to_string(),
            state: self.state,
            progress_percent: self.progress,
            chunks: self.chunks.values().cloned().collect(),
            last_error: self.last_error(),
            failure: self.failure.clone(),
            notices: self.notices.clone(),
        }
    }
}

/// Backend control markers such as `>dap<` or `>SOE<`.
fn is_sentinel(text: &str) -> bool {
    text.starts_with('>') && text.ends_with('<')
}

/// Convert a wire chunk into a displayable one, or drop it.
fn displayable(raw: RawChunk) -> Option<TextChunk> {
    let text = raw.text()?;
    let trimmed = text.trim();
    if trimmed.chars().count() < 2 || is_sentinel(trimmed) {
        return None;
    }
    let page_num = raw.page()?;
    let bbox = BBox::from_normalized(&raw.coords()?)?;
    Some(TextChunk { text: text.to_string(), bbox, page_num })
}
