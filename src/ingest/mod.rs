//! Incremental NDJSON ingestion pipeline
//!
//! Turns the raw body of an extraction response into session state:
//! - [`framer`] - byte chunks to newline-delimited records
//! - [`event`] - records to typed stream events
//! - [`accumulator`] - events to a deduplicated chunk set with progress
//! - [`session`] - the read loop tying it together, with cancellation
//! - [`replay`] - an in-memory transport for recorded streams

pub mod accumulator;
pub mod event;
pub mod framer;
pub mod replay;
pub mod session;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

pub use accumulator::{ChunkAccumulator, Delta, Failure, Notice, NoticeKind, SessionSnapshot, SessionState};
pub use event::{decode, DecodeFailure, FailureReason, RawChunk, StreamEvent, TextChunk};
pub use framer::LineFramer;
pub use replay::ReplayTransport;
pub use session::{ExtractionSession, Extractor, StopHandle};

/// Errors raised while opening or reading an extraction stream
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Missing PDF URL")]
    MissingUrl,

    #[error("Invalid PDF URL: {0}")]
    InvalidUrl(String),

    /// The backend answered the request with a non-2xx status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// HTTP status attached to the error, if the backend sent one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Rejected { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// The request itself was refused, as opposed to the connection failing.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::MissingUrl | Self::InvalidUrl(_) | Self::Rejected { .. })
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;

/// Response body of an extraction request, as a stream of byte chunks.
pub type BodyStream = BoxStream<'static, Result<Bytes>>;

/// Opens extraction streams for a PDF URL.
///
/// Implementations resolve to the response body once the backend has
/// accepted the request; a rejected request must surface as an error
/// before any body is returned.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, pdf_url: &str) -> Result<BodyStream>;
}
