//! In-memory transport serving recorded extraction streams.
//!
//! Used by the `replay` command to run a saved NDJSON body through the same
//! pipeline as a live request, and by tests to script chunk boundaries,
//! rejected requests, and dropped connections.

use std::path::Path;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tracing::debug;

use super::{BodyStream, IngestError, Result, Transport};

/// Default replay chunk size, small enough to split most records.
pub const DEFAULT_CHUNK_SIZE: usize = 64;

#[derive(Debug, Clone, Default)]
pub struct ReplayTransport {
    chunks: Vec<Bytes>,
    /// Connection error raised after the last chunk instead of a clean end.
    drop_with: Option<String>,
    /// Refuse the request with this status and message.
    reject: Option<(u16, String)>,
}

impl ReplayTransport {
    /// Serve `body` in chunks of `chunk_size` bytes.
    #[must_use]
    pub fn new(body: impl Into<Bytes>, chunk_size: usize) -> Self {
        let body = body.into();
        let size = chunk_size.max(1);
        let chunks = (0..body.len())
            .step_by(size)
            .map(|start| body.slice(start..(start + size).min(body.len())))
            .collect();
        Self { chunks, ..Self::default() }
    }

    /// Serve exactly these chunks, in order.
    #[must_use]
    pub fn from_chunks<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Load a recorded body from disk.
    pub async fn from_file(path: &Path, chunk_size: usize) -> anyhow::Result<Self> {
        let body = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(Self::new(body, chunk_size))
    }

    /// Fail the body with a connection error after the last chunk.
    #[must_use]
    pub fn dropping_connection(mut self, message: impl Into<String>) -> Self {
        self.drop_with = Some(message.into());
        self
    }

    /// Refuse the request before any body is served.
    #[must_use]
    pub fn rejecting(status: u16, message: impl Into<String>) -> Self {
        Self {
            reject: Some((status, message.into())),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn open(&self, pdf_url: &str) -> Result<BodyStream> {
        if let Some((status, message)) = &self.reject {
            return Err(IngestError::Rejected {
                status: *status,
                message: message.clone(),
            });
        }
        debug!(url = pdf_url, chunks = self.chunks.len(), "replaying recorded stream");

        let body = stream::iter(self.chunks.clone().into_iter().map(Ok));
        let tail = stream::iter(self.drop_with.clone().map(|message| {
            Err(IngestError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                message,
            )))
        }));
        Ok(body.chain(tail).boxed())
    }
}
