//! `pdfspot` - streamed PDF text extraction with on-page highlighting
//!
//! # Features
//!
//! - **Incremental ingestion**: NDJSON framing across arbitrary chunk
//!   boundaries, tolerant event decoding, deduplicated accumulation with
//!   monotonic progress
//! - **Sessions**: sequential read loop with cancellation and generation
//!   guarding, partial results kept on connection loss
//! - **Overlay projection**: normalized bounding boxes placed on rendered
//!   page surfaces inside a scrollable, resizable container
//!
//! # Example
//!
//! ```rust,no_run
//! use pdfspot::{BackendClient, Config, Extractor};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let mut extractor = Extractor::new(BackendClient::new(&config)?);
//!     let session = extractor.start("https://example.com/paper.pdf");
//!     if let Some(snapshot) = session.run(|acc| println!("{}%", acc.progress_percent())).await {
//!         println!("{} text blocks", snapshot.chunks.len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod ingest;
pub mod overlay;

pub use client::BackendClient;
pub use config::Config;
pub use ingest::{
    ChunkAccumulator, ExtractionSession, Extractor, IngestError, LineFramer, ReplayTransport,
    SessionSnapshot, SessionState, StopHandle, StreamEvent, TextChunk, Transport,
};
pub use overlay::{BBox, OverlayRect, OverlayTracker, PageLayout, Projection, Rect, Selection};

/// Version of pdfspot
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
