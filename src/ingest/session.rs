//! Extraction session orchestration.
//!
//! A session owns one request's pipeline: it opens the body through a
//! [`Transport`], reads chunks strictly one after another, frames and
//! decodes them, applies each event to its [`ChunkAccumulator`], and calls
//! the observer after every applied event.
//!
//! Sessions are created by an [`Extractor`], which hands out increasing
//! generation numbers. Starting a new session stops the previous one, and a
//! session whose generation is no longer current never calls its observer
//! again.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::Notify;
use tracing::{debug, info, instrument};

use super::accumulator::{ChunkAccumulator, SessionSnapshot, SessionState};
use super::event::decode;
use super::framer::LineFramer;
use super::Transport;

#[derive(Debug, Default)]
struct StopSignal {
    stopped: AtomicBool,
    notify: Notify,
}

/// Cancels a session. Cheap to clone; stopping is idempotent.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    inner: Arc<StopSignal>,
}

impl StopHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the session to stop. Safe to call at any time, any number of
    /// times, including before the stream has been opened.
    pub fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::SeqCst) {
            self.inner.notify.notify_waiters();
        }
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Resolves once [`stop`](Self::stop) has been called.
    pub async fn stopped(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_stopped() {
                return;
            }
            notified.await;
        }
    }
}

/// One extraction request and its accumulated state.
pub struct ExtractionSession {
    url: String,
    generation: u64,
    live: Arc<AtomicU64>,
    transport: Arc<dyn Transport>,
    stop: StopHandle,
    framer: LineFramer,
    acc: ChunkAccumulator,
}

impl std::fmt::Debug for ExtractionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionSession")
            .field("url", &self.url)
            .field("generation", &self.generation)
            .field("state", &self.acc.state())
            .finish_non_exhaustive()
    }
}

impl ExtractionSession {
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.acc.state()
    }

    /// Handle that cancels this session from elsewhere.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Not stopped and not superseded by a newer session.
    fn is_current(&self) -> bool {
        !self.stop.is_stopped() && self.live.load(Ordering::SeqCst) == self.generation
    }

    fn emit<F: FnMut(&ChunkAccumulator)>(&self, observer: &mut F) {
        if self.is_current() {
            observer(&self.acc);
        }
    }

    fn finish(&self) -> Option<SessionSnapshot> {
        if !self.is_current() {
            debug!(generation = self.generation, "session cancelled");
            return None;
        }
        Some(self.acc.snapshot(self.generation, &self.url))
    }

    /// Drive the session to a terminal state.
    ///
    /// `observer` sees the accumulator after the request starts and after
    /// every decoded event. Returns the final snapshot, or `None` if the
    /// session was stopped or superseded.
    #[instrument(skip_all, fields(url = %self.url, generation = self.generation))]
    pub async fn run<F>(mut self, mut observer: F) -> Option<SessionSnapshot>
    where
        F: FnMut(&ChunkAccumulator),
    {
        if !self.is_current() {
            return self.finish();
        }
        self.acc.begin();
        self.emit(&mut observer);
        info!("requesting extraction");

        let stop = self.stop.clone();
        let opened = tokio::select! {
            biased;
            () = stop.stopped() => None,
            opened = self.transport.open(&self.url) => Some(opened),
        };
        let Some(opened) = opened else {
            return self.finish();
        };
        let mut body = match opened {
            Ok(body) => body,
            Err(e) => {
                if e.is_rejection() {
                    self.acc.reject_request(e.status(), e.to_string());
                } else {
                    self.acc.fail_transport(e.to_string());
                }
                self.emit(&mut observer);
                return self.finish();
            }
        };

        loop {
            let next = tokio::select! {
                biased;
                () = stop.stopped() => None,
                next = body.next() => Some(next),
            };
            let Some(next) = next else {
                break;
            };
            match next {
                Some(Ok(bytes)) => {
                    let records = self.framer.feed(&bytes);
                    if self.handle_records(records, &mut observer) {
                        break;
                    }
                }
                Some(Err(e)) => {
                    self.acc.fail_transport(e.to_string());
                    self.emit(&mut observer);
                    break;
                }
                None => {
                    if let Some(tail) = self.framer.flush() {
                        self.handle_records(vec![tail], &mut observer);
                    }
                    if !self.acc.state().is_terminal() {
                        self.acc.fail_incomplete();
                        self.emit(&mut observer);
                    }
                    break;
                }
            }
        }
        // releases the underlying reader
        drop(body);

        info!(
            state = ?self.acc.state(),
            chunks = self.acc.len(),
            malformed = self.acc.malformed_count(),
            "session finished"
        );
        self.finish()
    }

    /// Decode and apply framed records. Returns `true` when reading should
    /// stop.
    fn handle_records<F: FnMut(&ChunkAccumulator)>(&mut self, records: Vec<String>, observer: &mut F) -> bool {
        for record in records {
            match decode(&record) {
                None => {}
                Some(Err(failure)) => self.acc.note_malformed(&failure),
                Some(Ok(event)) => {
                    let delta = self.acc.apply(event);
                    self.emit(observer);
                    if delta.halt {
                        return true;
                    }
                }
            }
            if !self.is_current() {
                return true;
            }
        }
        false
    }
}

/// Creates sessions against one transport and keeps only the newest alive.
pub struct Extractor {
    transport: Arc<dyn Transport>,
    generation: Arc<AtomicU64>,
    active: Option<StopHandle>,
}

impl Extractor {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_transport(Arc::new(transport))
    }

    #[must_use]
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            generation: Arc::new(AtomicU64::new(0)),
            active: None,
        }
    }

    /// Start a fresh session for `url`, stopping the current one.
    pub fn start(&mut self, url: impl Into<String>) -> ExtractionSession {
        self.stop();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let stop = StopHandle::new();
        self.active = Some(stop.clone());

        let url = url.into();
        debug!(%url, generation, "session created");
        ExtractionSession {
            url,
            generation,
            live: Arc::clone(&self.generation),
            transport: Arc::clone(&self.transport),
            stop,
            framer: LineFramer::new(),
            acc: ChunkAccumulator::new(),
        }
    }

    /// Stop the current session, if any. Returns `true` if one was running.
    pub fn stop(&mut self) -> bool {
        match self.active.take() {
            Some(handle) => {
                handle.stop();
                true
            }
            None => false,
        }
    }

    /// Generation of the most recently started session.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
