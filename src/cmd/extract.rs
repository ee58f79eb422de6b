use std::path::Path;

use anyhow::{bail, Result};

use pdfspot::{BackendClient, Config, ExtractionSession, Extractor, ReplayTransport, SessionState};

use super::output::SessionPrinter;
use crate::OutputFormat;

pub async fn cmd_extract(pdf_url: &str, backend: Option<&str>, format: OutputFormat) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = backend {
        config.backend_url = url.to_string();
    }
    let client = BackendClient::new(&config)?;

    eprintln!("📄 Extracting: {pdf_url}");
    eprintln!("🔌 Backend: {}", config.backend_url);

    let mut extractor = Extractor::new(client);
    run_session(extractor.start(pdf_url), format).await
}

pub async fn cmd_replay(file: &Path, chunk_size: Option<usize>, format: OutputFormat) -> Result<()> {
    let config = Config::load()?;
    let chunk_size = chunk_size.unwrap_or(config.replay_chunk_size);
    let replay = ReplayTransport::from_file(file, chunk_size).await?;

    eprintln!("🔁 Replaying: {} ({} reads)", file.display(), replay.chunk_count());

    let mut extractor = Extractor::new(replay);
    run_session(extractor.start(file.display().to_string()), format).await
}

async fn run_session(session: ExtractionSession, format: OutputFormat) -> Result<()> {
    let handle = session.stop_handle();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.stop();
        }
    });

    let mut printer = SessionPrinter::new(format);
    let snapshot = session.run(|acc| printer.observe(acc)).await;
    interrupt.abort();

    let Some(snapshot) = snapshot else {
        bail!("Extraction cancelled");
    };
    printer.finish(&snapshot)?;

    if snapshot.state == SessionState::Completed {
        return Ok(());
    }
    let message = snapshot.last_error.unwrap_or_else(|| "Extraction failed".to_string());
    bail!("{message}")
}
