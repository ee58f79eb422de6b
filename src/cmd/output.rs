use anyhow::Result;

use pdfspot::{ChunkAccumulator, SessionSnapshot, TextChunk};

use crate::OutputFormat;

/// Prints chunks and progress as the session observer reports them.
pub struct SessionPrinter {
    format: OutputFormat,
    printed: usize,
    last_progress: Option<u8>,
}

impl SessionPrinter {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            printed: 0,
            last_progress: None,
        }
    }

    pub fn observe(&mut self, acc: &ChunkAccumulator) {
        let progress = acc.progress_percent();
        if self.last_progress != Some(progress) && progress > 0 {
            eprintln!("⏳ {progress}%");
        }
        self.last_progress = Some(progress);

        if self.format == OutputFormat::Json {
            self.printed = acc.len();
            return;
        }
        for chunk in acc.chunks().skip(self.printed) {
            print_chunk(chunk, self.format);
        }
        self.printed = acc.len();
    }

    pub fn finish(&self, snapshot: &SessionSnapshot) -> Result<()> {
        if self.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(snapshot)?);
        }
        for notice in &snapshot.notices {
            eprintln!("⚠️  {}", notice.message);
        }
        eprintln!(
            "\n📊 {:?}: {} text blocks, {}%",
            snapshot.state,
            snapshot.chunks.len(),
            snapshot.progress_percent
        );
        Ok(())
    }
}

fn print_chunk(chunk: &TextChunk, format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            let b = chunk.bbox;
            println!(
                "p{:<4} [{:.3}, {:.3}, {:.3}, {:.3}]  {}",
                chunk.page_num, b.x0, b.y0, b.x1, b.y1, chunk.text
            );
        }
        OutputFormat::Ndjson => {
            if let Ok(line) = serde_json::to_string(chunk) {
                println!("{line}");
            }
        }
        OutputFormat::Json => {}
    }
}
