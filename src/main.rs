//! `pdfspot` CLI - stream positioned text out of a PDF and place it on pages

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "pdfspot")]
#[command(about = "Stream positioned text blocks out of a PDF and place them on rendered pages")]
#[command(version)]
struct Cli {
    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// How extracted text blocks are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per block as it arrives
    Text,
    /// One JSON object per block as it arrives
    Ndjson,
    /// Final session snapshot as a JSON document
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract text blocks from a remote PDF via the extraction backend
    Extract {
        /// URL of the PDF to extract
        pdf_url: String,

        /// Backend base URL (overrides config and BACKEND_URL)
        #[arg(short, long)]
        backend: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Run a recorded NDJSON extraction stream through the pipeline
    Replay {
        /// File holding the recorded response body
        file: PathBuf,

        /// Bytes per simulated network read
        #[arg(short, long)]
        chunk_size: Option<usize>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Place a normalized bounding box on a rendered page surface
    Project {
        /// Normalized box as x0,y0,x1,y1
        #[arg(long, allow_hyphen_values = true)]
        bbox: String,

        /// Page surface client rect as left,top,width,height
        #[arg(long, allow_hyphen_values = true, required_unless_present = "page", conflicts_with = "page")]
        canvas: Option<String>,

        /// Lay out pages in the container and place the box on this page
        #[arg(long)]
        page: Option<u32>,

        /// Number of stacked pages in the layout (defaults to --page)
        #[arg(long, requires = "page")]
        pages: Option<u32>,

        /// Intrinsic page size as width,height
        #[arg(long, requires = "page", default_value = "612,792")]
        page_size: String,

        /// Fixed zoom factor instead of fit-to-width
        #[arg(long, requires = "page")]
        zoom: Option<f64>,

        /// Container client rect as left,top,width,height
        #[arg(long, allow_hyphen_values = true, default_value = "0,0,0,0")]
        container: String,

        /// Rendering scale
        #[arg(short, long, default_value_t = 1.0)]
        scale: f64,

        /// Scroll the container by dx,dy before projecting
        #[arg(long, allow_hyphen_values = true)]
        scroll: Option<String>,
    },

    /// Check that the extraction backend is up
    Health {
        /// Backend base URL (overrides config and BACKEND_URL)
        #[arg(short, long)]
        backend: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match cli.command {
        Commands::Extract { pdf_url, backend, format } => {
            cmd::extract::cmd_extract(&pdf_url, backend.as_deref(), format).await?;
        }
        Commands::Replay { file, chunk_size, format } => {
            cmd::extract::cmd_replay(&file, chunk_size, format).await?;
        }
        Commands::Project {
            bbox,
            canvas,
            page,
            pages,
            page_size,
            zoom,
            container,
            scale,
            scroll,
        } => {
            let surface = match (canvas.as_deref(), page) {
                (Some(canvas), _) => cmd::project::Surface::Canvas(canvas),
                (None, Some(page)) => cmd::project::Surface::Layout {
                    page,
                    pages: pages.unwrap_or(page),
                    page_size: &page_size,
                    zoom,
                },
                (None, None) => anyhow::bail!("either --canvas or --page is required"),
            };
            cmd::project::cmd_project(&bbox, &surface, &container, scale, scroll.as_deref())?;
        }
        Commands::Health { backend } => {
            cmd::health::cmd_health(backend.as_deref()).await?;
        }
    }

    Ok(())
}
