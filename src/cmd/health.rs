use std::time::Instant;

use anyhow::{bail, Context, Result};

use pdfspot::{BackendClient, Config};

pub async fn cmd_health(backend: Option<&str>) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = backend {
        config.backend_url = url.to_string();
    }
    let client = BackendClient::new(&config)?;

    let start = Instant::now();
    let healthy = client
        .health()
        .await
        .with_context(|| format!("Backend unreachable: {}", config.backend_url))?;
    let elapsed = start.elapsed();

    if !healthy {
        bail!("Backend unhealthy: {}", config.backend_url);
    }
    println!(
        "✅ Backend healthy: {} ({:.2}ms)",
        config.backend_url,
        elapsed.as_secs_f64() * 1000.0
    );
    Ok(())
}
