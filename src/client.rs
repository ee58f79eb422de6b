//! HTTP transport to the extraction backend
//!
//! Sends `POST {"pdf_url": ..}` to the extraction endpoint and hands the
//! streaming NDJSON body to the ingestion pipeline. A non-2xx answer is
//! turned into [`IngestError::Rejected`] with the message from the error
//! body, before any of the body is read as a stream.

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::Config;
use crate::ingest::{self, BodyStream, IngestError, Transport};

/// Streaming client for the extraction backend
pub struct BackendClient {
    client: Client,
    extract_url: Url,
    health_url: Url,
}

impl BackendClient {
    /// Create a client for the backend described by `config`
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            // Keep connections alive for reuse across extractions
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .zstd(true)
            .gzip(true)
            .deflate(true)
            // Only the connection is bounded; a slow extraction may stream
            // for as long as the backend keeps it open.
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(10))
            .user_agent(concat!("pdfspot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            extract_url: config.endpoint(&config.extract_path)?,
            health_url: config.endpoint(&config.health_path)?,
        })
    }

    /// Probe the backend's health endpoint
    pub async fn health(&self) -> Result<bool> {
        #[derive(Deserialize)]
        struct Health {
            status: String,
        }

        let response = self.client.get(self.health_url.clone()).send().await?;
        if !response.status().is_success() {
            debug!(status = %response.status(), "health probe failed");
            return Ok(false);
        }
        let health: Health = response.json().await?;
        Ok(health.status == "ok")
    }
}

#[async_trait]
impl Transport for BackendClient {
    #[instrument(skip(self), fields(endpoint = %self.extract_url))]
    async fn open(&self, pdf_url: &str) -> ingest::Result<BodyStream> {
        let pdf_url = validate_pdf_url(pdf_url)?;

        let response = self
            .client
            .post(self.extract_url.clone())
            .header("Accept", "application/x-ndjson, application/json")
            .json(&json!({ "pdf_url": pdf_url.as_str() }))
            .send()
            .await?;

        let status = response.status();
        info!(%status, version = ?response.version(), "Response received");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IngestError::Rejected {
                status: status.as_u16(),
                message: rejection_message(status, &body),
            });
        }

        Ok(response.bytes_stream().map_err(IngestError::from).boxed())
    }
}

/// Check the user-supplied PDF URL before sending anything.
pub fn validate_pdf_url(raw: &str) -> ingest::Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(IngestError::MissingUrl);
    }
    let url = Url::parse(raw).map_err(|e| IngestError::InvalidUrl(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(IngestError::InvalidUrl(format!("unsupported scheme {other}"))),
    }
}

/// Error bodies sent by the proxy (`{"error", "details"}`) or the
/// backend itself (`{"detail"}`).
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    details: Option<String>,
    detail: Option<serde_json::Value>,
}

/// Message for a rejected request, taken from the JSON error body when
/// there is one.
fn rejection_message(status: StatusCode, body: &str) -> String {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let detail = parsed.detail.map(|d| match d {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    });
    match (parsed.error, parsed.details.or(detail)) {
        (Some(error), Some(details)) => format!("{error}: {details}"),
        (Some(message), None) | (None, Some(message)) => message,
        (None, None) => match status.canonical_reason() {
            Some(reason) => format!("Extraction failed: {} {reason}", status.as_u16()),
            None => format!("Extraction failed: {}", status.as_u16()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_error_shape() {
        let msg = rejection_message(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error":"Extraction failed","details":"fetch failed"}"#,
        );
        assert_eq!(msg, "Extraction failed: fetch failed");
        assert_eq!(
            rejection_message(StatusCode::BAD_REQUEST, r#"{"error":"Missing PDF URL"}"#),
            "Missing PDF URL"
        );
    }

    #[test]
    fn backend_detail_shape() {
        assert_eq!(
            rejection_message(StatusCode::INTERNAL_SERVER_ERROR, r#"{"detail":"404 Client Error"}"#),
            "404 Client Error"
        );
        let validation = rejection_message(
            StatusCode::UNPROCESSABLE_ENTITY,
            r#"{"detail":[{"loc":["body","pdf_url"],"msg":"invalid"}]}"#,
        );
        assert!(validation.contains("pdf_url"));
    }

    #[test]
    fn unparseable_body_falls_back_to_status() {
        assert_eq!(
            rejection_message(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>"),
            "Extraction failed: 502 Bad Gateway"
        );
    }

    #[test]
    fn pdf_url_validation() {
        assert!(matches!(validate_pdf_url("  "), Err(IngestError::MissingUrl)));
        assert!(matches!(validate_pdf_url("not a url"), Err(IngestError::InvalidUrl(_))));
        assert!(matches!(validate_pdf_url("ftp://host/a.pdf"), Err(IngestError::InvalidUrl(_))));
        assert_eq!(
            validate_pdf_url(" https://example.com/a.pdf ").unwrap().as_str(),
            "https://example.com/a.pdf"
        );
    }

    #[test]
    fn client_builds_endpoints_from_config() {
        let config = Config {
            backend_url: "http://127.0.0.1:9/api/".into(),
            extract_path: "extract".into(),
            ..Config::default()
        };
        let client = BackendClient::new(&config).unwrap();
        assert_eq!(client.extract_url.as_str(), "http://127.0.0.1:9/api/extract");
        assert_eq!(client.health_url.as_str(), "http://127.0.0.1:9/health");
    }

    #[tokio::test]
    async fn missing_url_is_rejected_without_network() {
        let client = BackendClient::new(&Config::default()).unwrap();
        let err = client.open("").await.err().unwrap();
        assert_eq!(err.to_string(), "Missing PDF URL");
    }

    #[tokio::test]
    async fn unreachable_backend_is_an_http_error() {
        let config = Config {
            backend_url: "http://127.0.0.1:9".into(),
            connect_timeout_secs: 2,
            ..Config::default()
        };
        let client = BackendClient::new(&config).unwrap();
        let err = client.open("https://example.com/a.pdf").await.err().unwrap();
        assert!(matches!(err, IngestError::Http(_)));
        assert!(client.health().await.is_err());
    }
}
