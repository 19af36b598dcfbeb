//! Margin-data API client for fetching per-symbol leverage multipliers.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use tracing::{debug, warn};

use crate::models::MarginEntry;

use super::types::MarginListResponse;

pub const DEFAULT_MARGIN_API_BASE: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRY_ELAPSED: Duration = Duration::from_secs(20);

/// Client for the margin-data service (read-only).
pub struct MarginClient {
    client: Client,
    base_url: String,
}

impl MarginClient {
    /// Create a client for the service at `base_url`.
    pub fn with_base_url(base_url: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the full margin list, retrying transient failures.
    ///
    /// Network errors, 429 and 5xx responses are retried with exponential
    /// backoff; other 4xx responses and malformed bodies fail immediately.
    pub async fn get_margins(&self) -> Result<Vec<MarginEntry>> {
        let url = format!("{}/margins", self.base_url);
        let policy = ExponentialBackoff {
            max_elapsed_time: Some(MAX_RETRY_ELAPSED),
            ..Default::default()
        };

        retry(policy, || async { self.fetch_margins_once(&url).await }).await
    }

    async fn fetch_margins_once(
        &self,
        url: &str,
    ) -> std::result::Result<Vec<MarginEntry>, backoff::Error<anyhow::Error>> {
        debug!(url = %url, "Fetching margin list");

        let response = self.client.get(url).send().await.map_err(|e| {
            warn!(error = %e, "Margin request failed, will retry");
            backoff::Error::transient(anyhow!(e).context("Failed to fetch margins"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let err = anyhow!("Margin request failed: {} - {}", status, body);

            if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                warn!(status = %status, "Margin service unavailable, will retry");
                return Err(backoff::Error::transient(err));
            }
            return Err(backoff::Error::permanent(err));
        }

        let list: MarginListResponse = response
            .json()
            .await
            .context("Failed to parse margin response")
            .map_err(backoff::Error::permanent)?;

        let entries = list.into_entries();
        debug!(count = entries.len(), "Fetched margin list");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Local HTTP stub answering each connection with the next scripted
    /// response; the last one repeats once the script runs out.
    async fn stub_server(responses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let (status, body) = responses[n.min(responses.len() - 1)];

                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(len) => request.extend_from_slice(&buf[..len]),
                    }
                }

                let reply = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{}", addr), hits)
    }

    fn local_client(base_url: &str) -> MarginClient {
        MarginClient {
            client: Client::builder().no_proxy().build().unwrap(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[tokio::test]
    async fn test_retries_unavailable_service() {
        let (base, hits) = stub_server(vec![
            (503, "busy"),
            (429, "slow down"),
            (200, r#"[{"symbol": "TCS", "margin": 3.5}]"#),
        ])
        .await;
        let client = local_client(&format!("{}/", base));

        let entries = client.get_margins().await.unwrap();
        assert_eq!(entries, vec![MarginEntry::new("TCS", dec!(3.5))]);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_error_fails_without_retry() {
        let (base, hits) = stub_server(vec![(404, "not found")]).await;
        let client = local_client(&base);

        let err = client.get_margins().await.unwrap_err();
        assert!(err.to_string().contains("404"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_body_fails_without_retry() {
        let (base, hits) = stub_server(vec![(200, r#"{"unexpected": true}"#)]).await;
        let client = local_client(&base);

        assert!(client.get_margins().await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
