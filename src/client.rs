//! Typed HTTP client for the nodewatch daemon REST API.

use anyhow::{bail, Context, Result};
use reqwest::Client;

use crate::domain::report::CompatibilityReport;
use crate::domain::types::DaemonHealth;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:9110";

pub struct NodewatchClient {
    base_url: String,
    http: Client,
}

impl NodewatchClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub async fn health(&self) -> Result<DaemonHealth> {
        self.get("/health").await
    }

    pub async fn compatibility(&self) -> Result<CompatibilityReport> {
        self.get("/api/v1/compatibility").await
    }

    // ── Internal helpers ───────────────────────────────────

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {}", url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if body.is_empty() {
                bail!("{} returned {}", url, status);
            }
            bail!("{} returned {}: {}", url, status, body);
        }

        resp.json()
            .await
            .with_context(|| format!("parsing response from {}", url))
    }
}
