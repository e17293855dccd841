//! Node info sources — where the monitor gets its per-poll snapshot.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::SourceConfig;
use crate::domain::node::NodesInfo;
use crate::error::{ConfigError, TransportError};

const NODES_FILTER_PATH: &str = "nodes.*.version,nodes.*.http.publish_address,nodes.*.ip";

/// Supplies a snapshot of the cluster's nodes on demand.
///
/// Implementations own their request timeout; an empty snapshot is a valid
/// answer and must not be reported as an error.
#[async_trait]
pub trait NodeInfoSource: Send + Sync {
    async fn fetch_node_versions(&self) -> Result<NodesInfo, TransportError>;
}

/// Queries `GET /_nodes` on a cluster over HTTP.
pub struct HttpNodeSource {
    nodes_url: String,
    http: Client,
}

impl HttpNodeSource {
    pub fn new(config: &SourceConfig) -> Result<Self, ConfigError> {
        let base = reqwest::Url::parse(&config.url).map_err(|e| ConfigError::InvalidSourceUrl {
            url: config.url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidSourceUrl {
                url: config.url.clone(),
                reason: format!("unsupported scheme {:?}", base.scheme()),
            });
        }

        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| ConfigError::InvalidSourceUrl {
                url: config.url.clone(),
                reason: format!("building HTTP client: {}", e),
            })?;

        Ok(Self {
            nodes_url: format!("{}/_nodes", config.url.trim_end_matches('/')),
            http,
        })
    }

    pub fn nodes_url(&self) -> &str {
        &self.nodes_url
    }
}

#[async_trait]
impl NodeInfoSource for HttpNodeSource {
    async fn fetch_node_versions(&self) -> Result<NodesInfo, TransportError> {
        let url = &self.nodes_url;
        debug!(url = %url, "fetching node versions");

        let resp = self
            .http
            .get(url)
            .query(&[("filter_path", NODES_FILTER_PATH)])
            .send()
            .await
            .map_err(|e| transport_error(url, e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.clone(),
                status,
            });
        }

        resp.json::<NodesInfo>().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout { url: url.clone() }
            } else {
                TransportError::Decode {
                    url: url.clone(),
                    source: e,
                }
            }
        })
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else {
        TransportError::Request {
            url: url.to_string(),
            source: e,
        }
    }
}
