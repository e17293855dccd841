use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, SimpleObject)]
pub struct DaemonHealth {
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
    pub application_version: String,
    pub source_url: String,
    /// False until the first poll has produced a report.
    pub has_report: bool,
}

/// Result of checking a single node version offline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionVerdict {
    pub node_version: String,
    pub application_version: String,
    pub strictness: String,
    pub compatible: bool,
    pub equal: bool,
}
