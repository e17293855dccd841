//! Node info — the `_nodes` wire shape and the sorted records built from it.

use std::collections::HashMap;

use async_graphql::{ComplexObject, SimpleObject};
use serde::{Deserialize, Deserializer, Serialize};

/// A single node as returned by the node info endpoint (filtered).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub version: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub ip: String,
    #[serde(default)]
    pub http: Option<NodeHttp>,
}

/// `null` or a non-string value decodes as `""` so one odd node is judged
/// malformed on its own instead of failing the whole snapshot.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        _ => String::new(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeHttp {
    #[serde(default)]
    pub publish_address: Option<String>,
}

/// Snapshot of every node the cluster reported in one poll.
///
/// `{}` is a valid body (nothing matched the filter) and yields no nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodesInfo {
    #[serde(default)]
    pub nodes: HashMap<String, NodeInfo>,
}

impl NodesInfo {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Records sorted by node key, independent of response order.
    pub fn sorted_records(&self) -> Vec<NodeVersionRecord> {
        let mut keys: Vec<&String> = self.nodes.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|key| NodeVersionRecord::from_info(key, &self.nodes[key]))
            .collect()
    }
}

/// One node's observed state at a poll instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
#[graphql(complex)]
pub struct NodeVersionRecord {
    pub key: String,
    pub version: String,
    pub ip: String,
    pub publish_address: Option<String>,
}

impl NodeVersionRecord {
    pub fn from_info(key: &str, info: &NodeInfo) -> Self {
        Self {
            key: key.to_string(),
            version: info.version.clone(),
            ip: info.ip.clone(),
            publish_address: info.http.as_ref().and_then(|h| h.publish_address.clone()),
        }
    }

    /// Human-readable form used in report messages: `v2.4.0 @ 10.0.0.1:9200 (10.0.0.1)`.
    pub fn display_name(&self) -> String {
        match &self.publish_address {
            Some(addr) => format!("v{} @ {} ({})", self.version, addr, self.ip),
            None => format!("v{} @ ({})", self.version, self.ip),
        }
    }

    /// Identity used by change detection: address and version only.
    pub fn same_node_version(&self, other: &Self) -> bool {
        self.ip == other.ip && self.version == other.version
    }
}

#[ComplexObject]
impl NodeVersionRecord {
    #[graphql(name = "displayName")]
    async fn humanized_name(&self) -> String {
        self.display_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_filtered_nodes_response() {
        let body = r#"{
            "nodes": {
                "b-node": {"version": "2.4.0", "ip": "10.0.0.2", "http": {"publish_address": "10.0.0.2:9200"}},
                "a-node": {"version": "2.3.0", "ip": "10.0.0.1"}
            }
        }"#;
        let info: NodesInfo = serde_json::from_str(body).unwrap();
        let records = info.sorted_records();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "a-node");
        assert_eq!(records[0].publish_address, None);
        assert_eq!(records[1].publish_address.as_deref(), Some("10.0.0.2:9200"));
    }

    #[test]
    fn empty_body_means_no_nodes() {
        let info: NodesInfo = serde_json::from_str("{}").unwrap();
        assert!(info.is_empty());
        assert!(info.sorted_records().is_empty());
    }

    #[test]
    fn missing_version_becomes_empty_string() {
        let info: NodesInfo = serde_json::from_str(r#"{"nodes": {"n1": {"ip": "10.0.0.1"}}}"#).unwrap();
        assert_eq!(info.nodes["n1"].version, "");
    }

    #[test]
    fn null_or_non_string_fields_stay_per_node() {
        let body = r#"{"nodes": {
            "n1": {"version": "2.4.0", "ip": "10.0.0.1"},
            "n2": {"version": null, "ip": "10.0.0.2"},
            "n3": {"version": 2, "ip": null}
        }}"#;
        let info: NodesInfo = serde_json::from_str(body).unwrap();

        assert_eq!(info.nodes.len(), 3);
        assert_eq!(info.nodes["n1"].version, "2.4.0");
        assert_eq!(info.nodes["n2"].version, "");
        assert_eq!(info.nodes["n3"].version, "");
        assert_eq!(info.nodes["n3"].ip, "");
    }

    #[test]
    fn display_name_with_and_without_publish_address() {
        let mut record = NodeVersionRecord {
            key: "n1".into(),
            version: "2.4.0".into(),
            ip: "10.0.0.1".into(),
            publish_address: Some("10.0.0.1:9200".into()),
        };
        assert_eq!(record.display_name(), "v2.4.0 @ 10.0.0.1:9200 (10.0.0.1)");

        record.publish_address = None;
        assert_eq!(record.display_name(), "v2.4.0 @ (10.0.0.1)");
    }
}
