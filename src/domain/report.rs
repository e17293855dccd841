//! Compatibility report — the verdict produced once per poll.
//!
//! `ReportBuilder` folds a raw node snapshot into a `CompatibilityReport`:
//! sort by node key, classify each node with the `VersionPolicy`, then pick
//! a message. An incompatibility message always wins over a warning message.

use async_graphql::SimpleObject;
use serde::{Deserialize, Serialize};

use super::node::{NodeVersionRecord, NodesInfo};
use super::version_policy::VersionPolicy;

pub const NO_DATA_MESSAGE: &str = "Unable to retrieve version information from cluster nodes.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, SimpleObject)]
pub struct CompatibilityReport {
    pub is_compatible: bool,
    pub message: Option<String>,
    pub incompatible_nodes: Vec<NodeVersionRecord>,
    pub warning_nodes: Vec<NodeVersionRecord>,
    pub application_version: String,
}

impl CompatibilityReport {
    /// The "no data" sentinel: nothing could be observed this poll.
    pub fn no_data(application_version: &str) -> Self {
        Self {
            is_compatible: false,
            message: Some(NO_DATA_MESSAGE.to_string()),
            incompatible_nodes: Vec::new(),
            warning_nodes: Vec::new(),
            application_version: application_version.to_string(),
        }
    }

    pub fn is_no_data(&self) -> bool {
        self.message.as_deref() == Some(NO_DATA_MESSAGE)
            && self.incompatible_nodes.is_empty()
            && self.warning_nodes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ReportBuilder {
    application_version: String,
    ignore_version_mismatch: bool,
    policy: VersionPolicy,
}

impl ReportBuilder {
    pub fn new(
        application_version: impl Into<String>,
        ignore_version_mismatch: bool,
        policy: VersionPolicy,
    ) -> Self {
        Self {
            application_version: application_version.into(),
            ignore_version_mismatch,
            policy,
        }
    }

    pub fn application_version(&self) -> &str {
        &self.application_version
    }

    pub fn build(&self, snapshot: &NodesInfo) -> CompatibilityReport {
        if snapshot.is_empty() {
            return CompatibilityReport::no_data(&self.application_version);
        }

        let app = self.application_version.as_str();
        let nodes = snapshot.sorted_records();

        let incompatible_nodes: Vec<NodeVersionRecord> = nodes
            .iter()
            .filter(|n| !self.policy.is_compatible(&n.version, app))
            .cloned()
            .collect();

        // Compatible-but-different nodes still deserve an upgrade notice.
        let warning_nodes: Vec<NodeVersionRecord> = nodes
            .iter()
            .filter(|n| !self.policy.is_equal(&n.version, app))
            .cloned()
            .collect();

        let message = if !incompatible_nodes.is_empty() {
            let names = join_names(&incompatible_nodes);
            if self.ignore_version_mismatch {
                Some(format!(
                    "Ignoring version incompatibility between application v{} and the following cluster nodes: {}",
                    app, names
                ))
            } else {
                Some(format!(
                    "This version of the application (v{}) is incompatible with the following cluster nodes: {}",
                    app, names
                ))
            }
        } else if !warning_nodes.is_empty() {
            Some(format!(
                "You're running application v{} with some different versions of cluster nodes. \
                 Update the application or the cluster to the same version to prevent \
                 compatibility issues: {}",
                app,
                join_names(&warning_nodes)
            ))
        } else {
            None
        };

        CompatibilityReport {
            is_compatible: self.ignore_version_mismatch || incompatible_nodes.is_empty(),
            message,
            incompatible_nodes,
            warning_nodes,
            application_version: self.application_version.clone(),
        }
    }
}

fn join_names(nodes: &[NodeVersionRecord]) -> String {
    nodes
        .iter()
        .map(NodeVersionRecord::display_name)
        .collect::<Vec<_>>()
        .join(", ")
}
