//! Change filter — only let a report through when the verdict actually moved.

use super::node::NodeVersionRecord;
use super::report::CompatibilityReport;

/// Holds the last delivered report and compares new ones against it.
///
/// Comparison is deliberately narrow: compatibility flag, list lengths, and
/// positional `(ip, version)` pairs. Message wording is not part of it.
#[derive(Debug, Default)]
pub struct ChangeFilter {
    last: Option<CompatibilityReport>,
}

impl ChangeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the report if it should be emitted, recording it as the new baseline.
    pub fn offer(&mut self, report: CompatibilityReport) -> Option<CompatibilityReport> {
        if let Some(last) = &self.last {
            if same_verdict(last, &report) {
                return None;
            }
        }
        self.last = Some(report.clone());
        Some(report)
    }

    pub fn last(&self) -> Option<&CompatibilityReport> {
        self.last.as_ref()
    }
}

pub fn same_verdict(prev: &CompatibilityReport, curr: &CompatibilityReport) -> bool {
    prev.is_compatible == curr.is_compatible
        && same_nodes(&prev.incompatible_nodes, &curr.incompatible_nodes)
        && same_nodes(&prev.warning_nodes, &curr.warning_nodes)
}

fn same_nodes(prev: &[NodeVersionRecord], curr: &[NodeVersionRecord]) -> bool {
    prev.len() == curr.len() && prev.iter().zip(curr).all(|(a, b)| a.same_node_version(b))
}
