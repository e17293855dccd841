pub mod change_filter;
pub mod node;
pub mod report;
pub mod types;
pub mod version_policy;
