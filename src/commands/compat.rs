//! `nodewatch compat` — evaluate one node version without touching a cluster.

use anyhow::Result;
use colored::Colorize;

use crate::commands::query::print_output;
use crate::domain::types::VersionVerdict;
use crate::domain::version_policy::{VersionPolicy, VersionStrictness};

pub fn run(node_version: &str, app_version: &str, strictness: &str, format: &str) -> Result<()> {
    let strictness: VersionStrictness = strictness.parse()?;
    let verdict = evaluate(node_version, app_version, strictness);

    if format == "table" {
        let label = if verdict.equal {
            "equal".green()
        } else if verdict.compatible {
            "compatible, different version".yellow()
        } else {
            "incompatible".red()
        };
        println!(
            "v{} against application v{} ({}): {}",
            verdict.node_version, verdict.application_version, verdict.strictness, label
        );
    } else {
        print_output(format, &verdict)?;
    }

    if !verdict.compatible {
        std::process::exit(1);
    }
    Ok(())
}

pub fn evaluate(node_version: &str, app_version: &str, strictness: VersionStrictness) -> VersionVerdict {
    let policy = VersionPolicy::new(strictness);
    VersionVerdict {
        node_version: node_version.to_string(),
        application_version: app_version.to_string(),
        strictness: policy.strictness().to_string(),
        compatible: policy.is_compatible(node_version, app_version),
        equal: policy.is_equal(node_version, app_version),
    }
}
