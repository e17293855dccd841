//! `nodewatch check` — poll the cluster once and print the verdict.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::commands::query::print_output;
use crate::config::{self, Overrides};
use crate::domain::node::NodesInfo;
use crate::domain::report::{CompatibilityReport, ReportBuilder};
use crate::domain::version_policy::VersionPolicy;
use crate::source::{HttpNodeSource, NodeInfoSource};

pub fn run(config_path: Option<PathBuf>, overrides: Overrides, format: &str) -> Result<()> {
    let mut cfg = config::load(config_path.as_deref())?;
    cfg.apply(overrides)?;
    cfg.monitor.validate()?;

    let source = HttpNodeSource::new(&cfg.source).context("configuring node source")?;
    let builder = ReportBuilder::new(
        cfg.monitor.application_version.trim(),
        cfg.monitor.ignore_version_mismatch,
        VersionPolicy::new(cfg.monitor.version_strictness),
    );

    let rt = tokio::runtime::Runtime::new()?;
    // A failed fetch is still an answer: the no-data report.
    let snapshot = rt.block_on(source.fetch_node_versions()).unwrap_or_else(|e| {
        eprintln!("{} {}", "!!".yellow().bold(), e);
        NodesInfo::default()
    });
    let report = builder.build(&snapshot);

    match format {
        "table" => print_table(&report, source.nodes_url(), snapshot.nodes.len()),
        other => print_output(other, &report)?,
    }

    std::process::exit(if report.is_compatible { 0 } else { 1 });
}

fn print_table(report: &CompatibilityReport, url: &str, observed: usize) {
    println!("{}", "nodewatch check".bold());
    println!("  cluster:     {}", url);
    println!("  application: v{}", report.application_version);
    println!("  nodes:       {}", observed);

    if report.is_compatible {
        println!("  verdict:     {}", "compatible".green());
    } else {
        println!("  verdict:     {}", "incompatible".red());
    }

    for node in &report.incompatible_nodes {
        println!("  {} {}", "x".red().bold(), node.display_name());
    }
    for node in report
        .warning_nodes
        .iter()
        .filter(|n| !report.incompatible_nodes.contains(n))
    {
        println!("  {} {}", "!".yellow().bold(), node.display_name());
    }

    if let Some(message) = &report.message {
        println!("  message:     {}", message);
    }
}
