use std::path::PathBuf;

use anyhow::Result;

use crate::config::{self, Overrides};

pub fn run(config_path: Option<PathBuf>, overrides: Overrides) -> Result<()> {
    // Defaults → config file → NODEWATCH_* env; CLI flags override all of them
    let mut cfg = config::load(config_path.as_deref())?;
    cfg.apply(overrides)?;
    cfg.monitor.validate()?;

    // Build tokio runtime explicitly (no #[tokio::main] on fn main)
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(crate::server::run(cfg))
}
