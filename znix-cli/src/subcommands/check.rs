use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use znix_core::Config;

use crate::error;

/// Report problems in znix documents
#[derive(ClapArgs, Debug)]
pub(crate) struct Args {
    /// Files to check
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Also run the host parser over each document
    #[arg(long)]
    pub external: bool,
}

/// Check every file; `Ok(true)` when none had a problem.
#[tracing::instrument(skip(config))]
pub(crate) async fn run(args: &Args, config: &Config) -> Result<bool> {
    let mut problems = 0;
    for path in &args.files {
        let source = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;

        let mut diagnostics = znix_core::analyze(&source);
        if args.external {
            diagnostics.extend(znix_core::external_diagnostic(&config.parser, &source).await);
        }

        tracing::debug!(path = %path.display(), count = diagnostics.len(), "checked");
        error::display(path, &source, &diagnostics);
        problems += diagnostics.len();
    }

    if problems > 0 {
        eprintln!(
            "{problems} problem(s) found in {} file(s)",
            args.files.len()
        );
    }
    Ok(problems == 0)
}
