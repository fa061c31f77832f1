use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args as ClapArgs;
use znix_core::Config;

/// Format znix documents
#[derive(ClapArgs, Debug)]
pub(crate) struct Args {
    /// Files to format
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Write the result back instead of printing it
    #[arg(short, long)]
    pub write: bool,
}

/// Format every file. Formatter failures are reported per file and make the
/// result `Ok(false)`; the remaining files are still formatted.
#[tracing::instrument(skip(config))]
pub(crate) async fn run(args: &Args, config: &Config) -> Result<bool> {
    let mut failed = 0;
    for path in &args.files {
        let source = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;

        let formatted = match znix_core::format_text(&config.formatter, &source).await {
            Ok(formatted) => formatted,
            Err(error) => {
                tracing::warn!(path = %path.display(), %error, "formatting failed");
                eprintln!("{}: {error}", path.display());
                failed += 1;
                continue;
            }
        };

        if args.write {
            if formatted != source {
                tokio::fs::write(path, &formatted)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                eprintln!("formatted {}", path.display());
            }
        } else {
            print!("{formatted}");
        }
    }
    Ok(failed == 0)
}
