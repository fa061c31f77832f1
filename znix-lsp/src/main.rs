//! znix-lsp: Language Server Protocol implementation for the znix dialect
//!
//! Provides, over stdio:
//! - Diagnostics (bracket, statement and typed-declaration heuristics, plus a
//!   debounced check through the host parser)
//! - Formatting through the host formatter
//! - Completion of dialect keywords, context variables and enum values

use tower_lsp::{LspService, Server};
use tracing_subscriber::EnvFilter;

use znix_lsp::Backend;

#[tokio::main]
async fn main() {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting znix-lsp server");

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
