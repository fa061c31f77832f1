//! LSP backend implementation
//!
//! Contains the main `Backend` struct that implements the `LanguageServer` trait.

use std::sync::{Arc, OnceLock};

use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CompletionOptions, CompletionParams, CompletionResponse, Diagnostic,
    DidChangeConfigurationParams,
    DidChangeTextDocumentParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    DocumentFormattingParams, InitializeParams, InitializeResult, InitializedParams,
    MessageType, OneOf, ServerCapabilities, ServerInfo, TextDocumentSyncCapability,
    TextDocumentSyncKind, TextEdit, Url,
};
use tower_lsp::{Client, LanguageServer};
use znix_core::Config;

use crate::capabilities::{completion, diagnostics, formatting};
use crate::convert::{PositionEncoding, PositionMapper};
use crate::scheduler::CheckScheduler;
use crate::state::{DocumentState, Workspace};

/// LSP backend for znix documents
pub struct Backend {
    /// Client handle for sending messages back to the editor
    client: Client,
    /// Open documents
    workspace: Workspace,
    /// Tool commands and debounce, from the client's initialization options
    config: Arc<RwLock<Config>>,
    /// Debounced host-parser checks
    scheduler: Arc<CheckScheduler>,
    /// Column encoding agreed on in `initialize`
    encoding: OnceLock<PositionEncoding>,
}

impl Backend {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self {
            client,
            workspace: Workspace::new(),
            config: Arc::new(RwLock::new(Config::default())),
            scheduler: Arc::new(CheckScheduler::new()),
            encoding: OnceLock::new(),
        }
    }

    fn encoding(&self) -> PositionEncoding {
        self.encoding.get().copied().unwrap_or_default()
    }

    /// Publish the in-process diagnostics now and schedule the host-parser
    /// check for later.
    async fn refresh_diagnostics(&self, uri: Url, state: DocumentState) {
        self.client
            .publish_diagnostics(uri.clone(), state.diagnostics.clone(), Some(state.version))
            .await;
        self.schedule_external_check(uri, state).await;
    }

    async fn schedule_external_check(&self, uri: Url, state: DocumentState) {
        let delay = self.config.read().await.debounce();
        let encoding = self.encoding();
        let client = self.client.clone();
        let config = Arc::clone(&self.config);
        let scheduler = Arc::clone(&self.scheduler);
        let target = uri.clone();

        self.scheduler.schedule(uri, delay, move |generation| async move {
            let parser = config.read().await.parser.clone();
            let external = znix_core::external_diagnostic(&parser, &state.text)
                .await
                .map(|found| {
                    let mapper = PositionMapper::new(&state.text, encoding);
                    diagnostics::to_lsp_diagnostic(&found, &mapper)
                });

            if let Some(published) =
                merge_check_result(&scheduler, &target, generation, state.diagnostics, external)
            {
                client
                    .publish_diagnostics(target, published, Some(state.version))
                    .await;
            }
        });
    }
}

/// What to publish when the check of `generation` finishes: the diagnostics
/// captured when it was scheduled plus the parser's finding, or `None` once a
/// later edit or a close has superseded the check.
fn merge_check_result(
    scheduler: &CheckScheduler,
    uri: &Url,
    generation: u64,
    captured: Vec<Diagnostic>,
    external: Option<Diagnostic>,
) -> Option<Vec<Diagnostic>> {
    if !scheduler.is_current(uri, generation) {
        tracing::debug!(%uri, generation, "discarding stale check result");
        return None;
    }
    let mut published = captured;
    published.extend(external);
    Some(published)
}

/// Replace `config` with `value` when it deserializes; keep it otherwise.
fn apply_config(value: serde_json::Value, config: &mut Config) {
    match serde_json::from_value::<Config>(value) {
        Ok(parsed) => {
            tracing::info!(
                formatter = %parsed.formatter.display(),
                parser = %parsed.parser.display(),
                debounce_ms = parsed.debounce_ms,
                "configuration applied"
            );
            *config = parsed;
        }
        Err(error) => {
            tracing::warn!(%error, "invalid configuration, keeping previous settings");
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        tracing::info!("Initializing znix-lsp");

        let encoding = PositionEncoding::negotiate(&params);
        if self.encoding.set(encoding).is_err() {
            tracing::warn!("initialize received twice, keeping the first position encoding");
        }
        tracing::debug!(?encoding, "position encoding negotiated");

        if let Some(options) = params.initialization_options {
            let mut config = self.config.write().await;
            apply_config(options, &mut config);
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                position_encoding: Some(self.encoding().kind()),
                // Full sync: every change carries the whole document
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                document_formatting_provider: Some(OneOf::Left(true)),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![
                        "$".to_string(),
                        "_".to_string(),
                        "(".to_string(),
                        "\"".to_string(),
                    ]),
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "znix-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        tracing::info!("znix-lsp initialized");
    }

    async fn shutdown(&self) -> Result<()> {
        tracing::info!("Shutting down znix-lsp");
        Ok(())
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        // settings may come namespaced under the server's own key
        let settings = match params.settings {
            serde_json::Value::Object(mut map) if map.contains_key("znix") => {
                map.remove("znix").unwrap_or_default()
            }
            other => other,
        };
        if settings.is_null() {
            return;
        }
        let mut config = self.config.write().await;
        apply_config(settings, &mut config);
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let text = params.text_document.text;
        let version = params.text_document.version;

        tracing::debug!("Document opened: {uri}");

        let state =
            self.workspace
                .update_document(uri.clone(), text, version, self.encoding());
        self.refresh_diagnostics(uri, state).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        // With FULL sync the last change holds the complete new text
        if let Some(change) = params.content_changes.into_iter().next_back() {
            tracing::debug!("Document changed: {uri}");

            let state = self.workspace.update_document(
                uri.clone(),
                change.text,
                version,
                self.encoding(),
            );
            self.refresh_diagnostics(uri, state).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;

        tracing::debug!("Document closed: {uri}");

        self.scheduler.cancel_pending(&uri);
        self.workspace.remove_document(&uri);
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;

        // Copy the text out so no map guard is held across the formatter run
        let Some(text) = self.workspace.get_document(&uri).map(|doc| doc.text.clone()) else {
            return Ok(None);
        };
        let formatter = self.config.read().await.formatter.clone();

        match formatting::format_document(&formatter, &text, self.encoding()).await {
            Ok(edits) => Ok(Some(edits)),
            Err(error) => {
                tracing::warn!(%error, "formatting failed");
                self.client
                    .show_message(MessageType::WARNING, format!("znix: formatting failed: {error}"))
                    .await;
                Ok(None)
            }
        }
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let response = self
            .workspace
            .get_document(&uri)
            .and_then(|doc| completion::compute_completions(&doc, position, self.encoding()))
            .map(CompletionResponse::Array);

        Ok(response)
    }
}
