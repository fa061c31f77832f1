//! Workspace-level state management

use dashmap::DashMap;
use dashmap::mapref::one::Ref;
use tower_lsp::lsp_types::Url;

use crate::capabilities::diagnostics;
use crate::convert::PositionEncoding;
use crate::state::DocumentState;

/// Open documents, keyed by URI
pub struct Workspace {
    documents: DashMap<Url, DocumentState>,
}

impl Workspace {
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }

    /// Store the new text and recompute its in-process diagnostics.
    ///
    /// Returns a snapshot of the stored state so callers never hold a map
    /// guard across an await point.
    pub fn update_document(
        &self,
        uri: Url,
        text: String,
        version: i32,
        encoding: PositionEncoding,
    ) -> DocumentState {
        let diagnostics = diagnostics::compute_diagnostics(&text, encoding);
        let state = DocumentState::new(text, version, diagnostics);
        self.documents.insert(uri, state.clone());
        state
    }

    #[must_use]
    pub fn get_document(&self, uri: &Url) -> Option<Ref<'_, Url, DocumentState>> {
        self.documents.get(uri)
    }

    pub fn remove_document(&self, uri: &Url) {
        self.documents.remove(uri);
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}
