//! Single document state management

use tower_lsp::lsp_types::Diagnostic;

/// An open document and its latest in-process diagnostics
#[derive(Debug, Clone)]
pub struct DocumentState {
    /// Full source text (full sync: replaced on every change)
    pub text: String,
    /// Version from the editor
    pub version: i32,
    /// Scanner and declaration-checker findings for `text`
    pub diagnostics: Vec<Diagnostic>,
}

impl DocumentState {
    #[must_use]
    pub fn new(text: String, version: i32, diagnostics: Vec<Diagnostic>) -> Self {
        Self {
            text,
            version,
            diagnostics,
        }
    }
}
