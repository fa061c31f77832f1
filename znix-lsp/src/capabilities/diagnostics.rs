//! Diagnostics: convert znix-core findings to LSP diagnostics
//!
//! Two sources end up here:
//! - the in-process heuristics, run on every open and change
//! - the host parser, run after the edits settle

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString};
use znix_core::{DiagnosticKind, Severity};

use crate::convert::{PositionEncoding, PositionMapper};

const SOURCE: &str = "znix";

/// Run the scanner and the declaration checker over `text`.
#[must_use]
pub fn compute_diagnostics(text: &str, encoding: PositionEncoding) -> Vec<Diagnostic> {
    let mapper = PositionMapper::new(text, encoding);
    znix_core::analyze(text)
        .iter()
        .map(|diagnostic| to_lsp_diagnostic(diagnostic, &mapper))
        .collect()
}

#[must_use]
pub fn to_lsp_diagnostic(
    diagnostic: &znix_core::Diagnostic,
    mapper: &PositionMapper<'_>,
) -> Diagnostic {
    Diagnostic {
        range: mapper.range(diagnostic.range),
        severity: Some(severity_to_lsp(diagnostic.severity)),
        code: Some(NumberOrString::String(kind_code(diagnostic.kind).to_string())),
        source: Some(SOURCE.to_string()),
        message: diagnostic.message.clone(),
        ..Default::default()
    }
}

fn severity_to_lsp(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Information => DiagnosticSeverity::INFORMATION,
        Severity::Hint => DiagnosticSeverity::HINT,
    }
}

fn kind_code(kind: DiagnosticKind) -> &'static str {
    match kind {
        DiagnosticKind::Structural => "structural",
        DiagnosticKind::StatementShape => "statement-shape",
        DiagnosticKind::TypeMismatch => "type-mismatch",
        DiagnosticKind::ExternalTool => "syntax",
    }
}
