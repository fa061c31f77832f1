use std::path::Path;

use miette::{Diagnostic, NamedSource, SourceSpan};
use znix_core::syntax::LineIndex;

/// A finding rendered with its source context
#[derive(Debug, Diagnostic, thiserror::Error)]
#[error("{message}")]
#[diagnostic()]
pub(crate) struct RichError {
    message: String,

    #[help]
    advice: String,

    #[source_code]
    src: NamedSource<String>,

    #[label("{position_advice}")]
    span: SourceSpan,
    position_advice: String,
}

impl RichError {
    pub(crate) fn new(path: &Path, source: &str, diagnostic: &znix_core::Diagnostic) -> Self {
        let index = LineIndex::new(source);
        let start = index.offset(diagnostic.range.start);
        let end = index.offset(diagnostic.range.end).max(start);

        Self {
            message: diagnostic.message.clone(),
            advice: advice_for(diagnostic.kind).to_string(),
            src: NamedSource::new(path.display().to_string(), source.to_string()),
            span: SourceSpan::new(start.into(), end - start),
            position_advice: format!(
                "here (line {}, column {})",
                diagnostic.range.start.line + 1,
                diagnostic.range.start.column + 1
            ),
        }
    }
}

fn advice_for(kind: znix_core::DiagnosticKind) -> &'static str {
    match kind {
        znix_core::DiagnosticKind::Structural => "every '{', '[' and '(' needs a matching close",
        znix_core::DiagnosticKind::StatementShape => {
            "attribute statements look like `name = value;`"
        }
        znix_core::DiagnosticKind::TypeMismatch => "the value must match the declared type",
        znix_core::DiagnosticKind::ExternalTool => "reported by the host parser",
    }
}

/// Print every diagnostic of one file to stderr.
pub(crate) fn display(path: &Path, source: &str, diagnostics: &[znix_core::Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{:?}", miette::Report::new(RichError::new(path, source, diagnostic)));
    }
}
