//! Diagnostics and formatting support for the znix configuration dialect.
//!
//! The dialect extends the Nix expression language with context variables
//! (`$ctx.name`), structural nodes (`(zmdl ...)`), action blocks
//! (`@do { ... }`) and typed declarations (`declare NAME : TYPE = VALUE;`).
//! Host tools reject all of these, so this crate offers two things:
//!
//! * fast heuristics ([`scan`], [`check_declarations`]) that run on every
//!   keystroke, and
//! * a masking layer ([`mask`]) that hides the dialect from the host
//!   formatter and parser and maps their results back ([`format_text`],
//!   [`check_syntax`]).
use tracing::instrument;

mod check;
mod config;
mod declarations;
mod error;
mod format;
mod mask;
mod model;
mod scanner;
pub mod syntax;
mod tool;

pub use check::{ReportedError, check_syntax, external_diagnostic, parse_error_output};
pub use config::{Config, DEFAULT_DEBOUNCE_MS, ToolCommand};
pub use declarations::{DeclaredType, TypedDeclaration, check_declarations, find_declarations};
pub use error::{Error, Tool};
pub use format::format_text;
pub use mask::{
    MaskMode, MaskedText, Placeholder, PlaceholderKind, PlaceholderMap, mask, unwrap_formatted,
};
pub use model::{Diagnostic, DiagnosticKind, Position, Range, Severity};
pub use scanner::{BracketEntry, scan};
pub use tool::{ToolOutput, run_tool};

/// Every diagnostic the in-process heuristics produce for `text`: bracket
/// and statement-shape findings first, then typed-declaration mismatches.
#[must_use]
#[instrument(skip(text), fields(len = text.len()))]
pub fn analyze(text: &str) -> Vec<Diagnostic> {
    let mut diagnostics = scan(text);
    diagnostics.extend(check_declarations(text));
    tracing::debug!(count = diagnostics.len(), "analyzed document");
    diagnostics
}
