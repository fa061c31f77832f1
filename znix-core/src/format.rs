use crate::config::ToolCommand;
use crate::error::{Error, Tool};
use crate::mask::{MaskMode, mask};
use crate::tool::run_tool;

/// Format a document with the host formatter.
///
/// The dialect constructs are masked first so the formatter only ever sees
/// host-language syntax, then put back into its output. Blank documents are
/// returned as they are without running the formatter.
///
/// # Errors
///
/// Any failure of the formatter run: it could not be started, exited
/// non-zero, or printed nothing.
#[tracing::instrument(skip(text), fields(len = text.len()))]
pub async fn format_text(formatter: &ToolCommand, text: &str) -> Result<String, Error> {
    if text.trim().is_empty() {
        return Ok(text.to_string());
    }

    let masked = mask(text, MaskMode::Format);
    tracing::trace!(
        placeholders = masked.placeholders.len(),
        wrapped = masked.wrapped,
        "masked document for formatting"
    );

    let formatted = run_tool(Tool::Formatter, formatter, &masked.text)
        .await?
        .into_stdout(Tool::Formatter)?;
    Ok(masked.restore(&formatted))
}
