//! Formatting: run the host formatter through the masking round trip

use tower_lsp::lsp_types::TextEdit;
use znix_core::ToolCommand;

use crate::convert::{PositionEncoding, PositionMapper};

/// Format `text` and describe the result as edits.
///
/// The whole document is replaced by a single edit; an unchanged document
/// yields no edits.
///
/// # Errors
///
/// Returns the formatter failure. Callers surface it and apply nothing.
pub async fn format_document(
    formatter: &ToolCommand,
    text: &str,
    encoding: PositionEncoding,
) -> Result<Vec<TextEdit>, znix_core::Error> {
    let formatted = znix_core::format_text(formatter, text).await?;
    Ok(full_document_edits(text, formatted, encoding))
}

fn full_document_edits(
    original: &str,
    formatted: String,
    encoding: PositionEncoding,
) -> Vec<TextEdit> {
    if original == formatted {
        return vec![];
    }
    vec![TextEdit {
        range: PositionMapper::new(original, encoding).full_range(),
        new_text: formatted,
    }]
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tower_lsp::lsp_types::{Position, Range};

    use super::*;

    #[test]
    fn test_changed_document_is_replaced_whole() {
        let edits = full_document_edits("a=1;\n", "a = 1;\n".to_string(), PositionEncoding::Utf16);
        assert_eq!(
            edits,
            vec![TextEdit {
                range: Range::new(Position::new(0, 0), Position::new(1, 0)),
                new_text: "a = 1;\n".to_string(),
            }]
        );
    }

    #[test]
    fn test_unchanged_document_needs_no_edit() {
        assert!(
            full_document_edits("a = 1;\n", "a = 1;\n".to_string(), PositionEncoding::Utf16)
                .is_empty()
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_formatter_failure_produces_no_edit() {
        let formatter = ToolCommand::new("sh", &["-c", "cat >/dev/null; exit 2"]);
        let result = format_document(&formatter, "{ a = 1; }", PositionEncoding::Utf16).await;
        assert!(result.is_err());
    }
}
