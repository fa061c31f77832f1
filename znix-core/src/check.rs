//! External syntax check through the host parser.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::ToolCommand;
use crate::error::{Error, Tool};
use crate::mask::{MaskMode, mask};
use crate::model::{Diagnostic, DiagnosticKind, Range};
use crate::syntax::LineIndex;
use crate::tool::run_tool;

#[allow(clippy::expect_used)]
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("valid ANSI escape regex")
});

/// `error: MSG at TAG:LINE:COL`, possibly spread over two lines.
#[allow(clippy::expect_used)]
static INLINE_ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"error:\s*(.+?),?\s+at\s+\S+:(\d+):(\d+)").expect("valid inline error regex")
});

#[allow(clippy::expect_used)]
static ERROR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"error:\s*(.+?)\s*$").expect("valid error line regex")
});

#[allow(clippy::expect_used)]
static LOCATION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*at\s+\S+:(\d+):(\d+):?\s*$").expect("valid location regex")
});

/// A parse error as the parser reported it: 1-indexed, against the masked
/// text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportedError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}

/// Pull the first parse error out of the parser's stderr.
#[must_use]
pub fn parse_error_output(stderr: &str) -> Option<ReportedError> {
    let clean = ANSI_ESCAPE.replace_all(stderr, "");

    if let Some(captures) = INLINE_ERROR.captures(&clean)
        && let (Some(message), Some(line), Some(column)) =
            (captures.get(1), captures.get(2), captures.get(3))
        && let (Ok(line), Ok(column)) = (line.as_str().parse(), column.as_str().parse())
    {
        return Some(ReportedError {
            message: message.as_str().trim().to_string(),
            line,
            column,
        });
    }

    // the location can also follow after lines of context
    let mut lines = clean.lines();
    let message = lines.by_ref().find_map(|line| {
        ERROR_LINE
            .captures(line)
            .and_then(|captures| captures.get(1))
            .map(|message| message.as_str().to_string())
    })?;
    let (line, column) = lines.find_map(|line| {
        let captures = LOCATION_LINE.captures(line)?;
        let line = captures.get(1)?.as_str().parse().ok()?;
        let column = captures.get(2)?.as_str().parse().ok()?;
        Some((line, column))
    })?;
    Some(ReportedError {
        message,
        line,
        column,
    })
}

/// Run the host parser over the check-masked document.
///
/// Returns the single parse error it reports, mapped back onto `text`, or
/// `None` when the document parses or the output was not recognised.
///
/// # Errors
///
/// Fails only when the parser could not be run at all.
#[tracing::instrument(skip(text), fields(len = text.len()))]
pub async fn check_syntax(parser: &ToolCommand, text: &str) -> Result<Option<Diagnostic>, Error> {
    let masked = mask(text, MaskMode::Check);
    let output = run_tool(Tool::Parser, parser, &masked.text).await?;
    if output.success {
        return Ok(None);
    }

    let Some(reported) = parse_error_output(&output.stderr) else {
        tracing::warn!(
            status = %output.status,
            stderr = %output.stderr.trim(),
            "unrecognised parser output"
        );
        return Ok(None);
    };

    let line_count = LineIndex::new(text).line_count();
    let position = masked.original_position(reported.line, reported.column, line_count);
    tracing::debug!(%position, message = %reported.message, "parser reported an error");
    Ok(Some(Diagnostic::error(
        DiagnosticKind::ExternalTool,
        Range::on_line(position.line, position.column, 1),
        reported.message,
    )))
}

/// [`check_syntax`] for callers that carry on without the parser: a parser
/// that cannot run is logged and contributes nothing.
pub async fn external_diagnostic(parser: &ToolCommand, text: &str) -> Option<Diagnostic> {
    match check_syntax(parser, text).await {
        Ok(found) => found,
        Err(error) => {
            tracing::warn!(parser = %parser.display(), %error, "external syntax check skipped");
            None
        }
    }
}
