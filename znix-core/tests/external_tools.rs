//! Formatting and syntax checks against stand-in tools built from `cat` and
//! `sh`.
#![cfg(unix)]

use std::path::PathBuf;

use pretty_assertions::assert_eq;
use znix_core::{DiagnosticKind, Position, ToolCommand, check_syntax, format_text};

type Error = Box<dyn std::error::Error>;

fn identity() -> ToolCommand {
    ToolCommand::new("cat", &[])
}

/// A parser that always rejects its input at the given masked location.
fn failing_parser(line: usize, column: usize) -> ToolCommand {
    let script = format!(
        "cat >/dev/null; printf 'error: syntax error, unexpected IDENT\\n\\n       at «stdin»:{line}:{column}:\\n' >&2; exit 1"
    );
    ToolCommand {
        command: "sh".to_string(),
        args: vec!["-c".to_string(), script],
    }
}

#[rstest::rstest]
#[tokio::test]
async fn identity_formatting_preserves_fixtures(
    #[files("tests/fixtures/clean/*.znix")] path: PathBuf,
) -> Result<(), Error> {
    let text = std::fs::read_to_string(&path)?;
    let formatted = format_text(&identity(), &text).await?;
    assert_eq!(formatted, text, "{}", path.display());
    Ok(())
}

#[tokio::test]
async fn structural_node_alone_formats_unchanged() -> Result<(), Error> {
    let formatted = format_text(&identity(), "(zmdl target)").await?;
    assert_eq!(formatted, "(zmdl target)");
    Ok(())
}

#[tokio::test]
async fn formatter_rewrites_reach_the_restored_text() -> Result<(), Error> {
    // squeeze runs of spaces the way a real formatter would normalise them
    let formatter = ToolCommand::new("tr", &["-s", " "]);
    let formatted = format_text(&formatter, "{\n  a   =   $ctx.value;\n}\n").await?;
    assert_eq!(formatted, "{\n a = $ctx.value;\n}\n");
    Ok(())
}

#[tokio::test]
async fn unwrapped_parser_errors_map_straight_through() -> Result<(), Error> {
    let diagnostic = check_syntax(&failing_parser(2, 5), "{\n  a b;\n}\n").await?;
    assert_eq!(
        diagnostic.map(|d| (d.kind, d.range.start)),
        Some((DiagnosticKind::ExternalTool, Position::new(1, 4)))
    );
    Ok(())
}

#[tokio::test]
async fn reported_lines_past_the_end_are_clamped() -> Result<(), Error> {
    // wrapped: the closing brace of the wrapper is masked line 4
    let diagnostic = check_syntax(&failing_parser(4, 1), "a = 1;\nb = 2;\n").await?;
    assert_eq!(
        diagnostic.map(|d| d.range.start.line),
        Some(2),
        "line 4 minus the wrapper line is line 2, the last line of the document"
    );
    Ok(())
}
