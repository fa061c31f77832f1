use std::path::PathBuf;

use pretty_assertions::assert_eq;
use znix_core::{DiagnosticKind, MaskMode, Position, Range, analyze, mask};

type Error = Box<dyn std::error::Error>;

#[rstest::rstest]
#[tracing_test::traced_test]
fn clean_fixtures_have_no_diagnostics(
    #[files("tests/fixtures/clean/*.znix")] path: PathBuf,
) -> Result<(), Error> {
    let text = std::fs::read_to_string(&path)?;
    let diagnostics = analyze(&text);
    assert!(
        diagnostics.is_empty(),
        "{}: unexpected diagnostics {diagnostics:#?}",
        path.display()
    );
    Ok(())
}

#[rstest::rstest]
fn check_masking_keeps_every_line_length(
    #[files("tests/fixtures/clean/*.znix")] path: PathBuf,
) -> Result<(), Error> {
    let text = std::fs::read_to_string(&path)?;
    let masked = mask(&text, MaskMode::Check);
    let masked_lines: Vec<usize> = masked
        .text
        .lines()
        .skip(masked.line_offset())
        .take(text.lines().count())
        .map(|line| line.chars().count())
        .collect();
    let original_lines: Vec<usize> = text.lines().map(|line| line.chars().count()).collect();
    assert_eq!(masked_lines, original_lines, "{}", path.display());
    Ok(())
}

#[test]
fn single_unclosed_brace_is_reported_once_at_its_position() {
    let text = "a = 1;\nb = {\n  c = 2;\n  d = [ 1 2 ];\n";
    let diagnostics = analyze(text);
    assert_eq!(
        diagnostics
            .iter()
            .map(|d| (d.kind, d.range.start, d.message.as_str()))
            .collect::<Vec<_>>(),
        vec![(
            DiagnosticKind::Structural,
            Position::new(1, 4),
            "Unclosed character '{'"
        )]
    );
}

#[test]
fn brace_followed_by_identifier_is_anchored_at_the_brace() {
    let diagnostics = analyze("x = { a = 1; }y;\n");
    let found = diagnostics
        .iter()
        .find(|d| d.message == "Expected ';' after '}' but found 'y'");
    assert_eq!(found.map(|d| d.range), Some(Range::on_line(0, 13, 1)));
}

#[test]
fn missing_terminator_spans_the_statement() {
    let diagnostics = analyze("foo = 1");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(
        diagnostics.first().map(|d| (d.range, d.message.as_str())),
        Some((Range::on_line(0, 0, 7), "Missing ';' at end of statement"))
    );
}

#[test]
fn typed_declarations_join_the_heuristic_findings() {
    let text = "declare x : int = \"5\";\ndeclare y : enum [\"a\" \"b\"] = \"c\";\nbroken = 1\n";
    let kinds: Vec<DiagnosticKind> = analyze(text).into_iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![
            DiagnosticKind::StatementShape,
            DiagnosticKind::TypeMismatch,
            DiagnosticKind::TypeMismatch,
        ]
    );
}

#[test]
fn dialect_free_text_round_trips_through_format_masking() {
    let text = "{\n  a = 1;\n  b = [ \"x\" ];\n}\n";
    let masked = mask(text, MaskMode::Format);
    assert!(masked.placeholders.is_empty());
    assert_eq!(masked.restore(&masked.text), text);
}
