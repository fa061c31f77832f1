//! Line-oriented bracket and statement scanner.
//!
//! There is no grammar for the dialect, so this approximates "every attribute
//! statement ends in `;` unless it opens a nested block" without parsing
//! expressions. False positives and negatives are accepted.

use crate::model::{Diagnostic, DiagnosticKind, Range};
use crate::syntax::{
    ACTION_KEYWORDS, ACTION_SHORTHAND, CONTINUATION_KEYWORDS, CONTROL_KEYWORDS, CodeLine,
    RAW_STRING_DELIMITER, STRUCTURAL_KEYWORDS, is_ident_char, word_at,
};

/// An opening bracket waiting for its close.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BracketEntry {
    pub character: char,
    pub line: usize,
    pub column: usize,
}

/// Characters a line may end with when it contains no `=`.
const OPENING_ENDINGS: &[&str] = &["{", "[", "(", RAW_STRING_DELIMITER, ":"];

/// Characters a line containing `=` may end with.
const STATEMENT_ENDINGS: &[&str] = &[";", "{", "[", "(", RAW_STRING_DELIMITER, "="];

/// What the line after a trailing `}` may start with.
const BRACE_FOLLOWERS: &[&str] = &[";", ",", ")", "]", "}", ":", "//", "."];

/// Scan a whole document and report structural and statement-shape problems.
#[must_use]
#[tracing::instrument(level = "trace", skip(text), fields(len = text.len()))]
pub fn scan(text: &str) -> Vec<Diagnostic> {
    let mut in_raw = false;
    let lines: Vec<CodeLine> = text
        .lines()
        .map(|line| {
            let code = CodeLine::new(line, in_raw);
            in_raw = code.ends_in_raw;
            code
        })
        .collect();

    let mut scanner = Scanner::default();
    for (line_no, code) in lines.iter().enumerate() {
        scanner.scan_line(line_no, code, lines.get(line_no + 1..).unwrap_or_default());
    }
    scanner.finish()
}

#[derive(Debug, Default)]
struct Scanner {
    stack: Vec<BracketEntry>,
    array_depth: usize,
    in_multiline: bool,
    inside_action_block: bool,
    action_block_depth: usize,
    expects_value: bool,
    diagnostics: Vec<Diagnostic>,
}

impl Scanner {
    fn scan_line(&mut self, line_no: usize, code: &CodeLine, rest: &[CodeLine]) {
        let array_depth_before = self.array_depth;
        let in_action_before = self.inside_action_block;
        let suppressed = self.in_multiline;

        let action_marker = action_marker_column(&code.chars);
        let array_closers = self.scan_brackets(line_no, code, action_marker);
        self.in_multiline = code.ends_in_raw;

        if !suppressed {
            self.check_brace_followers(line_no, code, rest, &array_closers);
        }

        if !suppressed
            && !in_action_before
            && array_depth_before == 0
            && self.array_depth == 0
        {
            self.check_statement(line_no, code);
        }

        if !code.is_blank() {
            self.expects_value = code.ends_with("=") || ends_with_continuation(code);
        }
    }

    /// Track brackets on one line. Returns the columns of every `}` that was
    /// encountered while an array literal was open.
    fn scan_brackets(
        &mut self,
        line_no: usize,
        code: &CodeLine,
        action_marker: Option<usize>,
    ) -> Vec<usize> {
        let mut in_array = Vec::new();
        let mut pending_action = action_marker;

        for (column, c) in code.chars.iter().copied().enumerate() {
            match c {
                '(' | '{' | '[' => {
                    self.stack.push(BracketEntry {
                        character: c,
                        line: line_no,
                        column,
                    });
                    if c == '[' {
                        self.array_depth += 1;
                    }
                    if c == '{'
                        && pending_action.is_some_and(|marker| column >= marker)
                        && !self.inside_action_block
                    {
                        tracing::trace!(line = line_no, "entering action block");
                        self.inside_action_block = true;
                        self.action_block_depth = self.stack.len();
                        pending_action = None;
                    }
                }
                ')' | '}' | ']' => {
                    if c == '}' && self.array_depth > 0 {
                        in_array.push(column);
                    }
                    if c == ']' {
                        self.array_depth = self.array_depth.saturating_sub(1);
                    }
                    let matched = self
                        .stack
                        .pop()
                        .is_some_and(|open| closer_for(open.character) == c);
                    if !matched {
                        self.diagnostics.push(Diagnostic::error(
                            DiagnosticKind::Structural,
                            Range::on_line(line_no, column, 1),
                            format!("Unexpected closing character '{c}'"),
                        ));
                    }
                    if self.inside_action_block && self.stack.len() < self.action_block_depth {
                        tracing::trace!(line = line_no, "leaving action block");
                        self.inside_action_block = false;
                    }
                }
                _ => {}
            }
        }

        in_array
    }

    fn check_brace_followers(
        &mut self,
        line_no: usize,
        code: &CodeLine,
        rest: &[CodeLine],
        array_closers: &[usize],
    ) {
        for (column, _) in code
            .chars
            .iter()
            .enumerate()
            .filter(|(column, c)| **c == '}' && !array_closers.contains(column))
        {
            // only a word glued to the brace; `f { } arg` is an application
            if let Some(word) = word_at(&code.chars, column + 1)
                && !CONTINUATION_KEYWORDS.contains(&word.as_str())
            {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::StatementShape,
                    Range::on_line(line_no, column, 1),
                    format!("Expected ';' after '}}' but found '{word}'"),
                ));
            }
        }

        if !code.ends_with("}") {
            return;
        }
        let Some(column) = code.chars.len().checked_sub(1) else {
            return;
        };
        if array_closers.contains(&column) {
            return;
        }
        let Some(next) = rest.iter().find(|line| !line.is_blank()) else {
            return;
        };
        if !starts_continuation(next) {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticKind::StatementShape,
                Range::on_line(line_no, column, 1),
                "Missing ';' after '}'",
            ));
        }
    }

    fn check_statement(&mut self, line_no: usize, code: &CodeLine) {
        let Some(first) = code.first_column() else {
            return;
        };
        if self.expects_value || is_exempt(code, first) {
            return;
        }

        let trimmed = code.trimmed();
        let range = Range::on_line(line_no, first, trimmed.chars().count());
        if !code.contains('=') {
            if !OPENING_ENDINGS.iter().any(|end| code.ends_with(end)) {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticKind::StatementShape,
                    range,
                    "Missing '=' in statement",
                ));
            }
        } else if !STATEMENT_ENDINGS.iter().any(|end| code.ends_with(end)) {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticKind::StatementShape,
                range,
                "Missing ';' at end of statement",
            ));
        }
    }

    fn finish(mut self) -> Vec<Diagnostic> {
        for open in std::mem::take(&mut self.stack) {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticKind::Structural,
                Range::on_line(open.line, open.column, 1),
                format!("Unclosed character '{}'", open.character),
            ));
        }
        tracing::debug!(count = self.diagnostics.len(), "scan finished");
        self.diagnostics
    }
}

fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

/// Column from which the first `{` opens an action block, if this line
/// introduces one.
fn action_marker_column(chars: &[char]) -> Option<usize> {
    let first = chars.iter().position(|c| !c.is_whitespace())?;
    if let Some(word) = word_at(chars, first)
        && ACTION_KEYWORDS.contains(&word.as_str())
    {
        let after = first + word.chars().count();
        let (column, c) = chars
            .iter()
            .enumerate()
            .skip(after)
            .find(|(_, c)| !c.is_whitespace())?;
        return (*c == '=').then_some(column);
    }

    let marker: Vec<char> = ACTION_SHORTHAND.chars().collect();
    chars
        .windows(marker.len())
        .enumerate()
        .filter(|(_, window)| *window == marker.as_slice())
        .map(|(column, _)| column)
        .find(|column| {
            let end = column + marker.len();
            let standalone = column
                .checked_sub(1)
                .and_then(|prev| chars.get(prev))
                .is_none_or(|c| !is_ident_char(*c))
                && chars.get(end).is_none_or(|c| !is_ident_char(*c));
            standalone
                && chars
                    .iter()
                    .skip(end)
                    .find(|c| !c.is_whitespace())
                    .is_some_and(|c| *c == '{')
        })
}

fn is_exempt(code: &CodeLine, first: usize) -> bool {
    let Some(lead) = code.chars.get(first).copied() else {
        return true;
    };
    if matches!(lead, '}' | ']' | ')' | ';') {
        return true;
    }
    if let Some(word) = word_at(&code.chars, first)
        && CONTROL_KEYWORDS.contains(&word.as_str())
    {
        return true;
    }
    lead == '('
        && word_at(&code.chars, first + 1)
            .is_some_and(|word| STRUCTURAL_KEYWORDS.contains(&word.as_str()))
}

/// `in`, `then` or `else` at the end of a line: an expression follows.
fn ends_with_continuation(code: &CodeLine) -> bool {
    let trimmed = code.trimmed();
    trimmed
        .rsplit(|c: char| !is_ident_char(c))
        .next()
        .is_some_and(|word| CONTINUATION_KEYWORDS.contains(&word))
}

fn starts_continuation(line: &CodeLine) -> bool {
    let Some(first) = line.first_column() else {
        return true;
    };
    let head: String = line.chars.iter().skip(first).collect();
    BRACE_FOLLOWERS.iter().any(|follower| head.starts_with(follower))
        || word_at(&line.chars, first)
            .is_some_and(|word| CONTINUATION_KEYWORDS.contains(&word.as_str()))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::model::Position;

    fn messages(text: &str) -> Vec<String> {
        scan(text).into_iter().map(|d| d.message).collect()
    }

    #[test]
    fn balanced_document_is_clean() {
        let text = r#"{
  name = "demo";
  nested = {
    list = [ 1 2 3 ];
    more = [
      "a"
      "b"
    ];
  };
}
"#;
        assert_eq!(messages(text), Vec::<String>::new());
    }

    #[test]
    fn unclosed_brace_is_anchored_at_its_position() {
        let text = "a = 1;\nb = {\n  c = 2;\n";
        let diagnostics = scan(text);
        assert_eq!(diagnostics.len(), 1);
        let first = diagnostics.first();
        assert_eq!(
            first.map(|d| d.range.start),
            Some(Position::new(1, 4)),
            "unclosed '{{' should point at the opener"
        );
        assert_eq!(
            first.map(|d| d.message.as_str()),
            Some("Unclosed character '{'")
        );
    }

    #[test]
    fn mismatched_close_is_unexpected() {
        let diagnostics = scan("a = (1 ];");
        let unexpected = diagnostics
            .iter()
            .find(|d| d.message == "Unexpected closing character ']'");
        assert_eq!(
            unexpected.map(|d| d.range.start),
            Some(Position::new(0, 7))
        );
        assert_eq!(unexpected.map(|d| d.kind), Some(DiagnosticKind::Structural));
    }

    #[test]
    fn stray_close_on_empty_stack() {
        assert_eq!(
            messages("a = 1;\n}"),
            vec!["Unexpected closing character '}'".to_string()]
        );
    }

    #[test]
    fn identifier_after_brace_needs_terminator() {
        let diagnostics = scan("a = { b = 1; }x\n");
        let found = diagnostics
            .iter()
            .find(|d| d.message.starts_with("Expected ';' after '}'"));
        assert_eq!(found.map(|d| d.range.start), Some(Position::new(0, 13)));
    }

    #[rstest]
    #[case("merged = builtins.foldl' (a: b: a // b) { } configs;")]
    #[case("x = f { } arg;")]
    fn applied_attribute_set_is_fine(#[case] text: &str) {
        assert_eq!(messages(text), Vec::<String>::new());
    }

    #[rstest]
    #[case("x = let a = { b = 1; } in a;")]
    #[case("x = if c then { a = 1; } else { b = 2; };")]
    fn continuation_keywords_after_brace_are_fine(#[case] text: &str) {
        assert_eq!(messages(text), Vec::<String>::new());
    }

    #[test]
    fn missing_terminator_after_closing_brace() {
        let text = "a = {\n  b = 1;\n}\n\n# comment\nc = 2;\n";
        let diagnostics = scan(text);
        assert_eq!(diagnostics.len(), 1);
        let first = diagnostics.first();
        assert_eq!(
            first.map(|d| d.message.as_str()),
            Some("Missing ';' after '}'")
        );
        assert_eq!(first.map(|d| d.range.start), Some(Position::new(2, 0)));
    }

    #[rstest]
    #[case("a = {\n  b = 1;\n}\n;\n")]
    #[case("a = {\n  b = 1;\n}\n// { c = 2; };\n")]
    #[case("{\n  b = 1;\n}\n")]
    fn brace_followed_by_continuation_is_fine(#[case] text: &str) {
        assert_eq!(messages(text), Vec::<String>::new());
    }

    #[test]
    fn missing_statement_terminator_spans_the_statement() {
        let diagnostics = scan("foo = 1");
        assert_eq!(diagnostics.len(), 1);
        let first = diagnostics.first();
        assert_eq!(
            first.map(|d| d.message.as_str()),
            Some("Missing ';' at end of statement")
        );
        assert_eq!(
            first.map(|d| d.range),
            Some(Range::on_line(0, 0, "foo = 1".len()))
        );
    }

    #[test]
    fn missing_assignment() {
        assert_eq!(
            messages("  foo bar;\n"),
            vec!["Missing '=' in statement".to_string()]
        );
    }

    #[rstest]
    #[case("let\n  a = 1;\nin\n  a\n")]
    #[case("with pkgs;\n")]
    #[case("inherit (pkgs) hello;\n")]
    #[case("(zmdl target)\n")]
    #[case("{ pkgs, ... }:\n{\n}\n")]
    #[case("foo =\n  bar;\n")]
    fn exempt_lines(#[case] text: &str) {
        assert_eq!(messages(text), Vec::<String>::new());
    }

    #[test]
    fn raw_string_bodies_are_ignored() {
        let text = "script = ''\n  if [ -f x ]; then\n    echo { oops\n  fi\n'';\n";
        assert_eq!(messages(text), Vec::<String>::new());
    }

    #[test]
    fn comments_do_not_count() {
        let text = "a = 1; # { [ (\nb = 2; # missing = here\n";
        assert_eq!(messages(text), Vec::<String>::new());
    }

    #[test]
    fn action_block_bodies_are_free_form() {
        let text = "_onEnter = {\n  run \"deploy\" $ctx.target\n  notify\n};\nafter = 1;\n";
        assert_eq!(messages(text), Vec::<String>::new());
    }

    #[test]
    fn action_shorthand_block_bodies_are_free_form() {
        let text = "@do {\n  log \"hi\"\n};\nbroken = 1\n";
        assert_eq!(
            messages(text),
            vec!["Missing ';' at end of statement".to_string()]
        );
    }

    #[test]
    fn single_line_action_block_is_left_again() {
        let text = "_onExit = { cleanup; };\nbroken\n";
        assert_eq!(messages(text), vec!["Missing '=' in statement".to_string()]);
    }

    #[test]
    fn array_elements_are_not_statements() {
        let text = "items = [\n  { a = 1; }\n  { b = 2; }\n  plain\n];\n";
        assert_eq!(messages(text), Vec::<String>::new());
    }

    #[test]
    fn strings_hide_brackets_and_terminators() {
        let text = "a = \"${b}c {\";\nd = \"x = y\";\n";
        assert_eq!(messages(text), Vec::<String>::new());
    }
}
