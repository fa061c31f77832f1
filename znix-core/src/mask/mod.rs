//! Reversible masking of dialect-only syntax.
//!
//! The host-language formatter and parser reject the dialect's extensions, so
//! before handing a document to them every extension is swapped for
//! something they accept:
//!
//! - [`MaskMode::Format`] substitutes unique placeholder identifiers and keeps
//!   a [`PlaceholderMap`] to put the original text back into the formatter's
//!   output.
//! - [`MaskMode::Check`] substitutes filler of exactly the same length, so
//!   every surviving character keeps its line and column and a position
//!   reported by the parser can be mapped straight back.

mod restore;

use std::ops::Range as Span;
use std::sync::LazyLock;

use regex::Regex;

use crate::declarations::find_declarations;
use crate::model::Position;
use crate::syntax::{ACTION_SHORTHAND, COMMENT_MARKER, STRUCTURAL_KEYWORDS, is_ident_char};

pub use restore::unwrap_formatted;

#[allow(clippy::expect_used)]
static CONTEXT_VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    // a prime only inside a segment, never the `''` that closes a raw string
    Regex::new(
        r"\$[A-Za-z_](?:[A-Za-z0-9_-]|'[A-Za-z0-9_-])*(?:\.[A-Za-z_](?:[A-Za-z0-9_-]|'[A-Za-z0-9_-])*)*",
    )
        .expect("context variable pattern is valid")
});

#[allow(clippy::expect_used)]
static STRUCTURAL_NODE: LazyLock<Regex> = LazyLock::new(|| {
    let keywords = STRUCTURAL_KEYWORDS.join("|");
    Regex::new(&format!(r"\((?:{keywords})\b(?:[^()]|\([^()]*\))*\)"))
        .expect("structural node pattern is valid")
});

#[allow(clippy::expect_used)]
static ACTION_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{}\s*\{{", regex::escape(ACTION_SHORTHAND)))
        .expect("action marker pattern is valid")
});

#[allow(clippy::expect_used)]
static LAMBDA_HEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_'-]*\s*:").expect("lambda head pattern is valid")
});

const PLACEHOLDER_PREFIX: &str = "__znix_mask";

/// Forms the host language accepts at the top of a file.
const TOP_LEVEL_KEYWORDS: &[&str] = &["let", "with", "rec"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskMode {
    /// Placeholders of any length, restored after formatting.
    Format,
    /// Same-length filler, for position-accurate parsing.
    Check,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// Restored by direct substitution wherever the token occurs.
    Plain,
    /// The token is followed by a synthetic `=` that goes away on restore.
    Assignment,
    /// The token is preceded by a synthetic `;` and stands for nothing; it
    /// goes away on restore, joining what precedes it to the real `=`.
    Continuation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Placeholder {
    pub token: String,
    pub original: String,
    pub kind: PlaceholderKind,
}

/// Placeholders in insertion order.
///
/// Restoration walks the list backwards, so a replacement text never
/// reintroduces a token that is still waiting to be restored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaceholderMap {
    prefix: String,
    entries: Vec<Placeholder>,
}

impl PlaceholderMap {
    /// A map whose tokens cannot occur in `text`.
    fn for_text(text: &str) -> Self {
        let mut prefix = PLACEHOLDER_PREFIX.to_string();
        while text.contains(&prefix) {
            prefix.push('_');
        }
        Self {
            prefix,
            entries: Vec::new(),
        }
    }

    fn insert(&mut self, original: &str, kind: PlaceholderKind) -> String {
        let token = format!("{}{}__", self.prefix, self.entries.len());
        self.entries.push(Placeholder {
            token: token.clone(),
            original: original.to_string(),
            kind,
        });
        token
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Placeholder> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The result of masking a document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaskedText {
    pub text: String,
    pub placeholders: PlaceholderMap,
    /// The masked text was wrapped in a synthetic `{ ... }`.
    pub wrapped: bool,
    pub mode: MaskMode,
}

impl MaskedText {
    /// Lines the synthetic wrapper adds in front of the original text.
    #[must_use]
    pub fn line_offset(&self) -> usize {
        usize::from(self.wrapped)
    }

    /// Undo the masking on the formatter's output.
    #[must_use]
    pub fn restore(&self, formatted: &str) -> String {
        let text = if self.wrapped {
            unwrap_formatted(formatted)
        } else {
            formatted.to_string()
        };
        restore::restore_placeholders(&text, &self.placeholders)
    }

    /// Map a 1-indexed position reported against the masked text back onto
    /// a document with `line_count` lines.
    #[must_use]
    pub fn original_position(&self, line: usize, column: usize, line_count: usize) -> Position {
        let line = line
            .saturating_sub(1)
            .saturating_sub(self.line_offset())
            .min(line_count.saturating_sub(1));
        Position::new(line, column.saturating_sub(1))
    }
}

/// One replacement of a source span.
#[derive(Debug)]
struct Splice {
    span: Span<usize>,
    replacement: String,
}

#[derive(Debug)]
struct Masker<'a> {
    source: &'a str,
    mode: MaskMode,
    placeholders: PlaceholderMap,
    splices: Vec<Splice>,
}

impl<'a> Masker<'a> {
    fn new(source: &'a str, mode: MaskMode) -> Self {
        Self {
            source,
            mode,
            placeholders: PlaceholderMap::for_text(source),
            splices: Vec::new(),
        }
    }

    fn is_claimed(&self, span: &Span<usize>) -> bool {
        self.splices.iter().any(|splice| {
            if span.is_empty() {
                splice.span.start < span.start && span.start < splice.span.end
            } else {
                splice.span.start < span.end && span.start < splice.span.end
            }
        })
    }

    fn push(&mut self, span: Span<usize>, replacement: String) {
        self.splices.push(Splice { span, replacement });
    }

    fn mask_declarations(&mut self) {
        for declaration in find_declarations(self.source) {
            let head = declaration.head.clone();
            if self.is_claimed(&head) {
                continue;
            }
            let Some(original) = self.source.get(head.clone()) else {
                continue;
            };
            match self.mode {
                MaskMode::Check => {
                    let span = head.start..declaration.equals;
                    if let Some(whole) = self.source.get(span.clone()) {
                        let replacement = filler(whole, "_");
                        self.push(span, replacement);
                    }
                }
                MaskMode::Format if declaration.has_inline_options(self.source) => {
                    let start = self
                        .placeholders
                        .insert(original, PlaceholderKind::Assignment);
                    let end = self.placeholders.insert("", PlaceholderKind::Continuation);
                    self.push(head, format!("{start} ="));
                    self.push(
                        declaration.equals..declaration.equals,
                        format!("; {end} "),
                    );
                }
                MaskMode::Format => {
                    let token = self.placeholders.insert(original, PlaceholderKind::Plain);
                    self.push(head, token);
                }
            }
        }
    }

    fn mask_action_markers(&mut self) {
        let markers: Vec<Span<usize>> = ACTION_MARKER
            .find_iter(self.source)
            .filter(|found| !follows_ident(self.source, found.start()))
            // everything up to, not including, the `{`
            .map(|found| found.start()..found.end().saturating_sub(1))
            .collect();
        for span in markers {
            if self.is_claimed(&span) || is_in_comment(self.source, span.start) {
                continue;
            }
            let Some(original) = self.source.get(span.clone()) else {
                continue;
            };
            let replacement = match self.mode {
                MaskMode::Check => filler(original, "_ ="),
                MaskMode::Format => {
                    let token = self
                        .placeholders
                        .insert(ACTION_SHORTHAND, PlaceholderKind::Assignment);
                    format!("{token} = ")
                }
            };
            self.push(span, replacement);
        }
    }

    fn mask_structural_nodes(&mut self) {
        let inners: Vec<Span<usize>> = STRUCTURAL_NODE
            .find_iter(self.source)
            .map(|found| found.start() + 1..found.end() - 1)
            .collect();
        for span in inners {
            if self.is_claimed(&span) {
                continue;
            }
            self.mask_plain(span);
        }
    }

    fn mask_context_variables(&mut self) {
        let spans: Vec<Span<usize>> = CONTEXT_VARIABLE
            .find_iter(self.source)
            .map(|found| found.range())
            .collect();
        for span in spans {
            if self.is_claimed(&span) {
                continue;
            }
            self.mask_plain(span);
        }
    }

    fn mask_plain(&mut self, span: Span<usize>) {
        let Some(original) = self.source.get(span.clone()) else {
            return;
        };
        let replacement = match self.mode {
            MaskMode::Check => filler(original, "_"),
            MaskMode::Format => self.placeholders.insert(original, PlaceholderKind::Plain),
        };
        self.push(span, replacement);
    }

    fn finish(mut self) -> MaskedText {
        self.splices
            .sort_by_key(|splice| (splice.span.start, splice.span.end));
        let mut text = String::with_capacity(self.source.len());
        let mut cursor = 0;
        for splice in &self.splices {
            if let Some(between) = self.source.get(cursor..splice.span.start) {
                text.push_str(between);
            }
            text.push_str(&splice.replacement);
            cursor = splice.span.end;
        }
        if let Some(tail) = self.source.get(cursor..) {
            text.push_str(tail);
        }

        let wrapped = needs_wrap(&text);
        if wrapped {
            text = format!("{{\n{text}\n}}");
        }
        tracing::trace!(
            mode = ?self.mode,
            placeholders = self.placeholders.len(),
            wrapped,
            "masked document"
        );
        MaskedText {
            text,
            placeholders: self.placeholders,
            wrapped,
            mode: self.mode,
        }
    }
}

/// Replace dialect-only syntax in `text` so host-language tools accept it.
#[must_use]
pub fn mask(text: &str, mode: MaskMode) -> MaskedText {
    let mut masker = Masker::new(text, mode);
    masker.mask_declarations();
    masker.mask_action_markers();
    masker.mask_structural_nodes();
    masker.mask_context_variables();
    masker.finish()
}

/// Same-length stand-in for `original`: `lead` first, blanks after it, with
/// line breaks kept where they were.
fn filler(original: &str, lead: &str) -> String {
    let mut lead = lead.chars();
    original
        .chars()
        .map(|c| match c {
            '\n' | '\r' => c,
            _ => lead.next().unwrap_or(' '),
        })
        .collect()
}

fn follows_ident(text: &str, offset: usize) -> bool {
    text.get(..offset)
        .and_then(|before| before.chars().next_back())
        .is_some_and(is_ident_char)
}

fn is_in_comment(text: &str, offset: usize) -> bool {
    let line_start = text
        .get(..offset)
        .and_then(|before| before.rfind('\n'))
        .map_or(0, |newline| newline + 1);
    text.get(line_start..offset)
        .is_some_and(|prefix| prefix.contains(COMMENT_MARKER))
}

/// Whether `text` needs a synthetic `{ ... }` to be a valid top-level form.
fn needs_wrap(text: &str) -> bool {
    let Some(start) = text
        .lines()
        .map(str::trim_start)
        .find(|line| !line.is_empty() && !line.starts_with(COMMENT_MARKER))
    else {
        return false;
    };
    if start.starts_with(['{', '[', '(', '"']) || start.starts_with("''") {
        return false;
    }
    let starts_with_keyword = TOP_LEVEL_KEYWORDS.iter().any(|keyword| {
        start
            .strip_prefix(keyword)
            .is_some_and(|rest| rest.chars().next().is_none_or(|c| !is_ident_char(c)))
    });
    !starts_with_keyword && !LAMBDA_HEAD.is_match(start)
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn tokens(masked: &MaskedText) -> Vec<String> {
        masked.placeholders.iter().map(|p| p.token.clone()).collect()
    }

    #[test]
    fn text_without_constructs_is_unchanged() {
        let text = "{\n  a = 1;\n}\n";
        let masked = mask(text, MaskMode::Format);
        assert!(masked.placeholders.is_empty());
        assert!(!masked.wrapped);
        assert_eq!(masked.text, text);
        assert_eq!(masked.restore(&masked.text), text);
    }

    #[test]
    fn context_variables_become_placeholders() {
        let text = "{ user = $ctx.user.name; }";
        let masked = mask(text, MaskMode::Format);
        let tokens = tokens(&masked);
        assert_eq!(tokens.len(), 1);
        assert_eq!(masked.text, format!("{{ user = {}; }}", tokens[0]));
        assert_eq!(masked.restore(&masked.text), text);
    }

    #[rstest]
    #[case(MaskMode::Format)]
    #[case(MaskMode::Check)]
    fn context_variable_leaves_raw_string_delimiter(#[case] mode: MaskMode) {
        let text = "{\n  script = ''echo $ctx.user'';\n}\n";
        let masked = mask(text, mode);
        assert_eq!(masked.text.matches("''").count(), 2);
        assert!(masked.text.contains("'';\n"));
        if mode == MaskMode::Format {
            assert_eq!(masked.restore(&masked.text), text);
        } else {
            assert_eq!(masked.text.len(), text.len());
        }
    }

    #[test]
    fn primes_inside_context_variable_names_are_kept() {
        let text = "{ f = $ctx.foldl'x; }";
        let masked = mask(text, MaskMode::Format);
        assert_eq!(
            masked.placeholders.iter().next().map(|p| p.original.as_str()),
            Some("$ctx.foldl'x")
        );
        assert_eq!(masked.restore(&masked.text), text);
    }

    #[test]
    fn structural_nodes_keep_their_parentheses() {
        let text = "(zmdl target)";
        let masked = mask(text, MaskMode::Format);
        assert!(!masked.wrapped);
        let tokens = tokens(&masked);
        assert_eq!(masked.text, format!("({})", tokens[0]));
        assert_eq!(masked.restore(&format!("({})\n", tokens[0])), "(zmdl target)\n");
    }

    #[test]
    fn structural_nodes_swallow_nested_references() {
        let text = "{ m = (zalias core (zmdl $ctx.base)); }";
        let masked = mask(text, MaskMode::Format);
        assert_eq!(masked.placeholders.len(), 1);
        assert_eq!(masked.restore(&masked.text), text);
    }

    #[test]
    fn plain_declaration_head_leaves_equals_exposed() {
        let text = "{ declare port : int = 8080; }";
        let masked = mask(text, MaskMode::Format);
        let tokens = tokens(&masked);
        assert_eq!(masked.text, format!("{{ {} = 8080; }}", tokens[0]));
        assert_eq!(masked.restore(&masked.text), text);
    }

    #[test]
    fn declaration_with_options_is_split_in_two() {
        let text = r#"declare mode : enum ["fast" "safe"] = "fast";"#;
        let masked = mask(text, MaskMode::Format);
        let tokens = tokens(&masked);
        assert_eq!(tokens.len(), 2);
        assert!(masked.wrapped);
        assert_eq!(
            masked.text,
            format!(
                "{{\n{} = [\"fast\" \"safe\"] ; {} = \"fast\";\n}}",
                tokens[0], tokens[1]
            )
        );

        let formatted = format!(
            "{{\n  {} = [\n    \"fast\"\n    \"safe\"\n  ];\n  {} = \"fast\";\n}}\n",
            tokens[0], tokens[1]
        );
        assert_eq!(
            masked.restore(&formatted),
            "declare mode : enum [\n  \"fast\"\n  \"safe\"\n] = \"fast\";\n"
        );
    }

    #[test]
    fn action_shorthand_becomes_an_assignment() {
        let text = "{ @do { run = 1; }; }";
        let masked = mask(text, MaskMode::Format);
        let tokens = tokens(&masked);
        assert_eq!(masked.text, format!("{{ {} = {{ run = 1; }}; }}", tokens[0]));
        assert_eq!(masked.restore(&masked.text), text);
    }

    #[test]
    fn placeholders_avoid_text_already_in_the_document() {
        let text = "{ __znix_mask0__ = $a; }";
        let masked = mask(text, MaskMode::Format);
        let tokens = tokens(&masked);
        assert!(!text.contains(&tokens[0]));
        assert_eq!(masked.restore(&masked.text), text);
    }

    #[test]
    fn check_mode_preserves_every_line_length() {
        let text = "_meta = { owner = $ctx.user; };\n\
                    declare mode : enum [\n  \"a\"\n  \"b\"\n] = \"a\";\n\
                    declare port : int = 1;\n\
                    mod = (zmdl core (x y));\n\
                    @do {\n  log $env.HOME;\n};\n";
        let masked = mask(text, MaskMode::Check);
        assert!(masked.wrapped);
        assert!(masked.placeholders.is_empty());
        let masked_lines: Vec<&str> = masked.text.lines().collect();
        let original_lines: Vec<&str> = text.lines().collect();
        assert_eq!(masked_lines.first(), Some(&"{"));
        assert_eq!(masked_lines.last(), Some(&"}"));
        for (original, masked) in original_lines.iter().zip(masked_lines.iter().skip(1)) {
            assert_eq!(
                original.chars().count(),
                masked.chars().count(),
                "{original:?} vs {masked:?}"
            );
        }
        assert!(!masked.text.contains('$'));
        assert!(!masked.text.contains("zmdl"));
        assert!(!masked.text.contains("declare"));
        assert!(!masked.text.contains("@do"));
    }

    #[test]
    fn check_mode_fillers_are_host_syntax() {
        let masked = mask("{ a = $x.y; @do { }; }", MaskMode::Check);
        assert_eq!(masked.text, "{ a = _   ; _ = { }; }");
    }

    #[rstest]
    #[case("{ a = 1; }", false)]
    #[case("# header\n\nlet a = 1; in a", false)]
    #[case("with pkgs; hello", false)]
    #[case("rec { a = 1; }", false)]
    #[case("[ 1 2 ]", false)]
    #[case("\"str\"", false)]
    #[case("pkgs: pkgs.hello", false)]
    #[case("a = 1;", true)]
    #[case("letter = 1;", true)]
    #[case("", false)]
    fn wrapping(#[case] text: &str, #[case] wrapped: bool) {
        assert_eq!(needs_wrap(text), wrapped);
    }

    #[test]
    fn positions_map_back_through_the_wrapper() {
        let masked = mask("a = 1;\nb = ;\n", MaskMode::Check);
        assert!(masked.wrapped);
        assert_eq!(masked.original_position(3, 5, 2), Position::new(1, 4));
        // the synthetic closing brace clamps to the last line
        assert_eq!(masked.original_position(5, 1, 2), Position::new(1, 0));
    }
}
