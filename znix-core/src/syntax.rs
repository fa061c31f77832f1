//! Lexical vocabulary of the dialect and the line-level helpers shared by the
//! scanner, the declaration checker and the masking engine.

use crate::model::Position;

/// Prefix of a context variable reference (`$ctx.user.name`).
pub const SIGIL: char = '$';

/// Starts a comment that runs to the end of the line.
pub const COMMENT_MARKER: char = '#';

/// Delimits a multi-line raw string.
pub const RAW_STRING_DELIMITER: &str = "''";

/// Keyword introducing a typed declaration.
pub const DECLARE_KEYWORD: &str = "declare";

/// Leading keywords of parenthesised structural nodes.
pub const STRUCTURAL_KEYWORDS: &[&str] = &["zmdl", "zalias", "zimport"];

/// Attribute names whose value is an action block.
pub const ACTION_KEYWORDS: &[&str] = &["_onEnter", "_onExit", "_onChange"];

/// Shorthand for an action block: `@do { ... };`.
pub const ACTION_SHORTHAND: &str = "@do";

/// Keywords that may legally follow a closing brace on the same line.
pub const CONTINUATION_KEYWORDS: &[&str] = &["in", "then", "else"];

/// Lines starting with one of these are not attribute statements.
pub const CONTROL_KEYWORDS: &[&str] = &[
    "let", "in", "with", "inherit", "rec", "if", "then", "else", "assert", "import", "or",
];

/// Underscore-prefixed keywords and metadata blocks.
pub const UNDERSCORE_KEYWORDS: &[(&str, &str)] = &[
    ("_meta", "Metadata block describing the configuration"),
    ("_extends", "Configuration this one extends"),
    ("_include", "Additional files merged into this configuration"),
    ("_doc", "Documentation string"),
    ("_onEnter", "Action run when the configuration is activated"),
    ("_onExit", "Action run when the configuration is deactivated"),
    ("_onChange", "Action run when a watched value changes"),
];

/// Well-known context variables available behind the sigil.
pub const CONTEXT_VARIABLES: &[(&str, &str)] = &[
    ("ctx", "Evaluation context"),
    ("env", "Process environment"),
    ("user", "Current user"),
    ("project", "Project being configured"),
    ("target", "Build target"),
    ("system", "Host system description"),
];

/// Types accepted in a typed declaration.
pub const DECLARED_TYPES: &[&str] = &["string", "int", "integer", "float", "boolean", "bool", "enum"];

#[must_use]
pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[must_use]
pub fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '\'')
}

/// A single line reduced to the characters that matter for structure.
///
/// Comments are cut off and the bodies of string literals are replaced by
/// blanks, so the remaining brackets, `=` and `;` are real syntax. The
/// string delimiters themselves are kept and every surviving character keeps
/// its column.
#[derive(Debug)]
pub(crate) struct CodeLine {
    pub(crate) chars: Vec<char>,
    pub(crate) starts_in_raw: bool,
    pub(crate) ends_in_raw: bool,
}

impl CodeLine {
    pub(crate) fn new(line: &str, in_raw: bool) -> Self {
        let source: Vec<char> = line.chars().collect();
        let mut chars = Vec::with_capacity(source.len());
        let mut raw = in_raw;
        let mut quoted = false;
        let mut idx = 0;

        while let Some(&c) = source.get(idx) {
            let next = source.get(idx + 1).copied();
            if raw {
                if c == '\'' && next == Some('\'') {
                    // `'''`, `''$` and `''\` are escapes inside a raw string
                    if matches!(source.get(idx + 2), Some('\'' | '$' | '\\')) {
                        chars.extend([' ', ' ', ' ']);
                        idx += 3;
                        continue;
                    }
                    chars.extend(['\'', '\'']);
                    raw = false;
                    idx += 2;
                    continue;
                }
                chars.push(' ');
            } else if quoted {
                if c == '\\' {
                    chars.push(' ');
                    if next.is_some() {
                        chars.push(' ');
                    }
                    idx += 2;
                    continue;
                }
                if c == '"' {
                    quoted = false;
                    chars.push('"');
                } else {
                    chars.push(' ');
                }
            } else if c == COMMENT_MARKER {
                break;
            } else if c == '"' {
                quoted = true;
                chars.push('"');
            } else if c == '\'' && next == Some('\'') {
                chars.extend(['\'', '\'']);
                raw = true;
                idx += 2;
                continue;
            } else {
                chars.push(c);
            }
            idx += 1;
        }

        // code may have been cut at a comment; keep trailing blanks out of it
        while chars.last().is_some_and(|c| c.is_whitespace()) {
            chars.pop();
        }

        Self {
            chars,
            starts_in_raw: in_raw,
            ends_in_raw: raw,
        }
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.chars.iter().all(|c| c.is_whitespace())
    }

    /// Column of the first non-blank character.
    pub(crate) fn first_column(&self) -> Option<usize> {
        self.chars.iter().position(|c| !c.is_whitespace())
    }

    pub(crate) fn trimmed(&self) -> String {
        self.chars.iter().collect::<String>().trim().to_string()
    }

    pub(crate) fn ends_with(&self, suffix: &str) -> bool {
        let tail: Vec<char> = suffix.chars().collect();
        self.chars.ends_with(&tail)
    }

    pub(crate) fn contains(&self, c: char) -> bool {
        self.chars.contains(&c)
    }
}

/// The word starting at `column`, if an identifier starts there.
pub(crate) fn word_at(chars: &[char], column: usize) -> Option<String> {
    let first = chars.get(column).copied()?;
    if !is_ident_start(first) {
        return None;
    }
    Some(
        chars
            .iter()
            .skip(column)
            .take_while(|c| is_ident_char(**c))
            .collect(),
    )
}

/// Maps byte offsets in a text to line/column positions.
#[derive(Debug)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.char_indices()
                .filter(|(_, c)| *c == '\n')
                .map(|(idx, _)| idx + 1),
        );
        Self { text, line_starts }
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Position of a byte offset. Offsets past the end map to the end.
    #[must_use]
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = self
            .line_starts
            .partition_point(|start| *start <= offset)
            .saturating_sub(1);
        let start = self.line_starts.get(line).copied().unwrap_or_default();
        let column = self
            .text
            .get(start..offset)
            .map_or(0, |prefix| prefix.chars().count());
        Position::new(line, column)
    }

    /// Text of `line` without its newline.
    #[must_use]
    pub fn line(&self, line: usize) -> Option<&'a str> {
        let start = self.line_starts.get(line).copied()?;
        self.text.get(start..)?.split('\n').next()
    }

    /// Byte offset of a position. Columns past the end of their line map to
    /// the line end, lines past the end of the text to its end.
    #[must_use]
    pub fn offset(&self, position: Position) -> usize {
        let Some(start) = self.line_starts.get(position.line).copied() else {
            return self.text.len();
        };
        let line = self.line(position.line).unwrap_or_default();
        let column = line
            .char_indices()
            .nth(position.column)
            .map_or(line.len(), |(idx, _)| idx);
        start + column
    }
}
