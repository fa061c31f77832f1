//! Typed declarations: `declare NAME : TYPE [OPTIONS] = VALUE;`
//!
//! The value is never parsed as an expression. It is bounded by the first
//! `;` at bracket depth 0 outside string literals and checked with shallow
//! lexical rules for the declared type.

use std::fmt;
use std::ops::Range as Span;
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{Diagnostic, DiagnosticKind, Range};
use crate::syntax::{COMMENT_MARKER, LineIndex};

#[allow(clippy::expect_used)]
static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bdeclare\s+([A-Za-z_][A-Za-z0-9_'-]*)\s*:\s*([A-Za-z]+)\b")
        .expect("declaration pattern is valid")
});

#[allow(clippy::expect_used)]
static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)""#).expect("quoted string pattern is valid"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeclaredType {
    String,
    Int,
    Float,
    Boolean,
    Enum,
    /// A type name the checker knows nothing about; its values are not checked.
    Other(String),
}

impl DeclaredType {
    fn parse(name: &str) -> Self {
        match name {
            "string" => Self::String,
            "int" | "integer" => Self::Int,
            "float" => Self::Float,
            "boolean" | "bool" => Self::Boolean,
            "enum" => Self::Enum,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Int => write!(f, "int"),
            Self::Float => write!(f, "float"),
            Self::Boolean => write!(f, "boolean"),
            Self::Enum => write!(f, "enum"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// A declaration found in the document, with byte spans into the source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypedDeclaration {
    pub name: String,
    pub declared_type: DeclaredType,
    /// Quoted options of an `enum` declaration, in source order.
    pub enum_options: Vec<String>,
    /// `declare NAME : TYPE`
    pub head: Span<usize>,
    /// Offset of the `=` that starts the value.
    pub equals: usize,
    /// The trimmed value, `None` when no terminating `;` was found.
    pub value: Option<Span<usize>>,
}

impl TypedDeclaration {
    /// Whether anything but blanks sits between the type and the `=`.
    #[must_use]
    pub fn has_inline_options(&self, text: &str) -> bool {
        text.get(self.head.end..self.equals)
            .is_some_and(|between| !between.trim().is_empty())
    }
}

/// Find every typed declaration in `text`.
#[must_use]
pub fn find_declarations(text: &str) -> Vec<TypedDeclaration> {
    DECLARATION
        .captures_iter(text)
        .filter_map(|captures| {
            let whole = captures.get(0)?;
            if is_commented_out(text, whole.start()) {
                return None;
            }
            let name = captures.get(1)?.as_str().to_string();
            let declared_type = DeclaredType::parse(captures.get(2)?.as_str());
            let equals = find_top_level(text, whole.end(), '=')?;
            let enum_options = text
                .get(whole.end()..equals)
                .map(|between| {
                    QUOTED
                        .captures_iter(between)
                        .filter_map(|option| option.get(1))
                        .map(|option| option.as_str().to_string())
                        .collect()
                })
                .unwrap_or_default();
            let value = find_top_level(text, equals + 1, ';')
                .and_then(|end| trimmed_span(text, equals + 1..end));
            Some(TypedDeclaration {
                name,
                declared_type,
                enum_options,
                head: whole.start()..whole.end(),
                equals,
                value,
            })
        })
        .collect()
}

/// Validate every declaration's value against its declared type.
#[must_use]
#[tracing::instrument(level = "trace", skip(text), fields(len = text.len()))]
pub fn check_declarations(text: &str) -> Vec<Diagnostic> {
    let index = LineIndex::new(text);
    find_declarations(text)
        .into_iter()
        .filter_map(|declaration| {
            // no terminator: the scanner already reports the statement
            let span = declaration.value.clone()?;
            let value = text.get(span.clone())?;
            let message = validate(&declaration, value)?;
            Some(Diagnostic::error(
                DiagnosticKind::TypeMismatch,
                Range::new(index.position(span.start), index.position(span.end)),
                message,
            ))
        })
        .collect()
}

fn validate(declaration: &TypedDeclaration, value: &str) -> Option<String> {
    let valid = match &declaration.declared_type {
        DeclaredType::String => value.starts_with('"') || value.starts_with("''"),
        DeclaredType::Int => is_integer(value),
        DeclaredType::Float => is_float(value),
        DeclaredType::Boolean => matches!(value, "true" | "false"),
        DeclaredType::Enum => {
            let unquoted = strip_quotes(value);
            if declaration.enum_options.iter().any(|option| option == unquoted) {
                return None;
            }
            return Some(format!(
                "Invalid enum value '{unquoted}' for '{}'. Valid options: {}",
                declaration.name,
                declaration.enum_options.join(", ")
            ));
        }
        DeclaredType::Other(_) => true,
    };
    (!valid).then(|| {
        let ty = &declaration.declared_type;
        format!(
            "Type mismatch: '{}' is declared as {ty} but the value is not a valid {ty}",
            declaration.name
        )
    })
}

fn all_digits(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

fn is_integer(value: &str) -> bool {
    all_digits(value.strip_prefix(['+', '-']).unwrap_or(value))
}

fn is_float(value: &str) -> bool {
    let number = value.strip_prefix(['+', '-']).unwrap_or(value);
    match number.split_once('.') {
        Some((whole, fraction)) => all_digits(whole) && all_digits(fraction),
        None => all_digits(number),
    }
}

fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(value)
}

fn is_commented_out(text: &str, offset: usize) -> bool {
    let line_start = text
        .get(..offset)
        .and_then(|before| before.rfind('\n'))
        .map_or(0, |newline| newline + 1);
    text.get(line_start..offset)
        .is_some_and(|prefix| prefix.contains(COMMENT_MARKER))
}

fn trimmed_span(text: &str, span: Span<usize>) -> Option<Span<usize>> {
    let slice = text.get(span.clone())?;
    let leading = slice.len() - slice.trim_start().len();
    let trimmed = slice.trim();
    if trimmed.is_empty() {
        return None;
    }
    let start = span.start + leading;
    Some(start..start + trimmed.len())
}

/// Byte offset of the first `target` at bracket depth 0 and outside string
/// literals and comments, searching from `from`.
///
/// Gives up at a closing bracket that was not opened after `from`, and, when
/// looking for `=`, at a top-level `;`. A `==` is never a match.
pub(crate) fn find_top_level(text: &str, from: usize, target: char) -> Option<usize> {
    let rest = text.get(from..)?;
    let mut chars = rest.char_indices().peekable();
    let mut depth = 0usize;
    let mut quoted = false;
    let mut raw = false;

    while let Some((idx, c)) = chars.next() {
        let next = chars.peek().map(|(_, next)| *next);
        if raw {
            if c == '\'' && next == Some('\'') {
                chars.next();
                if matches!(chars.peek(), Some((_, '\'' | '$' | '\\'))) {
                    chars.next();
                } else {
                    raw = false;
                }
            }
            continue;
        }
        if quoted {
            match c {
                '\\' => {
                    chars.next();
                }
                '"' => quoted = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => quoted = true,
            '\'' if next == Some('\'') => {
                chars.next();
                raw = true;
            }
            COMMENT_MARKER => {
                for (_, skipped) in chars.by_ref() {
                    if skipped == '\n' {
                        break;
                    }
                }
            }
            '(' | '{' | '[' => depth += 1,
            ')' | '}' | ']' => depth = depth.checked_sub(1)?,
            '=' if target == '=' && depth == 0 => {
                if next == Some('=') {
                    chars.next();
                } else {
                    return Some(from + idx);
                }
            }
            ';' if depth == 0 => {
                return (target == ';').then_some(from + idx);
            }
            _ => {}
        }
    }
    None
}
