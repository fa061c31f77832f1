//! Completion: suggest context variables, dialect keywords, declared types
//! and enum values

use std::sync::LazyLock;

use regex::Regex;
use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionItemLabelDetails, Position,
};
use znix_core::syntax::{
    CONTEXT_VARIABLES, DECLARED_TYPES, SIGIL, STRUCTURAL_KEYWORDS, UNDERSCORE_KEYWORDS,
    is_ident_char,
};

use crate::convert::{PositionEncoding, line_before_cursor};
use crate::state::DocumentState;

/// `declare NAME : enum [...] = "prefix` with the cursor inside the quotes
#[allow(clippy::expect_used)]
static ENUM_VALUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\bdeclare\s+([A-Za-z_][A-Za-z0-9_'-]*)\s*:\s*enum\b[^=]*=\s*"([^"]*)$"#)
        .expect("enum value pattern is valid")
});

/// `declare NAME : prefix` with the cursor on the type
#[allow(clippy::expect_used)]
static DECLARED_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bdeclare\s+[A-Za-z_][A-Za-z0-9_'-]*\s*:\s*([A-Za-z]*)$")
        .expect("declared type pattern is valid")
});

/// Detect completion context from cursor position and text
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionContext {
    /// After the `$` sigil
    ContextVariable { prefix: String },
    /// A word starting with `_`
    UnderscoreKeyword { prefix: String },
    /// Right after `(`
    StructuralKeyword { prefix: String },
    /// After `declare NAME :`
    DeclaredType { prefix: String },
    /// Inside the quoted value of an enum declaration
    EnumValue { name: String, prefix: String },
    /// No completion context detected
    None,
}

/// Compute completion items for a position
#[must_use]
pub fn compute_completions(
    doc: &DocumentState,
    position: Position,
    encoding: PositionEncoding,
) -> Option<Vec<CompletionItem>> {
    let context = detect_context(&doc.text, position, encoding)?;

    match context {
        CompletionContext::ContextVariable { prefix } => Some(complete_context_variables(&prefix)),
        CompletionContext::UnderscoreKeyword { prefix } => {
            Some(complete_underscore_keywords(&prefix))
        }
        CompletionContext::StructuralKeyword { prefix } => {
            Some(complete_structural_keywords(&prefix))
        }
        CompletionContext::DeclaredType { prefix } => Some(complete_declared_types(&prefix)),
        CompletionContext::EnumValue { name, prefix } => {
            Some(complete_enum_values(doc, &name, &prefix))
        }
        CompletionContext::None => None,
    }
}

/// Detect the completion context from cursor position
fn detect_context(
    text: &str,
    position: Position,
    encoding: PositionEncoding,
) -> Option<CompletionContext> {
    let before_cursor = line_before_cursor(text, position, encoding)?;

    if let Some(captures) = ENUM_VALUE.captures(&before_cursor)
        && let (Some(name), Some(prefix)) = (captures.get(1), captures.get(2))
    {
        return Some(CompletionContext::EnumValue {
            name: name.as_str().to_string(),
            prefix: prefix.as_str().to_string(),
        });
    }

    if let Some(prefix) = DECLARED_TYPE
        .captures(&before_cursor)
        .and_then(|captures| captures.get(1))
    {
        return Some(CompletionContext::DeclaredType {
            prefix: prefix.as_str().to_string(),
        });
    }

    // the identifier being typed, and what precedes it
    let word_start = before_cursor
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c))
        .last()
        .map_or(before_cursor.len(), |(idx, _)| idx);
    let (head, word) = before_cursor.split_at(word_start);
    let preceding = head.chars().next_back();

    if preceding == Some(SIGIL) {
        return Some(CompletionContext::ContextVariable {
            prefix: word.to_string(),
        });
    }
    if preceding == Some('(') {
        return Some(CompletionContext::StructuralKeyword {
            prefix: word.to_string(),
        });
    }
    if word.starts_with('_') {
        return Some(CompletionContext::UnderscoreKeyword {
            prefix: word.to_string(),
        });
    }

    Some(CompletionContext::None)
}

fn complete_context_variables(prefix: &str) -> Vec<CompletionItem> {
    CONTEXT_VARIABLES
        .iter()
        .filter(|(name, _)| name.starts_with(prefix))
        .map(|(name, desc)| CompletionItem {
            label: (*name).to_string(),
            kind: Some(CompletionItemKind::VARIABLE),
            label_details: Some(CompletionItemLabelDetails {
                detail: Some(" context".to_string()),
                description: None,
            }),
            detail: Some((*desc).to_string()),
            ..Default::default()
        })
        .collect()
}

fn complete_underscore_keywords(prefix: &str) -> Vec<CompletionItem> {
    UNDERSCORE_KEYWORDS
        .iter()
        .filter(|(name, _)| name.starts_with(prefix))
        .map(|(name, desc)| CompletionItem {
            label: (*name).to_string(),
            kind: Some(CompletionItemKind::KEYWORD),
            detail: Some((*desc).to_string()),
            ..Default::default()
        })
        .collect()
}

fn complete_structural_keywords(prefix: &str) -> Vec<CompletionItem> {
    STRUCTURAL_KEYWORDS
        .iter()
        .filter(|name| name.starts_with(prefix))
        .map(|name| CompletionItem {
            label: (*name).to_string(),
            kind: Some(CompletionItemKind::KEYWORD),
            label_details: Some(CompletionItemLabelDetails {
                detail: Some(" structural".to_string()),
                description: None,
            }),
            ..Default::default()
        })
        .collect()
}

fn complete_declared_types(prefix: &str) -> Vec<CompletionItem> {
    DECLARED_TYPES
        .iter()
        .filter(|name| name.starts_with(prefix))
        .map(|name| CompletionItem {
            label: (*name).to_string(),
            kind: Some(CompletionItemKind::TYPE_PARAMETER),
            ..Default::default()
        })
        .collect()
}

/// Options of the named enum declaration, as currently written in the
/// document
fn complete_enum_values(doc: &DocumentState, name: &str, prefix: &str) -> Vec<CompletionItem> {
    znix_core::find_declarations(&doc.text)
        .into_iter()
        .find(|declaration| declaration.name == name)
        .map(|declaration| declaration.enum_options)
        .unwrap_or_default()
        .into_iter()
        .filter(|option| option.starts_with(prefix))
        .map(|option| CompletionItem {
            label: option,
            kind: Some(CompletionItemKind::ENUM_MEMBER),
            label_details: Some(CompletionItemLabelDetails {
                detail: Some(format!(" {name}")),
                description: None,
            }),
            ..Default::default()
        })
        .collect()
}
