//! Type conversions between znix-core and LSP types
//!
//! Core columns count chars. LSP columns count code units of the position
//! encoding agreed on at initialization: UTF-32 units are chars, UTF-16
//! units need the line text to convert.

use tower_lsp::lsp_types::{InitializeParams, Position, PositionEncodingKind, Range};
use znix_core::syntax::LineIndex;

/// Convert usize to u32 for LSP types, saturating at `u32::MAX`.
fn to_lsp_u32(val: usize) -> u32 {
    val.try_into().unwrap_or(u32::MAX)
}

/// How LSP columns are counted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PositionEncoding {
    /// The LSP default, used when the client offers nothing better
    #[default]
    Utf16,
    Utf32,
}

impl PositionEncoding {
    /// UTF-32 when the client offers it, UTF-16 otherwise.
    #[must_use]
    pub fn negotiate(params: &InitializeParams) -> Self {
        let offered = params
            .capabilities
            .general
            .as_ref()
            .and_then(|general| general.position_encodings.as_ref());
        match offered {
            Some(kinds) if kinds.contains(&PositionEncodingKind::UTF32) => Self::Utf32,
            Some(_) | None => Self::Utf16,
        }
    }

    #[must_use]
    pub fn kind(self) -> PositionEncodingKind {
        match self {
            Self::Utf16 => PositionEncodingKind::UTF16,
            Self::Utf32 => PositionEncodingKind::UTF32,
        }
    }

    fn width(self, c: char) -> usize {
        match self {
            Self::Utf16 => c.len_utf16(),
            Self::Utf32 => 1,
        }
    }
}

/// Converts core positions of one document into LSP positions.
pub struct PositionMapper<'a> {
    index: LineIndex<'a>,
    text_len: usize,
    encoding: PositionEncoding,
}

impl<'a> PositionMapper<'a> {
    #[must_use]
    pub fn new(text: &'a str, encoding: PositionEncoding) -> Self {
        Self {
            index: LineIndex::new(text),
            text_len: text.len(),
            encoding,
        }
    }

    #[must_use]
    pub fn position(&self, pos: znix_core::Position) -> Position {
        let character = match self.index.line(pos.line) {
            Some(line) if self.encoding == PositionEncoding::Utf16 => {
                line.chars().take(pos.column).map(char::len_utf16).sum()
            }
            Some(_) | None => pos.column,
        };
        Position {
            line: to_lsp_u32(pos.line),
            character: to_lsp_u32(character),
        }
    }

    #[must_use]
    pub fn range(&self, range: znix_core::Range) -> Range {
        Range {
            start: self.position(range.start),
            end: self.position(range.end),
        }
    }

    /// The range spanning the whole document, for whole-document edits.
    #[must_use]
    pub fn full_range(&self) -> Range {
        Range {
            start: Position::default(),
            end: self.position(self.index.position(self.text_len)),
        }
    }
}

/// The text of `position`'s line up to the cursor.
///
/// Returns `None` if the line does not exist.
#[must_use]
pub fn line_before_cursor(
    text: &str,
    position: Position,
    encoding: PositionEncoding,
) -> Option<String> {
    let line = match text.lines().nth(position.line as usize) {
        Some(line) => line,
        // the cursor can sit on the empty line after a trailing newline
        None if text.lines().count() == position.line as usize => "",
        None => return None,
    };
    let mut units = 0;
    Some(
        line.chars()
            .take_while(|c| {
                units += encoding.width(*c);
                units <= position.character as usize
            })
            .collect(),
    )
}
