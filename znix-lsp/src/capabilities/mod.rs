//! LSP capability implementations

pub mod completion;
pub mod diagnostics;
pub mod formatting;
