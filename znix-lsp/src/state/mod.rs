//! State management for open documents

mod document;
mod workspace;

pub use document::DocumentState;
pub use workspace::Workspace;
