//! znix-lsp library
//!
//! Provides the LSP backend for documents written in the znix dialect.

pub mod backend;
pub mod capabilities;
pub mod convert;
pub mod scheduler;
pub mod state;

pub use backend::Backend;
