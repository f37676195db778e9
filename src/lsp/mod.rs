//! Language-server surface
//!
//! Hosts the engine behind tower-lsp: document lifecycle, diagnostics
//! publishing, completion/hover/code-action handlers, the debounced
//! project reconciler and the metadata file watcher.

pub mod backend;
pub mod conversion;
pub mod documents;

pub use backend::Backend;
