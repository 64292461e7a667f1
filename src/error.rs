//! Error taxonomy for the document model. Transport-layer errors (bad URI,
//! unknown document) are handled in `server` with `lsp_server`'s own types;
//! nothing here is meant to reach the wire.

use thiserror::Error;

/// Errors the document model can encounter. Only [`DocumentError::GrammarUnavailable`]
/// is allowed to escape document construction; every other variant is caught
/// and logged internally, triggering a fallback rather than propagating.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("no grammar available for language `{0}`")]
    GrammarUnavailable(String),

    #[error("edit position out of bounds: {0:?}")]
    EditOutOfBounds(lsp_types::Position),

    #[error("tree-sitter changed-range extends past the local edit")]
    ParseMismatch,
}
