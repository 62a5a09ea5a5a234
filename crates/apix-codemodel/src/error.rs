//! Error types for apix-codemodel.

/// Errors raised while loading a code model dump or parsing a type spelling.
#[derive(Debug, thiserror::Error)]
pub enum CodeModelError {
    #[error("Failed to parse type '{input}': {message}")]
    TypeParse { input: String, message: String },

    #[error("Invalid code model: {0}")]
    InvalidModel(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
