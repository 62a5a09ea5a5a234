//! Type system error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypeSystemError {
    /// The TOML document could not be deserialized.
    #[error("Type system document error: {0}")]
    Toml(#[from] toml::de::Error),

    /// An entry is inconsistent (bad signature, unknown flags target, ...).
    #[error("Invalid type entry '{name}': {reason}")]
    InvalidEntry { name: String, reason: String },

    /// A version string is not valid semver.
    #[error("Invalid version '{value}': {source}")]
    Version {
        value: String,
        #[source]
        source: semver::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
