//! Build error types.
//!
//! Rejections are not errors: they are recorded as
//! [`crate::RejectReason`] values on the finished model.

use apix_codemodel::CodeModelError;
use apix_config::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// A type named by a type-system rule matches no registry entry.
    #[error(
        "Type '{name}' wasn't found in the type database; use its fully qualified name{}",
        candidate_list(.candidates)
    )]
    UnknownType {
        name: String,
        candidates: Vec<String>,
    },

    /// A type spelling in a type-system rule does not parse.
    #[error("Invalid type '{spelling}' in '{context}': {source}")]
    TypeSpelling {
        spelling: String,
        context: String,
        #[source]
        source: CodeModelError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

fn candidate_list(candidates: &[String]) -> String {
    if candidates.is_empty() {
        ". No candidates found; declare it in the type system".to_string()
    } else {
        format!(". Candidates: {}", candidates.join(", "))
    }
}
