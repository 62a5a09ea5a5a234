//! Options of the metamodel builder.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_implicit_scope() -> String {
    "Qt".to_string()
}

fn default_flags_template() -> String {
    "QFlags".to_string()
}

fn default_concrete_wrapper_suffix() -> String {
    "$ConcreteWrapper".to_string()
}

fn default_hash_function() -> String {
    "qHash".to_string()
}

fn default_interface_suffix() -> String {
    "Interface".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BuilderConfig {
    /// Namespace tried last when a type name does not resolve
    /// (the toolkit's implicit meta-object scope).
    #[serde(default = "default_implicit_scope")]
    pub implicit_scope: String,

    /// Template whose instantiations are flags types.
    #[serde(default = "default_flags_template")]
    pub flags_template: String,

    /// Roots stripped from declaring file names when inferring includes.
    #[serde(default)]
    pub include_paths: Vec<String>,

    /// API version entries are checked against (`since`).
    #[serde(default)]
    pub api_version: Option<String>,

    /// Appended to the lookup name of abstract classes.
    #[serde(default = "default_concrete_wrapper_suffix")]
    pub concrete_wrapper_suffix: String,

    /// Free function that marks a class as hashable.
    #[serde(default = "default_hash_function")]
    pub hash_function: String,

    /// Suffix of synthesized interface classes.
    #[serde(default = "default_interface_suffix")]
    pub interface_suffix: String,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            implicit_scope: default_implicit_scope(),
            flags_template: default_flags_template(),
            include_paths: Vec::new(),
            api_version: None,
            concrete_wrapper_suffix: default_concrete_wrapper_suffix(),
            hash_function: default_hash_function(),
            interface_suffix: default_interface_suffix(),
        }
    }
}

impl BuilderConfig {
    /// The configured API version, accepting `5.15` as `5.15.0`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidValue`] for a malformed version.
    pub fn parsed_api_version(&self) -> Result<Option<semver::Version>, ConfigError> {
        let Some(raw) = self.api_version.as_deref() else {
            return Ok(None);
        };
        let padded = match raw.matches('.').count() {
            0 => format!("{raw}.0.0"),
            1 => format!("{raw}.0"),
            _ => raw.to_string(),
        };
        semver::Version::parse(&padded)
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                field: "builder.api_version".to_string(),
                reason: e.to_string(),
            })
    }
}
