//! Function, argument and added-function rules attached to type entries.

use serde::{Deserialize, Serialize};

use crate::error::TypeSystemError;
use crate::signature::{normalize_signature, signature_name, split_top_level};

/// Where a removed function disappears from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Removal {
    /// Removed from the generated binding only; still tracked in C++.
    TargetLang,
    /// Removed everywhere; the function is discarded by the builder.
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessModifier {
    #[default]
    Public,
    Protected,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finality {
    Final,
    NonFinal,
}

/// Rule for one argument (1-based `index`; 0 addresses the return value).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentModification {
    pub index: usize,
    #[serde(default)]
    pub renamed_to: Option<String>,
    #[serde(default)]
    pub replaced_default_expression: Option<String>,
    #[serde(default)]
    pub removed_default_expression: bool,
    #[serde(default)]
    pub removed: bool,
}

/// Rule for one function, keyed by its normalized minimal signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionModification {
    pub signature: String,
    #[serde(default)]
    pub renamed_to: Option<String>,
    #[serde(default)]
    pub access: Option<AccessModifier>,
    #[serde(default)]
    pub removal: Option<Removal>,
    #[serde(default)]
    pub finality: Option<Finality>,
    #[serde(default, rename = "argument")]
    pub argument_mods: Vec<ArgumentModification>,
}

impl FunctionModification {
    #[must_use]
    pub fn new(signature: &str) -> Self {
        Self {
            signature: normalize_signature(signature),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn matches(&self, signature: &str) -> bool {
        normalize_signature(&self.signature) == normalize_signature(signature)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        signature_name(&self.signature)
    }

    #[must_use]
    pub const fn is_removed_from_all(&self) -> bool {
        matches!(self.removal, Some(Removal::All))
    }

    #[must_use]
    pub const fn is_removed_from_target_lang(&self) -> bool {
        self.removal.is_some()
    }

    #[must_use]
    pub fn argument(&self, index: usize) -> Option<&ArgumentModification> {
        self.argument_mods.iter().find(|m| m.index == index)
    }
}

/// One argument of a user-added function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedArgument {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
}

/// A function declared only in the type system (`add-function`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddedFunction {
    pub name: String,
    #[serde(default = "default_return_type")]
    pub return_type: String,
    #[serde(default)]
    pub arguments: Vec<AddedArgument>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_constant: bool,
    #[serde(default)]
    pub access: AccessModifier,
}

fn default_return_type() -> String {
    "void".to_string()
}

impl AddedFunction {
    /// Build from a signature such as `fromValues(int, const QString& = QString()) const`.
    ///
    /// # Errors
    /// Returns [`TypeSystemError::InvalidEntry`] when the signature has no
    /// argument list.
    pub fn from_signature(signature: &str, return_type: &str) -> Result<Self, TypeSystemError> {
        let invalid = |reason: &str| TypeSystemError::InvalidEntry {
            name: signature.to_string(),
            reason: reason.to_string(),
        };
        let open = signature.find('(').ok_or_else(|| invalid("missing '('"))?;
        let close = signature.rfind(')').ok_or_else(|| invalid("missing ')'"))?;
        if close < open {
            return Err(invalid("unbalanced parentheses"));
        }
        let name = signature[..open].trim();
        if name.is_empty() {
            return Err(invalid("missing function name"));
        }
        let arguments = split_top_level(&signature[open + 1..close], ',')
            .into_iter()
            .filter(|a| !a.is_empty())
            .map(|arg| {
                let mut parts = arg.splitn(2, '=');
                let type_name = parts.next().unwrap_or_default().trim().to_string();
                let default_value = parts.next().map(|d| d.trim().to_string());
                AddedArgument {
                    type_name,
                    name: None,
                    default_value,
                }
            })
            .collect();
        let is_constant = signature[close + 1..].trim() == "const";
        Ok(Self {
            name: name.to_string(),
            return_type: return_type.trim().to_string(),
            arguments,
            is_static: false,
            is_constant,
            access: AccessModifier::Public,
        })
    }

    /// Normalized `name(type,type)[const]` signature.
    #[must_use]
    pub fn signature(&self) -> String {
        let args: Vec<&str> = self
            .arguments
            .iter()
            .map(|a| a.type_name.as_str())
            .collect();
        let constness = if self.is_constant { "const" } else { "" };
        normalize_signature(&format!("{}({}){constness}", self.name, args.join(",")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn added_function_parses_defaults() {
        let f = AddedFunction::from_signature(
            "fromValues(int, const QMap<int, QString>& = QMap<int, QString>())",
            "Foo*",
        )
        .unwrap();
        assert_eq!(f.name, "fromValues");
        assert_eq!(f.arguments.len(), 2);
        assert_eq!(f.arguments[1].type_name, "const QMap<int, QString>&");
        assert_eq!(
            f.arguments[1].default_value.as_deref(),
            Some("QMap<int, QString>()")
        );
        assert_eq!(
            f.signature(),
            "fromValues(int,const QMap<int,QString>&)"
        );
    }

    #[test]
    fn added_function_without_arguments() {
        let f = AddedFunction::from_signature("reset() const", "void").unwrap();
        assert!(f.arguments.is_empty());
        assert!(f.is_constant);
        assert_eq!(f.signature(), "reset()const");
    }

    #[test]
    fn added_function_requires_parentheses() {
        assert!(AddedFunction::from_signature("broken", "void").is_err());
    }

    #[test]
    fn modification_matches_normalized_signature() {
        let m = FunctionModification::new("setValue(const QString &)");
        assert!(m.matches("setValue(const QString&)"));
        assert_eq!(m.name(), "setValue");
    }
}
