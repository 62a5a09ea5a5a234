//! Enums and their values.

use std::collections::BTreeMap;

use apix_typesystem::TypeEntryId;

use super::ClassId;
use super::function::Visibility;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaEnumValue {
    pub name: String,
    /// Initializer as written; empty when implicit.
    pub string_value: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaEnum {
    /// Fully qualified name.
    pub name: String,
    pub entry: TypeEntryId,
    pub visibility: Visibility,
    pub values: Vec<MetaEnumValue>,
    pub enclosing_class: Option<ClassId>,
    /// `enum class`: values are only visible through the enum name.
    pub is_scoped: bool,
    /// Rejected value name -> surviving value with the same integer.
    pub redirections: BTreeMap<String, String>,
}

impl MetaEnum {
    #[must_use]
    pub fn new(name: &str, entry: TypeEntryId) -> Self {
        Self {
            name: name.to_string(),
            entry,
            visibility: Visibility::Public,
            values: Vec::new(),
            enclosing_class: None,
            is_scoped: false,
            redirections: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn short_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    /// Scope the values are visible in: the enum itself when scoped,
    /// otherwise its enclosing scope.
    #[must_use]
    pub fn value_scope(&self) -> Option<&str> {
        if self.is_scoped {
            return Some(&self.name);
        }
        self.name.rfind("::").map(|pos| &self.name[..pos])
    }

    #[must_use]
    pub fn find_value(&self, name: &str) -> Option<&MetaEnumValue> {
        self.values.iter().find(|v| v.name == name)
    }
}
