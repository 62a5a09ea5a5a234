//! TOML type-system documents.
//!
//! ```toml
//! api_version = "5.15"
//!
//! [[type]]
//! name = "NS::Widget"
//! kind = "object"
//! include = { name = "widget.h", kind = "local" }
//!
//! [[type.modify_function]]
//! signature = "resize(int,int)"
//! renamed_to = "setSize"
//!
//! [[reject]]
//! class = "NS::Widget"
//! function = "metaObject"
//! ```

use std::path::Path;

use semver::Version;
use serde::Deserialize;

use crate::database::{Rejection, TypeDatabase};
use crate::entry::{CodeGeneration, ContainerKind, EntryKind, Include, TypeEntry};
use crate::error::TypeSystemError;
use crate::modification::{AccessModifier, AddedFunction, FunctionModification};
use crate::signature::normalize_signature;

/// `add_function` as written in a document.
#[derive(Debug, Clone, Deserialize)]
pub struct AddFunctionSpec {
    pub signature: String,
    #[serde(default = "void")]
    pub return_type: String,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default)]
    pub access: AccessModifier,
}

fn void() -> String {
    "void".to_string()
}

impl AddFunctionSpec {
    fn into_added(self) -> Result<AddedFunction, TypeSystemError> {
        let mut added = AddedFunction::from_signature(&self.signature, &self.return_type)?;
        added.is_static = self.is_static;
        added.access = self.access;
        Ok(added)
    }
}

/// Document-level spelling of an entry kind. `interface` registers an
/// object type plus its designated interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecKind {
    Primitive,
    String,
    Char,
    Enum,
    Custom,
    Namespace,
    Object,
    Value,
    Interface,
    Container,
    Function,
}

impl SpecKind {
    const fn entry_kind(self) -> EntryKind {
        match self {
            Self::Primitive => EntryKind::Primitive,
            Self::String => EntryKind::String,
            Self::Char => EntryKind::Char,
            Self::Enum => EntryKind::Enum,
            Self::Custom => EntryKind::Custom,
            Self::Namespace => EntryKind::Namespace,
            Self::Object | Self::Interface => EntryKind::Object,
            Self::Value => EntryKind::Value,
            Self::Container => EntryKind::Container,
            Self::Function => EntryKind::Function,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerateSpec {
    #[default]
    All,
    Nothing,
    ForSubclass,
}

impl From<GenerateSpec> for CodeGeneration {
    fn from(value: GenerateSpec) -> Self {
        match value {
            GenerateSpec::All => Self::GenerateAll,
            GenerateSpec::Nothing => Self::GenerateNothing,
            GenerateSpec::ForSubclass => Self::GenerateForSubclass,
        }
    }
}

/// One `[[type]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct EntrySpec {
    pub name: String,
    pub kind: SpecKind,
    #[serde(default)]
    pub generate: GenerateSpec,
    #[serde(default)]
    pub target_lang_name: Option<String>,
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub include: Option<Include>,
    #[serde(default)]
    pub extra_includes: Vec<Include>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default)]
    pub container: Option<ContainerKind>,
    /// Enum only: name of the flags type wrapping it.
    #[serde(default)]
    pub flags: Option<String>,
    #[serde(default)]
    pub reject_enum_values: Vec<String>,
    #[serde(default)]
    pub force_integer: bool,
    /// Function only: accepted signatures; empty accepts every overload.
    #[serde(default)]
    pub signatures: Vec<String>,
    #[serde(default)]
    pub hash_function: Option<String>,
    #[serde(default)]
    pub modify_function: Vec<FunctionModification>,
    #[serde(default)]
    pub add_function: Vec<AddFunctionSpec>,
}

/// A whole type-system document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypeSystemDocument {
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default, rename = "type")]
    pub types: Vec<EntrySpec>,
    #[serde(default)]
    pub reject: Vec<Rejection>,
    #[serde(default)]
    pub add_function: Vec<AddFunctionSpec>,
    #[serde(default)]
    pub modify_function: Vec<FunctionModification>,
}

fn parse_version(value: &str) -> Result<Version, TypeSystemError> {
    // Accept the short `5.15` form alongside full semver.
    let padded = match value.matches('.').count() {
        0 => format!("{value}.0.0"),
        1 => format!("{value}.0"),
        _ => value.to_string(),
    };
    Version::parse(&padded).map_err(|source| TypeSystemError::Version {
        value: value.to_string(),
        source,
    })
}

impl TypeSystemDocument {
    /// # Errors
    /// Returns [`TypeSystemError::Toml`] when the document is malformed.
    pub fn from_toml_str(text: &str) -> Result<Self, TypeSystemError> {
        Ok(toml::from_str(text)?)
    }

    /// # Errors
    /// Returns an I/O or TOML error.
    pub fn load(path: &Path) -> Result<Self, TypeSystemError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Register everything in the document with `db`.
    ///
    /// # Errors
    /// Returns [`TypeSystemError::InvalidEntry`] for inconsistent entries
    /// and [`TypeSystemError::Version`] for unparsable versions.
    pub fn apply(self, db: &mut TypeDatabase) -> Result<(), TypeSystemError> {
        if let Some(version) = &self.api_version {
            db.set_api_version(Some(parse_version(version)?));
        }
        for spec in self.types {
            register_entry(db, spec)?;
        }
        for rejection in self.reject {
            db.add_rejection(rejection);
        }
        for added in self.add_function {
            db.add_global_added_function(added.into_added()?);
        }
        for modification in self.modify_function {
            db.add_global_function_modification(normalized(modification));
        }
        Ok(())
    }

    /// Build a fresh database from a document.
    ///
    /// # Errors
    /// See [`TypeSystemDocument::apply`].
    pub fn into_database(self) -> Result<TypeDatabase, TypeSystemError> {
        let mut db = TypeDatabase::new();
        self.apply(&mut db)?;
        Ok(db)
    }
}

fn normalized(mut modification: FunctionModification) -> FunctionModification {
    modification.signature = normalize_signature(&modification.signature);
    modification
}

fn register_entry(db: &mut TypeDatabase, spec: EntrySpec) -> Result<(), TypeSystemError> {
    let invalid = |reason: &str| TypeSystemError::InvalidEntry {
        name: spec.name.clone(),
        reason: reason.to_string(),
    };
    if spec.name.trim().is_empty() {
        return Err(invalid("empty name"));
    }
    if spec.flags.is_some() && spec.kind != SpecKind::Enum {
        return Err(invalid("only enums can declare flags"));
    }
    if spec.container.is_some() && spec.kind != SpecKind::Container {
        return Err(invalid("container kind on a non-container entry"));
    }
    if spec.kind == SpecKind::Container && spec.container.is_none() {
        return Err(invalid("container entries need a container kind"));
    }

    let mut entry = TypeEntry::new(&spec.name, spec.kind.entry_kind());
    entry.code_generation = spec.generate.into();
    entry.target_lang_name = spec.target_lang_name;
    entry.since = spec.since.as_deref().map(parse_version).transpose()?;
    entry.include = spec.include;
    entry.extra_includes = spec.extra_includes;
    entry.is_stream = spec.stream;
    entry.container_kind = spec.container;
    entry.rejected_enum_values = spec.reject_enum_values;
    entry.force_integer = spec.force_integer;
    entry.signatures = spec.signatures;
    entry.hash_function = spec.hash_function;
    entry.function_modifications = spec
        .modify_function
        .into_iter()
        .map(normalized)
        .collect();
    entry.added_functions = spec
        .add_function
        .into_iter()
        .map(AddFunctionSpec::into_added)
        .collect::<Result<_, _>>()?;

    let id = match spec.flags {
        Some(flags) => db.add_enum_with_flags(entry, &flags).0,
        None => db.add_entry(entry),
    };
    if spec.kind == SpecKind::Interface {
        db.add_interface_type(id);
    }
    tracing::debug!(name = %spec.name, kind = ?spec.kind, "registered type entry");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn loads_entries_and_rules() {
        let doc = TypeSystemDocument::from_toml_str(
            r#"
            api_version = "5.15"

            [[type]]
            name = "int"
            kind = "primitive"

            [[type]]
            name = "NS::Widget"
            kind = "object"
            since = "5.2"

            [[type.modify_function]]
            signature = "resize(int, int)"
            renamed_to = "setSize"

            [[type.add_function]]
            signature = "create(int)"
            return_type = "NS::Widget*"
            static = true

            [[reject]]
            class = "*"
            function = "metaObject"
            "#,
        )
        .unwrap();
        let db = doc.into_database().unwrap();

        assert_eq!(db.api_version(), Some(&Version::new(5, 15, 0)));
        let widget = db.find_complex_type("NS::Widget").unwrap();
        let entry = db.entry(widget);
        assert_eq!(entry.since, Some(Version::new(5, 2, 0)));
        assert_eq!(entry.function_modifications[0].signature, "resize(int,int)");
        assert_eq!(
            entry.function_modifications[0].renamed_to.as_deref(),
            Some("setSize")
        );
        assert!(entry.added_functions[0].is_static);
        assert!(db.is_function_rejected("NS::Widget", "metaObject"));
    }

    #[test]
    fn interface_kind_registers_both_entries() {
        let db = TypeSystemDocument::from_toml_str(
            r#"
            [[type]]
            name = "Paintable"
            kind = "interface"
            "#,
        )
        .unwrap()
        .into_database()
        .unwrap();
        let origin = db.find_complex_type("Paintable").unwrap();
        assert_eq!(db.entry(origin).kind, EntryKind::Object);
        let iface = db.find_complex_type("PaintableInterface").unwrap();
        assert_eq!(db.entry(iface).kind, EntryKind::Interface);
    }

    #[test]
    fn flags_only_on_enums() {
        let err = TypeSystemDocument::from_toml_str(
            r#"
            [[type]]
            name = "Foo"
            kind = "value"
            flags = "Foos"
            "#,
        )
        .unwrap()
        .into_database()
        .unwrap_err();
        assert!(matches!(err, TypeSystemError::InvalidEntry { .. }));
    }

    #[test]
    fn bad_version_is_reported() {
        let err = TypeSystemDocument::from_toml_str(r#"api_version = "five""#)
            .unwrap()
            .into_database()
            .unwrap_err();
        assert!(matches!(err, TypeSystemError::Version { .. }));
    }
}
