//! Type entries: one registry rule per qualified C++ name.
//!
//! Entries are stored in the [`crate::TypeDatabase`] arena and referred to
//! by [`TypeEntryId`]. Relationships between entries (an enum and its flags
//! type, an array and its element type, an interface and its origin) are
//! ids into the same arena.

use std::fmt;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::modification::{AddedFunction, FunctionModification};

/// Handle of a [`TypeEntry`] inside a [`crate::TypeDatabase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TypeEntryId(pub(crate) u32);

impl TypeEntryId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntryKind
// ---------------------------------------------------------------------------

/// What kind of C++ entity an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Primitive,
    Void,
    Varargs,
    /// A primitive marshalled as a string (`char*`, `QString`).
    String,
    /// A primitive marshalled as a single character.
    Char,
    Enum,
    Flags,
    /// Placeholder for the N-th template parameter of a template class.
    TemplateArgument,
    Array,
    Custom,
    Namespace,
    Object,
    Value,
    Interface,
    Container,
    Function,
}

impl EntryKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primitive => "primitive",
            Self::Void => "void",
            Self::Varargs => "varargs",
            Self::String => "string",
            Self::Char => "char",
            Self::Enum => "enum",
            Self::Flags => "flags",
            Self::TemplateArgument => "template_argument",
            Self::Array => "array",
            Self::Custom => "custom",
            Self::Namespace => "namespace",
            Self::Object => "object",
            Self::Value => "value",
            Self::Interface => "interface",
            Self::Container => "container",
            Self::Function => "function",
        }
    }

    /// Entries that can back a metamodel class.
    #[must_use]
    pub const fn is_complex(self) -> bool {
        matches!(
            self,
            Self::Namespace | Self::Object | Self::Value | Self::Interface | Self::Container
        )
    }

    /// Primitive-like kinds: plain primitives plus string and char.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        matches!(self, Self::Primitive | Self::String | Self::Char)
    }

    /// Entries that only exist inside a build and are never looked up by name.
    #[must_use]
    pub const fn is_synthetic(self) -> bool {
        matches!(self, Self::TemplateArgument | Self::Array)
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CodeGeneration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeGeneration {
    #[default]
    GenerateAll,
    GenerateNothing,
    /// Only generated as a base for subclasses defined elsewhere.
    GenerateForSubclass,
}

// ---------------------------------------------------------------------------
// ContainerKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    List,
    LinkedList,
    Vector,
    Stack,
    Queue,
    Set,
    Map,
    MultiMap,
    Hash,
    MultiHash,
    Pair,
}

// ---------------------------------------------------------------------------
// Include
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeKind {
    #[default]
    Global,
    Local,
}

/// A header to include for an entry, e.g. `<QtCore/qstring.h>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Include {
    pub name: String,
    #[serde(default)]
    pub kind: IncludeKind,
}

impl Include {
    #[must_use]
    pub fn global(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: IncludeKind::Global,
        }
    }

    #[must_use]
    pub fn local(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: IncludeKind::Local,
        }
    }
}

impl fmt::Display for Include {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            IncludeKind::Global => write!(f, "<{}>", self.name),
            IncludeKind::Local => write!(f, "\"{}\"", self.name),
        }
    }
}

// ---------------------------------------------------------------------------
// TypeEntry
// ---------------------------------------------------------------------------

/// A registry rule.
///
/// Kind-specific fields are left at their defaults for kinds they do not
/// apply to.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEntry {
    pub name: String,
    pub kind: EntryKind,
    pub code_generation: CodeGeneration,
    pub target_lang_name: Option<String>,
    /// First API version the entry exists in.
    pub since: Option<Version>,
    pub include: Option<Include>,
    pub extra_includes: Vec<Include>,

    /// Primitive typedef: the primitive it stands for.
    pub referenced_type: Option<TypeEntryId>,

    /// Enum: its flags type.
    pub flags: Option<TypeEntryId>,
    /// Flags: the enum it wraps.
    pub enum_entry: Option<TypeEntryId>,
    /// Flags: the template spelling, e.g. `QFlags<NS::Option>`.
    pub original_name: Option<String>,
    pub rejected_enum_values: Vec<String>,
    pub force_integer: bool,

    /// Template argument: parameter position.
    pub ordinal: usize,
    /// Array: element type.
    pub nested: Option<TypeEntryId>,

    /// Complex type: the interface synthesized for it.
    pub designated_interface: Option<TypeEntryId>,
    /// Interface: the class it was extracted from.
    pub origin: Option<TypeEntryId>,
    pub is_stream: bool,
    pub container_kind: Option<ContainerKind>,
    pub hash_function: Option<String>,
    pub function_modifications: Vec<FunctionModification>,
    pub added_functions: Vec<AddedFunction>,

    /// Function: accepted signatures of the free function.
    pub signatures: Vec<String>,

    /// Derived during a build: name under which an abstract class is
    /// looked up (its concrete wrapper).
    pub lookup_name: Option<String>,
    /// Derived during a build: container a class inherits from.
    pub base_container_type: Option<TypeEntryId>,
}

impl TypeEntry {
    #[must_use]
    pub fn new(name: &str, kind: EntryKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            code_generation: CodeGeneration::GenerateAll,
            target_lang_name: None,
            since: None,
            include: None,
            extra_includes: Vec::new(),
            referenced_type: None,
            flags: None,
            enum_entry: None,
            original_name: None,
            rejected_enum_values: Vec::new(),
            force_integer: false,
            ordinal: 0,
            nested: None,
            designated_interface: None,
            origin: None,
            is_stream: false,
            container_kind: None,
            hash_function: None,
            function_modifications: Vec::new(),
            added_functions: Vec::new(),
            signatures: Vec::new(),
            lookup_name: None,
            base_container_type: None,
        }
    }

    #[must_use]
    pub const fn is_complex(&self) -> bool {
        self.kind.is_complex()
    }

    #[must_use]
    pub const fn generates_code(&self) -> bool {
        !matches!(self.code_generation, CodeGeneration::GenerateNothing)
    }

    /// Last `::` part of the name.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    /// Name in the binding language; defaults to the short C++ name.
    #[must_use]
    pub fn target_lang_name(&self) -> &str {
        self.target_lang_name
            .as_deref()
            .unwrap_or_else(|| self.short_name())
    }

    /// Name used to look the type up in generated code.
    #[must_use]
    pub fn lookup_name(&self) -> &str {
        self.lookup_name.as_deref().unwrap_or(&self.name)
    }

    /// Enclosing scope part of the name (`A::B::C` -> `A::B`).
    #[must_use]
    pub fn qualifier(&self) -> Option<&str> {
        self.name.rfind("::").map(|pos| &self.name[..pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn names_default_from_qualified_name() {
        let entry = TypeEntry::new("NS::Inner::Widget", EntryKind::Object);
        assert_eq!(entry.short_name(), "Widget");
        assert_eq!(entry.target_lang_name(), "Widget");
        assert_eq!(entry.qualifier(), Some("NS::Inner"));
        assert_eq!(entry.lookup_name(), "NS::Inner::Widget");
    }

    #[test]
    fn include_renders_with_delimiters() {
        assert_eq!(Include::global("foo.h").to_string(), "<foo.h>");
        assert_eq!(Include::local("bar.h").to_string(), "\"bar.h\"");
    }

    #[test]
    fn complex_kinds() {
        assert!(EntryKind::Value.is_complex());
        assert!(EntryKind::Container.is_complex());
        assert!(!EntryKind::Enum.is_complex());
        assert!(!EntryKind::Primitive.is_complex());
    }
}
