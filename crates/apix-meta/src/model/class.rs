//! Classes, namespaces and interfaces of the metamodel.

use std::fmt;

use apix_typesystem::{Include, TypeEntryId};
use bitflags::bitflags;
use serde::Serialize;

use super::enums::MetaEnum;
use super::field::MetaField;
use super::function::{FunctionType, MetaFunction, Visibility};
use super::types::MetaType;

/// Handle of a [`MetaClass`] inside a [`crate::MetaModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ClassId(pub(crate) u32);

impl ClassId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    #[default]
    Ordinary,
    /// Synthesized from a class whose entry designates an interface.
    Interface,
    Namespace,
    /// Declares template parameters.
    Template,
}

impl ClassKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ordinary => "ordinary",
            Self::Interface => "interface",
            Self::Namespace => "namespace",
            Self::Template => "template",
        }
    }
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct ClassAttributes: u32 {
        /// Cannot be subclassed from the target language.
        const FINAL = 1;
        const FINAL_IN_CPP = 1 << 1;
        const ABSTRACT = 1 << 2;
        const HAS_NON_PRIVATE_CONSTRUCTOR = 1 << 3;
        const HAS_VIRTUAL_DESTRUCTOR = 1 << 4;
        const HAS_PRIVATE_DESTRUCTOR = 1 << 5;
        const HAS_PROTECTED_DESTRUCTOR = 1 << 6;
        const HAS_EQUALS_OPERATOR = 1 << 7;
        const HAS_HASH_FUNCTION = 1 << 8;
        const HAS_CLONE_OPERATOR = 1 << 9;
        /// Needs a generated subclass even without virtual functions.
        const FORCE_SHELL_CLASS = 1 << 10;
    }
}

/// A property declaration as written
/// (`Type name READ getter WRITE setter RESET resetter`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDeclaration {
    pub type_name: String,
    pub name: String,
    pub read: String,
    pub write: Option<String>,
    pub reset: Option<String>,
}

impl PropertyDeclaration {
    /// `None` when the text has no name or getter.
    #[must_use]
    pub fn parse(declaration: &str) -> Option<Self> {
        let tokens: Vec<&str> = declaration.split_whitespace().collect();
        let keyword = tokens
            .iter()
            .position(|t| matches!(*t, "READ" | "WRITE" | "RESET"))?;
        if keyword < 2 {
            return None;
        }
        let mut read = None;
        let mut write = None;
        let mut reset = None;
        for pair in tokens[keyword..].chunks(2) {
            let [key, value] = pair else { break };
            match *key {
                "READ" => read = Some((*value).to_string()),
                "WRITE" => write = Some((*value).to_string()),
                "RESET" => reset = Some((*value).to_string()),
                _ => {}
            }
        }
        Some(Self {
            type_name: tokens[..keyword - 1].join(" "),
            name: tokens[keyword - 1].to_string(),
            read: read?,
            write,
            reset,
        })
    }

    #[must_use]
    pub fn into_spec(self, entry: TypeEntryId, index: usize) -> PropertySpec {
        PropertySpec {
            name: self.name,
            type_name: self.type_name,
            entry,
            read: self.read,
            write: self.write,
            reset: self.reset,
            index,
        }
    }
}

/// A property whose type resolved against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PropertySpec {
    pub name: String,
    pub type_name: String,
    pub entry: TypeEntryId,
    pub read: String,
    pub write: Option<String>,
    pub reset: Option<String>,
    /// Declaration order within the class.
    pub index: usize,
}

#[derive(Debug, Clone)]
pub struct MetaClass {
    /// Fully qualified C++ name.
    pub name: String,
    pub entry: TypeEntryId,
    pub kind: ClassKind,
    pub attributes: ClassAttributes,
    /// Base names as declared, scope-qualified where possible.
    pub base_class_names: Vec<String>,
    /// Resolved primary base.
    pub base_class: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    /// Lookup-only back reference; inner classes are owned by the model.
    pub enclosing_class: Option<ClassId>,
    pub inner_classes: Vec<ClassId>,
    pub fields: Vec<MetaField>,
    pub enums: Vec<MetaEnum>,
    pub functions: Vec<MetaFunction>,
    /// Placeholder entries for template parameters, by ordinal.
    pub template_arguments: Vec<TypeEntryId>,
    pub property_specs: Vec<PropertySpec>,
    /// The interface synthesized from this class.
    pub extracted_interface: Option<ClassId>,
    /// Interface only: the class it was extracted from.
    pub primary_interface_implementor: Option<ClassId>,
    pub include: Option<Include>,
    pub extra_includes: Vec<Include>,
    /// Synthesized from a typedef of a registered type.
    pub is_type_alias: bool,
    pub template_base_class: Option<ClassId>,
    pub template_base_instantiations: Vec<MetaType>,
}

impl MetaClass {
    #[must_use]
    pub fn new(name: &str, entry: TypeEntryId, kind: ClassKind) -> Self {
        Self {
            name: name.to_string(),
            entry,
            kind,
            attributes: ClassAttributes::empty(),
            base_class_names: Vec::new(),
            base_class: None,
            interfaces: Vec::new(),
            enclosing_class: None,
            inner_classes: Vec::new(),
            fields: Vec::new(),
            enums: Vec::new(),
            functions: Vec::new(),
            template_arguments: Vec::new(),
            property_specs: Vec::new(),
            extracted_interface: None,
            primary_interface_implementor: None,
            include: None,
            extra_includes: Vec::new(),
            is_type_alias: false,
            template_base_class: None,
            template_base_instantiations: Vec::new(),
        }
    }

    /// Last `::` part of the name.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    /// Enclosing scope part of the name.
    #[must_use]
    pub fn qualifier(&self) -> Option<&str> {
        self.name.rfind("::").map(|pos| &self.name[..pos])
    }

    #[must_use]
    pub fn is_namespace(&self) -> bool {
        self.kind == ClassKind::Namespace
    }

    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    #[must_use]
    pub const fn is_abstract(&self) -> bool {
        self.attributes.contains(ClassAttributes::ABSTRACT)
    }

    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.attributes.contains(ClassAttributes::FINAL)
    }

    #[must_use]
    pub const fn has(&self, attribute: ClassAttributes) -> bool {
        self.attributes.contains(attribute)
    }

    /// Attach a function and update the operator/constructor flags it implies.
    pub fn add_function(&mut self, function: MetaFunction) {
        if function.visibility != Visibility::Private {
            if function.name == "operator==" {
                self.attributes |= ClassAttributes::HAS_EQUALS_OPERATOR;
            }
            if function.is_constructor() {
                self.attributes |= ClassAttributes::HAS_NON_PRIVATE_CONSTRUCTOR;
            }
        }
        if function.function_type == FunctionType::CopyConstructor
            && function.visibility == Visibility::Public
        {
            self.attributes |= ClassAttributes::HAS_CLONE_OPERATOR;
        }
        self.functions.push(function);
    }

    #[must_use]
    pub fn has_function(&self, name: &str) -> bool {
        self.functions.iter().any(|f| f.name == name)
    }

    pub fn functions_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MetaFunction> {
        self.functions.iter().filter(move |f| f.name == name)
    }

    /// A function with the same minimal signature is already attached.
    #[must_use]
    pub fn has_signature(&self, minimal_signature: &str) -> bool {
        self.functions
            .iter()
            .any(|f| f.minimal_signature() == minimal_signature)
    }

    pub fn constructors(&self) -> impl Iterator<Item = &MetaFunction> {
        self.functions.iter().filter(|f| f.is_constructor())
    }

    #[must_use]
    pub fn find_field(&self, name: &str) -> Option<&MetaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn find_enum(&self, name: &str) -> Option<&MetaEnum> {
        self.enums
            .iter()
            .find(|e| e.name == name || e.short_name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apix_typesystem::{EntryKind, TypeDatabase, TypeEntry};
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_property_declaration() {
        let decl = PropertyDeclaration::parse(
            "const QString& title READ title WRITE setTitle RESET resetTitle",
        )
        .unwrap();
        assert_eq!(decl.type_name, "const QString&");
        assert_eq!(decl.name, "title");
        assert_eq!(decl.read, "title");
        assert_eq!(decl.write.as_deref(), Some("setTitle"));
        assert_eq!(decl.reset.as_deref(), Some("resetTitle"));
    }

    #[test]
    fn property_without_getter_is_ignored() {
        assert!(PropertyDeclaration::parse("int count WRITE setCount").is_none());
        assert!(PropertyDeclaration::parse("READ value").is_none());
    }

    #[test]
    fn add_function_tracks_operator_flags() {
        let mut db = TypeDatabase::new();
        let entry = db.add_entry(TypeEntry::new("NS::Point", EntryKind::Value));
        let mut class = MetaClass::new("NS::Point", entry, ClassKind::Ordinary);
        class.add_function(MetaFunction::new("operator=="));
        let mut copy = MetaFunction::new("Point");
        copy.function_type = FunctionType::CopyConstructor;
        class.add_function(copy);
        assert!(class.has(ClassAttributes::HAS_EQUALS_OPERATOR));
        assert!(class.has(ClassAttributes::HAS_CLONE_OPERATOR));
        assert!(class.has(ClassAttributes::HAS_NON_PRIVATE_CONSTRUCTOR));
        assert_eq!(class.short_name(), "Point");
        assert_eq!(class.qualifier(), Some("NS"));
    }
}
