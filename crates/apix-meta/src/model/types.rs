//! Resolved type occurrences.

use std::fmt;

use apix_codemodel::ReferenceType;
use apix_typesystem::{EntryKind, TypeDatabase, TypeEntryId};
use serde::Serialize;

// ---------------------------------------------------------------------------
// UsagePattern
// ---------------------------------------------------------------------------

/// Coarse classification of a [`MetaType`], used downstream to pick a
/// marshalling strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UsagePattern {
    Primitive,
    String,
    Char,
    Enum,
    Object,
    ObjectPointer,
    Value,
    ValuePointer,
    Container,
    Flags,
    Array,
    /// Opaque; passed around as a raw pointer.
    #[default]
    NativePointer,
    Varargs,
    TemplateArgument,
}

impl UsagePattern {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primitive => "primitive",
            Self::String => "string",
            Self::Char => "char",
            Self::Enum => "enum",
            Self::Object => "object",
            Self::ObjectPointer => "object_pointer",
            Self::Value => "value",
            Self::ValuePointer => "value_pointer",
            Self::Container => "container",
            Self::Flags => "flags",
            Self::Array => "array",
            Self::NativePointer => "native_pointer",
            Self::Varargs => "varargs",
            Self::TemplateArgument => "template_argument",
        }
    }
}

impl fmt::Display for UsagePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// MetaType
// ---------------------------------------------------------------------------

/// One resolved use of a type at a declaration site.
///
/// Values are never shared between declarations: template instantiation
/// clones and substitutes. Equality compares the entry, constness,
/// reference kind, indirections and instantiations only.
#[derive(Debug, Clone)]
pub struct MetaType {
    pub entry: TypeEntryId,
    /// Registry name of `entry` at resolution time.
    pub name: String,
    pub is_constant: bool,
    pub is_volatile: bool,
    pub reference: ReferenceType,
    pub indirections: usize,
    /// Bounded arrays: the element count of this dimension.
    pub array_element_count: Option<usize>,
    pub array_element: Option<Box<MetaType>>,
    pub instantiations: Vec<MetaType>,
    pub pattern: UsagePattern,
    /// Spelling as written at the declaration site.
    pub original_description: String,
}

impl PartialEq for MetaType {
    fn eq(&self, other: &Self) -> bool {
        self.entry == other.entry
            && self.is_constant == other.is_constant
            && self.reference == other.reference
            && self.indirections == other.indirections
            && self.instantiations == other.instantiations
    }
}

impl Eq for MetaType {}

impl MetaType {
    #[must_use]
    pub fn new(entry: TypeEntryId, name: &str) -> Self {
        Self {
            entry,
            name: name.to_string(),
            is_constant: false,
            is_volatile: false,
            reference: ReferenceType::None,
            indirections: 0,
            array_element_count: None,
            array_element: None,
            instantiations: Vec::new(),
            pattern: UsagePattern::NativePointer,
            original_description: String::new(),
        }
    }

    /// Pointer indirections, counting an lvalue reference as one more.
    #[must_use]
    pub fn actual_indirections(&self) -> usize {
        self.indirections + usize::from(self.reference == ReferenceType::LValue)
    }

    #[must_use]
    pub const fn is_reference(&self) -> bool {
        !matches!(self.reference, ReferenceType::None)
    }

    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self.pattern, UsagePattern::Object | UsagePattern::ObjectPointer)
    }

    #[must_use]
    pub const fn is_value(&self) -> bool {
        matches!(self.pattern, UsagePattern::Value | UsagePattern::ValuePointer)
    }

    #[must_use]
    pub const fn is_enum_like(&self) -> bool {
        matches!(self.pattern, UsagePattern::Enum | UsagePattern::Flags)
    }

    #[must_use]
    pub const fn is_container(&self) -> bool {
        matches!(self.pattern, UsagePattern::Container)
    }

    /// Last `::` part of the registry name.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.name.rsplit("::").next().unwrap_or(&self.name)
    }

    /// Scope part of the registry name, if any.
    #[must_use]
    pub fn qualifier(&self) -> Option<&str> {
        self.name.rfind("::").map(|pos| &self.name[..pos])
    }

    /// Classify the type. Must run after `instantiations` are final.
    pub fn decide_usage_pattern(&mut self, db: &TypeDatabase) {
        let actual = self.actual_indirections();
        let kind = db.entry(self.entry).kind;
        self.pattern = match kind {
            EntryKind::Primitive
                if actual == 0
                    || (self.is_constant
                        && self.reference == ReferenceType::LValue
                        && self.indirections == 0) =>
            {
                UsagePattern::Primitive
            }
            EntryKind::Varargs => UsagePattern::Varargs,
            EntryKind::String if self.indirections == 0 => UsagePattern::String,
            EntryKind::Char if self.indirections == 0 => UsagePattern::Char,
            EntryKind::Array => UsagePattern::Array,
            EntryKind::Container if self.indirections == 0 => UsagePattern::Container,
            EntryKind::TemplateArgument => UsagePattern::TemplateArgument,
            EntryKind::Flags if self.indirections == 0 => UsagePattern::Flags,
            EntryKind::Enum if actual == 0 => UsagePattern::Enum,
            EntryKind::Object | EntryKind::Interface | EntryKind::Value
                if self.indirections <= 1 =>
            {
                self.degrade_const_pointer_reference();
                match (kind, self.indirections) {
                    (EntryKind::Value, 0) => UsagePattern::Value,
                    (EntryKind::Value, _) => UsagePattern::ValuePointer,
                    (_, 0) => UsagePattern::Object,
                    _ => UsagePattern::ObjectPointer,
                }
            }
            _ => UsagePattern::NativePointer,
        };
    }

    // `const T*&` is carried as a plain `T*`.
    fn degrade_const_pointer_reference(&mut self) {
        if self.indirections == 1 && self.is_constant && self.is_reference() {
            self.is_constant = false;
            self.reference = ReferenceType::None;
        }
    }

    /// Registry name followed by instantiations, e.g. `QList<NS::Foo*>`.
    #[must_use]
    pub fn instantiation_spelling(&self) -> String {
        if self.instantiations.is_empty() {
            return self.name.clone();
        }
        let args: Vec<String> = self.instantiations.iter().map(Self::cpp_signature).collect();
        let mut out = format!("{}<{}", self.name, args.join(", "));
        if out.ends_with('>') {
            out.push(' ');
        }
        out.push('>');
        out
    }

    /// Full C++ spelling with qualifiers, in registry names.
    #[must_use]
    pub fn cpp_signature(&self) -> String {
        if self.array_element.is_some() {
            return self.array_signature();
        }
        let mut out = String::new();
        if self.is_constant {
            out.push_str("const ");
        }
        out.push_str(&self.instantiation_spelling());
        out.push_str(&"*".repeat(self.indirections));
        match self.reference {
            ReferenceType::None => {}
            ReferenceType::LValue => out.push('&'),
            ReferenceType::RValue => out.push_str("&&"),
        }
        out
    }

    fn array_signature(&self) -> String {
        let mut dims = String::new();
        let mut current = self;
        while let Some(element) = &current.array_element {
            match current.array_element_count {
                Some(count) => dims.push_str(&format!("[{count}]")),
                None => dims.push_str("[]"),
            }
            current = element;
        }
        format!("{}{dims}", current.cpp_signature())
    }
}

impl fmt::Display for MetaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.cpp_signature())
    }
}
