//! Functions and their arguments.

use std::fmt;

use apix_codemodel::AccessPolicy;
use apix_typesystem::{AccessModifier, normalize_signature};
use bitflags::bitflags;
use serde::Serialize;

use super::ClassId;
use super::types::MetaType;

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<AccessPolicy> for Visibility {
    fn from(value: AccessPolicy) -> Self {
        match value {
            AccessPolicy::Public => Self::Public,
            AccessPolicy::Protected => Self::Protected,
            AccessPolicy::Private => Self::Private,
        }
    }
}

impl From<AccessModifier> for Visibility {
    fn from(value: AccessModifier) -> Self {
        match value {
            AccessModifier::Public => Self::Public,
            AccessModifier::Protected => Self::Protected,
            AccessModifier::Private => Self::Private,
        }
    }
}

// ---------------------------------------------------------------------------
// FunctionType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionType {
    #[default]
    Normal,
    Signal,
    Slot,
    Constructor,
    CopyConstructor,
    MoveConstructor,
    Destructor,
    AssignmentOperator,
    MoveAssignmentOperator,
    /// A free operator rewritten into a member of its host class.
    GlobalScopeOperator,
}

impl FunctionType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Signal => "signal",
            Self::Slot => "slot",
            Self::Constructor => "constructor",
            Self::CopyConstructor => "copy_constructor",
            Self::MoveConstructor => "move_constructor",
            Self::Destructor => "destructor",
            Self::AssignmentOperator => "assignment_operator",
            Self::MoveAssignmentOperator => "move_assignment_operator",
            Self::GlobalScopeOperator => "global_scope_operator",
        }
    }

    #[must_use]
    pub const fn is_constructor(self) -> bool {
        matches!(
            self,
            Self::Constructor | Self::CopyConstructor | Self::MoveConstructor
        )
    }
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct FunctionAttributes: u32 {
        const STATIC = 1;
        /// Not overridable from the target language.
        const FINAL = 1 << 1;
        /// Declared `final` in C++.
        const FINAL_IN_CPP = 1 << 2;
        const ABSTRACT = 1 << 3;
        const VIRTUAL = 1 << 4;
        const PROPERTY_READER = 1 << 5;
        const PROPERTY_WRITER = 1 << 6;
        const PROPERTY_RESETTER = 1 << 7;
        /// Bound to the second operand of the C++ declaration.
        const REVERSE_OPERATOR = 1 << 8;
        /// The removed `this` operand was a pointer.
        const POINTER_OPERATOR = 1 << 9;
        const USER_ADDED = 1 << 10;
        /// Type resolution failed; never attached to a class.
        const INVALID = 1 << 11;
        const REMOVED_FROM_TARGET_LANG = 1 << 12;
    }
}

// ---------------------------------------------------------------------------
// MetaArgument
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaArgument {
    pub name: String,
    pub original_name: String,
    pub ty: MetaType,
    /// Zero-based position in the C++ declaration.
    pub index: usize,
    pub default_value: Option<String>,
    /// Default expression exactly as declared.
    pub original_default_value: Option<String>,
    /// Removed from the binding by an argument modification.
    pub removed: bool,
}

impl MetaArgument {
    #[must_use]
    pub fn new(name: &str, ty: MetaType, index: usize) -> Self {
        Self {
            name: name.to_string(),
            original_name: name.to_string(),
            ty,
            index,
            default_value: None,
            original_default_value: None,
            removed: false,
        }
    }
}

// ---------------------------------------------------------------------------
// MetaFunction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaFunction {
    /// Name after modifications.
    pub name: String,
    /// Name as declared; modification rules are keyed on it.
    pub original_name: String,
    pub function_type: FunctionType,
    pub attributes: FunctionAttributes,
    pub visibility: Visibility,
    /// Class the signature was first declared in.
    pub declaring_class: Option<ClassId>,
    /// Class the binding lives in.
    pub implementing_class: Option<ClassId>,
    pub arguments: Vec<MetaArgument>,
    /// `None` for `void`.
    pub return_type: Option<MetaType>,
    pub is_constant: bool,
    pub is_explicit: bool,
}

impl MetaFunction {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            original_name: name.to_string(),
            function_type: FunctionType::Normal,
            attributes: FunctionAttributes::empty(),
            visibility: Visibility::Public,
            declaring_class: None,
            implementing_class: None,
            arguments: Vec::new(),
            return_type: None,
            is_constant: false,
            is_explicit: false,
        }
    }

    /// Normalized `original_name(types)const` used to match modification
    /// rules and detect duplicates.
    #[must_use]
    pub fn minimal_signature(&self) -> String {
        self.signature_with(&self.original_name)
    }

    /// Like [`MetaFunction::minimal_signature`] but with the current name.
    #[must_use]
    pub fn signature(&self) -> String {
        self.signature_with(&self.name)
    }

    fn signature_with(&self, name: &str) -> String {
        let args: Vec<String> = self
            .arguments
            .iter()
            .map(|a| a.ty.cpp_signature())
            .collect();
        let constness = if self.is_constant { "const" } else { "" };
        normalize_signature(&format!("{name}({}){constness}", args.join(",")))
    }

    #[must_use]
    pub const fn is_constructor(&self) -> bool {
        self.function_type.is_constructor()
    }

    #[must_use]
    pub fn is_operator(&self) -> bool {
        self.original_name.starts_with("operator")
    }

    #[must_use]
    pub const fn is_invalid(&self) -> bool {
        self.attributes.contains(FunctionAttributes::INVALID)
    }

    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.attributes.contains(FunctionAttributes::STATIC)
    }

    #[must_use]
    pub const fn is_abstract(&self) -> bool {
        self.attributes.contains(FunctionAttributes::ABSTRACT)
    }

    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.attributes.contains(FunctionAttributes::FINAL)
    }

    #[must_use]
    pub const fn is_reverse_operator(&self) -> bool {
        self.attributes.contains(FunctionAttributes::REVERSE_OPERATOR)
    }

    #[must_use]
    pub const fn is_user_added(&self) -> bool {
        self.attributes.contains(FunctionAttributes::USER_ADDED)
    }

    #[must_use]
    pub fn is_private(&self) -> bool {
        self.visibility == Visibility::Private
    }

    /// Arguments not removed by modifications.
    pub fn visible_arguments(&self) -> impl Iterator<Item = &MetaArgument> {
        self.arguments.iter().filter(|a| !a.removed)
    }

    /// Renumber argument indices after arguments were dropped.
    pub fn reindex_arguments(&mut self) {
        for (index, argument) in self.arguments.iter_mut().enumerate() {
            argument.index = index;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apix_typesystem::{EntryKind, TypeDatabase, TypeEntry};
    use pretty_assertions::assert_eq;

    #[test]
    fn signatures_use_registry_names() {
        let mut db = TypeDatabase::new();
        let point = db.add_entry(TypeEntry::new("NS::Point", EntryKind::Value));
        let int = db.add_entry(TypeEntry::new("int", EntryKind::Primitive));
        let mut f = MetaFunction::new("moveTo");
        let mut arg = MetaType::new(point, "NS::Point");
        arg.is_constant = true;
        arg.reference = apix_codemodel::ReferenceType::LValue;
        f.arguments.push(MetaArgument::new("p", arg, 0));
        f.arguments.push(MetaArgument::new("steps", MetaType::new(int, "int"), 1));
        f.is_constant = true;
        assert_eq!(f.minimal_signature(), "moveTo(const NS::Point&,int)const");

        f.name = "relocate".to_string();
        assert_eq!(f.signature(), "relocate(const NS::Point&,int)const");
        assert_eq!(f.minimal_signature(), "moveTo(const NS::Point&,int)const");
    }

    #[test]
    fn visible_arguments_skip_removed() {
        let mut db = TypeDatabase::new();
        let int = db.add_entry(TypeEntry::new("int", EntryKind::Primitive));
        let mut f = MetaFunction::new("f");
        f.arguments.push(MetaArgument::new("a", MetaType::new(int, "int"), 0));
        let mut removed = MetaArgument::new("b", MetaType::new(int, "int"), 1);
        removed.removed = true;
        f.arguments.push(removed);
        let names: Vec<&str> = f.visible_arguments().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["a"]);
    }
}
