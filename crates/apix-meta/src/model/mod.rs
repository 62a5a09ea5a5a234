//! The resolved metamodel.
//!
//! Classes live in one arena indexed by [`ClassId`]; functions, fields and
//! enums are owned by value by their class. Relationships between classes
//! (base, interfaces, enclosing/inner) are ids into the same arena.

mod class;
mod diagnostics;
mod enums;
mod field;
mod function;
mod reject;
mod types;

pub use class::{ClassAttributes, ClassId, ClassKind, MetaClass, PropertyDeclaration, PropertySpec};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use enums::{MetaEnum, MetaEnumValue};
pub use field::MetaField;
pub use function::{FunctionAttributes, FunctionType, MetaArgument, MetaFunction, Visibility};
pub use reject::{RejectMaps, RejectReason};
pub use types::{MetaType, UsagePattern};

use std::collections::{BTreeSet, HashMap};

/// Output of [`crate::MetaBuilder::build`].
#[derive(Debug, Clone, Default)]
pub struct MetaModel {
    pub(crate) arena: Vec<MetaClass>,
    pub(crate) by_name: HashMap<String, ClassId>,
    /// Ordinary classes (including namespaces and interfaces) in traversal order.
    pub(crate) ordinary: Vec<ClassId>,
    /// Classes backed by container entries.
    pub(crate) templates: Vec<ClassId>,
    /// Non-interface ordinary classes in dependency order; empty on a cycle.
    pub(crate) sorted: Vec<ClassId>,
    pub(crate) global_functions: Vec<MetaFunction>,
    pub(crate) global_enums: Vec<MetaEnum>,
    pub(crate) rejects: RejectMaps,
    pub(crate) used_types: BTreeSet<String>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

impl MetaModel {
    /// # Panics
    /// Panics when `id` does not come from this model.
    #[must_use]
    pub fn class(&self, id: ClassId) -> &MetaClass {
        &self.arena[id.index()]
    }

    pub(crate) fn class_mut(&mut self, id: ClassId) -> &mut MetaClass {
        &mut self.arena[id.index()]
    }

    #[must_use]
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn find_class(&self, name: &str) -> Option<&MetaClass> {
        self.class_id(name).map(|id| self.class(id))
    }

    /// Ordinary classes in traversal order.
    pub fn classes(&self) -> impl Iterator<Item = &MetaClass> {
        self.ordinary.iter().map(|id| self.class(*id))
    }

    #[must_use]
    pub fn class_ids(&self) -> &[ClassId] {
        &self.ordinary
    }

    /// Non-interface classes in dependency order.
    pub fn sorted_classes(&self) -> impl Iterator<Item = &MetaClass> {
        self.sorted.iter().map(|id| self.class(*id))
    }

    #[must_use]
    pub fn sorted_ids(&self) -> &[ClassId] {
        &self.sorted
    }

    pub fn templates(&self) -> impl Iterator<Item = &MetaClass> {
        self.templates.iter().map(|id| self.class(*id))
    }

    #[must_use]
    pub fn global_functions(&self) -> &[MetaFunction] {
        &self.global_functions
    }

    #[must_use]
    pub fn global_enums(&self) -> &[MetaEnum] {
        &self.global_enums
    }

    /// Every enum of the model, global ones first.
    pub fn all_enums(&self) -> impl Iterator<Item = &MetaEnum> {
        self.global_enums
            .iter()
            .chain(self.arena.iter().flat_map(|c| c.enums.iter()))
    }

    /// An enum by qualified name, wherever it lives.
    #[must_use]
    pub fn find_enum(&self, name: &str) -> Option<&MetaEnum> {
        self.all_enums().find(|e| e.name == name)
    }

    #[must_use]
    pub const fn rejects(&self) -> &RejectMaps {
        &self.rejects
    }

    /// Registry names every resolved type went through.
    #[must_use]
    pub const fn used_types(&self) -> &BTreeSet<String> {
        &self.used_types
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn diagnostics_of(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    /// Walk the primary base chain of `id`, nearest base first.
    pub fn base_chain(&self, id: ClassId) -> impl Iterator<Item = ClassId> + '_ {
        let mut seen = Vec::new();
        std::iter::successors(self.class(id).base_class, move |current| {
            seen.push(*current);
            self.class(*current)
                .base_class
                .filter(|next| !seen.contains(next))
        })
    }

    /// Whether `base` is `id` itself or one of its primary bases.
    #[must_use]
    pub fn inherits_from(&self, id: ClassId, base: ClassId) -> bool {
        id == base || self.base_chain(id).any(|b| b == base)
    }

    pub(crate) fn add_class(&mut self, class: MetaClass, template: bool) -> ClassId {
        let id = ClassId(u32::try_from(self.arena.len()).unwrap_or(u32::MAX));
        self.by_name.insert(class.name.clone(), id);
        self.arena.push(class);
        if template {
            self.templates.push(id);
        } else {
            self.ordinary.push(id);
        }
        id
    }
}
