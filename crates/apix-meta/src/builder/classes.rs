//! Phase 1: namespaces, classes, enums and typedefs.

use std::path::Path;

use apix_codemodel::{ClassModel, EnumKind, EnumModel, NamespaceModel, ScopeModel, ScopeRef, TypeInfo, TypedefModel};
use apix_typesystem::{EntryKind, Include, TypeEntryId};

use super::resolver::Resolved;
use super::{FreeScope, MetaBuilder, PendingMembers};
use crate::model::{
    ClassAttributes, ClassId, ClassKind, DiagnosticKind, MetaClass, MetaEnum, MetaEnumValue,
    PropertyDeclaration, RejectReason,
};

impl<'m> MetaBuilder<'m, '_> {
    pub(super) fn traverse_global_namespace(&mut self) {
        let file = self.file;
        let global = &file.global;
        let scopes = self.global_scopes();
        let saved = self.enter(None, scopes.clone());
        self.free_scopes.push(FreeScope {
            namespace: global,
            scopes,
            class: None,
        });
        self.traverse_scope_items(&global.scope, None);
        self.traverse_nested_namespaces(global, None);
        self.leave(saved);
    }

    /// Reopened namespaces arrive as separate nodes; they share one class.
    fn traverse_nested_namespaces(&mut self, parent: &'m NamespaceModel, enclosing: Option<ClassId>) {
        let mut groups: Vec<(&str, Vec<&'m NamespaceModel>)> = Vec::new();
        for namespace in &parent.namespaces {
            match groups.iter_mut().find(|(name, _)| *name == namespace.name()) {
                Some((_, nodes)) => nodes.push(namespace),
                None => groups.push((namespace.name(), vec![namespace])),
            }
        }
        for (_, nodes) in groups {
            self.traverse_namespace(&nodes, enclosing);
        }
    }

    fn traverse_namespace(&mut self, nodes: &[&'m NamespaceModel], enclosing: Option<ClassId>) {
        let Some(first) = nodes.first() else {
            return;
        };
        let name = first.scope.qualified_name().join("::");
        let class = self.namespace_class(&name, first.is_inline, enclosing);
        for &node in nodes {
            let mut scopes = self.scopes.clone();
            scopes.push(ScopeRef::Namespace(node));
            let saved = self.enter(class, scopes.clone());
            if let Some(id) = class {
                self.pending_members.push(PendingMembers {
                    class: id,
                    body: &node.scope,
                    scopes: scopes.clone(),
                });
            }
            self.free_scopes.push(FreeScope {
                namespace: node,
                scopes,
                class,
            });
            self.traverse_scope_items(&node.scope, class);
            self.traverse_nested_namespaces(node, class);
            self.leave(saved);
        }
    }

    /// The class standing for namespace `name`; `None` when the namespace
    /// is unregistered, rejected or not generated. Its members are still
    /// traversed on their own.
    fn namespace_class(&mut self, name: &str, is_inline: bool, enclosing: Option<ClassId>) -> Option<ClassId> {
        if let Some(id) = self.model.class_id(name) {
            return Some(id);
        }
        if self.db.is_class_rejected(name) {
            self.reject_class(name, RejectReason::GenerationDisabled);
            return None;
        }
        let Some(entry) = self.db.find_namespace_type(name) else {
            if !is_inline {
                self.diagnose(
                    DiagnosticKind::MissingNamespaceEntry,
                    name,
                    "namespace has no type entry; its members are traversed on their own".to_string(),
                );
            }
            return None;
        };
        if !self.db.entry(entry).generates_code() {
            self.reject_class(name, RejectReason::GenerationDisabled);
            return None;
        }
        if !self.db.is_api_compatible(entry) {
            self.reject_class(name, RejectReason::ApiIncompatible);
            return None;
        }
        let mut class = MetaClass::new(name, entry, ClassKind::Namespace);
        class.include.clone_from(&self.db.entry(entry).include);
        class.enclosing_class = enclosing;
        let id = self.model.add_class(class, false);
        if let Some(parent) = enclosing {
            self.model.class_mut(parent).inner_classes.push(id);
        }
        tracing::debug!(namespace = name, "added namespace");
        Some(id)
    }

    fn traverse_scope_items(&mut self, body: &'m ScopeModel, enclosing: Option<ClassId>) {
        for class in body.unique_classes() {
            self.traverse_class(class, enclosing);
        }
        for item in body.unique_enums() {
            self.traverse_enum(item, enclosing);
        }
        for alias in &body.typedefs {
            self.traverse_typedef(alias, enclosing);
        }
    }

    // -----------------------------------------------------------------------
    // Classes
    // -----------------------------------------------------------------------

    /// The entry a class named `name` binds to, or why it is rejected.
    pub(super) fn class_reject_reason(&self, name: &str) -> Result<TypeEntryId, RejectReason> {
        if self.db.is_class_rejected(name) {
            return Err(RejectReason::GenerationDisabled);
        }
        let entry = match self.db.find_complex_type(name) {
            Some(entry) if self.db.entry(entry).kind != EntryKind::Namespace => entry,
            _ if self.db.find_type(name).is_some() => return Err(RejectReason::RedefinedToNotClass),
            _ => return Err(RejectReason::NotInTypeSystem),
        };
        if !self.db.entry(entry).generates_code() {
            return Err(RejectReason::GenerationDisabled);
        }
        if !self.db.is_api_compatible(entry) {
            return Err(RejectReason::ApiIncompatible);
        }
        Ok(entry)
    }

    fn traverse_class(&mut self, model: &'m ClassModel, enclosing: Option<ClassId>) {
        let name = model.scope.qualified_name().join("::");
        if self.model.class_id(&name).is_some() {
            return;
        }
        let entry = match self.class_reject_reason(&name) {
            Ok(entry) => entry,
            Err(reason) => {
                self.reject_class(&name, reason);
                return;
            }
        };

        let kind = if model.template_parameters.is_empty() {
            ClassKind::Ordinary
        } else {
            ClassKind::Template
        };
        let mut class = MetaClass::new(&name, entry, kind);
        if model.is_final {
            class.attributes |= ClassAttributes::FINAL | ClassAttributes::FINAL_IN_CPP;
        }
        if self.db.entry(entry).hash_function.is_some() {
            class.attributes |= ClassAttributes::HAS_HASH_FUNCTION;
        }
        class.include = self.class_include(entry, &model.scope.file_name);
        class.extra_includes.clone_from(&self.db.entry(entry).extra_includes);
        class.enclosing_class = enclosing;
        class.base_class_names = model
            .base_classes
            .iter()
            .map(|base| self.qualify_base_name(&base.name))
            .collect();
        for (ordinal, parameter) in model.template_parameters.iter().enumerate() {
            let placeholder = self.db.add_template_argument(parameter, ordinal);
            class.template_arguments.push(placeholder);
        }

        let is_container = self.db.entry(entry).kind == EntryKind::Container;
        let id = self.model.add_class(class, is_container);
        if let Some(parent) = enclosing {
            self.model.class_mut(parent).inner_classes.push(id);
        }
        tracing::debug!(class = %name, "added class");

        let mut scopes = self.scopes.clone();
        scopes.push(ScopeRef::Class(model));
        let saved = self.enter(Some(id), scopes.clone());
        self.add_property_specs(id, model);
        self.pending_members.push(PendingMembers {
            class: id,
            body: &model.scope,
            scopes,
        });
        self.traverse_scope_items(&model.scope, Some(id));
        self.leave(saved);

        self.extract_interface(id);
    }

    /// Qualify a base class name as written in the current scopes.
    /// Template instantiations are kept verbatim and resolved later.
    fn qualify_base_name(&self, written: &str) -> String {
        let written = written.trim();
        if written.contains('<') {
            return written.to_string();
        }
        if self.db.find_type(written).is_some() || self.model.class_id(written).is_some() {
            return written.to_string();
        }
        if let Some(qualified) = self
            .scope_prefixes()
            .into_iter()
            .map(|prefix| format!("{prefix}::{written}"))
            .find(|name| self.db.find_type(name).is_some())
        {
            return qualified;
        }
        if let Ok(info) = TypeInfo::parse(written) {
            for scope in self.scopes.iter().rev() {
                let unwrapped = info.resolve_typedefs(*scope);
                if unwrapped != info {
                    return unwrapped.instantiation_name();
                }
            }
        }
        written.to_string()
    }

    fn add_property_specs(&mut self, id: ClassId, model: &ClassModel) {
        let class_name = self.model.class(id).name.clone();
        for (index, text) in model.property_declarations.iter().enumerate() {
            let Some(declaration) = PropertyDeclaration::parse(text) else {
                self.diagnose(
                    DiagnosticKind::UnknownPropertyType,
                    &class_name,
                    format!("unparsable property declaration '{text}'"),
                );
                continue;
            };
            match self.translate_spelling(&declaration.type_name) {
                Some(Resolved::Type(ty)) => {
                    let spec = declaration.into_spec(ty.entry, index);
                    self.model.class_mut(id).property_specs.push(spec);
                }
                _ => {
                    let subject = format!("{class_name}::{}", declaration.name);
                    self.diagnose(
                        DiagnosticKind::UnknownPropertyType,
                        &subject,
                        format!("type '{}' is not in the type system", declaration.type_name),
                    );
                }
            }
        }
    }

    /// Synthesize the interface class designated for `id`'s entry.
    pub(super) fn extract_interface(&mut self, id: ClassId) {
        let entry = self.model.class(id).entry;
        let Some(interface_entry) = self.db.entry(entry).designated_interface else {
            return;
        };
        let interface_name = self.db.entry(interface_entry).name.clone();
        if self.model.class_id(&interface_name).is_some() {
            return;
        }
        let mut interface = MetaClass::new(&interface_name, interface_entry, ClassKind::Interface);
        interface.primary_interface_implementor = Some(id);
        interface.include.clone_from(&self.model.class(id).include);
        let interface_id = self.model.add_class(interface, false);
        let class = self.model.class_mut(id);
        class.extracted_interface = Some(interface_id);
        class.interfaces.push(interface_id);
    }

    /// Include for a class: the entry's own, else the declaring header
    /// relative to the first matching include path, else its file name.
    fn class_include(&self, entry: TypeEntryId, file_name: &str) -> Option<Include> {
        if let Some(include) = &self.db.entry(entry).include {
            return Some(include.clone());
        }
        if file_name.is_empty() {
            return None;
        }
        let path = Path::new(file_name);
        for root in &self.config.include_paths {
            if let Ok(relative) = path.strip_prefix(root) {
                return Some(Include::global(&relative.to_string_lossy()));
            }
        }
        path.file_name()
            .map(|name| Include::global(&name.to_string_lossy()))
    }

    // -----------------------------------------------------------------------
    // Enums
    // -----------------------------------------------------------------------

    fn traverse_enum(&mut self, model: &EnumModel, enclosing: Option<ClassId>) {
        let scope = model.scope.join("::");
        let name = if model.name.is_empty() {
            scope.clone()
        } else {
            model.qualified_name().join("::")
        };
        self.register_provisional_values(model, &name, &scope);
        // Anonymous enums only contribute constants.
        if model.kind == EnumKind::Anonymous || model.name.is_empty() {
            return;
        }

        if self.db.is_enum_rejected(&scope, &model.name) {
            self.reject_enum(&name, RejectReason::GenerationDisabled);
            return;
        }
        let Some(entry) = self.db.find_enum_type(&name) else {
            self.reject_enum(&name, RejectReason::NotInTypeSystem);
            return;
        };
        if !self.db.entry(entry).generates_code() {
            self.reject_enum(&name, RejectReason::GenerationDisabled);
            return;
        }
        if !self.db.is_api_compatible(entry) {
            self.reject_enum(&name, RejectReason::ApiIncompatible);
            return;
        }

        let mut meta_enum = MetaEnum::new(&name, entry);
        meta_enum.visibility = model.access.into();
        meta_enum.is_scoped = model.kind == EnumKind::EnumClass;
        meta_enum.enclosing_class = enclosing;
        meta_enum.values = model
            .enumerators
            .iter()
            .map(|e| MetaEnumValue {
                name: e.name.clone(),
                string_value: e.value.clone(),
                value: 0,
            })
            .collect();
        match enclosing {
            Some(id) => self.model.class_mut(id).enums.push(meta_enum),
            None => self.model.global_enums.push(meta_enum),
        }
    }

    /// Early values so array bounds can name enumerators; every enum is
    /// evaluated again, base classes first, once all are known.
    fn register_provisional_values(&mut self, model: &EnumModel, name: &str, scope: &str) {
        let value_scope = match model.kind {
            EnumKind::EnumClass => Some(name),
            _ if scope.is_empty() => None,
            _ => Some(scope),
        };
        let prefixes = self.scope_prefixes();
        let mut counter = 0i64;
        for enumerator in &model.enumerators {
            let value = self
                .enum_values
                .evaluate(&enumerator.value, counter, &prefixes)
                .value;
            counter = value.wrapping_add(1);
            self.enum_values
                .register(name, value_scope, &enumerator.name, value);
        }
    }

    // -----------------------------------------------------------------------
    // Typedefs
    // -----------------------------------------------------------------------

    fn traverse_typedef(&mut self, alias: &TypedefModel, enclosing: Option<ClassId>) {
        let name = alias.qualified_name().join("::");
        if let Some(primitive) = self.db.find_primitive_type(&name) {
            let target = alias.type_info.qualified_name_string();
            if let Some(referenced) = self.db.find_primitive_type(&target)
                && referenced != primitive
            {
                self.db.set_referenced_type(primitive, referenced);
            }
            return;
        }
        if self.db.find_complex_type(&name).is_none() || self.model.class_id(&name).is_some() {
            return;
        }
        let entry = match self.class_reject_reason(&name) {
            Ok(entry) => entry,
            Err(reason) => {
                self.reject_class(&name, reason);
                return;
            }
        };

        let mut class = MetaClass::new(&name, entry, ClassKind::Ordinary);
        class.is_type_alias = true;
        class.base_class_names = vec![self.qualify_base_name(&alias.type_info.instantiation_name())];
        class.include = self.class_include(entry, &alias.file_name);
        class.extra_includes.clone_from(&self.db.entry(entry).extra_includes);
        class.enclosing_class = enclosing;
        let is_container = self.db.entry(entry).kind == EntryKind::Container;
        let id = self.model.add_class(class, is_container);
        if let Some(parent) = enclosing {
            self.model.class_mut(parent).inner_classes.push(id);
        }
        tracing::debug!(class = %name, "added typedef class");
        self.extract_interface(id);
    }
}
