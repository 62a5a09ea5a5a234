//! Phases 5 and 6: base classes, interfaces and template instantiation,
//! then implicit constructors, abstractness and lookup names.

use std::collections::HashSet;

use apix_codemodel::{ReferenceType, TypeInfo};
use apix_typesystem::{EntryKind, TypeDatabase};

use super::MetaBuilder;
use super::resolver::Resolved;
use crate::model::{
    ClassAttributes, ClassId, DiagnosticKind, FunctionAttributes, FunctionType, MetaArgument,
    MetaFunction, MetaType,
};

/// Attributes an alias class takes over from the template it instantiates.
const ALIAS_INHERITED: ClassAttributes = ClassAttributes::HAS_NON_PRIVATE_CONSTRUCTOR
    .union(ClassAttributes::HAS_VIRTUAL_DESTRUCTOR)
    .union(ClassAttributes::HAS_PRIVATE_DESTRUCTOR)
    .union(ClassAttributes::HAS_PROTECTED_DESTRUCTOR)
    .union(ClassAttributes::HAS_EQUALS_OPERATOR)
    .union(ClassAttributes::HAS_CLONE_OPERATOR);

fn qualifier_of(name: &str) -> Option<&str> {
    name.rfind("::").map(|pos| &name[..pos])
}

/// Replace template placeholders in `ty` with the instantiation arguments.
/// `None` when a placeholder is out of range or bound to `void`.
fn substitute(mut ty: MetaType, arguments: &[Option<MetaType>], db: &TypeDatabase) -> Option<MetaType> {
    let entry = db.entry(ty.entry);
    if entry.kind == EntryKind::TemplateArgument {
        let mut concrete = arguments.get(entry.ordinal)?.clone()?;
        concrete.indirections += ty.indirections;
        concrete.is_constant |= ty.is_constant;
        if ty.is_reference() {
            concrete.reference = ty.reference;
        }
        concrete.decide_usage_pattern(db);
        return Some(concrete);
    }
    let instantiations = std::mem::take(&mut ty.instantiations);
    for instantiation in instantiations {
        ty.instantiations.push(substitute(instantiation, arguments, db)?);
    }
    if let Some(element) = ty.array_element.take() {
        ty.array_element = Some(Box::new(substitute(*element, arguments, db)?));
    }
    ty.decide_usage_pattern(db);
    Some(ty)
}

fn substitute_function(mut function: MetaFunction, arguments: &[Option<MetaType>], db: &TypeDatabase) -> Option<MetaFunction> {
    if let Some(return_type) = function.return_type.take() {
        function.return_type = Some(substitute(return_type, arguments, db)?);
    }
    function.arguments = std::mem::take(&mut function.arguments)
        .into_iter()
        .map(|mut argument| {
            argument.ty = substitute(argument.ty, arguments, db)?;
            Some(argument)
        })
        .collect::<Option<Vec<_>>>()?;
    Some(function)
}

impl MetaBuilder<'_, '_> {
    pub(super) fn setup_all_inheritance(&mut self) {
        let saved = self.enter(None, self.global_scopes());
        let classes: Vec<ClassId> = self
            .model
            .ordinary
            .iter()
            .chain(self.model.templates.iter())
            .copied()
            .collect();
        for id in classes {
            let class = self.model.class(id);
            if class.is_interface() || class.is_namespace() {
                continue;
            }
            self.setup_inheritance(id);
        }
        self.leave(saved);
    }

    /// Resolve the bases of `id` once, bases before derived classes.
    fn setup_inheritance(&mut self, id: ClassId) -> bool {
        if !self.inheritance_done.insert(id) {
            return true;
        }
        let base_names = self.model.class(id).base_class_names.clone();
        match base_names.as_slice() {
            [] => true,
            [single] if single.contains('<') => self.setup_template_inheritance(id, single),
            _ => self.setup_general_inheritance(id, &base_names),
        }
    }

    fn setup_template_inheritance(&mut self, id: ClassId, written: &str) -> bool {
        let class_name = self.model.class(id).name.clone();
        let Ok(info) = TypeInfo::parse(written) else {
            self.diagnose(
                DiagnosticKind::UnknownTemplateBase,
                &class_name,
                format!("unparsable template base '{written}'"),
            );
            return false;
        };
        let template_name = info.qualified_name_string();
        let mut candidates = Vec::new();
        let mut qualifier = qualifier_of(&class_name);
        while let Some(scope) = qualifier {
            candidates.push(format!("{scope}::{template_name}"));
            qualifier = qualifier_of(scope);
        }
        candidates.push(template_name);

        let entry = self.model.class(id).entry;
        for candidate in &candidates {
            if let Some(template) = self.model.class_id(candidate)
                && template != id
            {
                self.setup_inheritance(template);
                if !self.inherit_template(id, template, &info) {
                    return false;
                }
                let template_entry = self.model.class(template).entry;
                if self.db.entry(template_entry).kind == EntryKind::Container {
                    self.db.set_base_container_type(entry, template_entry);
                }
                return true;
            }
            if let Some(container) = self.db.find_container_type(candidate) {
                self.db.set_base_container_type(entry, container);
                return true;
            }
        }
        self.diagnose(
            DiagnosticKind::UnknownTemplateBase,
            &class_name,
            format!("template base '{written}' is neither a known template class nor a container"),
        );
        false
    }

    /// The first base without a designated interface is the primary base;
    /// bases with one contribute their interface and everything it inherits.
    fn setup_general_inheritance(&mut self, id: ClassId, base_names: &[String]) -> bool {
        let class_name = self.model.class(id).name.clone();
        let mut primary: Option<(ClassId, &str)> = None;
        let mut interfaces: Vec<ClassId> = Vec::new();
        for base_name in base_names {
            if self.db.is_class_rejected(base_name) {
                continue;
            }
            let base = self.model.class_id(base_name).filter(|base| *base != id);
            let base_entry = base
                .map(|b| self.model.class(b).entry)
                .or_else(|| self.db.find_complex_type(base_name));
            let Some(base_entry) = base_entry else {
                self.diagnose(
                    DiagnosticKind::UnknownBaseClass,
                    &class_name,
                    format!("base class '{base_name}' is not in the type system"),
                );
                continue;
            };

            let designated = self.db.entry(base_entry).designated_interface;
            match designated {
                None => {
                    let Some(base) = base else {
                        continue;
                    };
                    if let Some((_, first)) = primary {
                        self.diagnose(
                            DiagnosticKind::AmbiguousPrimaryBase,
                            &class_name,
                            format!("'{base_name}' ignored; '{first}' is already the primary base"),
                        );
                        continue;
                    }
                    self.setup_inheritance(base);
                    primary = Some((base, base_name));
                }
                Some(interface_entry) => {
                    if let Some(base) = base {
                        self.setup_inheritance(base);
                        interfaces.extend(self.model.class(base).interfaces.iter().copied());
                    }
                    let interface_name = &self.db.entry(interface_entry).name;
                    if let Some(interface) = self.model.class_id(interface_name) {
                        interfaces.push(interface);
                        interfaces.extend(self.model.class(interface).interfaces.iter().copied());
                    }
                }
            }
        }

        let class = self.model.class_mut(id);
        if let Some((base, _)) = primary {
            class.base_class = Some(base);
        }
        for interface in interfaces {
            if !class.interfaces.contains(&interface) {
                class.interfaces.push(interface);
            }
        }
        true
    }

    /// Copy the functions of `template` into `sub`, instantiated with the
    /// arguments written in `info`.
    fn inherit_template(&mut self, sub: ClassId, template: ClassId, info: &TypeInfo) -> bool {
        let sub_name = self.model.class(sub).name.clone();
        let template_name = self.model.class(template).name.clone();
        let enclosing_name = self
            .model
            .class(sub)
            .enclosing_class
            .map(|id| self.model.class(id).name.clone());

        let mut arguments: Vec<Option<MetaType>> = Vec::new();
        for argument in &info.arguments {
            let bare = argument.qualified_name_string();
            let mut candidates = vec![format!("{sub_name}::{bare}"), format!("{template_name}::{bare}")];
            if let Some(enclosing) = &enclosing_name {
                candidates.push(format!("{enclosing}::{bare}"));
            }
            candidates.push(bare.clone());
            let resolved = candidates.iter().find_map(|candidate| {
                let mut candidate_info = argument.clone();
                candidate_info.qualified_name = TypeInfo::named(candidate).qualified_name;
                self.translate_type(&candidate_info)
            });
            match resolved {
                Some(Resolved::Type(ty)) => arguments.push(Some(ty)),
                Some(Resolved::Void) => arguments.push(None),
                None => {
                    self.diagnose(
                        DiagnosticKind::IgnoredTemplateArgument,
                        &sub_name,
                        format!("template argument '{argument}' of '{template_name}' is not in the type system"),
                    );
                    arguments.push(None);
                }
            }
        }

        let sub_entry = self.model.class(sub).entry;
        let template_entry = self.model.class(template).entry;
        let is_alias = self.model.class(sub).is_type_alias;
        let sub_short_name = self.model.class(sub).short_name().to_string();
        let existing: HashSet<String> = self
            .model
            .class(sub)
            .functions
            .iter()
            .map(|f| f.name.clone())
            .collect();
        let template_functions = self.model.class(template).functions.clone();

        for function in template_functions {
            if function
                .attributes
                .contains(FunctionAttributes::REMOVED_FROM_TARGET_LANG)
            {
                continue;
            }
            let old_signature = function.minimal_signature();
            let Some(mut function) = substitute_function(function, &arguments, self.db) else {
                continue;
            };
            if function.is_constructor() {
                if !is_alias {
                    continue;
                }
                function.name.clone_from(&sub_short_name);
                function.original_name.clone_from(&sub_short_name);
            } else if existing.contains(&function.name) {
                continue;
            }
            function.declaring_class = Some(sub);
            function.implementing_class = Some(sub);

            let new_signature = function.minimal_signature();
            let rekeyed: Vec<_> = self
                .db
                .function_modifications(template_entry, &old_signature)
                .into_iter()
                .cloned()
                .collect();
            for mut modification in rekeyed {
                modification.signature.clone_from(&new_signature);
                self.db.add_function_modification(sub_entry, modification);
            }
            if !self.apply_modifications(sub_entry, &mut function) {
                continue;
            }
            let class = self.model.class_mut(sub);
            if !class.has_signature(&new_signature) {
                class.add_function(function);
            }
        }

        let template_class = self.model.class(template);
        let interfaces = template_class.interfaces.clone();
        let base = template_class.base_class;
        let inherited = template_class.attributes.intersection(ALIAS_INHERITED);
        let class = self.model.class_mut(sub);
        class.template_base_class = Some(template);
        class.template_base_instantiations = arguments.into_iter().flatten().collect();
        for interface in interfaces {
            if !class.interfaces.contains(&interface) {
                class.interfaces.push(interface);
            }
        }
        if base.is_some() {
            class.base_class = base;
        }
        if class.is_type_alias {
            class.attributes |= inherited;
        }
        true
    }

    // -----------------------------------------------------------------------
    // Finalization
    // -----------------------------------------------------------------------

    pub(super) fn finalize_classes(&mut self) {
        let classes: Vec<ClassId> = self
            .model
            .ordinary
            .iter()
            .chain(self.model.templates.iter())
            .copied()
            .collect();
        for id in classes {
            let class = self.model.class(id);
            if class.is_interface() || class.is_namespace() {
                continue;
            }
            let is_abstract = self.is_abstract_class(id);
            self.add_implicit_constructors(id);
            let entry = self.model.class(id).entry;
            if is_abstract {
                self.model.class_mut(id).attributes |= ClassAttributes::ABSTRACT;
                let lookup = format!(
                    "{}{}",
                    self.db.entry(entry).target_lang_name(),
                    self.config.concrete_wrapper_suffix
                );
                self.db.set_lookup_name(entry, lookup);
            }
        }
    }

    /// Own pure virtual functions, or inherited ones no class along the
    /// base chain overrides by name.
    fn is_abstract_class(&self, id: ClassId) -> bool {
        let class = self.model.class(id);
        if class.functions.iter().any(MetaFunction::is_abstract) {
            return true;
        }
        let mut overridden: HashSet<&str> = class.functions.iter().map(|f| f.name.as_str()).collect();
        for base in self.model.base_chain(id) {
            let base = self.model.class(base);
            if base
                .functions
                .iter()
                .any(|f| f.is_abstract() && !overridden.contains(f.name.as_str()))
            {
                return true;
            }
            overridden.extend(base.functions.iter().map(|f| f.name.as_str()));
        }
        false
    }

    /// A public default constructor when none is declared, and a copy
    /// constructor for value types that do not declare one.
    fn add_implicit_constructors(&mut self, id: ClassId) {
        let class = self.model.class(id);
        let entry = class.entry;
        let name = class.name.clone();
        let short_name = class.short_name().to_string();
        let needs_default = !self.declared_constructors.contains(&id)
            && class.constructors().next().is_none()
            && !class.has(ClassAttributes::FINAL_IN_CPP);
        let needs_copy = self.db.entry(entry).kind == EntryKind::Value
            && !self.declared_copy_constructors.contains(&id)
            && !class
                .functions
                .iter()
                .any(|f| f.function_type == FunctionType::CopyConstructor);

        if needs_default {
            let mut constructor = MetaFunction::new(&short_name);
            constructor.function_type = FunctionType::Constructor;
            constructor.attributes = FunctionAttributes::FINAL;
            constructor.declaring_class = Some(id);
            constructor.implementing_class = Some(id);
            self.model.class_mut(id).add_function(constructor);
        }
        if needs_copy {
            let mut ty = MetaType::new(entry, &name);
            ty.is_constant = true;
            ty.reference = ReferenceType::LValue;
            ty.decide_usage_pattern(self.db);
            let mut copy = MetaFunction::new(&short_name);
            copy.function_type = FunctionType::CopyConstructor;
            copy.attributes = FunctionAttributes::FINAL;
            copy.arguments.push(MetaArgument::new("other", ty, 0));
            copy.declaring_class = Some(id);
            copy.implementing_class = Some(id);
            let class = self.model.class_mut(id);
            if !class.has_signature(&copy.minimal_signature()) {
                class.add_function(copy);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apix_typesystem::TypeEntry;
    use pretty_assertions::assert_eq;

    #[test]
    fn substitution_keeps_use_site_qualifiers() {
        let mut db = TypeDatabase::new();
        let point = db.add_entry(TypeEntry::new("NS::Point", EntryKind::Value));
        let list = db.add_entry(TypeEntry::new("QList", EntryKind::Container));
        let placeholder = db.add_template_argument("T", 0);

        let mut written = MetaType::new(list, "QList");
        let mut element = MetaType::new(placeholder, "T");
        element.is_constant = true;
        element.reference = ReferenceType::LValue;
        written.instantiations.push(element);

        let concrete = MetaType::new(point, "NS::Point");
        let substituted = substitute(written, &[Some(concrete)], &db).unwrap();
        assert_eq!(substituted.cpp_signature(), "QList<const NS::Point&>");
    }

    #[test]
    fn void_or_missing_arguments_drop_the_type() {
        let mut db = TypeDatabase::new();
        let placeholder = db.add_template_argument("T", 1);
        let written = MetaType::new(placeholder, "T");
        assert!(substitute(written.clone(), &[None, None], &db).is_none());
        assert!(substitute(written, &[None], &db).is_none());
    }
}
