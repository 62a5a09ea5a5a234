//! Phases 2 and 3: member functions, fields, added functions and global
//! functions.

use std::sync::LazyLock;

use apix_codemodel::{AccessPolicy, FunctionKind, FunctionModel, ReferenceType, ScopeModel, TypeInfo};
use apix_typesystem::{
    AddedFunction, EntryKind, Finality, FunctionModification, TypeEntryId, normalize_signature,
    strip_template_args,
};
use regex::Regex;

use super::defaults::fix_default_value;
use super::resolver::Resolved;
use super::{FreeScope, MetaBuilder};
use crate::error::BuildError;
use crate::model::{
    ClassAttributes, ClassId, FunctionAttributes, FunctionType, MetaArgument, MetaField,
    MetaFunction, MetaType, RejectReason, Visibility,
};

static CONVERSION_OPERATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^operator\s+(?:const\s+)?([A-Za-z_][\w:<>,\s*]*?)\s*&*$")
        .expect("valid conversion operator regex")
});

/// Target type text of a conversion operator (`operator const QString&`
/// yields `QString`); `None` for every other function name.
pub(super) fn conversion_target(name: &str) -> Option<&str> {
    let target = CONVERSION_OPERATOR.captures(name)?.get(1)?.as_str().trim();
    (!matches!(target, "new" | "delete")).then_some(target)
}

fn qualified_key(class_name: &str, signature: &str) -> String {
    if class_name.is_empty() {
        signature.to_string()
    } else {
        format!("{class_name}::{signature}")
    }
}

/// Apply function and argument rules in order. `false` means the function
/// is removed everywhere and must be discarded.
fn apply_function_modifications(function: &mut MetaFunction, modifications: &[FunctionModification]) -> bool {
    for modification in modifications {
        if modification.is_removed_from_all() {
            return false;
        }
        if modification.is_removed_from_target_lang() {
            function.attributes |= FunctionAttributes::REMOVED_FROM_TARGET_LANG;
        }
        if let Some(name) = &modification.renamed_to {
            function.name.clone_from(name);
        }
        if let Some(access) = modification.access {
            function.visibility = access.into();
        }
        match modification.finality {
            Some(Finality::Final) => function.attributes |= FunctionAttributes::FINAL,
            Some(Finality::NonFinal) => function.attributes.remove(FunctionAttributes::FINAL),
            None => {}
        }
        for rule in &modification.argument_mods {
            // 1-based; index 0 addresses the return value.
            let Some(argument) = rule
                .index
                .checked_sub(1)
                .and_then(|index| function.arguments.get_mut(index))
            else {
                continue;
            };
            if let Some(name) = &rule.renamed_to {
                argument.name.clone_from(name);
            }
            if let Some(expression) = &rule.replaced_default_expression {
                argument.default_value = Some(expression.clone());
            }
            if rule.removed_default_expression {
                argument.default_value = None;
            }
            if rule.removed {
                argument.removed = true;
            }
        }
    }
    true
}

impl<'m> MetaBuilder<'m, '_> {
    pub(super) fn traverse_members(&mut self) -> Result<(), BuildError> {
        let pending = std::mem::take(&mut self.pending_members);
        for members in &pending {
            let saved = self.enter(Some(members.class), members.scopes.clone());
            // Fields first: default arguments may name them.
            self.traverse_fields(members.class, members.body);
            self.traverse_functions(members.class, members.body);
            self.leave(saved);
        }

        let classes: Vec<ClassId> = self
            .model
            .ordinary
            .iter()
            .chain(self.model.templates.iter())
            .copied()
            .collect();
        for &id in &classes {
            self.add_entry_added_functions(id)?;
        }
        for &id in &classes {
            self.mark_property_functions(id);
            self.fill_interface(id);
        }
        Ok(())
    }

    fn traverse_functions(&mut self, class_id: ClassId, body: &ScopeModel) {
        let is_namespace = self.model.class(class_id).is_namespace();
        let entry = self.model.class(class_id).entry;
        for model in &body.functions {
            // Free operators in namespaces are rehomed onto their operand classes.
            if is_namespace && model.name.starts_with("operator") {
                continue;
            }
            let Some(mut function) = self.traverse_function(model) else {
                continue;
            };
            if is_namespace {
                function.attributes |= FunctionAttributes::STATIC | FunctionAttributes::FINAL;
            }
            self.track_special_members(class_id, &function);
            if function.is_invalid() {
                continue;
            }
            if !self.apply_modifications(entry, &mut function) {
                continue;
            }
            function.declaring_class = Some(class_id);
            function.implementing_class = Some(class_id);
            let class = self.model.class_mut(class_id);
            if class.has_signature(&function.minimal_signature()) {
                continue;
            }
            class.add_function(function);
        }
    }

    /// Translate one declaration in the current class context.
    ///
    /// `None` when the function is rejected by a rule or is a friend. An
    /// unresolvable function is returned marked invalid so the caller can
    /// account for it before dropping it.
    pub(super) fn traverse_function(&mut self, model: &FunctionModel) -> Option<MetaFunction> {
        let class_name = self.current_class_name();
        let raw_signature = normalize_signature(&model.raw_signature());
        if self.db.is_function_rejected(&class_name, &raw_signature) {
            self.reject_function(&qualified_key(&class_name, &raw_signature), RejectReason::GenerationDisabled);
            return None;
        }
        if model.is_friend {
            return None;
        }

        let mut function = MetaFunction::new(&model.name);
        function.visibility = model.access.into();
        function.is_constant = model.is_constant;
        function.is_explicit = model.is_explicit;
        function.function_type = match model.kind {
            FunctionKind::Normal => FunctionType::Normal,
            FunctionKind::Signal => FunctionType::Signal,
            FunctionKind::Slot => FunctionType::Slot,
        };
        if model.is_abstract {
            function.attributes |= FunctionAttributes::ABSTRACT;
        }
        if model.is_virtual {
            function.attributes |= FunctionAttributes::VIRTUAL;
        } else {
            function.attributes |= FunctionAttributes::FINAL;
        }
        if model.is_final {
            function.attributes |= FunctionAttributes::FINAL | FunctionAttributes::FINAL_IN_CPP;
        }
        if model.is_static {
            function.attributes |= FunctionAttributes::STATIC | FunctionAttributes::FINAL;
        }
        if model.is_deleted {
            function.attributes |= FunctionAttributes::INVALID;
        }

        let class_short_name = self
            .current_class
            .map(|id| strip_template_args(self.model.class(id).short_name()).to_string());
        if model.name.starts_with('~') {
            // Only tracked; destructors are never bound.
            function.function_type = FunctionType::Destructor;
            function.attributes |= FunctionAttributes::INVALID;
            return Some(function);
        }
        if class_short_name.as_deref() == Some(strip_template_args(&model.name)) {
            function.function_type = FunctionType::Constructor;
        } else {
            let return_type = match conversion_target(&model.name) {
                Some(target) => match self.translate_spelling(target) {
                    Some(Resolved::Type(ty)) => Some(Resolved::Type(ty)),
                    _ => None,
                },
                None => self.translate_type(&model.return_type),
            };
            let Some(return_type) = return_type else {
                self.reject_function(&qualified_key(&class_name, &raw_signature), RejectReason::UnmatchedReturnType);
                function.attributes |= FunctionAttributes::INVALID;
                return Some(function);
            };
            function.return_type = return_type.into_type();
        }

        let arguments = match model.arguments.as_slice() {
            [only] if only.type_info.is_void() => &[][..],
            all => all,
        };
        for (index, argument) in arguments.iter().enumerate() {
            let Some(Resolved::Type(ty)) = self.translate_type(&argument.type_info) else {
                self.reject_function(&qualified_key(&class_name, &raw_signature), RejectReason::UnmatchedArgumentType);
                function.attributes |= FunctionAttributes::INVALID;
                return Some(function);
            };
            let name = if argument.name.is_empty() {
                format!("arg__{}", index + 1)
            } else {
                argument.name.clone()
            };
            let mut meta = MetaArgument::new(&name, ty, index);
            if let Some(expression) = &argument.default_value {
                let class = self.current_class.map(|id| self.model.class(id));
                meta.default_value = Some(fix_default_value(expression, &meta.ty, class));
                meta.original_default_value = Some(expression.clone());
            }
            function.arguments.push(meta);
        }
        if model.is_variadic
            && let Some(varargs) = self.db.find_type("...")
        {
            let mut ty = MetaType::new(varargs, "...");
            ty.decide_usage_pattern(self.db);
            let index = function.arguments.len();
            function
                .arguments
                .push(MetaArgument::new(&format!("arg__{}", index + 1), ty, index));
        }

        self.classify_special_member(&mut function);
        Some(function)
    }

    /// Copy/move constructors and assignment operators take exactly one
    /// argument of the class type itself with no indirection.
    fn classify_special_member(&self, function: &mut MetaFunction) {
        let Some(class_id) = self.current_class else {
            return;
        };
        let entry = self.model.class(class_id).entry;
        let [argument] = function.arguments.as_slice() else {
            return;
        };
        let ty = &argument.ty;
        if ty.entry != entry || ty.indirections != 0 {
            return;
        }
        let const_lvalue = ty.is_constant && ty.reference == ReferenceType::LValue;
        let rvalue = ty.reference == ReferenceType::RValue;
        if function.function_type == FunctionType::Constructor {
            if const_lvalue {
                function.function_type = FunctionType::CopyConstructor;
            } else if rvalue {
                function.function_type = FunctionType::MoveConstructor;
            }
        } else if function.name == "operator=" {
            if const_lvalue || ty.reference == ReferenceType::None {
                function.function_type = FunctionType::AssignmentOperator;
            } else if rvalue {
                function.function_type = FunctionType::MoveAssignmentOperator;
            }
        }
    }

    /// Record what declared constructors and destructors imply for the class.
    fn track_special_members(&mut self, class_id: ClassId, function: &MetaFunction) {
        if function.is_constructor() {
            self.declared_constructors.insert(class_id);
            if function.function_type == FunctionType::CopyConstructor {
                self.declared_copy_constructors.insert(class_id);
            }
            let class = self.model.class_mut(class_id);
            if function.is_private() {
                if !class.has(ClassAttributes::HAS_NON_PRIVATE_CONSTRUCTOR) {
                    class.attributes |= ClassAttributes::FINAL;
                }
            } else if !function.is_invalid() {
                class.attributes |= ClassAttributes::HAS_NON_PRIVATE_CONSTRUCTOR;
                if !class.has(ClassAttributes::FINAL_IN_CPP) {
                    class.attributes.remove(ClassAttributes::FINAL);
                }
            }
        } else if function.function_type == FunctionType::Destructor {
            let class = self.model.class_mut(class_id);
            if function.attributes.contains(FunctionAttributes::VIRTUAL) {
                class.attributes |= ClassAttributes::HAS_VIRTUAL_DESTRUCTOR | ClassAttributes::FORCE_SHELL_CLASS;
            }
            match function.visibility {
                Visibility::Private => class.attributes |= ClassAttributes::HAS_PRIVATE_DESTRUCTOR,
                Visibility::Protected => class.attributes |= ClassAttributes::HAS_PROTECTED_DESTRUCTOR,
                Visibility::Public => {}
            }
        }
    }

    /// Apply the entry's rules and the global rules matching the minimal
    /// signature. `false` when the function is removed everywhere.
    pub(super) fn apply_modifications(&mut self, entry: TypeEntryId, function: &mut MetaFunction) -> bool {
        let signature = function.minimal_signature();
        let mut modifications: Vec<FunctionModification> = self
            .db
            .function_modifications(entry, &signature)
            .into_iter()
            .cloned()
            .collect();
        if !modifications.is_empty() {
            self.applied_modifications.insert((entry, signature.clone()));
        }
        modifications.extend(
            self.db
                .global_function_modifications(&signature)
                .into_iter()
                .cloned(),
        );
        apply_function_modifications(function, &modifications)
    }

    fn traverse_fields(&mut self, class_id: ClassId, body: &ScopeModel) {
        let class_name = self.model.class(class_id).name.clone();
        for variable in &body.variables {
            if variable.access == AccessPolicy::Private || variable.is_friend {
                continue;
            }
            let key = format!("{class_name}::{}", variable.name);
            if self.db.is_field_rejected(&class_name, &variable.name) {
                self.reject_field(&key, RejectReason::GenerationDisabled);
                continue;
            }
            let Some(Resolved::Type(ty)) = self.translate_type(&variable.type_info) else {
                self.reject_field(&key, RejectReason::UnmatchedArgumentType);
                continue;
            };
            self.model.class_mut(class_id).fields.push(MetaField {
                name: variable.name.clone(),
                ty,
                visibility: variable.access.into(),
                is_static: variable.is_static,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Added functions
    // -----------------------------------------------------------------------

    fn add_entry_added_functions(&mut self, id: ClassId) -> Result<(), BuildError> {
        let entry = self.model.class(id).entry;
        let added = self.db.entry(entry).added_functions.clone();
        for spec in &added {
            let mut function = self.added_function(Some(id), spec)?;
            if !self.apply_modifications(entry, &mut function) {
                continue;
            }
            function.declaring_class = Some(id);
            function.implementing_class = Some(id);
            let class = self.model.class_mut(id);
            if class.has_signature(&function.minimal_signature()) {
                continue;
            }
            class.add_function(function);
        }
        Ok(())
    }

    /// Build a function declared only in the type system.
    ///
    /// # Errors
    /// Every type must be registered; a missing one is a hard error
    /// naming the registered candidates.
    pub(super) fn added_function(
        &mut self,
        class: Option<ClassId>,
        spec: &AddedFunction,
    ) -> Result<MetaFunction, BuildError> {
        let mut function = MetaFunction::new(&spec.name);
        function.visibility = spec.access.into();
        function.is_constant = spec.is_constant;
        function.attributes = FunctionAttributes::USER_ADDED | FunctionAttributes::FINAL;
        if spec.is_static {
            function.attributes |= FunctionAttributes::STATIC;
        }
        if spec.return_type.trim() != "void" {
            function.return_type = Some(self.translate_added_type(&spec.return_type, &spec.name)?);
        }
        for (index, argument) in spec.arguments.iter().enumerate() {
            let ty = self.translate_added_type(&argument.type_name, &spec.name)?;
            let name = argument
                .name
                .clone()
                .unwrap_or_else(|| format!("arg__{}", index + 1));
            let mut meta = MetaArgument::new(&name, ty, index);
            meta.default_value.clone_from(&argument.default_value);
            meta.original_default_value.clone_from(&argument.default_value);
            function.arguments.push(meta);
        }

        let Some(class_id) = class else {
            return Ok(function);
        };
        let class = self.model.class(class_id);
        if strip_template_args(&spec.name) == class.short_name() {
            function.function_type = FunctionType::Constructor;
            function.return_type = None;
            if let [argument] = function.arguments.as_slice()
                && argument.ty.entry == class.entry
                && argument.ty.indirections == 0
                && argument.ty.is_constant
                && argument.ty.reference == ReferenceType::LValue
            {
                function.function_type = FunctionType::CopyConstructor;
            }
        } else if function.is_operator() && function.arguments.len() == 2 {
            if function.arguments[0].ty.entry == class.entry {
                function.arguments.remove(0);
            } else if function.arguments[1].ty.entry == class.entry {
                function.attributes |= FunctionAttributes::REVERSE_OPERATOR;
                function.arguments.pop();
            }
            function.reindex_arguments();
        }
        Ok(function)
    }

    fn translate_added_type(&mut self, spelling: &str, context: &str) -> Result<MetaType, BuildError> {
        let info = TypeInfo::parse(spelling).map_err(|source| BuildError::TypeSpelling {
            spelling: spelling.to_string(),
            context: context.to_string(),
            source,
        })?;
        self.translate_added_info(&info)
    }

    fn translate_added_info(&mut self, info: &TypeInfo) -> Result<MetaType, BuildError> {
        let name = info.qualified_name_string();
        let flags = if info.name() == self.db.flags_template() && info.arguments.len() == 1 {
            let spelled = format!(
                "{}<{}>",
                self.db.flags_template(),
                info.arguments[0].qualified_name_string()
            );
            self.db.find_flags_type(&spelled)
        } else {
            None
        };
        let entry = flags
            .or_else(|| self.find_direct(&name))
            .ok_or_else(|| BuildError::UnknownType {
                candidates: self.db.candidates_with_suffix(&name),
                name: name.clone(),
            })?;

        let entry_name = self.db.entry(entry).name.clone();
        let mut ty = MetaType::new(entry, &entry_name);
        ty.is_constant = info.is_constant;
        ty.is_volatile = info.is_volatile;
        ty.reference = info.reference_type;
        ty.indirections = info.indirections;
        ty.original_description = info.to_string();
        if self.db.entry(entry).kind != EntryKind::Flags {
            for argument in &info.arguments {
                ty.instantiations.push(self.translate_added_info(argument)?);
            }
        }
        self.model.used_types.insert(entry_name);
        ty.decide_usage_pattern(self.db);
        Ok(ty)
    }

    // -----------------------------------------------------------------------
    // Properties and interfaces
    // -----------------------------------------------------------------------

    fn mark_property_functions(&mut self, id: ClassId) {
        let specs = self.model.class(id).property_specs.clone();
        let class = self.model.class_mut(id);
        for spec in &specs {
            for function in &mut class.functions {
                let arity = function.arguments.len();
                if function.name == spec.read && arity == 0 {
                    function.attributes |= FunctionAttributes::PROPERTY_READER;
                }
                if spec.write.as_deref() == Some(function.name.as_str()) && arity == 1 {
                    function.attributes |= FunctionAttributes::PROPERTY_WRITER;
                }
                if spec.reset.as_deref() == Some(function.name.as_str()) && arity == 0 {
                    function.attributes |= FunctionAttributes::PROPERTY_RESETTER;
                }
            }
        }
    }

    /// Mirror the public instance API of a class onto its extracted interface.
    fn fill_interface(&mut self, id: ClassId) {
        let Some(interface) = self.model.class(id).extracted_interface else {
            return;
        };
        let class = self.model.class(id);
        let functions: Vec<MetaFunction> = class
            .functions
            .iter()
            .filter(|f| {
                !f.is_constructor()
                    && !f.is_private()
                    && !f.is_static()
                    && f.function_type != FunctionType::Destructor
            })
            .cloned()
            .map(|mut f| {
                f.declaring_class = Some(interface);
                f.implementing_class = Some(interface);
                f
            })
            .collect();
        let fields: Vec<MetaField> = class
            .fields
            .iter()
            .filter(|f| f.visibility == Visibility::Public)
            .cloned()
            .collect();
        let target = self.model.class_mut(interface);
        for function in functions {
            if !target.has_signature(&function.minimal_signature()) {
                target.add_function(function);
            }
        }
        target.fields.extend(fields);
    }

    // -----------------------------------------------------------------------
    // Global functions
    // -----------------------------------------------------------------------

    /// Free functions of unregistered scopes bound through function entries,
    /// then the globally added functions.
    pub(super) fn traverse_global_functions(&mut self) -> Result<(), BuildError> {
        let scopes: Vec<FreeScope<'m>> = self
            .free_scopes
            .iter()
            .filter(|scope| scope.class.is_none())
            .cloned()
            .collect();
        for scope in &scopes {
            let saved = self.enter(None, scope.scopes.clone());
            let prefix = scope.namespace.scope.qualified_name();
            for model in &scope.namespace.scope.functions {
                if model.access != AccessPolicy::Public || model.name.starts_with("operator") {
                    continue;
                }
                self.traverse_global_function(&prefix, model);
            }
            self.leave(saved);
        }

        let added = self.db.global_added_functions().to_vec();
        for spec in &added {
            let mut function = self.added_function(None, spec)?;
            function.attributes |= FunctionAttributes::STATIC;
            let signature = function.minimal_signature();
            if self
                .model
                .global_functions
                .iter()
                .any(|f| f.minimal_signature() == signature)
            {
                continue;
            }
            self.model.global_functions.push(function);
        }
        Ok(())
    }

    fn traverse_global_function(&mut self, prefix: &[String], model: &FunctionModel) {
        let mut qualified = prefix.to_vec();
        qualified.push(model.name.clone());
        let qualified = qualified.join("::");
        let Some(entry) = self
            .db
            .find_function_type(&qualified)
            .or_else(|| self.db.find_function_type(&model.name))
        else {
            return;
        };
        if !self.db.entry(entry).generates_code() {
            return;
        }
        let Some(mut function) = self.traverse_function(model) else {
            return;
        };
        if function.is_invalid() {
            return;
        }

        let raw_signature = normalize_signature(&model.raw_signature());
        let minimal = function.minimal_signature();
        let signatures = &self.db.entry(entry).signatures;
        if !signatures.is_empty()
            && !signatures.iter().any(|s| {
                let s = normalize_signature(s);
                s == raw_signature || s == minimal
            })
        {
            return;
        }
        if !self.apply_modifications(entry, &mut function) {
            return;
        }
        function.attributes |= FunctionAttributes::STATIC | FunctionAttributes::FINAL;
        if self
            .model
            .global_functions
            .iter()
            .any(|f| f.minimal_signature() == minimal)
        {
            return;
        }
        let entry_name = self.db.entry(entry).name.clone();
        self.bound_global_signatures.insert(entry_name);
        self.bound_global_signatures.insert(raw_signature);
        self.bound_global_signatures.insert(minimal);
        self.model.global_functions.push(function);
    }
}
