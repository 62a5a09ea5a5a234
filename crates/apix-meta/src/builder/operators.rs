//! Phase 4: free operators are rehomed onto the class of an operand, and
//! free hash functions mark the classes they hash.

use apix_codemodel::{AccessPolicy, FunctionModel};

use super::MetaBuilder;
use super::functions::conversion_target;
use super::resolver::Resolved;
use crate::model::{ClassAttributes, ClassId, FunctionAttributes, FunctionType, MetaFunction, MetaType};

impl MetaBuilder<'_, '_> {
    pub(super) fn rewrite_operators(&mut self) {
        let scopes = self.free_scopes.clone();
        for scope in &scopes {
            let saved = self.enter(None, scope.scopes.clone());
            for model in &scope.namespace.scope.functions {
                if model.access != AccessPolicy::Public
                    || !model.name.starts_with("operator")
                    || conversion_target(&model.name).is_some()
                {
                    continue;
                }
                self.rewrite_operator(model);
            }
            self.leave(saved);
        }
    }

    fn rewrite_operator(&mut self, model: &FunctionModel) {
        let Some(mut function) = self.traverse_function(model) else {
            return;
        };
        if function.is_invalid() {
            return;
        }
        let host = match function.arguments.len() {
            1 => self.rewrite_unary(&mut function),
            2 if self.is_stream_operator(&function) => self.rewrite_stream_operator(&mut function),
            2 => self.rewrite_binary(&mut function),
            _ => None,
        };
        let Some(host) = host else {
            tracing::debug!(operator = %function.minimal_signature(), "no eligible class for free operator");
            return;
        };

        function.function_type = FunctionType::GlobalScopeOperator;
        function.attributes |= FunctionAttributes::FINAL;
        function.reindex_arguments();
        function.declaring_class = Some(host);
        function.implementing_class = Some(host);
        let entry = self.model.class(host).entry;
        if !self.apply_modifications(entry, &mut function) {
            return;
        }
        let class = self.model.class_mut(host);
        if class.has_signature(&function.minimal_signature()) {
            return;
        }
        tracing::debug!(class = %class.name, operator = %function.name, "rehomed free operator");
        class.add_function(function);
    }

    /// The class that can host an operator taking `ty`: an ordinary class
    /// whose entry generates code.
    fn operator_host(&self, ty: &MetaType) -> Option<ClassId> {
        let entry = self.db.entry(ty.entry);
        if !entry.generates_code() {
            return None;
        }
        let id = self.model.class_id(&entry.name)?;
        let class = self.model.class(id);
        (class.entry == ty.entry && !class.is_namespace() && !class.is_interface()).then_some(id)
    }

    fn rewrite_unary(&self, function: &mut MetaFunction) -> Option<ClassId> {
        let host = self.operator_host(&function.arguments[0].ty)?;
        let operand = function.arguments.remove(0);
        function.is_constant = operand.ty.is_constant;
        Some(host)
    }

    /// Argument 0 hosts unless it is not eligible, or the result is the
    /// class of argument 1 and not that of argument 0.
    fn rewrite_binary(&self, function: &mut MetaFunction) -> Option<ClassId> {
        let first = self.operator_host(&function.arguments[0].ty);
        let second = self.operator_host(&function.arguments[1].ty);
        let result = function
            .return_type
            .as_ref()
            .and_then(|ty| self.operator_host(ty));
        let reverse = match first {
            None => true,
            Some(first) => result.is_some() && result != Some(first) && result == second,
        };
        let (host, self_index) = if reverse { (second?, 1) } else { (first?, 0) };

        let operand = function.arguments.remove(self_index);
        if operand.ty.indirections > 0 {
            function.attributes |= FunctionAttributes::POINTER_OPERATOR;
        }
        function.is_constant = operand.ty.is_constant;
        if reverse {
            function.attributes |= FunctionAttributes::REVERSE_OPERATOR;
        }
        Some(host)
    }

    fn is_stream_operator(&self, function: &MetaFunction) -> bool {
        matches!(function.name.as_str(), "operator<<" | "operator>>")
            && self.db.entry(function.arguments[0].ty.entry).is_stream
    }

    /// The streamed class hosts the operator; when it is not generated the
    /// stream class does, as a reverse operator. The other side's header
    /// becomes an extra include.
    fn rewrite_stream_operator(&mut self, function: &mut MetaFunction) -> Option<ClassId> {
        let stream_entry = function.arguments[0].ty.entry;
        let streamed_entry = function.arguments[1].ty.entry;
        let (host, other) = if let Some(host) = self.operator_host(&function.arguments[1].ty) {
            function.arguments.remove(1);
            (host, stream_entry)
        } else {
            let host = self.operator_host(&function.arguments[0].ty)?;
            function.arguments.remove(0);
            function.arguments.reverse();
            function.attributes |= FunctionAttributes::REVERSE_OPERATOR;
            (host, streamed_entry)
        };

        if let Some(include) = self.db.entry(other).include.clone() {
            let class = self.model.class_mut(host);
            if class.include.as_ref() != Some(&include) && !class.extra_includes.contains(&include) {
                class.extra_includes.push(include);
            }
        }
        Some(host)
    }

    /// Free functions named like the configured hash function mark the
    /// class of their first argument as hashable.
    pub(super) fn register_hash_functions(&mut self) {
        let name = self.config.hash_function.clone();
        let scopes = self.free_scopes.clone();
        for scope in &scopes {
            let saved = self.enter(None, scope.scopes.clone());
            for model in scope.namespace.scope.functions_named(&name) {
                let Some(first) = model.arguments.first() else {
                    continue;
                };
                let Some(Resolved::Type(ty)) = self.translate_type(&first.type_info) else {
                    continue;
                };
                if let Some(id) = self.model.class_id(&ty.name) {
                    self.model.class_mut(id).attributes |= ClassAttributes::HAS_HASH_FUNCTION;
                }
            }
            self.leave(saved);
        }
    }
}
