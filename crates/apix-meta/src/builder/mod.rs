//! The metamodel builder.
//!
//! [`MetaBuilder::build`] walks the code model once per phase, strictly in
//! this order:
//!
//! 1. classes, namespaces, enums and typedefs
//! 2. member functions and fields, then added functions
//! 3. global functions
//! 4. free operators and hash functions
//! 5. inheritance and template instantiation
//! 6. implicit constructors, abstractness and lookup names
//! 7. enum values (base classes first), then enum default arguments
//! 8. topological sort
//! 9. consistency checks
//!
//! The registry is borrowed mutably for the whole build: the builder only
//! writes the derived bookkeeping fields of its entries.

mod checks;
mod classes;
mod defaults;
mod enum_values;
mod functions;
mod inheritance;
mod operators;
mod resolver;
mod sorter;

pub use enum_values::{EnumEvaluation, EnumValueTable};

use std::collections::HashSet;

use apix_codemodel::{FileModel, NamespaceModel, ScopeModel, ScopeRef};
use apix_config::BuilderConfig;
use apix_typesystem::{TypeDatabase, TypeEntryId};

use crate::error::BuildError;
use crate::model::{ClassId, Diagnostic, DiagnosticKind, MetaModel, RejectReason};

/// A class or namespace body whose members are traversed in phase 2,
/// with the lexical scopes it was found in.
#[derive(Clone)]
struct PendingMembers<'m> {
    class: ClassId,
    body: &'m ScopeModel,
    scopes: Vec<ScopeRef<'m>>,
}

/// A namespace node searched for free functions and operators.
#[derive(Clone)]
struct FreeScope<'m> {
    namespace: &'m NamespaceModel,
    scopes: Vec<ScopeRef<'m>>,
    /// The namespace class, when the namespace has an entry.
    class: Option<ClassId>,
}

/// Builds a [`MetaModel`] from a parsed code model and a type registry.
pub struct MetaBuilder<'m, 'db> {
    file: &'m FileModel,
    db: &'db mut TypeDatabase,
    config: BuilderConfig,
    model: MetaModel,

    /// Class whose members are being resolved.
    current_class: Option<ClassId>,
    /// Lexical scope stack, global scope first.
    scopes: Vec<ScopeRef<'m>>,

    pending_members: Vec<PendingMembers<'m>>,
    free_scopes: Vec<FreeScope<'m>>,
    inheritance_done: HashSet<ClassId>,
    declared_constructors: HashSet<ClassId>,
    declared_copy_constructors: HashSet<ClassId>,
    applied_modifications: HashSet<(TypeEntryId, String)>,
    bound_global_signatures: HashSet<String>,
    enum_values: EnumValueTable,
}

impl<'m, 'db> MetaBuilder<'m, 'db> {
    #[must_use]
    pub fn new(file: &'m FileModel, db: &'db mut TypeDatabase, config: BuilderConfig) -> Self {
        Self {
            file,
            db,
            config,
            model: MetaModel::default(),
            current_class: None,
            scopes: Vec::new(),
            pending_members: Vec::new(),
            free_scopes: Vec::new(),
            inheritance_done: HashSet::new(),
            declared_constructors: HashSet::new(),
            declared_copy_constructors: HashSet::new(),
            applied_modifications: HashSet::new(),
            bound_global_signatures: HashSet::new(),
            enum_values: EnumValueTable::default(),
        }
    }

    /// Run every phase and return the finished model.
    ///
    /// # Errors
    /// Returns [`BuildError::UnknownType`] when an added function names a
    /// type the registry does not know, [`BuildError::TypeSpelling`] when
    /// such a type does not parse, and [`BuildError::Config`] for an
    /// invalid configured API version.
    pub fn build(mut self) -> Result<MetaModel, BuildError> {
        if let Some(version) = self.config.parsed_api_version()? {
            self.db.set_api_version(Some(version));
        }

        self.traverse_global_namespace();
        tracing::debug!(
            classes = self.model.ordinary.len(),
            templates = self.model.templates.len(),
            "traversed scopes"
        );
        self.traverse_members()?;
        self.traverse_global_functions()?;
        self.rewrite_operators();
        self.register_hash_functions();
        self.setup_all_inheritance();
        self.finalize_classes();
        self.evaluate_enums();
        self.requalify_enum_defaults();
        self.sort_classes();
        self.check_consistency();

        tracing::debug!(
            classes = self.model.sorted.len(),
            rejected = self.model.rejects.len(),
            diagnostics = self.model.diagnostics.len(),
            "metamodel built"
        );
        Ok(self.model)
    }

    // -----------------------------------------------------------------------
    // Bookkeeping shared by the phases
    // -----------------------------------------------------------------------

    fn diagnose(&mut self, kind: DiagnosticKind, subject: &str, message: String) {
        tracing::warn!(kind = %kind, subject, "{message}");
        self.model.diagnostics.push(Diagnostic {
            kind,
            subject: subject.to_string(),
            message,
        });
    }

    fn reject_class(&mut self, name: &str, reason: RejectReason) {
        tracing::debug!(class = name, reason = %reason, "rejected class");
        self.model.rejects.classes.insert(name.to_string(), reason);
    }

    fn reject_enum(&mut self, name: &str, reason: RejectReason) {
        tracing::debug!(r#enum = name, reason = %reason, "rejected enum");
        self.model.rejects.enums.insert(name.to_string(), reason);
    }

    fn reject_function(&mut self, name: &str, reason: RejectReason) {
        tracing::debug!(function = name, reason = %reason, "rejected function");
        self.model.rejects.functions.insert(name.to_string(), reason);
    }

    fn reject_field(&mut self, name: &str, reason: RejectReason) {
        tracing::debug!(field = name, reason = %reason, "rejected field");
        self.model.rejects.fields.insert(name.to_string(), reason);
    }

    /// Qualified name of the current class, empty at global scope.
    fn current_class_name(&self) -> String {
        self.current_class
            .map(|id| self.model.class(id).name.clone())
            .unwrap_or_default()
    }

    /// Name prefixes tried for unqualified names: the current class, each
    /// lexical scope innermost first, then the implicit scope.
    fn scope_prefixes(&self) -> Vec<String> {
        let mut prefixes: Vec<String> = Vec::new();
        let mut push = |prefix: String| {
            if !prefix.is_empty() && !prefixes.contains(&prefix) {
                prefixes.push(prefix);
            }
        };
        push(self.current_class_name());
        for scope in self.scopes.iter().rev() {
            push(scope.qualified_name().join("::"));
        }
        push(self.config.implicit_scope.clone());
        prefixes
    }

    /// Swap in a class context and lexical scopes, returning the old ones.
    fn enter(
        &mut self,
        class: Option<ClassId>,
        scopes: Vec<ScopeRef<'m>>,
    ) -> (Option<ClassId>, Vec<ScopeRef<'m>>) {
        let old_class = std::mem::replace(&mut self.current_class, class);
        let old_scopes = std::mem::replace(&mut self.scopes, scopes);
        (old_class, old_scopes)
    }

    fn leave(&mut self, saved: (Option<ClassId>, Vec<ScopeRef<'m>>)) {
        self.current_class = saved.0;
        self.scopes = saved.1;
    }

    fn global_scopes(&self) -> Vec<ScopeRef<'m>> {
        vec![self.file.global_scope()]
    }
}

/// Convenience wrapper: build with a fresh builder.
///
/// # Errors
/// See [`MetaBuilder::build`].
pub fn build_model(
    file: &FileModel,
    db: &mut TypeDatabase,
    config: BuilderConfig,
) -> Result<MetaModel, BuildError> {
    MetaBuilder::new(file, db, config).build()
}
