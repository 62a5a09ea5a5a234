//! Raw type descriptors to registry-backed [`MetaType`]s.

use apix_codemodel::TypeInfo;
use apix_typesystem::{EntryKind, TypeEntryId};

use super::MetaBuilder;
use super::enum_values::parse_integer_literal;
use crate::model::MetaType;

/// A successful translation. `void` is kept apart from real types so
/// callers can tell "no return value" from a failure.
pub(crate) enum Resolved {
    Void,
    Type(MetaType),
}

impl Resolved {
    pub(crate) fn into_type(self) -> Option<MetaType> {
        match self {
            Self::Void => None,
            Self::Type(ty) => Some(ty),
        }
    }
}

impl MetaBuilder<'_, '_> {
    /// Translate `info` in the current class and lexical scopes.
    ///
    /// The name is first tried as written so registry rules keyed on a
    /// typedef name win; only then are typedefs unwrapped, innermost scope
    /// first.
    pub(super) fn translate_type(&mut self, info: &TypeInfo) -> Option<Resolved> {
        if info.is_function_pointer {
            return None;
        }
        if let Some(resolved) = self.translate_unaliased(info) {
            return Some(resolved);
        }
        let scopes = self.scopes.clone();
        for scope in scopes.into_iter().rev() {
            let unwrapped = info.resolve_typedefs(scope);
            if unwrapped != *info {
                return self.translate_unaliased(&unwrapped);
            }
        }
        None
    }

    /// Parse and translate a type spelled as text.
    pub(super) fn translate_spelling(&mut self, spelling: &str) -> Option<Resolved> {
        let info = TypeInfo::parse(spelling).ok()?;
        self.translate_type(&info)
    }

    fn translate_unaliased(&mut self, info: &TypeInfo) -> Option<Resolved> {
        if !info.arrays.is_empty() {
            if info.arrays.iter().all(|dim| dim.trim().is_empty()) {
                let mut pointer = info.clone();
                pointer.indirections += pointer.arrays.len();
                pointer.arrays.clear();
                return self.translate_unaliased(&pointer);
            }
            return self.translate_array(info).map(Resolved::Type);
        }
        if info.is_void() {
            return Some(Resolved::Void);
        }

        let mut name = info.qualified_name_string();
        if info.name() == self.db.flags_template() && info.arguments.len() == 1 {
            if let Some(Resolved::Type(inner)) = self.translate_type(&info.arguments[0]) {
                let inner = self.db.entry(inner.entry);
                if inner.kind == EntryKind::Enum {
                    name = format!("{}<{}>", self.db.flags_template(), inner.name);
                }
            }
        }

        let entry = self.lookup_entry(&name)?;
        let entry_name = self.db.entry(entry).name.clone();
        let is_flags = self.db.entry(entry).kind == EntryKind::Flags;
        self.model.used_types.insert(entry_name.clone());

        let mut ty = MetaType::new(entry, &entry_name);
        ty.is_constant = info.is_constant;
        ty.is_volatile = info.is_volatile;
        ty.reference = info.reference_type;
        ty.indirections = info.indirections;
        ty.original_description = info.to_string();
        if !is_flags {
            for argument in &info.arguments {
                match self.translate_type(argument)? {
                    Resolved::Void => return None,
                    Resolved::Type(arg) => ty.instantiations.push(arg),
                }
            }
        }
        ty.decide_usage_pattern(self.db);
        Some(Resolved::Type(ty))
    }

    /// Registry entry for `name`: direct, flags and container lookups,
    /// then the current class's template parameters, then each scope
    /// prefix unless the name itself is rejected.
    fn lookup_entry(&self, name: &str) -> Option<TypeEntryId> {
        if let Some(id) = self.find_direct(name) {
            return Some(id);
        }
        if let Some(class) = self.current_class {
            let parameter = self
                .model
                .class(class)
                .template_arguments
                .iter()
                .copied()
                .find(|id| self.db.entry(*id).name == name);
            if parameter.is_some() {
                return parameter;
            }
        }
        if self.db.is_class_rejected(name) {
            return None;
        }
        self.scope_prefixes()
            .iter()
            .find_map(|prefix| self.find_direct(&format!("{prefix}::{name}")))
    }

    pub(super) fn find_direct(&self, name: &str) -> Option<TypeEntryId> {
        self.db
            .find_type(name)
            .or_else(|| self.db.find_flags_type(name))
            .or_else(|| self.db.find_container_type(name))
    }

    /// Bounded arrays become a chain of array types wrapping the element,
    /// the last dimension innermost.
    fn translate_array(&mut self, info: &TypeInfo) -> Option<MetaType> {
        let mut element = info.clone();
        element.arrays.clear();
        let Resolved::Type(mut current) = self.translate_unaliased(&element)? else {
            return None;
        };
        for dim in info.arrays.iter().rev() {
            let count = self.array_dimension(dim)?;
            let entry = self.db.array_entry(current.entry);
            let mut array = MetaType::new(entry, &self.db.entry(entry).name);
            array.array_element_count = count;
            array.array_element = Some(Box::new(current));
            array.original_description = info.to_string();
            array.decide_usage_pattern(self.db);
            current = array;
        }
        Some(current)
    }

    // `Some(None)` is an unbounded dimension.
    fn array_dimension(&self, dim: &str) -> Option<Option<usize>> {
        let dim = dim.trim();
        if dim.is_empty() {
            return Some(None);
        }
        if let Some(value) = parse_integer_literal(dim) {
            return usize::try_from(value).ok().map(Some);
        }
        let evaluation = self.enum_values.evaluate(dim, -1, &self.scope_prefixes());
        if !evaluation.is_matched() {
            return None;
        }
        usize::try_from(evaluation.value).ok().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use apix_codemodel::{ClassModel, FileModel, NamespaceModel, ReferenceType, TypeInfo, TypedefModel};
    use apix_config::BuilderConfig;
    use apix_typesystem::{TypeDatabase, TypeSystemDocument};
    use pretty_assertions::assert_eq;

    use super::*;

    fn database(toml: &str) -> TypeDatabase {
        TypeSystemDocument::from_toml_str(toml)
            .and_then(TypeSystemDocument::into_database)
            .unwrap()
    }

    fn typedef(name: &str, target: &str) -> TypedefModel {
        TypedefModel {
            name: name.to_string(),
            type_info: TypeInfo::parse(target).unwrap(),
            ..TypedefModel::default()
        }
    }

    /// Builder with classes traversed, resolving inside `class` (or at
    /// global scope when `None`).
    fn builder_in<'m, 'db>(
        file: &'m FileModel,
        db: &'db mut TypeDatabase,
        class: Option<&str>,
    ) -> MetaBuilder<'m, 'db> {
        let mut builder = MetaBuilder::new(file, db, BuilderConfig::default());
        builder.traverse_global_namespace();
        let _ = match class {
            Some(name) => {
                let id = builder.model.class_id(name).unwrap();
                let path: Vec<String> = name.split("::").map(str::to_string).collect();
                builder.enter(Some(id), file.scope_chain(&path))
            }
            None => {
                let scopes = builder.global_scopes();
                builder.enter(None, scopes)
            }
        };
        builder
    }

    fn resolve(builder: &mut MetaBuilder<'_, '_>, spelling: &str) -> Option<MetaType> {
        builder.translate_spelling(spelling).and_then(Resolved::into_type)
    }

    const PRIMITIVES: &str = r#"
        [[type]]
        name = "int"
        kind = "primitive"

        [[type]]
        name = "double"
        kind = "primitive"
    "#;

    #[test]
    fn typedef_name_with_its_own_rule_is_kept() {
        let mut global = NamespaceModel::default();
        global.scope.typedefs.push(typedef("qreal", "double"));
        let file = FileModel::new(global);

        let mut db = database(&format!("{PRIMITIVES}\n[[type]]\nname = \"qreal\"\nkind = \"primitive\"\n"));
        let mut builder = builder_in(&file, &mut db, None);
        assert_eq!(resolve(&mut builder, "qreal").unwrap().name, "qreal");

        let mut db = database(PRIMITIVES);
        let mut builder = builder_in(&file, &mut db, None);
        assert_eq!(resolve(&mut builder, "const qreal&").unwrap().name, "double");
    }

    #[test]
    fn typedef_chains_unwrap_to_the_registered_type() {
        let mut global = NamespaceModel::default();
        global.scope.typedefs.push(typedef("real_t", "double"));
        global.scope.typedefs.push(typedef("scalar", "real_t"));
        let file = FileModel::new(global);
        let mut db = database(PRIMITIVES);
        let mut builder = builder_in(&file, &mut db, None);

        let ty = resolve(&mut builder, "scalar*").unwrap();
        assert_eq!(ty.name, "double");
        assert_eq!(ty.indirections, 1);
    }

    #[test]
    fn self_referential_typedef_fails_without_looping() {
        let mut global = NamespaceModel::default();
        global.scope.typedefs.push(typedef("conn_t", "conn_t"));
        let file = FileModel::new(global);
        let mut db = database(PRIMITIVES);
        let mut builder = builder_in(&file, &mut db, None);

        assert!(resolve(&mut builder, "conn_t").is_none());
    }

    #[test]
    fn unqualified_names_retry_under_class_then_scopes_then_implicit_scope() {
        let mut ns = NamespaceModel::new("NS");
        ns.scope.classes.push(ClassModel::new("Outer"));
        let mut global = NamespaceModel::default();
        global.namespaces.push(ns);
        let file = FileModel::new(global);
        let mut db = database(
            r#"
            [[type]]
            name = "NS"
            kind = "namespace"

            [[type]]
            name = "NS::Outer"
            kind = "object"

            [[type]]
            name = "NS::Outer::Thing"
            kind = "value"

            [[type]]
            name = "NS::Thing"
            kind = "value"

            [[type]]
            name = "NS::Point"
            kind = "value"

            [[type]]
            name = "Qt::Key"
            kind = "value"
        "#,
        );
        let mut builder = builder_in(&file, &mut db, Some("NS::Outer"));

        assert_eq!(resolve(&mut builder, "Thing").unwrap().name, "NS::Outer::Thing");
        assert_eq!(resolve(&mut builder, "Point").unwrap().name, "NS::Point");
        assert_eq!(resolve(&mut builder, "Key").unwrap().name, "Qt::Key");
        assert!(resolve(&mut builder, "Missing").is_none());
    }

    #[test]
    fn rejected_names_are_not_retried_under_scopes() {
        let mut global = NamespaceModel::default();
        global.scope.classes.push(ClassModel::new("Outer"));
        let file = FileModel::new(global);
        let mut db = database(
            r#"
            [[type]]
            name = "Outer"
            kind = "object"

            [[type]]
            name = "Outer::Handle"
            kind = "value"

            [[reject]]
            class = "Handle"
        "#,
        );
        let mut builder = builder_in(&file, &mut db, Some("Outer"));

        assert!(resolve(&mut builder, "Handle").is_none());
        assert_eq!(resolve(&mut builder, "Outer::Handle").unwrap().name, "Outer::Handle");
    }

    #[test]
    fn template_parameters_bind_to_placeholders() {
        let mut boxed = ClassModel::new("Box");
        boxed.template_parameters = vec!["K".to_string(), "T".to_string()];
        let mut global = NamespaceModel::default();
        global.scope.classes.push(boxed);
        let file = FileModel::new(global);
        let mut db = database("[[type]]\nname = \"Box\"\nkind = \"object\"\n");
        let mut builder = builder_in(&file, &mut db, Some("Box"));

        let ty = resolve(&mut builder, "const T&").unwrap();
        assert_eq!(builder.db.entry(ty.entry).kind, EntryKind::TemplateArgument);
        assert_eq!(builder.db.entry(ty.entry).ordinal, 1);
        assert!(ty.is_constant);
        assert_eq!(ty.reference, ReferenceType::LValue);

        let _ = builder.enter(None, Vec::new());
        assert!(resolve(&mut builder, "T").is_none());
    }

    #[test]
    fn unbounded_arrays_become_pointers() {
        let file = FileModel::new(NamespaceModel::default());
        let mut db = database(PRIMITIVES);
        let mut builder = builder_in(&file, &mut db, None);

        let ty = resolve(&mut builder, "int[]").unwrap();
        assert_eq!(ty.name, "int");
        assert_eq!(ty.indirections, 1);
        assert!(ty.array_element.is_none());
    }

    #[test]
    fn bounded_arrays_chain_outermost_first() {
        let file = FileModel::new(NamespaceModel::default());
        let mut db = database(PRIMITIVES);
        let mut builder = builder_in(&file, &mut db, None);

        let outer = resolve(&mut builder, "int[4][2]").unwrap();
        assert_eq!(builder.db.entry(outer.entry).kind, EntryKind::Array);
        assert_eq!(outer.array_element_count, Some(4));
        let inner = outer.array_element.as_deref().unwrap();
        assert_eq!(inner.array_element_count, Some(2));
        let element = inner.array_element.as_deref().unwrap();
        assert_eq!(element.name, "int");
        assert!(element.array_element.is_none());
    }

    #[test]
    fn unresolved_template_argument_fails_the_whole_type() {
        let file = FileModel::new(NamespaceModel::default());
        let mut db = database(&format!("{PRIMITIVES}\n[[type]]\nname = \"QList\"\nkind = \"container\"\n"));
        let mut builder = builder_in(&file, &mut db, None);

        assert!(resolve(&mut builder, "QList<Unknown>").is_none());
        assert!(resolve(&mut builder, "QList<void>").is_none());
        let list = resolve(&mut builder, "QList<int>").unwrap();
        assert_eq!(list.instantiations.len(), 1);
        assert_eq!(list.instantiations[0].name, "int");
    }

    #[test]
    fn resolution_is_idempotent() {
        let file = FileModel::new(NamespaceModel::default());
        let mut db = database(&format!("{PRIMITIVES}\n[[type]]\nname = \"QList\"\nkind = \"container\"\n"));
        let mut builder = builder_in(&file, &mut db, None);

        let first = resolve(&mut builder, "const QList<int>&").unwrap();
        let second = resolve(&mut builder, "const QList<int>&").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.original_description, second.original_description);
        assert!(builder.model.used_types.contains("QList"));
        assert!(builder.model.used_types.contains("int"));
    }

    #[test]
    fn void_and_function_pointers_are_told_apart() {
        let file = FileModel::new(NamespaceModel::default());
        let mut db = database(PRIMITIVES);
        let mut builder = builder_in(&file, &mut db, None);

        assert!(matches!(builder.translate_spelling("void"), Some(Resolved::Void)));
        let mut callback = TypeInfo::parse("int").unwrap();
        callback.is_function_pointer = true;
        assert!(builder.translate_type(&callback).is_none());
    }
}
