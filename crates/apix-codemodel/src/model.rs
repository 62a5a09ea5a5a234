//! The scope tree handed over by the parser: file -> namespaces -> classes -> members.

use serde::{Deserialize, Serialize};

use crate::type_info::{TypeInfo, split_qualified};

/// Declared access of a member.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    #[default]
    Public,
    Protected,
    Private,
}

/// Meta-object flavour of a member function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionKind {
    #[default]
    Normal,
    Signal,
    Slot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    #[default]
    Class,
    Struct,
    Union,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumKind {
    #[default]
    CEnum,
    EnumClass,
    Anonymous,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentModel {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub type_info: TypeInfo,
    #[serde(default)]
    pub default_value: Option<String>,
}

impl ArgumentModel {
    #[must_use]
    pub fn new(name: &str, type_info: TypeInfo) -> Self {
        Self {
            name: name.to_string(),
            type_info,
            default_value: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, expression: &str) -> Self {
        self.default_value = Some(expression.to_string());
        self
    }
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionModel {
    pub name: String,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub access: AccessPolicy,
    #[serde(default)]
    pub kind: FunctionKind,
    #[serde(default = "TypeInfo::void")]
    pub return_type: TypeInfo,
    #[serde(default)]
    pub arguments: Vec<ArgumentModel>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub is_constant: bool,
    #[serde(default)]
    pub is_friend: bool,
    #[serde(default)]
    pub is_explicit: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_variadic: bool,
    #[serde(default)]
    pub is_invokable: bool,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub line: u32,
}

impl FunctionModel {
    #[must_use]
    pub fn new(name: &str, return_type: TypeInfo) -> Self {
        Self {
            name: name.to_string(),
            return_type,
            ..Self::default()
        }
    }

    /// `name(type1,type2)` built from the raw argument spellings.
    #[must_use]
    pub fn raw_signature(&self) -> String {
        let args: Vec<String> = self
            .arguments
            .iter()
            .map(|a| a.type_info.to_string())
            .collect();
        format!("{}({})", self.name, args.join(","))
    }
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableModel {
    pub name: String,
    #[serde(rename = "type")]
    pub type_info: TypeInfo,
    #[serde(default)]
    pub access: AccessPolicy,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_friend: bool,
    #[serde(default)]
    pub is_mutable: bool,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub line: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumeratorModel {
    pub name: String,
    /// Initializer exactly as written; empty when implicit.
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumModel {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub access: AccessPolicy,
    #[serde(default)]
    pub kind: EnumKind,
    #[serde(default)]
    pub enumerators: Vec<EnumeratorModel>,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub line: u32,
}

impl EnumModel {
    #[must_use]
    pub fn qualified_name(&self) -> Vec<String> {
        let mut name = self.scope.clone();
        name.push(self.name.clone());
        name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedefModel {
    pub name: String,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(rename = "type")]
    pub type_info: TypeInfo,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub line: u32,
}

impl TypedefModel {
    #[must_use]
    pub fn qualified_name(&self) -> Vec<String> {
        let mut name = self.scope.clone();
        name.push(self.name.clone());
        name
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseClassModel {
    pub name: String,
    #[serde(default)]
    pub access: AccessPolicy,
    #[serde(default)]
    pub is_virtual: bool,
}

/// Members shared by namespaces and classes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeModel {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default)]
    pub classes: Vec<ClassModel>,
    #[serde(default)]
    pub functions: Vec<FunctionModel>,
    #[serde(default)]
    pub variables: Vec<VariableModel>,
    #[serde(default)]
    pub enums: Vec<EnumModel>,
    #[serde(default)]
    pub typedefs: Vec<TypedefModel>,
    /// Names listed in meta-object enum declarations (`Q_ENUMS`).
    #[serde(default)]
    pub enums_declarations: Vec<String>,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub line: u32,
}

impl ScopeModel {
    #[must_use]
    pub fn qualified_name(&self) -> Vec<String> {
        let mut name = self.scope.clone();
        if !self.name.is_empty() {
            name.push(self.name.clone());
        }
        name
    }

    /// Classes deduplicated by name; a later declaration replaces an
    /// earlier one (forward declaration followed by definition).
    #[must_use]
    pub fn unique_classes(&self) -> Vec<&ClassModel> {
        let mut out: Vec<&ClassModel> = Vec::new();
        for class in &self.classes {
            if let Some(slot) = out.iter_mut().find(|c| c.scope.name == class.scope.name) {
                *slot = class;
            } else {
                out.push(class);
            }
        }
        out
    }

    /// Enums deduplicated by name, last declaration wins.
    #[must_use]
    pub fn unique_enums(&self) -> Vec<&EnumModel> {
        let mut out: Vec<&EnumModel> = Vec::new();
        for item in &self.enums {
            match out
                .iter_mut()
                .find(|e| !item.name.is_empty() && e.name == item.name)
            {
                Some(slot) => *slot = item,
                None => out.push(item),
            }
        }
        out
    }

    #[must_use]
    pub fn find_class(&self, name: &str) -> Option<&ClassModel> {
        self.classes.iter().rev().find(|c| c.scope.name == name)
    }

    #[must_use]
    pub fn find_enum(&self, name: &str) -> Option<&EnumModel> {
        self.enums.iter().rev().find(|e| e.name == name)
    }

    #[must_use]
    pub fn find_typedef(&self, name: &str) -> Option<&TypedefModel> {
        self.typedefs.iter().rev().find(|t| t.name == name)
    }

    /// All overloads with the given name.
    pub fn functions_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FunctionModel> {
        self.functions.iter().filter(move |f| f.name == name)
    }

    fn assign_scopes(&mut self, scope: &[String]) {
        self.scope = scope.to_vec();
        let inner = self.qualified_name();
        for class in &mut self.classes {
            class.scope.assign_scopes(&inner);
        }
        for function in &mut self.functions {
            function.scope.clone_from(&inner);
        }
        for item in &mut self.enums {
            item.scope.clone_from(&inner);
        }
        for typedef in &mut self.typedefs {
            typedef.scope.clone_from(&inner);
        }
    }
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassModel {
    #[serde(flatten)]
    pub scope: ScopeModel,
    #[serde(default)]
    pub kind: ClassKind,
    #[serde(default)]
    pub base_classes: Vec<BaseClassModel>,
    #[serde(default)]
    pub template_parameters: Vec<String>,
    /// Property declarations, e.g. `QString title READ title WRITE setTitle`.
    #[serde(default)]
    pub property_declarations: Vec<String>,
    #[serde(default)]
    pub is_final: bool,
}

impl ClassModel {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            scope: ScopeModel {
                name: name.to_string(),
                ..ScopeModel::default()
            },
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.scope.name
    }

    #[must_use]
    pub fn base_class_names(&self) -> Vec<String> {
        self.base_classes.iter().map(|b| b.name.clone()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceModel {
    #[serde(flatten)]
    pub scope: ScopeModel,
    #[serde(default)]
    pub namespaces: Vec<NamespaceModel>,
    #[serde(default)]
    pub is_inline: bool,
}

impl NamespaceModel {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            scope: ScopeModel {
                name: name.to_string(),
                ..ScopeModel::default()
            },
            ..Self::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.scope.name
    }

    /// Namespaces deduplicated by name. Reopened namespaces are kept as
    /// separate nodes by the parser; the first node's position is kept.
    #[must_use]
    pub fn unique_namespaces(&self) -> Vec<&Self> {
        let mut seen = std::collections::HashSet::new();
        self.namespaces
            .iter()
            .filter(|ns| seen.insert(ns.scope.name.as_str()))
            .collect()
    }

    #[must_use]
    pub fn find_namespace(&self, name: &str) -> Option<&Self> {
        self.namespaces.iter().find(|ns| ns.scope.name == name)
    }

    fn assign_scopes(&mut self, scope: &[String]) {
        self.scope.assign_scopes(scope);
        let inner = self.scope.qualified_name();
        for ns in &mut self.namespaces {
            ns.assign_scopes(&inner);
        }
    }
}

/// The translation unit: an unnamed global namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileModel {
    #[serde(flatten)]
    pub global: NamespaceModel,
}

impl FileModel {
    #[must_use]
    pub fn new(global: NamespaceModel) -> Self {
        let mut model = Self { global };
        model.assign_scopes();
        model
    }

    /// Load a JSON dump produced by the parser and fill in scope chains.
    ///
    /// # Errors
    /// Returns [`crate::CodeModelError::Json`] when the dump is malformed.
    pub fn from_json(json: &str) -> Result<Self, crate::CodeModelError> {
        let mut model: Self = serde_json::from_str(json)?;
        if !model.global.scope.name.is_empty() {
            return Err(crate::CodeModelError::InvalidModel(
                "the global namespace must be unnamed".to_string(),
            ));
        }
        model.assign_scopes();
        Ok(model)
    }

    /// Recompute the `scope` of every nested item from the tree shape.
    pub fn assign_scopes(&mut self) {
        self.global.assign_scopes(&[]);
    }

    #[must_use]
    pub fn global_scope(&self) -> ScopeRef<'_> {
        ScopeRef::Namespace(&self.global)
    }

    /// Find a class by its `::`-qualified name from the global scope.
    #[must_use]
    pub fn find_class(&self, qualified_name: &str) -> Option<&ClassModel> {
        match self.global_scope().find_item(&split_qualified(qualified_name)) {
            Some(ItemRef::Class(class)) => Some(class),
            _ => None,
        }
    }

    /// Collect the scope chain (global first) leading to `qualified_name`,
    /// following only namespaces and classes.
    #[must_use]
    pub fn scope_chain(&self, qualified_name: &[String]) -> Vec<ScopeRef<'_>> {
        let mut chain = vec![self.global_scope()];
        let mut current = self.global_scope();
        for part in qualified_name {
            let next = match current {
                ScopeRef::Namespace(ns) => ns
                    .find_namespace(part)
                    .map(ScopeRef::Namespace)
                    .or_else(|| ns.scope.find_class(part).map(ScopeRef::Class)),
                ScopeRef::Class(class) => class.scope.find_class(part).map(ScopeRef::Class),
            };
            let Some(next) = next else { break };
            chain.push(next);
            current = next;
        }
        chain
    }
}

/// A scope node: either a namespace or a class.
#[derive(Debug, Clone, Copy)]
pub enum ScopeRef<'m> {
    Namespace(&'m NamespaceModel),
    Class(&'m ClassModel),
}

impl<'m> ScopeRef<'m> {
    #[must_use]
    pub const fn body(self) -> &'m ScopeModel {
        match self {
            Self::Namespace(ns) => &ns.scope,
            Self::Class(class) => &class.scope,
        }
    }

    #[must_use]
    pub fn qualified_name(self) -> Vec<String> {
        self.body().qualified_name()
    }

    /// Walk `qualified_name` downwards from this scope.
    ///
    /// Namespaces and classes are descended into; an enum or typedef is
    /// only returned when it is the last name part. `None` when any part
    /// is missing.
    #[must_use]
    pub fn find_item(self, qualified_name: &[String]) -> Option<ItemRef<'m>> {
        if qualified_name.is_empty() {
            return None;
        }
        let mut scope = self;
        let last = qualified_name.len() - 1;
        for (i, name) in qualified_name.iter().enumerate() {
            if let Self::Namespace(ns) = scope
                && let Some(inner) = ns.find_namespace(name)
            {
                scope = Self::Namespace(inner);
                continue;
            }
            let body = scope.body();
            if let Some(class) = body.find_class(name) {
                scope = Self::Class(class);
            } else if let Some(item) = body.find_enum(name) {
                return (i == last).then_some(ItemRef::Enum(item));
            } else if let Some(alias) = body.find_typedef(name) {
                return (i == last).then_some(ItemRef::Typedef(alias));
            } else {
                return None;
            }
        }
        Some(match scope {
            Self::Namespace(ns) => ItemRef::Namespace(ns),
            Self::Class(class) => ItemRef::Class(class),
        })
    }
}

/// A located code model item, as returned by [`ScopeRef::find_item`].
#[derive(Debug, Clone, Copy)]
pub enum ItemRef<'m> {
    Namespace(&'m NamespaceModel),
    Class(&'m ClassModel),
    Enum(&'m EnumModel),
    Typedef(&'m TypedefModel),
}

impl ItemRef<'_> {
    #[must_use]
    pub fn qualified_name(&self) -> Vec<String> {
        match self {
            Self::Namespace(ns) => ns.scope.qualified_name(),
            Self::Class(class) => class.scope.qualified_name(),
            Self::Enum(item) => item.qualified_name(),
            Self::Typedef(alias) => alias.qualified_name(),
        }
    }

    /// Identity comparison: both refer to the same node of the tree.
    #[must_use]
    pub fn is_same(&self, other: &ItemRef<'_>) -> bool {
        match (self, other) {
            (Self::Namespace(a), ItemRef::Namespace(b)) => std::ptr::eq(*a, *b),
            (Self::Class(a), ItemRef::Class(b)) => std::ptr::eq(*a, *b),
            (Self::Enum(a), ItemRef::Enum(b)) => std::ptr::eq(*a, *b),
            (Self::Typedef(a), ItemRef::Typedef(b)) => std::ptr::eq(*a, *b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> FileModel {
        let mut ns = NamespaceModel::new("NS");
        let mut outer = ClassModel::new("Outer");
        outer.scope.typedefs.push(TypedefModel {
            name: "Handle".to_string(),
            type_info: TypeInfo {
                indirections: 1,
                ..TypeInfo::named("Outer")
            },
            ..TypedefModel::default()
        });
        outer.scope.classes.push(ClassModel::new("Inner"));
        ns.scope.classes.push(outer);
        ns.scope.enums.push(EnumModel {
            name: "Color".to_string(),
            ..EnumModel::default()
        });
        ns.scope.typedefs.push(TypedefModel {
            name: "conn_t".to_string(),
            type_info: TypeInfo::named("conn_t"),
            ..TypedefModel::default()
        });
        let mut global = NamespaceModel::default();
        global.namespaces.push(ns);
        FileModel::new(global)
    }

    #[test]
    fn scopes_are_assigned_from_tree_shape() {
        let model = sample();
        let inner = model.find_class("NS::Outer::Inner").expect("inner class");
        assert_eq!(inner.scope.qualified_name(), vec!["NS", "Outer", "Inner"]);
    }

    #[test]
    fn find_item_stops_at_enum_only_when_last() {
        let model = sample();
        let ns = model.global.find_namespace("NS").unwrap();
        let scope = ScopeRef::Namespace(ns);
        assert!(matches!(
            scope.find_item(&["Color".to_string()]),
            Some(ItemRef::Enum(_))
        ));
        assert!(
            scope
                .find_item(&["Color".to_string(), "Red".to_string()])
                .is_none()
        );
    }

    #[test]
    fn typedef_resolution_qualifies_and_combines() {
        let model = sample();
        let outer = model.find_class("NS::Outer").unwrap();
        let resolved = TypeInfo {
            is_constant: true,
            ..TypeInfo::named("Handle")
        }
        .resolve_typedefs(ScopeRef::Class(outer));
        assert_eq!(resolved.to_string(), "const Outer*");
    }

    #[test]
    fn self_referential_typedef_does_not_recurse() {
        let model = sample();
        let ns = model.global.find_namespace("NS").unwrap();
        let resolved = TypeInfo::named("conn_t").resolve_typedefs(ScopeRef::Namespace(ns));
        assert_eq!(resolved.qualified_name_string(), "NS::conn_t");
    }

    #[test]
    fn scope_chain_follows_namespaces_and_classes() {
        let model = sample();
        let chain = model.scope_chain(&["NS".to_string(), "Outer".to_string()]);
        let names: Vec<String> = chain
            .iter()
            .map(|s| s.qualified_name().join("::"))
            .collect();
        assert_eq!(names, vec!["", "NS", "NS::Outer"]);
    }

    #[test]
    fn later_class_declaration_wins() {
        let mut scope = ScopeModel::default();
        scope.classes.push(ClassModel::new("Fwd"));
        let mut defined = ClassModel::new("Fwd");
        defined.is_final = true;
        scope.classes.push(defined);
        let unique = scope.unique_classes();
        assert_eq!(unique.len(), 1);
        assert!(unique[0].is_final);
    }
}
