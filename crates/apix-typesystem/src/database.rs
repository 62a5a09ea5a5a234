//! The type registry queried by the metamodel builder.

use std::collections::HashMap;

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::entry::{EntryKind, TypeEntry, TypeEntryId};
use crate::modification::{AddedFunction, FunctionModification};
use crate::signature::{normalize_signature, signature_name, strip_template_args};

/// Wildcard accepted in every field of a [`Rejection`].
pub const WILDCARD: &str = "*";

/// A `reject` rule. `class_name` may be [`WILDCARD`]; a rule with only a
/// class name rejects the whole class.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    #[serde(rename = "class")]
    pub class_name: String,
    #[serde(default, rename = "function")]
    pub function_name: Option<String>,
    #[serde(default, rename = "field")]
    pub field_name: Option<String>,
    #[serde(default, rename = "enum")]
    pub enum_name: Option<String>,
}

impl Rejection {
    #[must_use]
    pub fn class(name: &str) -> Self {
        Self {
            class_name: name.to_string(),
            ..Self::default()
        }
    }

    fn matches_class(&self, class_name: &str) -> bool {
        self.class_name == WILDCARD || self.class_name == class_name
    }

    const fn is_whole_class(&self) -> bool {
        self.function_name.is_none() && self.field_name.is_none() && self.enum_name.is_none()
    }
}

fn matches_member(pattern: Option<&String>, name: &str) -> bool {
    pattern.is_some_and(|p| p == WILDCARD || p == name)
}

/// Arena of [`TypeEntry`] values plus the rules that are not tied to a
/// single entry.
#[derive(Debug, Clone)]
pub struct TypeDatabase {
    entries: Vec<TypeEntry>,
    by_name: HashMap<String, Vec<TypeEntryId>>,
    flags_by_original: HashMap<String, TypeEntryId>,
    array_entries: HashMap<TypeEntryId, TypeEntryId>,
    rejections: Vec<Rejection>,
    global_added_functions: Vec<AddedFunction>,
    global_function_modifications: Vec<FunctionModification>,
    api_version: Option<Version>,
    flags_template: String,
    interface_suffix: String,
}

impl Default for TypeDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeDatabase {
    /// An empty registry holding only the built-in `void` and `...` entries.
    #[must_use]
    pub fn new() -> Self {
        let mut db = Self {
            entries: Vec::new(),
            by_name: HashMap::new(),
            flags_by_original: HashMap::new(),
            array_entries: HashMap::new(),
            rejections: Vec::new(),
            global_added_functions: Vec::new(),
            global_function_modifications: Vec::new(),
            api_version: None,
            flags_template: "QFlags".to_string(),
            interface_suffix: "Interface".to_string(),
        };
        db.add_entry(TypeEntry::new("void", EntryKind::Void));
        db.add_entry(TypeEntry::new("...", EntryKind::Varargs));
        db
    }

    /// Template name used to spell flags types (`QFlags<Enum>`).
    #[must_use]
    pub fn flags_template(&self) -> &str {
        &self.flags_template
    }

    pub fn set_flags_template(&mut self, name: &str) {
        name.clone_into(&mut self.flags_template);
    }

    pub fn set_interface_suffix(&mut self, suffix: &str) {
        suffix.clone_into(&mut self.interface_suffix);
    }

    /// Name of the interface synthesized for `name`.
    #[must_use]
    pub fn interface_name(&self, name: &str) -> String {
        format!("{name}{}", self.interface_suffix)
    }

    // -----------------------------------------------------------------------
    // Arena
    // -----------------------------------------------------------------------

    /// Register an entry and return its handle.
    pub fn add_entry(&mut self, entry: TypeEntry) -> TypeEntryId {
        let id = self.push(entry);
        let entry = &self.entries[id.index()];
        if !entry.kind.is_synthetic() {
            self.by_name.entry(entry.name.clone()).or_default().push(id);
        }
        if let Some(original) = &entry.original_name {
            self.flags_by_original.insert(original.clone(), id);
        }
        id
    }

    fn push(&mut self, entry: TypeEntry) -> TypeEntryId {
        let id = TypeEntryId(u32::try_from(self.entries.len()).unwrap_or(u32::MAX));
        self.entries.push(entry);
        id
    }

    /// Register an enum together with its flags type `flags_name`, wired
    /// to each other. Returns `(enum, flags)`.
    pub fn add_enum_with_flags(
        &mut self,
        mut enum_entry: TypeEntry,
        flags_name: &str,
    ) -> (TypeEntryId, TypeEntryId) {
        let original = format!("{}<{}>", self.flags_template, enum_entry.name);
        let mut flags = TypeEntry::new(flags_name, EntryKind::Flags);
        flags.original_name = Some(original);
        flags.since.clone_from(&enum_entry.since);
        enum_entry.flags = None;
        let enum_id = self.add_entry(enum_entry);
        flags.enum_entry = Some(enum_id);
        let flags_id = self.add_entry(flags);
        self.entries[enum_id.index()].flags = Some(flags_id);
        (enum_id, flags_id)
    }

    /// # Panics
    /// Panics when `id` does not come from this database.
    #[must_use]
    pub fn entry(&self, id: TypeEntryId) -> &TypeEntry {
        &self.entries[id.index()]
    }

    fn entry_mut(&mut self, id: TypeEntryId) -> &mut TypeEntry {
        &mut self.entries[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (TypeEntryId, &TypeEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (TypeEntryId(u32::try_from(i).unwrap_or(u32::MAX)), e))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // -----------------------------------------------------------------------
    // Lookups
    // -----------------------------------------------------------------------

    fn find_where(&self, name: &str, pred: impl Fn(&TypeEntry) -> bool) -> Option<TypeEntryId> {
        self.by_name
            .get(name)?
            .iter()
            .copied()
            .find(|id| pred(self.entry(*id)))
    }

    /// The type entry for `name`, ignoring function entries.
    #[must_use]
    pub fn find_type(&self, name: &str) -> Option<TypeEntryId> {
        self.find_where(name, |e| e.kind != EntryKind::Function)
    }

    #[must_use]
    pub fn find_complex_type(&self, name: &str) -> Option<TypeEntryId> {
        self.find_where(name, TypeEntry::is_complex)
    }

    #[must_use]
    pub fn find_primitive_type(&self, name: &str) -> Option<TypeEntryId> {
        self.find_where(name, |e| e.kind.is_primitive())
    }

    #[must_use]
    pub fn find_namespace_type(&self, name: &str) -> Option<TypeEntryId> {
        self.find_where(name, |e| e.kind == EntryKind::Namespace)
    }

    #[must_use]
    pub fn find_enum_type(&self, name: &str) -> Option<TypeEntryId> {
        self.find_where(name, |e| e.kind == EntryKind::Enum)
    }

    #[must_use]
    pub fn find_function_type(&self, name: &str) -> Option<TypeEntryId> {
        self.find_where(name, |e| e.kind == EntryKind::Function)
    }

    /// A container matched by template name; `QList<int>` finds `QList`.
    #[must_use]
    pub fn find_container_type(&self, name: &str) -> Option<TypeEntryId> {
        self.find_where(strip_template_args(name), |e| e.kind == EntryKind::Container)
    }

    /// A flags type by its own name or by its template spelling.
    #[must_use]
    pub fn find_flags_type(&self, name: &str) -> Option<TypeEntryId> {
        self.find_where(name, |e| e.kind == EntryKind::Flags)
            .or_else(|| self.flags_by_original.get(name).copied())
    }

    /// Every registered name equal to `name` or ending in `::name`.
    #[must_use]
    pub fn candidates_with_suffix(&self, name: &str) -> Vec<String> {
        let short = name.rsplit("::").next().unwrap_or(name);
        let suffix = format!("::{short}");
        let mut out: Vec<String> = self
            .by_name
            .keys()
            .filter(|k| k.as_str() == short || k.ends_with(&suffix))
            .cloned()
            .collect();
        out.sort();
        out
    }

    // -----------------------------------------------------------------------
    // Rejections
    // -----------------------------------------------------------------------

    pub fn add_rejection(&mut self, rejection: Rejection) {
        self.rejections.push(rejection);
    }

    #[must_use]
    pub fn rejections(&self) -> &[Rejection] {
        &self.rejections
    }

    #[must_use]
    pub fn is_class_rejected(&self, class_name: &str) -> bool {
        self.rejections
            .iter()
            .any(|r| r.is_whole_class() && r.matches_class(class_name))
    }

    /// `function` may be a bare name or a full signature.
    #[must_use]
    pub fn is_function_rejected(&self, class_name: &str, function: &str) -> bool {
        let normalized = normalize_signature(function);
        self.rejections.iter().any(|r| {
            r.matches_class(class_name)
                && r.function_name.as_ref().is_some_and(|p| {
                    p == WILDCARD
                        || normalize_signature(p) == normalized
                        || (!p.contains('(') && p == signature_name(&normalized))
                })
        })
    }

    #[must_use]
    pub fn is_field_rejected(&self, class_name: &str, field_name: &str) -> bool {
        self.rejections
            .iter()
            .any(|r| r.matches_class(class_name) && matches_member(r.field_name.as_ref(), field_name))
    }

    #[must_use]
    pub fn is_enum_rejected(&self, class_name: &str, enum_name: &str) -> bool {
        self.rejections
            .iter()
            .any(|r| r.matches_class(class_name) && matches_member(r.enum_name.as_ref(), enum_name))
    }

    // -----------------------------------------------------------------------
    // API version
    // -----------------------------------------------------------------------

    pub fn set_api_version(&mut self, version: Option<Version>) {
        self.api_version = version;
    }

    #[must_use]
    pub const fn api_version(&self) -> Option<&Version> {
        self.api_version.as_ref()
    }

    /// Whether `id` exists in the configured API version.
    #[must_use]
    pub fn is_api_compatible(&self, id: TypeEntryId) -> bool {
        match (&self.api_version, &self.entry(id).since) {
            (Some(current), Some(since)) => since <= current,
            _ => true,
        }
    }

    // -----------------------------------------------------------------------
    // Global rules
    // -----------------------------------------------------------------------

    pub fn add_global_added_function(&mut self, function: AddedFunction) {
        self.global_added_functions.push(function);
    }

    #[must_use]
    pub fn global_added_functions(&self) -> &[AddedFunction] {
        &self.global_added_functions
    }

    pub fn add_global_function_modification(&mut self, modification: FunctionModification) {
        self.global_function_modifications.push(modification);
    }

    #[must_use]
    pub fn global_function_modifications(&self, signature: &str) -> Vec<&FunctionModification> {
        self.global_function_modifications
            .iter()
            .filter(|m| m.matches(signature))
            .collect()
    }

    /// Modifications registered on `id` for the given minimal signature.
    #[must_use]
    pub fn function_modifications(&self, id: TypeEntryId, signature: &str) -> Vec<&FunctionModification> {
        self.entry(id)
            .function_modifications
            .iter()
            .filter(|m| m.matches(signature))
            .collect()
    }

    // -----------------------------------------------------------------------
    // Synthesized entries
    // -----------------------------------------------------------------------

    /// Array entry wrapping `element`; one per element type.
    pub fn array_entry(&mut self, element: TypeEntryId) -> TypeEntryId {
        if let Some(id) = self.array_entries.get(&element) {
            return *id;
        }
        let mut entry = TypeEntry::new(&format!("{}[]", self.entry(element).name), EntryKind::Array);
        entry.nested = Some(element);
        let id = self.add_entry(entry);
        self.array_entries.insert(element, id);
        id
    }

    /// Placeholder for template parameter `name` at `ordinal`.
    pub fn add_template_argument(&mut self, name: &str, ordinal: usize) -> TypeEntryId {
        let mut entry = TypeEntry::new(name, EntryKind::TemplateArgument);
        entry.ordinal = ordinal;
        self.add_entry(entry)
    }

    /// Register the interface designated for `origin`.
    pub fn add_interface_type(&mut self, origin: TypeEntryId) -> TypeEntryId {
        let source = self.entry(origin);
        let mut entry = TypeEntry::new(&self.interface_name(&source.name), EntryKind::Interface);
        entry.origin = Some(origin);
        entry.include.clone_from(&source.include);
        entry.since.clone_from(&source.since);
        let id = self.add_entry(entry);
        self.entry_mut(origin).designated_interface = Some(id);
        id
    }

    // -----------------------------------------------------------------------
    // Derived bookkeeping written during a build
    // -----------------------------------------------------------------------

    pub fn set_lookup_name(&mut self, id: TypeEntryId, name: String) {
        self.entry_mut(id).lookup_name = Some(name);
    }

    pub fn set_base_container_type(&mut self, id: TypeEntryId, container: TypeEntryId) {
        self.entry_mut(id).base_container_type = Some(container);
    }

    pub fn set_referenced_type(&mut self, id: TypeEntryId, referenced: TypeEntryId) {
        self.entry_mut(id).referenced_type = Some(referenced);
    }

    pub fn add_function_modification(&mut self, id: TypeEntryId, modification: FunctionModification) {
        self.entry_mut(id).function_modifications.push(modification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn db() -> TypeDatabase {
        let mut db = TypeDatabase::new();
        db.add_entry(TypeEntry::new("int", EntryKind::Primitive));
        db.add_entry(TypeEntry::new("NS::Widget", EntryKind::Object));
        db.add_entry(TypeEntry::new("QList", EntryKind::Container));
        db.add_enum_with_flags(TypeEntry::new("NS::Option", EntryKind::Enum), "NS::Options");
        db
    }

    #[test]
    fn builtin_entries_exist() {
        let db = TypeDatabase::new();
        let void = db.find_type("void").unwrap();
        assert_eq!(db.entry(void).kind, EntryKind::Void);
        assert!(db.find_type("...").is_some());
    }

    #[test]
    fn container_lookup_ignores_arguments() {
        let db = db();
        assert_eq!(db.find_container_type("QList<int>"), db.find_type("QList"));
        assert!(db.find_container_type("NS::Widget").is_none());
    }

    #[test]
    fn flags_found_by_name_and_template_spelling() {
        let db = db();
        let by_name = db.find_flags_type("NS::Options").unwrap();
        assert_eq!(db.find_flags_type("QFlags<NS::Option>"), Some(by_name));
        let option = db.find_enum_type("NS::Option").unwrap();
        assert_eq!(db.entry(option).flags, Some(by_name));
        assert_eq!(db.entry(by_name).enum_entry, Some(option));
    }

    #[test]
    fn rejection_rules() {
        let mut db = db();
        db.add_rejection(Rejection::class("NS::Hidden"));
        db.add_rejection(Rejection {
            class_name: WILDCARD.to_string(),
            function_name: Some("metaObject".to_string()),
            ..Rejection::default()
        });
        db.add_rejection(Rejection {
            class_name: "NS::Widget".to_string(),
            function_name: Some("resize(int, int)".to_string()),
            field_name: None,
            enum_name: None,
        });
        db.add_rejection(Rejection {
            class_name: "NS::Widget".to_string(),
            field_name: Some("d_ptr".to_string()),
            ..Rejection::default()
        });

        assert!(db.is_class_rejected("NS::Hidden"));
        assert!(!db.is_class_rejected("NS::Widget"));
        assert!(db.is_function_rejected("Any", "metaObject"));
        assert!(db.is_function_rejected("NS::Widget", "resize(int,int)"));
        assert!(!db.is_function_rejected("NS::Widget", "resize(int)"));
        assert!(db.is_field_rejected("NS::Widget", "d_ptr"));
        assert!(!db.is_enum_rejected("NS::Widget", "d_ptr"));
    }

    #[test]
    fn api_version_gates_entries() {
        let mut db = TypeDatabase::new();
        let mut entry = TypeEntry::new("New", EntryKind::Value);
        entry.since = Some(Version::new(6, 2, 0));
        let id = db.add_entry(entry);
        assert!(db.is_api_compatible(id));
        db.set_api_version(Some(Version::new(5, 15, 0)));
        assert!(!db.is_api_compatible(id));
        db.set_api_version(Some(Version::new(6, 5, 0)));
        assert!(db.is_api_compatible(id));
    }

    #[test]
    fn synthesized_entries_are_not_found_by_name() {
        let mut db = db();
        let int = db.find_type("int").unwrap();
        let array = db.array_entry(int);
        assert_eq!(db.array_entry(int), array);
        assert_eq!(db.entry(array).nested, Some(int));
        let t = db.add_template_argument("T", 0);
        assert_eq!(db.entry(t).kind, EntryKind::TemplateArgument);
        assert!(db.find_type("T").is_none());
        assert!(db.find_type("int[]").is_none());
    }

    #[test]
    fn interface_entry_links_both_ways() {
        let mut db = db();
        let widget = db.find_type("NS::Widget").unwrap();
        let iface = db.add_interface_type(widget);
        assert_eq!(db.entry(iface).name, "NS::WidgetInterface");
        assert_eq!(db.entry(widget).designated_interface, Some(iface));
        assert_eq!(db.entry(iface).origin, Some(widget));
    }

    #[test]
    fn suffix_candidates_are_sorted() {
        let mut db = db();
        db.add_entry(TypeEntry::new("Other::Widget", EntryKind::Value));
        assert_eq!(
            db.candidates_with_suffix("Widget"),
            vec!["NS::Widget".to_string(), "Other::Widget".to_string()]
        );
    }
}
