//! The raw type descriptor attached to every declaration in the code model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{ItemRef, ScopeRef};

/// Reference qualifier of a type occurrence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceType {
    #[default]
    None,
    LValue,
    RValue,
}

/// One raw, unresolved type occurrence as produced by the parser.
///
/// `qualified_name` holds the scope-separated name parts (`["NS", "Foo"]`),
/// template instantiation arguments are kept structurally in `arguments`,
/// and array dimensions are kept verbatim (an empty string is `T[]`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub qualified_name: Vec<String>,
    #[serde(default)]
    pub is_constant: bool,
    #[serde(default)]
    pub is_volatile: bool,
    #[serde(default)]
    pub reference_type: ReferenceType,
    #[serde(default)]
    pub indirections: usize,
    #[serde(default)]
    pub arrays: Vec<String>,
    #[serde(default)]
    pub arguments: Vec<TypeInfo>,
    #[serde(default)]
    pub is_function_pointer: bool,
}

impl TypeInfo {
    /// A plain named type. `::` separators in `name` become name parts.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            qualified_name: split_qualified(name),
            ..Self::default()
        }
    }

    /// The bare `void` type, used as the default return type.
    #[must_use]
    pub fn void() -> Self {
        Self::named("void")
    }

    #[must_use]
    pub fn qualified_name_string(&self) -> String {
        self.qualified_name.join("::")
    }

    /// Last name part, without scope.
    #[must_use]
    pub fn name(&self) -> &str {
        self.qualified_name.last().map_or("", String::as_str)
    }

    #[must_use]
    pub fn is_void(&self) -> bool {
        self.qualified_name.len() == 1 && self.qualified_name[0] == "void" && self.indirections == 0
    }

    #[must_use]
    pub const fn is_reference(&self) -> bool {
        !matches!(self.reference_type, ReferenceType::None)
    }

    /// Qualified name including template arguments, e.g. `QList<Foo*>`.
    #[must_use]
    pub fn instantiation_name(&self) -> String {
        let mut out = self.qualified_name_string();
        if !self.arguments.is_empty() {
            out.push('<');
            let args: Vec<String> = self.arguments.iter().map(ToString::to_string).collect();
            out.push_str(&args.join(", "));
            if out.ends_with('>') {
                out.push(' ');
            }
            out.push('>');
        }
        out
    }

    /// Merge an alias target with the qualifiers written at the use site.
    ///
    /// `typedef Foo* FooPtr; const FooPtr&` combines into `const Foo*&`.
    #[must_use]
    pub fn combine(alias: &Self, other: &Self) -> Self {
        let mut combined = alias.clone();
        combined.is_constant |= other.is_constant;
        combined.is_volatile |= other.is_volatile;
        if other.is_reference() {
            combined.reference_type = other.reference_type;
        }
        combined.indirections += other.indirections;
        combined.arrays.extend(other.arrays.iter().cloned());
        combined
    }

    /// Unwrap typedefs visible from `scope`, following alias chains.
    ///
    /// Returns `self` (with a possibly more qualified name) when nothing
    /// aliases it. Recursion stops when an alias resolves to itself, as in
    /// `typedef struct conn_t conn_t;`.
    #[must_use]
    pub fn resolve_typedefs(&self, scope: ScopeRef<'_>) -> Self {
        let item = scope.find_item(&self.qualified_name);
        let mut other = self.clone();
        if let Some(item) = item {
            let qualified = item.qualified_name();
            if qualified.len() > 1 {
                other.qualified_name = qualified;
            }
        }

        let Some(ItemRef::Typedef(alias)) = item else {
            return other;
        };

        let combined = Self::combine(&alias.type_info, &other);
        let Some(next) = scope.find_item(&combined.qualified_name) else {
            return combined;
        };
        if next.is_same(&ItemRef::Typedef(alias)) {
            tracing::warn!(
                name = %self.qualified_name_string(),
                "typedef resolves to itself; keeping the unresolved name"
            );
            return other;
        }
        combined.resolve_typedefs(scope)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_function_pointer {
            return write!(f, "{}(*)(...)", self.qualified_name_string());
        }
        if self.is_constant {
            f.write_str("const ")?;
        }
        if self.is_volatile {
            f.write_str("volatile ")?;
        }
        f.write_str(&self.instantiation_name())?;
        for _ in 0..self.indirections {
            f.write_str("*")?;
        }
        match self.reference_type {
            ReferenceType::None => {}
            ReferenceType::LValue => f.write_str("&")?,
            ReferenceType::RValue => f.write_str("&&")?,
        }
        for dim in &self.arrays {
            write!(f, "[{dim}]")?;
        }
        Ok(())
    }
}

/// Split `A::B<C::D>::E` on top-level `::` only.
pub(crate) fn split_qualified(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    let mut chars = name.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' => {
                depth += 1;
                current.push(c);
            }
            '>' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ':' if depth == 0 && chars.peek() == Some(&':') => {
                chars.next();
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_renders_cpp_spelling() {
        let mut info = TypeInfo::named("QList");
        info.arguments.push(TypeInfo {
            indirections: 1,
            ..TypeInfo::named("NS::Foo")
        });
        info.is_constant = true;
        info.reference_type = ReferenceType::LValue;
        assert_eq!(info.to_string(), "const QList<NS::Foo*>&");
    }

    #[test]
    fn nested_template_closers_are_separated() {
        let mut inner = TypeInfo::named("QList");
        inner.arguments.push(TypeInfo::named("int"));
        let mut outer = TypeInfo::named("QList");
        outer.arguments.push(inner);
        assert_eq!(outer.instantiation_name(), "QList<QList<int> >");
    }

    #[test]
    fn combine_adds_use_site_qualifiers() {
        let alias = TypeInfo {
            indirections: 1,
            ..TypeInfo::named("Foo")
        };
        let use_site = TypeInfo {
            is_constant: true,
            reference_type: ReferenceType::LValue,
            ..TypeInfo::named("FooPtr")
        };
        let combined = TypeInfo::combine(&alias, &use_site);
        assert_eq!(combined.to_string(), "const Foo*&");
    }

    #[test]
    fn split_keeps_template_scopes_together() {
        assert_eq!(
            split_qualified("A::B<C::D>::E"),
            vec!["A".to_string(), "B<C::D>".to_string(), "E".to_string()]
        );
    }

    #[test]
    fn void_requires_zero_indirections() {
        assert!(TypeInfo::void().is_void());
        let ptr = TypeInfo {
            indirections: 1,
            ..TypeInfo::void()
        };
        assert!(!ptr.is_void());
    }
}
