//! Textual fixups of default argument expressions.

use std::sync::LazyLock;

use regex::Regex;

use super::enum_values::parse_integer_literal;
use crate::model::{MetaClass, MetaType};

static CONSTRUCTOR_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_]\w*)\s*\(.*\)$").expect("valid constructor call regex"));

static CONTAINER_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][\w:]*\s*<.*>\s*\(\s*\)$").expect("valid container literal regex")
});

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_]\w*$").expect("valid identifier regex"));

/// Normalize `expression` for an argument of type `ty` declared in `class`.
///
/// Enum and flags defaults are returned untouched; they are qualified once
/// every enum value is known.
pub(crate) fn fix_default_value(expression: &str, ty: &MetaType, class: Option<&MetaClass>) -> String {
    let expression = expression.trim();
    if expression.is_empty() || ty.is_enum_like() {
        return expression.to_string();
    }
    if ty.name == "bool" && ty.indirections == 0 {
        return parse_integer_literal(expression)
            .map_or_else(|| expression.to_string(), |value| (value != 0).to_string());
    }
    if ty.is_container() && CONTAINER_LITERAL.is_match(expression) {
        return format!("{}()", ty.instantiation_spelling());
    }
    if ty.is_value() && ty.indirections == 0 && expression == "0" {
        return format!("{}()", ty.name);
    }
    if let Some(captures) = CONSTRUCTOR_CALL.captures(expression) {
        if let Some(qualifier) = ty.qualifier()
            && &captures[1] == ty.short_name()
        {
            return format!("{qualifier}::{expression}");
        }
        return expression.to_string();
    }
    if IDENTIFIER.is_match(expression)
        && let Some(class) = class
        && class.find_field(expression).is_some()
    {
        return format!("{}::{expression}", class.name);
    }
    expression.to_string()
}
