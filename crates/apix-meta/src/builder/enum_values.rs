//! Enum value evaluation.
//!
//! Expressions are OR-combinations of terms. A term is an integer literal,
//! `true`/`false`, or a symbol naming an already evaluated enum value, and
//! may be wrapped in parentheses, complemented with `~`, negated, or
//! combined with `+`, `-`, `<<` and `>>`.

use std::collections::{HashMap, HashSet};

use apix_typesystem::EntryKind;

use super::MetaBuilder;
use crate::model::{ClassId, DiagnosticKind, MetaEnum, MetaType};

/// Outcome of evaluating one expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumEvaluation {
    pub value: i64,
    /// Terms that did not resolve; each contributed 0.
    pub unmatched: Vec<String>,
}

impl EnumEvaluation {
    #[must_use]
    pub fn is_matched(&self) -> bool {
        self.unmatched.is_empty()
    }
}

/// Every enum value evaluated so far, under its bare, scope-qualified and
/// enum-qualified names.
#[derive(Debug, Clone, Default)]
pub struct EnumValueTable {
    values: HashMap<String, i64>,
}

impl EnumValueTable {
    pub fn register(&mut self, enum_name: &str, value_scope: Option<&str>, name: &str, value: i64) {
        self.values.insert(name.to_string(), value);
        if let Some(scope) = value_scope {
            self.values.insert(format!("{scope}::{name}"), value);
        }
        self.values.insert(format!("{enum_name}::{name}"), value);
    }

    /// Resolve `symbol` under each of `scopes` in order, then as written,
    /// then by its last `::` part. Bare names are shared by every enum that
    /// registered them, so they only apply when no scope matched.
    #[must_use]
    pub fn lookup(&self, symbol: &str, scopes: &[String]) -> Option<i64> {
        let symbol = symbol.trim();
        let scoped = scopes
            .iter()
            .find_map(|scope| self.values.get(&format!("{scope}::{symbol}")));
        if let Some(value) = scoped.or_else(|| self.values.get(symbol)) {
            return Some(*value);
        }
        let bare = symbol.rsplit("::").next()?;
        self.values.get(bare).copied()
    }

    /// Evaluate `expression`; an empty expression or one where no term
    /// matched yields `fallback`.
    #[must_use]
    pub fn evaluate(&self, expression: &str, fallback: i64, scopes: &[String]) -> EnumEvaluation {
        let expression = expression.trim();
        if expression.is_empty() {
            return EnumEvaluation {
                value: fallback,
                unmatched: Vec::new(),
            };
        }
        let mut value = 0i64;
        let mut matched_any = false;
        let mut unmatched = Vec::new();
        for term in split_terms(expression, '|') {
            match self.evaluate_term(&term, scopes) {
                Some(v) => {
                    value |= v;
                    matched_any = true;
                }
                None => unmatched.push(term),
            }
        }
        EnumEvaluation {
            value: if matched_any { value } else { fallback },
            unmatched,
        }
    }

    fn evaluate_term(&self, term: &str, scopes: &[String]) -> Option<i64> {
        let term = strip_outer_parens(term.trim());
        if term.is_empty() {
            return None;
        }
        if let Some((lhs, op, rhs)) = split_binary(term) {
            let lhs = self.evaluate_term(lhs, scopes)?;
            let rhs = self.evaluate_term(rhs, scopes)?;
            return match op {
                BinaryOp::Shl => lhs.checked_shl(u32::try_from(rhs).ok()?),
                BinaryOp::Shr => lhs.checked_shr(u32::try_from(rhs).ok()?),
                BinaryOp::Add => Some(lhs.wrapping_add(rhs)),
                BinaryOp::Sub => Some(lhs.wrapping_sub(rhs)),
            };
        }
        if let Some(rest) = term.strip_prefix('~') {
            return self.evaluate_term(rest, scopes).map(|v| !v);
        }
        if let Some(value) = parse_integer_literal(term) {
            return Some(value);
        }
        if let Some(rest) = term.strip_prefix('-') {
            return self.evaluate_term(rest, scopes).map(i64::wrapping_neg);
        }
        match term {
            "true" => Some(1),
            "false" => Some(0),
            _ => self.lookup(term, scopes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Shl,
    Shr,
    Add,
    Sub,
}

/// Split on `separator` outside parentheses.
pub(crate) fn split_terms(expression: &str, separator: char) -> Vec<String> {
    let mut terms = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in expression.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if c == separator && depth == 0 {
            terms.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    terms.push(current.trim().to_string());
    terms.retain(|t| !t.is_empty());
    terms
}

fn strip_outer_parens(mut term: &str) -> &str {
    while term.starts_with('(') && term.ends_with(')') && closes_at_end(term) {
        term = term[1..term.len() - 1].trim();
    }
    term
}

// The opening parenthesis is matched by the last character.
fn closes_at_end(term: &str) -> bool {
    let mut depth = 0i32;
    for (i, c) in term.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return i == term.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

/// Split at the last top-level operator of the lowest precedence present:
/// shifts bind looser than `+`/`-`.
fn split_binary(term: &str) -> Option<(&str, BinaryOp, &str)> {
    let bytes = term.as_bytes();
    let mut depth = 0i32;
    let mut shift = None;
    let mut additive = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => depth -= 1,
            b'<' | b'>' if depth == 0 && bytes.get(i + 1) == Some(&bytes[i]) => {
                let op = if bytes[i] == b'<' { BinaryOp::Shl } else { BinaryOp::Shr };
                shift = Some((i, 2, op));
                i += 2;
                continue;
            }
            b'+' | b'-' if depth == 0 && has_left_operand(&term[..i]) => {
                let op = if bytes[i] == b'+' { BinaryOp::Add } else { BinaryOp::Sub };
                additive = Some((i, 1, op));
            }
            _ => {}
        }
        i += 1;
    }
    let (pos, len, op) = shift.or(additive)?;
    Some((term[..pos].trim(), op, term[pos + len..].trim()))
}

fn has_left_operand(before: &str) -> bool {
    before
        .trim_end()
        .chars()
        .last()
        .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == ')')
}

/// Parse a C++ integer literal: decimal, `0x` hex or `0`-prefixed octal,
/// optionally negative, with `u`/`l` suffixes.
#[must_use]
pub fn parse_integer_literal(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text),
    };
    let body = body.trim_end_matches(['u', 'U', 'l', 'L']);
    let (digits, radix) = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        (hex, 16)
    } else if body.len() > 1 && body.starts_with('0') {
        (&body[1..], 8)
    } else {
        (body, 10)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    #[allow(clippy::cast_possible_wrap)]
    let value = u64::from_str_radix(digits, radix).ok()? as i64;
    Some(if negative { value.wrapping_neg() } else { value })
}

// ---------------------------------------------------------------------------
// Builder phase
// ---------------------------------------------------------------------------

impl MetaBuilder<'_, '_> {
    /// Evaluate global enums, then every class's enums with its bases first.
    pub(super) fn evaluate_enums(&mut self) {
        let mut globals = std::mem::take(&mut self.model.global_enums);
        for meta_enum in &mut globals {
            self.evaluate_enum(meta_enum, &[]);
        }
        self.model.global_enums = globals;

        let mut done = HashSet::new();
        let classes: Vec<ClassId> = self
            .model
            .ordinary
            .iter()
            .chain(self.model.templates.iter())
            .copied()
            .collect();
        for id in classes {
            self.figure_out_enum_values_for_class(id, &mut done);
        }
    }

    fn figure_out_enum_values_for_class(&mut self, id: ClassId, done: &mut HashSet<ClassId>) {
        if !done.insert(id) {
            return;
        }
        let class = self.model.class(id);
        let prerequisites: Vec<ClassId> = class
            .base_class
            .into_iter()
            .chain(class.template_base_class)
            .chain(class.enclosing_class)
            .collect();
        for prerequisite in prerequisites {
            self.figure_out_enum_values_for_class(prerequisite, done);
        }

        let mut scopes = vec![self.model.class(id).name.clone()];
        scopes.extend(self.model.base_chain(id).map(|b| self.model.class(b).name.clone()));
        let mut enclosing = self.model.class(id).enclosing_class;
        while let Some(outer) = enclosing {
            scopes.push(self.model.class(outer).name.clone());
            enclosing = self.model.class(outer).enclosing_class;
        }

        let mut enums = std::mem::take(&mut self.model.class_mut(id).enums);
        for meta_enum in &mut enums {
            self.evaluate_enum(meta_enum, &scopes);
        }
        self.model.class_mut(id).enums = enums;
    }

    fn evaluate_enum(&mut self, meta_enum: &mut MetaEnum, class_scopes: &[String]) {
        let mut scopes: Vec<String> = meta_enum.value_scope().map(str::to_string).into_iter().collect();
        scopes.push(meta_enum.name.clone());
        scopes.extend(class_scopes.iter().cloned());

        let mut counter = 0i64;
        for index in 0..meta_enum.values.len() {
            let evaluation =
                self.enum_values
                    .evaluate(&meta_enum.values[index].string_value, counter, &scopes);
            meta_enum.values[index].value = evaluation.value;
            counter = evaluation.value.wrapping_add(1);
            let value = &meta_enum.values[index];
            self.enum_values.register(
                &meta_enum.name,
                meta_enum.value_scope(),
                &value.name,
                value.value,
            );
            if !evaluation.is_matched() {
                let subject = format!("{}::{}", meta_enum.name, meta_enum.values[index].name);
                self.diagnose(
                    DiagnosticKind::UnmatchedEnumValue,
                    &subject,
                    format!("unmatched terms: {}", evaluation.unmatched.join(", ")),
                );
            }
        }
        self.redirect_rejected_values(meta_enum);
        self.report_duplicate_values(meta_enum);
    }

    fn redirect_rejected_values(&mut self, meta_enum: &mut MetaEnum) {
        let rejected = self.db.entry(meta_enum.entry).rejected_enum_values.clone();
        if rejected.is_empty() {
            return;
        }
        let (dropped, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut meta_enum.values)
            .into_iter()
            .partition(|v| rejected.contains(&v.name));
        for value in dropped {
            match kept.iter().find(|k| k.value == value.value) {
                Some(alternative) => {
                    meta_enum
                        .redirections
                        .insert(value.name, alternative.name.clone());
                }
                None => {
                    let subject = format!("{}::{}", meta_enum.name, value.name);
                    self.diagnose(
                        DiagnosticKind::RejectedEnumValueWithoutAlternative,
                        &subject,
                        format!("no remaining value equals {}", value.value),
                    );
                }
            }
        }
        meta_enum.values = kept;
    }

    fn report_duplicate_values(&mut self, meta_enum: &MetaEnum) {
        if self.db.entry(meta_enum.entry).force_integer {
            return;
        }
        for (i, later) in meta_enum.values.iter().enumerate() {
            let Some(earlier) = meta_enum.values[..i].iter().find(|e| e.value == later.value) else {
                continue;
            };
            // An explicit alias of the earlier value is intentional.
            if later.string_value.rsplit("::").next() == Some(earlier.name.as_str()) {
                continue;
            }
            let subject = format!("{}::{}", meta_enum.name, later.name);
            self.diagnose(
                DiagnosticKind::DuplicateEnumValue,
                &subject,
                format!("has the same value as '{}' ({})", earlier.name, later.value),
            );
        }
    }

    /// Qualify enum and flags default arguments now that every value is known.
    pub(super) fn requalify_enum_defaults(&mut self) {
        for index in 0..self.model.arena.len() {
            let mut functions = std::mem::take(&mut self.model.arena[index].functions);
            let class_name = self.model.arena[index].name.clone();
            for function in &mut functions {
                self.requalify_function_defaults(&class_name, function);
            }
            self.model.arena[index].functions = functions;
        }
        let mut globals = std::mem::take(&mut self.model.global_functions);
        for function in &mut globals {
            self.requalify_function_defaults("", function);
        }
        self.model.global_functions = globals;
    }

    fn requalify_function_defaults(&mut self, class_name: &str, function: &mut crate::model::MetaFunction) {
        for index in 0..function.arguments.len() {
            let argument = &function.arguments[index];
            if !argument.ty.is_enum_like() {
                continue;
            }
            let Some(expression) = argument.default_value.clone() else {
                continue;
            };
            match self.requalify_enum_default(&argument.ty, &expression) {
                Some(qualified) => function.arguments[index].default_value = Some(qualified),
                None => {
                    let subject = if class_name.is_empty() {
                        function.minimal_signature()
                    } else {
                        format!("{class_name}::{}", function.minimal_signature())
                    };
                    self.diagnose(
                        DiagnosticKind::UnmatchedDefaultValue,
                        &subject,
                        format!("default '{expression}' does not evaluate"),
                    );
                }
            }
        }
    }

    fn requalify_enum_default(&self, ty: &MetaType, expression: &str) -> Option<String> {
        let entry = self.db.entry(ty.entry);
        let enum_id = match entry.kind {
            EntryKind::Flags => entry.enum_entry?,
            _ => ty.entry,
        };
        let enum_name = &self.db.entry(enum_id).name;
        let Some(meta_enum) = self.model.find_enum(enum_name) else {
            return Some(expression.to_string());
        };
        let scopes: Vec<String> = meta_enum
            .value_scope()
            .map(str::to_string)
            .into_iter()
            .chain(std::iter::once(meta_enum.name.clone()))
            .collect();
        let mut terms = Vec::new();
        for term in split_terms(expression, '|') {
            let bare = term.rsplit("::").next().unwrap_or(&term);
            if parse_integer_literal(&term).is_some() || term.ends_with(')') {
                terms.push(term);
            } else if meta_enum.find_value(bare).is_some() {
                terms.push(match meta_enum.value_scope() {
                    Some(scope) => format!("{scope}::{bare}"),
                    None => bare.to_string(),
                });
            } else if self.enum_values.lookup(&term, &scopes).is_some() {
                terms.push(term);
            } else {
                return None;
            }
        }
        Some(terms.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn table() -> EnumValueTable {
        let mut table = EnumValueTable::default();
        table.register("NS::Flag", Some("NS"), "A", 1);
        table.register("NS::Flag", Some("NS"), "B", 2);
        table.register("NS::Widget::Mode", Some("NS::Widget"), "Fast", 8);
        table
    }

    #[rstest]
    #[case("0", 0)]
    #[case("42", 42)]
    #[case("0x10", 16)]
    #[case("0XffU", 255)]
    #[case("010", 8)]
    #[case("-3", -3)]
    #[case("7ul", 7)]
    fn integer_literals(#[case] text: &str, #[case] expected: i64) {
        assert_eq!(parse_integer_literal(text), Some(expected));
    }

    #[rstest]
    #[case("")]
    #[case("0x")]
    #[case("09")]
    #[case("A")]
    fn non_literals(#[case] text: &str) {
        assert_eq!(parse_integer_literal(text), None);
    }

    #[rstest]
    #[case("A | B", 3)]
    #[case("(A|B)", 3)]
    #[case("1 << 4", 16)]
    #[case("B << 1 | A", 5)]
    #[case("B + 1", 3)]
    #[case("1 << 2 + 1", 8)]
    #[case("0x100 >> 4", 16)]
    #[case("NS::Flag::B", 2)]
    #[case("Mode::Fast", 8)]
    #[case("true", 1)]
    #[case("false | A", 1)]
    #[case("-1", -1)]
    fn expressions(#[case] expression: &str, #[case] expected: i64) {
        let scopes = vec!["NS::Widget".to_string()];
        let evaluation = table().evaluate(expression, 99, &scopes);
        assert!(evaluation.is_matched(), "{expression}: {:?}", evaluation.unmatched);
        assert_eq!(evaluation.value, expected);
    }

    #[test]
    fn complement_is_or_ed_with_other_terms() {
        let mut table = table();
        table.register("NS::Flag", Some("NS"), "C", 3);
        let evaluation = table.evaluate("C|~B", 0, &[]);
        assert_eq!(evaluation.value, 3 | !2);
    }

    #[test]
    fn scoped_names_win_over_later_bare_registrations() {
        let mut table = EnumValueTable::default();
        table.register("Base::E", Some("Base"), "A", 1);
        table.register("Other::F", Some("Other"), "A", 7);
        let scopes = vec![
            "Derived".to_string(),
            "Derived::G".to_string(),
            "Base".to_string(),
        ];
        assert_eq!(table.lookup("A", &scopes), Some(1));
        assert_eq!(table.lookup("Other::A", &scopes), Some(7));
        assert_eq!(table.lookup("A", &[]), Some(7));
    }

    #[test]
    fn empty_expression_uses_fallback() {
        assert_eq!(table().evaluate("  ", 7, &[]).value, 7);
    }

    #[test]
    fn unmatched_terms_contribute_zero() {
        let evaluation = table().evaluate("A | Missing", 7, &[]);
        assert_eq!(evaluation.value, 1);
        assert_eq!(evaluation.unmatched, vec!["Missing".to_string()]);
    }

    #[test]
    fn nothing_matched_keeps_fallback() {
        let evaluation = table().evaluate("Missing | Other", 7, &[]);
        assert_eq!(evaluation.value, 7);
        assert_eq!(evaluation.unmatched.len(), 2);
    }

    #[test]
    fn splits_outside_parentheses_only() {
        assert_eq!(
            split_terms("A | f(B|C) | D", '|'),
            vec!["A".to_string(), "f(B|C)".to_string(), "D".to_string()]
        );
    }
}
