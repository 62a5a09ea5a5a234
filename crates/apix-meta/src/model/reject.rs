//! Rejection bookkeeping.
//!
//! Rejections are not errors: the entity is left out of the model and the
//! reason is recorded under its qualified name.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    NotInTypeSystem,
    GenerationDisabled,
    RedefinedToNotClass,
    UnmatchedReturnType,
    UnmatchedArgumentType,
    ApiIncompatible,
}

impl RejectReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotInTypeSystem => "not_in_type_system",
            Self::GenerationDisabled => "generation_disabled",
            Self::RedefinedToNotClass => "redefined_to_not_class",
            Self::UnmatchedReturnType => "unmatched_return_type",
            Self::UnmatchedArgumentType => "unmatched_argument_type",
            Self::ApiIncompatible => "api_incompatible",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind reject maps, keyed by qualified name (functions by
/// `Class::signature`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RejectMaps {
    pub classes: BTreeMap<String, RejectReason>,
    pub enums: BTreeMap<String, RejectReason>,
    pub functions: BTreeMap<String, RejectReason>,
    pub fields: BTreeMap<String, RejectReason>,
}

impl RejectMaps {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
            && self.enums.is_empty()
            && self.functions.is_empty()
            && self.fields.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.classes.len() + self.enums.len() + self.functions.len() + self.fields.len()
    }

    /// Names in `map` grouped by reason.
    #[must_use]
    pub fn by_reason(map: &BTreeMap<String, RejectReason>) -> BTreeMap<RejectReason, Vec<&str>> {
        let mut grouped: BTreeMap<RejectReason, Vec<&str>> = BTreeMap::new();
        for (name, reason) in map {
            grouped.entry(*reason).or_default().push(name);
        }
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn groups_by_reason() {
        let mut maps = RejectMaps::default();
        maps.classes
            .insert("A".to_string(), RejectReason::NotInTypeSystem);
        maps.classes
            .insert("B".to_string(), RejectReason::GenerationDisabled);
        maps.classes
            .insert("C".to_string(), RejectReason::NotInTypeSystem);
        let grouped = RejectMaps::by_reason(&maps.classes);
        assert_eq!(grouped[&RejectReason::NotInTypeSystem], vec!["A", "C"]);
        assert_eq!(grouped[&RejectReason::GenerationDisabled], vec!["B"]);
        assert_eq!(maps.len(), 3);
    }
}
