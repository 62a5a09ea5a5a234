//! Non-fatal findings collected during a build.
//!
//! Every diagnostic is also emitted as a `tracing` warning when recorded.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    UnknownBaseClass,
    UnknownTemplateBase,
    AmbiguousPrimaryBase,
    IgnoredTemplateArgument,
    UnmatchedEnumValue,
    DuplicateEnumValue,
    RejectedEnumValueWithoutAlternative,
    UnmatchedDefaultValue,
    UnknownPropertyType,
    MissingNamespaceEntry,
    DependencyCycle,
    TypeNotDefined,
    GlobalFunctionNotDefined,
    EnumNotDeclared,
    ModificationNotFound,
}

impl DiagnosticKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnknownBaseClass => "unknown_base_class",
            Self::UnknownTemplateBase => "unknown_template_base",
            Self::AmbiguousPrimaryBase => "ambiguous_primary_base",
            Self::IgnoredTemplateArgument => "ignored_template_argument",
            Self::UnmatchedEnumValue => "unmatched_enum_value",
            Self::DuplicateEnumValue => "duplicate_enum_value",
            Self::RejectedEnumValueWithoutAlternative => "rejected_enum_value_without_alternative",
            Self::UnmatchedDefaultValue => "unmatched_default_value",
            Self::UnknownPropertyType => "unknown_property_type",
            Self::MissingNamespaceEntry => "missing_namespace_entry",
            Self::DependencyCycle => "dependency_cycle",
            Self::TypeNotDefined => "type_not_defined",
            Self::GlobalFunctionNotDefined => "global_function_not_defined",
            Self::EnumNotDeclared => "enum_not_declared",
            Self::ModificationNotFound => "modification_not_found",
        }
    }

    /// Raised by the consistency checks after the build.
    #[must_use]
    pub const fn is_consistency_check(self) -> bool {
        matches!(
            self,
            Self::TypeNotDefined
                | Self::GlobalFunctionNotDefined
                | Self::EnumNotDeclared
                | Self::ModificationNotFound
        )
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Qualified name of the entity concerned.
    pub subject: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.subject, self.message)
    }
}
