use super::function::Visibility;
use super::types::MetaType;

/// A data member of a class or namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaField {
    pub name: String,
    pub ty: MetaType,
    pub visibility: Visibility,
    pub is_static: bool,
}
