//! # apix-codemodel
//!
//! The parsed C++ code model consumed by the API extractor.
//!
//! The tokenizer and parser that produce this model live outside the
//! extractor; this crate only defines the shape they hand over:
//! - [`TypeInfo`]: a raw, unresolved type occurrence (name parts,
//!   cv-qualifiers, indirections, reference kind, arrays, template arguments)
//! - the scope tree ([`FileModel`] -> [`NamespaceModel`] -> [`ClassModel`] ->
//!   functions, variables, enums, typedefs), loadable from a JSON dump
//! - [`ScopeRef`] / [`ItemRef`]: closed sum types used to walk the tree and
//!   unwrap typedefs

mod error;
mod model;
mod type_info;
mod type_parser;

pub use error::CodeModelError;
pub use model::{
    AccessPolicy, ArgumentModel, BaseClassModel, ClassKind, ClassModel, EnumKind, EnumModel,
    EnumeratorModel, FileModel, FunctionKind, FunctionModel, ItemRef, NamespaceModel, ScopeModel,
    ScopeRef, TypedefModel, VariableModel,
};
pub use type_info::{ReferenceType, TypeInfo};
