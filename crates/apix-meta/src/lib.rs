//! # apix-meta
//!
//! Resolves a parsed C++ code model against a type registry into a
//! binding-ready metamodel.
//!
//! - [`MetaBuilder`]: runs the build phases over a [`apix_codemodel::FileModel`]
//!   and an [`apix_typesystem::TypeDatabase`]
//! - [`MetaModel`]: the result, with classes in dependency order, template
//!   classes, global functions and enums, reject maps and diagnostics
//! - [`EnumValueTable`]: the enum value expression evaluator, usable on its own
//!
//! ```no_run
//! use apix_codemodel::FileModel;
//! use apix_config::BuilderConfig;
//! use apix_typesystem::TypeSystemDocument;
//!
//! let file = FileModel::from_json("{}").expect("code model");
//! let mut db = TypeSystemDocument::from_toml_str("")
//!     .and_then(TypeSystemDocument::into_database)
//!     .expect("type system");
//! let model = apix_meta::build_model(&file, &mut db, BuilderConfig::default()).expect("build");
//! for class in model.sorted_classes() {
//!     println!("{}", class.name);
//! }
//! ```

mod builder;
mod error;
mod model;

pub use builder::{EnumEvaluation, EnumValueTable, MetaBuilder, build_model};
pub use error::BuildError;
pub use model::{
    ClassAttributes, ClassId, ClassKind, Diagnostic, DiagnosticKind, FunctionAttributes,
    FunctionType, MetaArgument, MetaClass, MetaEnum, MetaEnumValue, MetaField, MetaFunction,
    MetaModel, MetaType, PropertyDeclaration, PropertySpec, RejectMaps, RejectReason,
    UsagePattern, Visibility,
};
