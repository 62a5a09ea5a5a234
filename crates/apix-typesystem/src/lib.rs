//! # apix-typesystem
//!
//! The type registry the metamodel builder cross-references.
//!
//! - [`TypeDatabase`]: an arena of [`TypeEntry`] rules keyed by qualified
//!   C++ name, plus rejection rules, global added functions and function
//!   modifications, and the configured API version
//! - [`FunctionModification`] / [`AddedFunction`]: per-signature rules
//! - [`TypeSystemDocument`]: a TOML front end that fills a database
//! - signature helpers shared with the builder ([`normalize_signature`])

mod database;
mod document;
mod entry;
mod error;
mod modification;
mod signature;

pub use database::{Rejection, TypeDatabase, WILDCARD};
pub use document::{AddFunctionSpec, EntrySpec, GenerateSpec, SpecKind, TypeSystemDocument};
pub use entry::{
    CodeGeneration, ContainerKind, EntryKind, Include, IncludeKind, TypeEntry, TypeEntryId,
};
pub use error::TypeSystemError;
pub use modification::{
    AccessModifier, AddedArgument, AddedFunction, ArgumentModification, Finality,
    FunctionModification, Removal,
};
pub use signature::{normalize_signature, signature_name, split_top_level, strip_template_args};
