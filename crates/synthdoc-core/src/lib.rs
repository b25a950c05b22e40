//! Core contracts and helpers for synthdoc.
//!
//! This crate defines the canonical template types, the template metadata
//! document format, validation helpers, and the read-only template store
//! shared by the generator and the CLI.

pub mod error;
pub mod metadata;
pub mod store;
pub mod template;
pub mod validation;

pub use error::{Error, Result};
pub use metadata::{MetadataDocument, TemplateEntry, load_metadata, parse_metadata};
pub use store::{LoadedTemplates, TemplateStore};
pub use template::{BBox, FieldSpec, Template, ValueSource, ValueSourceKind};
pub use validation::validate_template;
