//! Template-driven synthetic document generation for synthdoc.
//!
//! This crate fills template fields from the builtin and custom value
//! registries, places the result on a background, persists each sample and
//! optionally degrades it, with deterministic per-sample seeding.

pub mod augment;
pub mod background;
pub mod compositor;
pub mod engine;
pub mod errors;
pub mod generators;
pub mod model;
pub mod output;
pub mod text;

pub use augment::{Degrader, ScanDegrader};
pub use background::{BackgroundCorpus, DirectoryCorpus, EmptyCorpus, MemoryCorpus, Placement};
pub use engine::{BatchEngine, BatchResult, RenderedSample, SampleRenderer};
pub use errors::GenerationError;
pub use generators::{GeneratorContext, GeneratorRegistry, RegistrySet, ValueGenerator};
pub use model::{
    BackgroundOptions, BatchReport, FailurePolicy, GenerateOptions, ManifestEntry, SampleFailure,
    SampleMetadata, TemplateSelection, TextOptions,
};
pub use text::{Font, TextExtent};
