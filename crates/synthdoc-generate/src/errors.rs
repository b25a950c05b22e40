use synthdoc_core::ValueSourceKind;
use thiserror::Error;

use crate::model::BatchReport;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Template(#[from] synthdoc_core::Error),
    #[error("unknown {kind} generator '{id}'")]
    UnknownGenerator { kind: ValueSourceKind, id: String },
    #[error("background placement failed: {0}")]
    BackgroundFit(String),
    #[error("background corpus error: {0}")]
    Corpus(String),
    #[error("font error: {0}")]
    Font(String),
    #[error("augmentation failed: {0}")]
    Augment(String),
    #[error("invalid options: {0}")]
    InvalidOptions(String),
    #[error("thread pool error: {0}")]
    ThreadPool(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sample {index} panicked: {message}")]
    Panicked { index: u64, message: String },
    #[error("generation failed: all {} samples failed", .0.samples_requested)]
    Failed(Box<BatchReport>),
    #[error("sample {index} failed: {source}")]
    SampleFailed {
        index: u64,
        #[source]
        source: Box<GenerationError>,
    },
}

impl GenerationError {
    pub fn unknown_generator(kind: ValueSourceKind, id: impl Into<String>) -> Self {
        GenerationError::UnknownGenerator {
            kind,
            id: id.into(),
        }
    }

    /// Stable short code used in reports and log lines.
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::Template(_) => "template_load",
            GenerationError::UnknownGenerator { .. } => "unknown_generator",
            GenerationError::BackgroundFit(_) => "background_fit",
            GenerationError::Corpus(_) => "corpus",
            GenerationError::Font(_) => "font",
            GenerationError::Augment(_) => "augment",
            GenerationError::InvalidOptions(_) => "invalid_options",
            GenerationError::ThreadPool(_) => "thread_pool",
            GenerationError::Io(_) => "io",
            GenerationError::Image(_) => "image",
            GenerationError::Json(_) => "json",
            GenerationError::Panicked { .. } => "panic",
            GenerationError::Failed(_) => "failed",
            GenerationError::SampleFailed { source, .. } => source.code(),
        }
    }
}
