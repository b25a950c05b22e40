use thiserror::Error;

/// Core error type shared across synthdoc crates.
#[derive(Debug, Error)]
pub enum Error {
    /// A template's base image or metadata could not be loaded.
    #[error("failed to load template '{template}': {reason}")]
    TemplateLoad { template: String, reason: String },
    /// The template violates internal invariants.
    #[error("invalid template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn template_load(template: impl Into<String>, reason: impl ToString) -> Self {
        Error::TemplateLoad {
            template: template.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_template(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidTemplate {
            template: template.into(),
            reason: reason.into(),
        }
    }

    /// Name of the template this error is about, when there is one.
    pub fn template(&self) -> Option<&str> {
        match self {
            Error::TemplateLoad { template, .. } | Error::InvalidTemplate { template, .. } => {
                Some(template)
            }
            _ => None,
        }
    }
}

/// Convenience alias for results returned by synthdoc crates.
pub type Result<T> = std::result::Result<T, Error>;
