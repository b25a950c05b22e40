use std::path::Path;

use thiserror::Error;

use synthdoc_generate::GenerateOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Options from a TOML file, or the defaults when no file is given.
///
/// Missing keys keep their default values.
pub fn load_options(path: Option<&Path>) -> Result<GenerateOptions, ConfigError> {
    let Some(path) = path else {
        return Ok(GenerateOptions::default());
    };
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    parse_options(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub fn parse_options(content: &str) -> Result<GenerateOptions, toml::de::Error> {
    toml::from_str(content)
}
