use std::path::{Path, PathBuf};

use image::RgbaImage;
use tracing::debug;
use walkdir::WalkDir;

use crate::errors::GenerationError;

/// File extensions indexed by [`DirectoryCorpus`].
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "webp"];

/// Read-only, randomly addressable collection of background photos.
///
/// Indexes are stable for the lifetime of the corpus.
pub trait BackgroundCorpus: Send + Sync {
    fn len(&self) -> usize;

    fn load(&self, index: usize) -> Result<RgbaImage, GenerationError>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A corpus with no photos; every background is a flat canvas.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCorpus;

impl BackgroundCorpus for EmptyCorpus {
    fn len(&self) -> usize {
        0
    }

    fn load(&self, index: usize) -> Result<RgbaImage, GenerationError> {
        Err(GenerationError::Corpus(format!(
            "index {index} requested from an empty corpus"
        )))
    }
}

/// Image files below a directory, in sorted path order.
#[derive(Debug, Clone)]
pub struct DirectoryCorpus {
    root: PathBuf,
    paths: Vec<PathBuf>,
}

impl DirectoryCorpus {
    pub fn open(root: &Path) -> Result<Self, GenerationError> {
        if !root.is_dir() {
            return Err(GenerationError::Corpus(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        let mut paths = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(ext) = entry.path().extension().and_then(|v| v.to_str()) else {
                continue;
            };
            if IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
                paths.push(entry.into_path());
            }
        }
        paths.sort();
        debug!(root = %root.display(), images = paths.len(), "background corpus indexed");
        Ok(Self {
            root: root.to_path_buf(),
            paths,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl BackgroundCorpus for DirectoryCorpus {
    fn len(&self) -> usize {
        self.paths.len()
    }

    fn load(&self, index: usize) -> Result<RgbaImage, GenerationError> {
        let path = self.paths.get(index).ok_or_else(|| {
            GenerationError::Corpus(format!(
                "index {index} out of range for {} images",
                self.paths.len()
            ))
        })?;
        let image = image::open(path)
            .map_err(|err| GenerationError::Corpus(format!("{}: {err}", path.display())))?;
        Ok(image.to_rgba8())
    }
}

/// Backgrounds held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCorpus {
    images: Vec<RgbaImage>,
}

impl MemoryCorpus {
    pub fn new(images: Vec<RgbaImage>) -> Self {
        Self { images }
    }
}

impl BackgroundCorpus for MemoryCorpus {
    fn len(&self) -> usize {
        self.images.len()
    }

    fn load(&self, index: usize) -> Result<RgbaImage, GenerationError> {
        self.images.get(index).cloned().ok_or_else(|| {
            GenerationError::Corpus(format!(
                "index {index} out of range for {} images",
                self.images.len()
            ))
        })
    }
}
