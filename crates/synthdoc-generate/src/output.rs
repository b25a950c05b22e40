use std::fs::{OpenOptions, create_dir_all};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat};
use serde::Serialize;

use crate::errors::GenerationError;

pub const MANIFEST_FILE: &str = "metadata.json";
pub const REPORT_FILE: &str = "generation_report.json";

const AUGMENT_STREAM: &str = "augment";

pub fn sample_image_name(index: u64) -> String {
    format!("sample_{index}.png")
}

pub fn sample_metadata_name(index: u64) -> String {
    format!("sample_{index}_metadata.json")
}

pub fn augmented_image_name(index: u64) -> String {
    format!("aug_sample_{index}.png")
}

/// Seed for sample `index`; independent of worker count and completion order.
pub fn sample_seed(batch_seed: u64, index: u64) -> u64 {
    let mut hash = batch_seed ^ index.wrapping_mul(0x9e3779b97f4a7c15);
    hash = hash.wrapping_mul(0x100000001b3);
    hash
}

/// Seed for the augmentation pass of sample `index`, distinct from its generation seed.
pub fn augment_seed(batch_seed: u64, index: u64) -> u64 {
    sample_seed(hash_seed(batch_seed, AUGMENT_STREAM), index)
}

fn hash_seed(seed: u64, key: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in key.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), GenerationError> {
    let data = serde_json::to_vec_pretty(value)?;
    write_bytes_atomic(path, &data)
}

/// Encode as PNG and write atomically.
pub fn write_image_atomic(
    path: &Path,
    image: impl Into<DynamicImage>,
) -> Result<(), GenerationError> {
    let mut buffer = Cursor::new(Vec::new());
    image.into().write_to(&mut buffer, ImageFormat::Png)?;
    write_bytes_atomic(path, buffer.get_ref())
}

/// Write to `<name>.tmp`, sync, then rename over `path`.
pub fn write_bytes_atomic(path: &Path, data: &[u8]) -> Result<(), GenerationError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }

    let tmp_path = temp_path(path)?;
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&tmp_path)?;
    file.write_all(data)?;
    file.sync_all()?;

    std::fs::rename(&tmp_path, path)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            sync_dir(parent)?;
        }
    }

    Ok(())
}

fn temp_path(path: &Path) -> Result<PathBuf, GenerationError> {
    let file_name = path.file_name().ok_or_else(|| {
        GenerationError::InvalidOptions(format!("invalid path for atomic write: {}", path.display()))
    })?;
    let tmp_name = format!("{}.tmp", file_name.to_string_lossy());
    Ok(path.with_file_name(tmp_name))
}

#[cfg(unix)]
fn sync_dir(path: &Path) -> io::Result<()> {
    let dir = OpenOptions::new().read(true).open(path)?;
    dir.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
