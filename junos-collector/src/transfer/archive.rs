//! tar.gz archival of a run's output directory.

use crate::utils::errors::{CollectorError, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::{Path, PathBuf};
use tar::Builder;
use tracing::info;

/// A finished archive on disk.
#[derive(Debug, Clone)]
pub struct Archive {
    pub path: PathBuf,
    pub size: u64,
}

/// Path of the archive written for `dir`: a sibling named `<dir>.tar.gz`.
pub fn archive_path(dir: &Path) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .ok_or_else(|| CollectorError::Archive(format!("{} has no file name", dir.display())))?;
    Ok(dir.with_file_name(format!("{}.tar.gz", name.to_string_lossy())))
}

/// Compress `dir` into `<dir>.tar.gz`, stored under its own base name.
pub fn create_archive(dir: &Path) -> Result<Archive> {
    let path = archive_path(dir)?;
    let base = dir
        .file_name()
        .ok_or_else(|| CollectorError::Archive(format!("{} has no file name", dir.display())))?;

    info!("Compressing directory {} to {}", dir.display(), path.display());

    let file = File::create(&path)?;
    let mut builder = Builder::new(GzEncoder::new(file, Compression::default()));
    builder.append_dir_all(base, dir).map_err(|e| {
        CollectorError::Archive(format!("cannot add {}: {}", dir.display(), e))
    })?;
    builder.into_inner()?.finish()?;

    let size = std::fs::metadata(&path)?.len();
    info!("Archive created: {} ({})", path.display(), format_size(size));

    Ok(Archive { path, size })
}

/// Human-readable size, 1024-based: `512 bytes`, `1.50 KB`, `2.00 MB`.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match bytes {
        b if b < KB => format!("{} bytes", b),
        b if b < MB => format!("{:.2} KB", b as f64 / KB as f64),
        b if b < GB => format!("{:.2} MB", b as f64 / MB as f64),
        b => format!("{:.2} GB", b as f64 / GB as f64),
    }
}
