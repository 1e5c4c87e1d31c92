//! Per-entry stat lookups with narrow error suppression.
//!
//! Only `NotFound` and `PermissionDenied` are treated as "skip this entry";
//! every other failure surfaces as [`AtlasError::Io`] so the calling tool can
//! report it once at the top level.

use std::fs::{self, Metadata};
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{AtlasError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStat {
    pub size_bytes: u64,
    pub modified_at: Option<DateTime<Utc>>,
    pub is_directory: bool,
}

impl From<&Metadata> for EntryStat {
    fn from(metadata: &Metadata) -> Self {
        Self {
            size_bytes: if metadata.is_dir() { 0 } else { metadata.len() },
            modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            is_directory: metadata.is_dir(),
        }
    }
}

pub fn is_skippable(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied
    )
}

/// Maps an io result onto `Ok(Some)`, a skip (`Ok(None)`), or a hard error.
pub fn skip_or_fail<T>(path: &Path, result: io::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if is_skippable(err.kind()) => {
            debug!("skipping {}: {}", path.display(), err);
            Ok(None)
        }
        Err(err) => Err(AtlasError::io(path, err)),
    }
}

/// Follows symlinks, like a plain `stat`.
pub fn stat_path(path: &Path) -> Result<Option<EntryStat>> {
    Ok(skip_or_fail(path, fs::metadata(path))?.map(|metadata| EntryStat::from(&metadata)))
}

pub fn entry_stat(entry: &walkdir::DirEntry) -> Result<Option<EntryStat>> {
    match entry.metadata() {
        Ok(metadata) => Ok(Some(EntryStat::from(&metadata))),
        Err(err) => skip_walk_error(entry.path(), err),
    }
}

/// Loop errors carry no io error and are skipped along with the narrow io kinds.
pub fn skip_walk_error<T>(fallback: &Path, err: walkdir::Error) -> Result<Option<T>> {
    let path = err.path().unwrap_or(fallback).to_path_buf();
    match err.io_error().map(io::Error::kind) {
        None => {
            debug!("skipping {}: {}", path.display(), err);
            Ok(None)
        }
        Some(kind) if is_skippable(kind) => {
            debug!("skipping {}: {}", path.display(), err);
            Ok(None)
        }
        Some(_) => Err(AtlasError::io(path, io::Error::from(err))),
    }
}

/// `true` only when the path can be stat'ed; failures of any kind read as absent.
pub fn exists(path: &Path) -> bool {
    fs::metadata(path).is_ok()
}

/// File names (not directories) directly inside `dir`, sorted.
pub fn list_file_names(dir: &Path) -> Result<Vec<String>> {
    let Some(read_dir) = skip_or_fail(dir, fs::read_dir(dir))? else {
        return Ok(Vec::new());
    };

    let mut names = Vec::new();
    for item in read_dir {
        let Some(entry) = skip_or_fail(dir, item)? else {
            continue;
        };
        let Some(file_type) = skip_or_fail(&entry.path(), entry.file_type())? else {
            continue;
        };
        if file_type.is_file() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
    }
    names.sort();
    Ok(names)
}
