use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;
use uuid::Uuid;

use crate::categorize::classify_path;
use crate::error::{AtlasError, Result};
use crate::model::{
    bytes_to_gb, bytes_to_mb, FileCategory, FileRecord, LargeFilesReport, ScanEntry,
    BYTES_PER_GB, BYTES_PER_MB,
};
use crate::stat::stat_path;
use crate::walker::{BoundedWalker, Visit, WalkOptions};

const WINDOWS_RESTRICTED_NAMES: &[&str] = &[
    "windows",
    "program files",
    "program files (x86)",
    "$recycle.bin",
];

const UNIX_PSEUDO_ROOTS: &[&str] = &["/proc", "/sys", "/dev"];

const STALE_AGE_DAYS: f64 = 365.0;

#[derive(Debug, Clone)]
pub struct LargeFileOptions {
    pub min_size_mb: u64,
    pub max_results: usize,
    pub walk: WalkOptions,
    pub scan_id: Option<String>,
}

impl Default for LargeFileOptions {
    fn default() -> Self {
        Self {
            min_size_mb: 100,
            max_results: 20,
            walk: WalkOptions::default(),
            scan_id: None,
        }
    }
}

/// Case-insensitive substring match against protected Windows directory names.
pub fn matches_restricted_name(directory: &str) -> bool {
    let lowered = directory.to_lowercase();
    WINDOWS_RESTRICTED_NAMES
        .iter()
        .any(|restricted| lowered.contains(restricted))
}

pub fn is_pseudo_filesystem(directory: &Path) -> bool {
    let normalized = directory.to_string_lossy().replace('\\', "/");
    UNIX_PSEUDO_ROOTS
        .iter()
        .any(|prefix| normalized == *prefix || normalized.starts_with(&format!("{prefix}/")))
}

/// Rejects directories that must never be traversed on this platform.
pub fn check_scan_allowed(directory: &Path) -> Result<()> {
    let restricted = if cfg!(windows) {
        matches_restricted_name(&directory.to_string_lossy())
    } else if cfg!(unix) {
        is_pseudo_filesystem(directory)
    } else {
        false
    };

    if restricted {
        return Err(AtlasError::Restricted(directory.to_path_buf()));
    }
    Ok(())
}

pub fn find_large_files(directory: &Path, options: &LargeFileOptions) -> Result<LargeFilesReport> {
    check_scan_allowed(directory)?;
    let root = stat_path(directory)?.ok_or_else(|| AtlasError::NotFound(directory.to_path_buf()))?;
    if !root.is_directory {
        return Err(AtlasError::NotADirectory(directory.to_path_buf()));
    }

    let scan_id = options
        .scan_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let now = Utc::now();
    let min_size_bytes = options.min_size_mb.saturating_mul(BYTES_PER_MB);
    let collect_cap = options.max_results.saturating_mul(2);

    info!(
        "large file scan {scan_id}: {} (min {} MB, max {})",
        directory.display(),
        options.min_size_mb,
        options.max_results
    );

    let mut files = Vec::new();
    let mut total_size_bytes = 0_u64;
    let walker = BoundedWalker::new(directory, &options.walk.unbounded());
    let summary = walker.walk(|entry| {
        if entry.is_directory || entry.size_bytes <= min_size_bytes {
            return Ok(Visit::Continue);
        }
        total_size_bytes = total_size_bytes.saturating_add(entry.size_bytes);
        files.push(file_record(entry, now));
        if files.len() >= collect_cap {
            return Ok(Visit::Stop);
        }
        Ok(Visit::Continue)
    })?;

    files.sort_by(|a, b| {
        b.size_bytes
            .cmp(&a.size_bytes)
            .then_with(|| a.path.cmp(&b.path))
    });
    files.truncate(options.max_results);

    let recommendations = large_file_recommendations(&files, total_size_bytes);
    info!(
        "large file scan {scan_id}: {} file(s) kept, {} entries visited",
        files.len(),
        summary.visited
    );

    Ok(LargeFilesReport {
        scan_id,
        directory: directory.to_string_lossy().to_string(),
        min_size_mb: options.min_size_mb,
        files_found: files.len(),
        total_size_gb: bytes_to_gb(total_size_bytes),
        files,
        recommendations,
        scan_timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        warnings: summary.into_warnings(walker.root()),
    })
}

fn file_record(entry: &ScanEntry, now: DateTime<Utc>) -> FileRecord {
    let (extension, category) = classify_path(&entry.path);
    FileRecord {
        path: entry.path.to_string_lossy().to_string(),
        size_bytes: entry.size_bytes,
        size_mb: bytes_to_mb(entry.size_bytes),
        age_days: entry.age_days(now).unwrap_or(0.0),
        extension,
        category,
        last_modified: entry
            .modified_at
            .map(|time| time.to_rfc3339_opts(SecondsFormat::Secs, true)),
    }
}

fn large_file_recommendations(files: &[FileRecord], total_size_bytes: u64) -> Vec<String> {
    let mut recommendations = Vec::new();
    if total_size_bytes > BYTES_PER_GB {
        recommendations.push("Consider archiving or compressing old large files".to_string());
    }

    let videos = files
        .iter()
        .filter(|file| file.category == FileCategory::Video)
        .count();
    if videos > 0 {
        recommendations.push(format!(
            "Found {videos} large video files - consider compression"
        ));
    }

    let stale = files
        .iter()
        .filter(|file| file.age_days > STALE_AGE_DAYS)
        .count();
    if stale > 0 {
        recommendations.push(format!("Found {stale} files older than 1 year"));
    }
    recommendations
}

#[cfg(test)]
mod tests {
    use std::fs::{self, File};
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    use filetime::FileTime;
    use tempfile::TempDir;

    use super::{
        find_large_files, is_pseudo_filesystem, matches_restricted_name, LargeFileOptions,
    };
    use crate::error::AtlasError;
    use crate::model::{FileCategory, BYTES_PER_MB};

    fn sparse(path: &Path, mb: u64) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("mkdirs");
        }
        File::create(path)
            .and_then(|file| file.set_len(mb * BYTES_PER_MB))
            .expect("sparse file");
    }

    fn options(min_size_mb: u64, max_results: usize) -> LargeFileOptions {
        LargeFileOptions {
            min_size_mb,
            max_results,
            ..LargeFileOptions::default()
        }
    }

    #[test]
    fn ranks_and_caps_results_by_size() {
        let temp = TempDir::new().expect("tempdir");
        sparse(&temp.path().join("a/movie.MP4"), 40);
        sparse(&temp.path().join("b/c/backup.zip"), 25);
        sparse(&temp.path().join("notes.pdf"), 12);
        sparse(&temp.path().join("small.bin"), 2);

        let report = find_large_files(temp.path(), &options(10, 2)).expect("scan");

        assert_eq!(report.files_found, 2);
        assert_eq!(report.files.len(), 2);
        assert!(report.files[0].size_mb >= report.files[1].size_mb);
        assert_eq!(report.files[0].category, FileCategory::Video);
        assert_eq!(report.files[0].extension, ".mp4");
        assert_eq!(report.files[1].category, FileCategory::Archive);
        assert!(report
            .recommendations
            .iter()
            .any(|item| item == "Found 1 large video files - consider compression"));
    }

    #[test]
    fn size_threshold_is_strict() {
        let temp = TempDir::new().expect("tempdir");
        sparse(&temp.path().join("exact.bin"), 10);
        sparse(&temp.path().join("over.bin"), 11);

        let report = find_large_files(temp.path(), &options(10, 20)).expect("scan");
        assert_eq!(report.files.len(), 1);
        assert!(report.files[0].path.ends_with("over.bin"));
    }

    #[test]
    fn stops_collecting_at_twice_the_cap() {
        let temp = TempDir::new().expect("tempdir");
        for name in ["a.bin", "b.bin", "c.bin", "d.bin", "e.bin"] {
            sparse(&temp.path().join(name), 3);
        }

        let report = find_large_files(temp.path(), &options(1, 1)).expect("scan");
        assert_eq!(report.files.len(), 1);
        // two of five collected before the early stop
        assert_eq!(report.total_size_gb, 0.01);
    }

    #[test]
    fn flags_large_totals_and_stale_files() {
        let temp = TempDir::new().expect("tempdir");
        let old = temp.path().join("archive/old.tar");
        sparse(&old, 700);
        sparse(&temp.path().join("fresh.iso"), 500);
        let two_years_ago = SystemTime::now() - Duration::from_secs(2 * 365 * 86_400);
        filetime::set_file_mtime(&old, FileTime::from_system_time(two_years_ago))
            .expect("backdate");

        let report = find_large_files(temp.path(), &options(100, 20)).expect("scan");

        assert_eq!(report.total_size_gb, 1.17);
        assert_eq!(
            report.recommendations,
            vec![
                "Consider archiving or compressing old large files".to_string(),
                "Found 1 files older than 1 year".to_string(),
            ]
        );
        let stale = report
            .files
            .iter()
            .find(|file| file.path.ends_with("old.tar"))
            .expect("old file listed");
        assert!(stale.age_days > 700.0);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let err = find_large_files(Path::new("/nonexistent/storage-atlas"), &options(100, 20))
            .expect_err("missing directory");
        assert!(matches!(err, AtlasError::NotFound(_)));
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn file_path_is_rejected() {
        let temp = TempDir::new().expect("tempdir");
        let file = temp.path().join("one.bin");
        fs::write(&file, b"x").expect("write");
        let err = find_large_files(&file, &options(1, 20)).expect_err("not a directory");
        assert!(matches!(err, AtlasError::NotADirectory(_)));
    }

    #[test]
    fn restricted_names_match_case_insensitively() {
        assert!(matches_restricted_name("C:\\WINDOWS\\System32"));
        assert!(matches_restricted_name("D:\\Program Files (x86)\\Steam"));
        assert!(matches_restricted_name("C:\\$Recycle.Bin"));
        assert!(!matches_restricted_name("D:\\Media\\Movies"));
    }

    #[test]
    fn pseudo_filesystems_are_detected_by_prefix() {
        assert!(is_pseudo_filesystem(Path::new("/proc")));
        assert!(is_pseudo_filesystem(Path::new("/sys/kernel")));
        assert!(!is_pseudo_filesystem(Path::new("/home/devon")));
        assert!(!is_pseudo_filesystem(Path::new("/process")));
    }

    #[cfg(unix)]
    #[test]
    fn pseudo_filesystem_scan_is_refused() {
        let err = find_large_files(Path::new("/proc"), &options(100, 20)).expect_err("refused");
        assert!(matches!(err, AtlasError::Restricted(_)));
    }
}
