use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::{Duration, Instant};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::model::ScanEntry;
use crate::stat::{entry_stat, skip_walk_error};

/// What the visitor wants the walker to do after seeing an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    /// Do not descend into this directory. Ignored for files.
    Prune,
    /// End the walk now; the summary is marked as stopped.
    Stop,
}

#[derive(Debug, Clone, Default)]
pub struct WalkOptions {
    /// Deepest directory (root = 0) whose contents are reported. `None` walks everything.
    pub max_depth: Option<usize>,
    pub excludes: Vec<String>,
    pub cancel_flag: Option<Arc<AtomicBool>>,
    pub deadline: Option<Instant>,
}

impl WalkOptions {
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.deadline = timeout.map(|limit| Instant::now() + limit);
        self
    }

    /// Same limits and excludes, no depth bound. Used for measuring subtrees.
    pub fn unbounded(&self) -> Self {
        Self {
            max_depth: None,
            ..self.clone()
        }
    }

    fn interruption(&self) -> Option<Interruption> {
        if self
            .cancel_flag
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Some(Interruption::Cancelled);
        }
        if self
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
        {
            return Some(Interruption::DeadlineExceeded);
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interruption {
    Cancelled,
    DeadlineExceeded,
}

#[derive(Debug, Clone, Default)]
pub struct WalkSummary {
    pub visited: u64,
    pub skipped: u64,
    pub pruned: u64,
    pub stopped: bool,
    pub interrupted: Option<Interruption>,
    pub warnings: Vec<String>,
}

impl WalkSummary {
    pub fn absorb(&mut self, other: WalkSummary) {
        self.visited = self.visited.saturating_add(other.visited);
        self.skipped = self.skipped.saturating_add(other.skipped);
        self.pruned = self.pruned.saturating_add(other.pruned);
        if self.interrupted.is_none() {
            self.interrupted = other.interrupted;
        }
        for warning in other.warnings {
            if !self.warnings.contains(&warning) {
                self.warnings.push(warning);
            }
        }
    }

    pub fn into_warnings(mut self, root: &Path) -> Vec<String> {
        match self.interrupted {
            Some(Interruption::Cancelled) => self.warnings.push(format!(
                "scan canceled while walking {}; results contain partial data",
                root.display()
            )),
            Some(Interruption::DeadlineExceeded) => self.warnings.push(format!(
                "scan deadline reached while walking {}; results contain partial data",
                root.display()
            )),
            None => {}
        }
        self.warnings
    }
}

/// Depth-bounded, prunable, fault-tolerant traversal rooted at one directory.
///
/// Entries are visited in file-name order so repeated walks over an unchanged
/// tree yield the same sequence. Symlinks and special files are not reported.
pub struct BoundedWalker {
    root: PathBuf,
    options: WalkOptions,
    excludes: ExcludeMatcher,
    warnings: Vec<String>,
}

impl BoundedWalker {
    pub fn new(root: impl Into<PathBuf>, options: &WalkOptions) -> Self {
        let mut warnings = Vec::new();
        let excludes = ExcludeMatcher::new(&options.excludes, &mut warnings);
        Self {
            root: root.into(),
            options: options.clone(),
            excludes,
            warnings,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn walk<F>(&self, mut on_entry: F) -> Result<WalkSummary>
    where
        F: FnMut(&ScanEntry) -> Result<Visit>,
    {
        let mut summary = WalkSummary {
            warnings: self.warnings.clone(),
            ..WalkSummary::default()
        };

        let mut walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name();
        if let Some(depth) = self.options.max_depth {
            walker = walker.max_depth(depth.saturating_add(1));
        }
        let excludes = &self.excludes;
        let mut iter = walker
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !excludes.is_excluded(entry.path()));

        loop {
            if let Some(reason) = self.options.interruption() {
                warn!("walk of {} interrupted: {:?}", self.root.display(), reason);
                summary.interrupted = Some(reason);
                break;
            }

            let Some(item) = iter.next() else {
                break;
            };
            let entry = match item {
                Ok(entry) => entry,
                Err(err) => {
                    skip_walk_error::<()>(&self.root, err)?;
                    summary.skipped += 1;
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }
            let file_type = entry.file_type();
            if !file_type.is_dir() && !file_type.is_file() {
                continue;
            }
            let Some(stat) = entry_stat(&entry)? else {
                summary.skipped += 1;
                continue;
            };

            let scan_entry = ScanEntry {
                path: entry.path().to_path_buf(),
                size_bytes: stat.size_bytes,
                modified_at: stat.modified_at,
                is_directory: stat.is_directory,
                depth: entry.depth(),
            };
            summary.visited += 1;

            match on_entry(&scan_entry)? {
                Visit::Continue => {}
                Visit::Prune => {
                    if scan_entry.is_directory {
                        debug!("pruned {}", scan_entry.path.display());
                        iter.skip_current_dir();
                        summary.pruned += 1;
                    }
                }
                Visit::Stop => {
                    summary.stopped = true;
                    break;
                }
            }
        }

        Ok(summary)
    }
}

/// Compiled exclude patterns. Patterns without glob syntax match as
/// case-insensitive substrings of the full path.
struct ExcludeMatcher {
    globs: GlobSet,
    needles: Vec<String>,
}

impl ExcludeMatcher {
    fn new(patterns: &[String], warnings: &mut Vec<String>) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut needles = Vec::new();
        for pattern in patterns.iter().map(|p| p.trim()).filter(|p| !p.is_empty()) {
            if !has_glob_syntax(pattern) {
                needles.push(pattern.to_lowercase());
                continue;
            }
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(err) => {
                    warnings.push(format!(
                        "exclude pattern '{pattern}' is not a valid glob ({err}); matching it as text"
                    ));
                    needles.push(pattern.to_lowercase());
                }
            }
        }

        let globs = builder.build().unwrap_or_else(|err| {
            warnings.push(format!("exclude globs disabled: {err}"));
            GlobSet::empty()
        });
        Self { globs, needles }
    }

    fn is_excluded(&self, path: &Path) -> bool {
        if self.globs.is_match(path) {
            return true;
        }
        if self.needles.is_empty() {
            return false;
        }
        let haystack = path.to_string_lossy().to_lowercase();
        self.needles.iter().any(|needle| haystack.contains(needle.as_str()))
    }
}

fn has_glob_syntax(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', ']', '{', '}'])
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::{atomic::AtomicBool, Arc};
    use std::time::Duration;

    use tempfile::TempDir;

    use super::{BoundedWalker, ExcludeMatcher, Interruption, Visit, WalkOptions};

    fn build_tree(root: &Path) {
        fs::create_dir_all(root.join("a/b/c/d/e")).expect("mkdirs");
        fs::write(root.join("top.txt"), b"top").expect("write");
        fs::write(root.join("a/b/c/d/deep.txt"), b"deep").expect("write");
        fs::write(root.join("a/b/c/d/e/deeper.txt"), b"deeper").expect("write");
        fs::create_dir_all(root.join("skip/inner")).expect("mkdir");
        fs::write(root.join("skip/inner/hidden.txt"), b"hidden").expect("write");
    }

    fn collect(root: &Path, options: &WalkOptions) -> Vec<PathBuf> {
        let mut seen = Vec::new();
        BoundedWalker::new(root, options)
            .walk(|entry| {
                seen.push(entry.path.strip_prefix(root).expect("under root").to_path_buf());
                Ok(Visit::Continue)
            })
            .expect("walk");
        seen
    }

    #[test]
    fn depth_bound_limits_reported_entries() {
        let temp = TempDir::new().expect("tempdir");
        build_tree(temp.path());

        let options = WalkOptions {
            max_depth: Some(3),
            ..WalkOptions::default()
        };
        let seen = collect(temp.path(), &options);

        assert!(seen.contains(&PathBuf::from("a/b/c/d")));
        assert!(!seen.contains(&PathBuf::from("a/b/c/d/deep.txt")));
        assert!(seen.iter().all(|path| path.components().count() <= 4));

        let unbounded = collect(temp.path(), &WalkOptions::default());
        assert!(unbounded.contains(&PathBuf::from("a/b/c/d/e/deeper.txt")));

        let walker = BoundedWalker::new(temp.path(), &options);
        walker
            .walk(|entry| {
                let relative = entry.path.strip_prefix(walker.root()).expect("under root");
                assert_eq!(entry.depth, relative.components().count());
                assert!(entry.depth <= 4);
                Ok(Visit::Continue)
            })
            .expect("walk");
    }

    #[test]
    fn sibling_removed_mid_walk_is_skipped() {
        let temp = TempDir::new().expect("tempdir");
        for name in ["a.txt", "b.txt", "c.txt"] {
            fs::write(temp.path().join(name), name).expect("write");
        }

        let mut seen = Vec::new();
        let summary = BoundedWalker::new(temp.path(), &WalkOptions::default())
            .walk(|entry| {
                let name = entry.file_name();
                if name == "a.txt" {
                    fs::remove_file(temp.path().join("b.txt")).expect("remove sibling");
                }
                seen.push(name.into_owned());
                Ok(Visit::Continue)
            })
            .expect("walk completes");

        assert_eq!(seen, vec!["a.txt".to_string(), "c.txt".to_string()]);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.visited, 2);
        assert!(summary.interrupted.is_none());
    }

    #[test]
    fn pruned_directories_are_not_entered() {
        let temp = TempDir::new().expect("tempdir");
        build_tree(temp.path());

        let mut seen = Vec::new();
        let summary = BoundedWalker::new(temp.path(), &WalkOptions::default())
            .walk(|entry| {
                seen.push(entry.path.clone());
                if entry.file_name() == "skip" {
                    return Ok(Visit::Prune);
                }
                Ok(Visit::Continue)
            })
            .expect("walk");

        assert_eq!(summary.pruned, 1);
        assert!(seen.iter().any(|path| path.ends_with("skip")));
        assert!(!seen.iter().any(|path| path.starts_with(temp.path().join("skip/inner"))));
    }

    #[test]
    fn stop_ends_walk_early() {
        let temp = TempDir::new().expect("tempdir");
        build_tree(temp.path());

        let mut count = 0;
        let summary = BoundedWalker::new(temp.path(), &WalkOptions::default())
            .walk(|_| {
                count += 1;
                Ok(if count == 2 { Visit::Stop } else { Visit::Continue })
            })
            .expect("walk");

        assert_eq!(count, 2);
        assert!(summary.stopped);
    }

    #[test]
    fn repeated_walks_yield_identical_sequences() {
        let temp = TempDir::new().expect("tempdir");
        build_tree(temp.path());

        let options = WalkOptions::default();
        assert_eq!(collect(temp.path(), &options), collect(temp.path(), &options));
    }

    #[test]
    fn cancelled_walk_reports_interruption() {
        let temp = TempDir::new().expect("tempdir");
        build_tree(temp.path());

        let options = WalkOptions {
            cancel_flag: Some(Arc::new(AtomicBool::new(true))),
            ..WalkOptions::default()
        };
        let summary = BoundedWalker::new(temp.path(), &options)
            .walk(|_| Ok(Visit::Continue))
            .expect("walk");

        assert_eq!(summary.visited, 0);
        assert_eq!(summary.interrupted, Some(Interruption::Cancelled));
        let warnings = summary.into_warnings(temp.path());
        assert!(warnings[0].contains("canceled"));
    }

    #[test]
    fn expired_deadline_stops_walk() {
        let temp = TempDir::new().expect("tempdir");
        build_tree(temp.path());

        let options = WalkOptions::default().with_timeout(Some(Duration::ZERO));
        let summary = BoundedWalker::new(temp.path(), &options)
            .walk(|_| Ok(Visit::Continue))
            .expect("walk");
        assert_eq!(summary.interrupted, Some(Interruption::DeadlineExceeded));
    }

    #[test]
    fn excluded_subtrees_are_skipped() {
        let temp = TempDir::new().expect("tempdir");
        build_tree(temp.path());

        let options = WalkOptions {
            excludes: vec!["skip".to_string()],
            ..WalkOptions::default()
        };
        let seen = collect(temp.path(), &options);
        assert!(!seen.iter().any(|path| path.starts_with("skip")));
        assert!(seen.contains(&PathBuf::from("top.txt")));
    }

    #[test]
    fn exclude_matcher_matches_glob_and_substring() {
        let mut warnings = Vec::new();
        let matcher = ExcludeMatcher::new(
            &[
                "**/*.iso".to_string(),
                "[".to_string(),
                "Snapshots".to_string(),
            ],
            &mut warnings,
        );

        assert!(matcher.is_excluded(Path::new("/data/images/disk.iso")));
        assert!(matcher.is_excluded(Path::new("/data/snapshots/2024/a.bin")));
        assert!(!matcher.is_excluded(Path::new("/data/src/main.rs")));
        assert!(!warnings.is_empty());
    }
}
