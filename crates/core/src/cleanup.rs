//! Cleanup candidate detection.
//!
//! Three heuristics run over a single walk:
//!
//! * directories named like conventional scratch space are measured with a
//!   sub-walk, reported when larger than 1 MB, and then pruned so the main
//!   walk never enters them;
//! * stale files (`.log`, `.tmp`, `.bak`, `.old`) larger than 10 MB are
//!   reported for truncation or compression;
//! * in deep mode, files larger than 1 MB whose extension-less name occurs
//!   inside a sibling file name are flagged as possible duplicates.
//!
//! The duplicate check is a name heuristic only. It produces false positives
//! (`report.pdf` next to `report_final.pdf`) and misses renamed copies, which is
//! why those candidates always carry [`RiskLevel::High`] and save nothing.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::Lazy;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AtlasError, Result};
use crate::model::{
    bytes_to_mb, round_to, AnalysisType, CandidateKind, CleanupAction, CleanupCandidate,
    CleanupReport, RiskLevel, ScanEntry, BYTES_PER_MB,
};
use crate::stat::{list_file_names, stat_path};
use crate::walker::{BoundedWalker, Visit, WalkOptions, WalkSummary};

static TEMP_DIR_NAMES: Lazy<HashSet<String>> = Lazy::new(|| {
    ["tmp", "temp", "__pycache__", ".cache", "node_modules"]
        .iter()
        .map(|name| name.to_lowercase())
        .collect()
});

const STALE_FILE_SUFFIXES: &[&str] = &[".log", ".tmp", ".bak", ".old"];

const TEMP_DIR_MIN_BYTES: u64 = BYTES_PER_MB;
const STALE_FILE_MIN_BYTES: u64 = 10 * BYTES_PER_MB;
const DUPLICATE_MIN_BYTES: u64 = BYTES_PER_MB;
const SIGNIFICANT_SAVINGS_MB: f64 = 1000.0;

/// Assumed share of a stale file's size recovered by compressing it.
/// An estimate used for the savings total, not a measured ratio.
pub const STALE_FILE_SAVINGS_RATIO: f64 = 0.8;

#[derive(Debug, Clone)]
pub struct CleanupOptions {
    pub deep_analysis: bool,
    /// Depth bound applied when `deep_analysis` is off.
    pub max_depth: usize,
    pub max_candidates: usize,
    pub walk: WalkOptions,
    pub scan_id: Option<String>,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            deep_analysis: false,
            max_depth: 3,
            max_candidates: 20,
            walk: WalkOptions::default(),
            scan_id: None,
        }
    }
}

pub fn risk_for(kind: CandidateKind) -> RiskLevel {
    match kind {
        CandidateKind::TempDirectory => RiskLevel::Low,
        CandidateKind::LogFile => RiskLevel::Medium,
        CandidateKind::PotentialDuplicate => RiskLevel::High,
    }
}

pub fn action_for(kind: CandidateKind) -> CleanupAction {
    match kind {
        CandidateKind::TempDirectory => CleanupAction::SafeToDelete,
        CandidateKind::LogFile => CleanupAction::ConsiderTruncatingOrCompressing,
        CandidateKind::PotentialDuplicate => CleanupAction::ManualReviewNeeded,
    }
}

pub fn is_temp_dir_name(name: &str) -> bool {
    TEMP_DIR_NAMES.contains(&name.to_lowercase())
}

pub fn is_stale_file_name(name: &str) -> bool {
    let lowered = name.to_lowercase();
    STALE_FILE_SUFFIXES
        .iter()
        .any(|suffix| lowered.ends_with(suffix))
}

/// `true` when `file_name` without its extension occurs in another sibling name.
pub fn looks_duplicated(file_name: &str, siblings: &[String]) -> bool {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    if stem.is_empty() {
        return false;
    }
    siblings
        .iter()
        .any(|other| other != file_name && other.contains(&*stem))
}

fn candidate(
    kind: CandidateKind,
    entry: &ScanEntry,
    size_mb: f64,
    file_count: Option<u64>,
    age_days: Option<f64>,
) -> CleanupCandidate {
    CleanupCandidate {
        kind,
        path: entry.path.to_string_lossy().to_string(),
        size_mb,
        file_count,
        age_days,
        action: action_for(kind),
        risk_level: risk_for(kind),
    }
}

struct SubtreeUsage {
    size_bytes: u64,
    file_count: u64,
    summary: WalkSummary,
}

fn measure_subtree(dir: &Path, options: &WalkOptions) -> Result<SubtreeUsage> {
    let mut size_bytes = 0_u64;
    let mut file_count = 0_u64;
    let summary = BoundedWalker::new(dir, &options.unbounded()).walk(|entry| {
        if !entry.is_directory {
            size_bytes = size_bytes.saturating_add(entry.size_bytes);
            file_count += 1;
        }
        Ok(Visit::Continue)
    })?;
    Ok(SubtreeUsage {
        size_bytes,
        file_count,
        summary,
    })
}

pub fn cleanup_recommendations(path: &Path, options: &CleanupOptions) -> Result<CleanupReport> {
    let root = stat_path(path)?.ok_or_else(|| AtlasError::NotFound(path.to_path_buf()))?;
    if !root.is_directory {
        return Err(AtlasError::NotADirectory(path.to_path_buf()));
    }

    let scan_id = options
        .scan_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let now = Utc::now();
    let analysis_type = if options.deep_analysis {
        AnalysisType::Deep
    } else {
        AnalysisType::Standard
    };
    let walk_options = WalkOptions {
        max_depth: (!options.deep_analysis).then_some(options.max_depth),
        ..options.walk.clone()
    };

    info!(
        "cleanup scan {scan_id}: {} ({:?})",
        path.display(),
        analysis_type
    );

    let mut scan = CleanupScan {
        deep_analysis: options.deep_analysis,
        now,
        candidates: Vec::new(),
        potential_savings_mb: 0.0,
        siblings: HashMap::new(),
        subtree_summary: WalkSummary::default(),
    };
    let mut summary =
        BoundedWalker::new(path, &walk_options).walk(|entry| scan.visit(entry, &walk_options))?;
    summary.absorb(scan.subtree_summary);

    let mut candidates = scan.candidates;
    candidates.sort_by(|a, b| {
        b.size_mb
            .total_cmp(&a.size_mb)
            .then_with(|| a.path.cmp(&b.path))
    });
    let insights = cleanup_insights(&candidates, scan.potential_savings_mb);
    let recommendations_count = candidates.len();
    candidates.truncate(options.max_candidates);

    info!(
        "cleanup scan {scan_id}: {recommendations_count} candidate(s), {:.2} MB potential savings",
        scan.potential_savings_mb
    );

    Ok(CleanupReport {
        scan_id,
        path: path.to_string_lossy().to_string(),
        analysis_type,
        recommendations_count,
        recommendations: candidates,
        potential_savings_mb: round_to(scan.potential_savings_mb, 2),
        potential_savings_gb: round_to(scan.potential_savings_mb / 1024.0, 2),
        insights,
        scan_timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
        warnings: summary.into_warnings(path),
    })
}

struct CleanupScan {
    deep_analysis: bool,
    now: DateTime<Utc>,
    candidates: Vec<CleanupCandidate>,
    potential_savings_mb: f64,
    siblings: HashMap<PathBuf, Vec<String>>,
    subtree_summary: WalkSummary,
}

impl CleanupScan {
    fn visit(&mut self, entry: &ScanEntry, walk_options: &WalkOptions) -> Result<Visit> {
        if entry.is_directory {
            if !is_temp_dir_name(&entry.file_name()) {
                return Ok(Visit::Continue);
            }
            let usage = measure_subtree(&entry.path, walk_options)?;
            self.subtree_summary.absorb(usage.summary);
            if usage.size_bytes > TEMP_DIR_MIN_BYTES {
                let size_mb = bytes_to_mb(usage.size_bytes);
                self.candidates.push(candidate(
                    CandidateKind::TempDirectory,
                    entry,
                    size_mb,
                    Some(usage.file_count),
                    None,
                ));
                self.potential_savings_mb += size_mb;
            }
            debug!(
                "temp directory {} at depth {} measured and pruned",
                entry.path.display(),
                entry.depth
            );
            return Ok(Visit::Prune);
        }

        let name = entry.file_name();
        if is_stale_file_name(&name) && entry.size_bytes > STALE_FILE_MIN_BYTES {
            let size_mb = bytes_to_mb(entry.size_bytes);
            self.candidates.push(candidate(
                CandidateKind::LogFile,
                entry,
                size_mb,
                None,
                entry.age_days(self.now),
            ));
            self.potential_savings_mb += size_mb * STALE_FILE_SAVINGS_RATIO;
        }

        if self.deep_analysis && entry.size_bytes > DUPLICATE_MIN_BYTES {
            let Some(parent) = entry.path.parent() else {
                return Ok(Visit::Continue);
            };
            let siblings = match self.siblings.entry(parent.to_path_buf()) {
                Entry::Occupied(occupied) => occupied.into_mut(),
                Entry::Vacant(vacant) => vacant.insert(list_file_names(parent)?),
            };
            if looks_duplicated(&name, siblings) {
                self.candidates.push(candidate(
                    CandidateKind::PotentialDuplicate,
                    entry,
                    bytes_to_mb(entry.size_bytes),
                    None,
                    None,
                ));
            }
        }

        Ok(Visit::Continue)
    }
}

fn cleanup_insights(candidates: &[CleanupCandidate], potential_savings_mb: f64) -> Vec<String> {
    let mut insights = Vec::new();
    if potential_savings_mb > SIGNIFICANT_SAVINGS_MB {
        insights.push(format!(
            "Significant cleanup potential: {:.1}GB could be recovered",
            potential_savings_mb / 1024.0
        ));
    }

    let count_of = |kind: CandidateKind| {
        candidates
            .iter()
            .filter(|candidate| candidate.kind == kind)
            .count()
    };
    let temp_dirs = count_of(CandidateKind::TempDirectory);
    if temp_dirs > 0 {
        insights.push(format!(
            "Found {temp_dirs} temporary directories safe for cleanup"
        ));
    }
    let logs = count_of(CandidateKind::LogFile);
    if logs > 0 {
        insights.push(format!(
            "Found {logs} large log files that could be compressed"
        ));
    }
    insights
}
