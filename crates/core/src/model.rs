use std::borrow::Cow;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const BYTES_PER_MB: u64 = 1024 * 1024;
pub const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;

/// One filesystem entry as seen by the walker. Lives only for the duration of a visit.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified_at: Option<DateTime<Utc>>,
    pub is_directory: bool,
    /// Distance from the walk root; the root itself is depth 0.
    pub depth: usize,
}

impl ScanEntry {
    pub fn file_name(&self) -> Cow<'_, str> {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default()
    }

    pub fn age_days(&self, now: DateTime<Utc>) -> Option<f64> {
        self.modified_at.map(|modified| {
            let seconds = (now - modified).num_milliseconds() as f64 / 1000.0;
            round_to(seconds / 86_400.0, 1)
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Video,
    Archive,
    Log,
    Image,
    Document,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub path: String,
    pub size_bytes: u64,
    pub size_mb: f64,
    pub age_days: f64,
    pub extension: String,
    pub category: FileCategory,
    pub last_modified: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LargeFilesReport {
    pub scan_id: String,
    pub directory: String,
    pub min_size_mb: u64,
    pub files_found: usize,
    pub total_size_gb: f64,
    pub files: Vec<FileRecord>,
    pub recommendations: Vec<String>,
    pub scan_timestamp: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    TempDirectory,
    LogFile,
    PotentialDuplicate,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CleanupAction {
    SafeToDelete,
    ConsiderTruncatingOrCompressing,
    ManualReviewNeeded,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleanupCandidate {
    #[serde(rename = "type")]
    pub kind: CandidateKind,
    pub path: String,
    pub size_mb: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_days: Option<f64>,
    pub action: CleanupAction,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Standard,
    Deep,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CleanupReport {
    pub scan_id: String,
    pub path: String,
    pub analysis_type: AnalysisType,
    pub recommendations_count: usize,
    pub recommendations: Vec<CleanupCandidate>,
    pub potential_savings_mb: f64,
    pub potential_savings_gb: f64,
    pub insights: Vec<String>,
    pub scan_timestamp: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DiskHealth {
    Healthy,
    Concern,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiskAssessment {
    pub path: String,
    pub total_gb: f64,
    pub used_gb: f64,
    pub free_gb: f64,
    pub usage_percent: f64,
    pub health_status: DiskHealth,
    pub recommendations: Vec<String>,
    pub analysis_timestamp: String,
}

/// Raw capacity numbers for the volume backing a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskSpace {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CpuStats {
    pub usage_percent: f64,
    pub count_logical: usize,
    pub count_physical: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryStats {
    pub total_gb: f64,
    pub available_gb: f64,
    pub used_percent: f64,
    pub free_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadAverage {
    #[serde(rename = "1min")]
    pub one: f64,
    #[serde(rename = "5min")]
    pub five: f64,
    #[serde(rename = "15min")]
    pub fifteen: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiskIoStats {
    pub read_mb: f64,
    pub write_mb: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_count: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkIoStats {
    pub sent_mb: f64,
    pub recv_mb: f64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unavailable {
    pub status: String,
}

impl Default for Unavailable {
    fn default() -> Self {
        Self {
            status: "unavailable".to_string(),
        }
    }
}

/// A provider reading that may be missing on the current platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Probed<T> {
    Available(T),
    Unavailable(Unavailable),
}

impl<T> Probed<T> {
    pub fn unavailable() -> Self {
        Self::Unavailable(Unavailable::default())
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }
}

impl<T> From<Option<T>> for Probed<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => Self::Available(inner),
            None => Self::unavailable(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SystemHealth {
    Healthy,
    AttentionNeeded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemStats {
    pub timestamp: String,
    pub cpu: CpuStats,
    pub memory: MemoryStats,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_average: Option<LoadAverage>,
    pub disk_io: Probed<DiskIoStats>,
    pub network_io: Probed<NetworkIoStats>,
    pub health_status: SystemHealth,
    pub health_issues: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl HealthStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "excellent",
            Self::Good => "good",
            Self::Fair => "fair",
            Self::Poor => "poor",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppliedPenalty {
    pub rule_id: String,
    pub delta: u32,
    pub issue: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub health_score: u32,
    pub status: HealthStatus,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub penalties: Vec<AppliedPenalty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_stats: Option<SystemStats>,
    pub disk_analysis: Vec<DiskAssessment>,
    pub summary: String,
    pub check_timestamp: String,
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

pub fn bytes_to_mb(bytes: u64) -> f64 {
    round_to(bytes as f64 / BYTES_PER_MB as f64, 2)
}

pub fn bytes_to_gb(bytes: u64) -> f64 {
    round_to(bytes as f64 / BYTES_PER_GB as f64, 2)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{bytes_to_gb, bytes_to_mb, Probed, ScanEntry, BYTES_PER_MB};

    #[test]
    fn converts_and_rounds_units() {
        assert_eq!(bytes_to_mb(15 * BYTES_PER_MB), 15.0);
        assert_eq!(bytes_to_mb(BYTES_PER_MB + BYTES_PER_MB / 3), 1.33);
        assert_eq!(bytes_to_gb(1536 * BYTES_PER_MB), 1.5);
    }

    #[test]
    fn unavailable_probe_serializes_as_status_record() {
        let probe: Probed<u64> = None.into();
        let value = serde_json::to_value(&probe).expect("serialize");
        assert_eq!(value, serde_json::json!({ "status": "unavailable" }));
    }

    #[test]
    fn entry_age_is_rounded_to_tenths_of_days() {
        let now = Utc::now();
        let entry = ScanEntry {
            path: "/data/x.log".into(),
            size_bytes: 1,
            modified_at: Some(now - Duration::hours(36)),
            is_directory: false,
            depth: 1,
        };
        assert_eq!(entry.age_days(now), Some(1.5));
        assert_eq!(entry.file_name(), "x.log");
    }
}
