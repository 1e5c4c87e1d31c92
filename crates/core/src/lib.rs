pub mod categorize;
pub mod cleanup;
pub mod config;
pub mod disk;
pub mod error;
pub mod health;
pub mod large_files;
pub mod markdown;
pub mod model;
pub mod probe;
pub mod stat;
pub mod system;
pub mod walker;

pub use categorize::{classify_extension, classify_path, extension_of};
pub use cleanup::{cleanup_recommendations, CleanupOptions};
pub use config::AtlasConfig;
pub use disk::{analyze_disk_usage, analyze_mounts, assess_disk, candidate_mount_points};
pub use error::{AtlasError, Result};
pub use health::{score_health, system_health_check};
pub use large_files::{find_large_files, LargeFileOptions};
pub use markdown::render_health_markdown;
pub use model::{
    AnalysisType, AppliedPenalty, CandidateKind, CleanupAction, CleanupCandidate, CleanupReport,
    CpuStats, DiskAssessment, DiskHealth, DiskIoStats, DiskSpace, FileCategory, FileRecord,
    HealthReport, HealthStatus, LargeFilesReport, LoadAverage, MemoryStats, NetworkIoStats,
    Probed, RiskLevel, ScanEntry, SystemHealth, SystemStats, Unavailable,
};
pub use probe::{HostProbe, SysinfoProbe};
pub use system::get_system_stats;
pub use walker::{BoundedWalker, Interruption, Visit, WalkOptions, WalkSummary};
