use std::env;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use tracing::debug;

use crate::error::{AtlasError, Result};
use crate::model::{bytes_to_gb, round_to, DiskAssessment, DiskHealth, DiskSpace};
use crate::probe::HostProbe;
use crate::stat::exists;

const CONCERN_PERCENT: f64 = 70.0;
const WARNING_PERCENT: f64 = 80.0;
const CRITICAL_PERCENT: f64 = 90.0;
const LOW_FREE_GB: f64 = 1.0;

const UNIX_HEALTH_MOUNTS: &[&str] = &["/", "/home", "/var", "/tmp"];

impl DiskHealth {
    /// Each threshold is exclusive: exactly 90% is still `Warning`.
    pub fn from_usage(usage_percent: f64) -> Self {
        if usage_percent > CRITICAL_PERCENT {
            Self::Critical
        } else if usage_percent > WARNING_PERCENT {
            Self::Warning
        } else if usage_percent > CONCERN_PERCENT {
            Self::Concern
        } else {
            Self::Healthy
        }
    }
}

/// Maps `/` onto the system drive on Windows; other paths pass through.
pub fn resolve_platform_root(path: &Path) -> PathBuf {
    if cfg!(windows) && path == Path::new("/") {
        let drive = env::var("SystemDrive").unwrap_or_else(|_| "C:".to_string());
        return PathBuf::from(format!("{}\\", drive.trim_end_matches('\\')));
    }
    path.to_path_buf()
}

/// Mount points inspected by the health check on this platform.
pub fn candidate_mount_points() -> Vec<PathBuf> {
    if cfg!(windows) {
        return (b'A'..=b'Z')
            .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
            .collect();
    }
    UNIX_HEALTH_MOUNTS.iter().map(PathBuf::from).collect()
}

pub fn analyze_disk_usage(probe: &dyn HostProbe, path: &Path) -> Result<DiskAssessment> {
    let resolved = resolve_platform_root(path);
    if !exists(&resolved) {
        return Err(AtlasError::NotFound(resolved));
    }
    let space = probe.disk_space(&resolved)?;
    assess_disk(&resolved, space)
}

pub fn assess_disk(path: &Path, space: DiskSpace) -> Result<DiskAssessment> {
    if space.total_bytes == 0 {
        return Err(AtlasError::EmptyVolume(path.to_path_buf()));
    }

    let free_gb = bytes_to_gb(space.free_bytes);
    let usage_percent = round_to(
        space.used_bytes as f64 / space.total_bytes as f64 * 100.0,
        2,
    );

    let mut recommendations = Vec::new();
    if usage_percent > WARNING_PERCENT {
        recommendations.push("Consider cleanup operations".to_string());
    }
    if usage_percent > CRITICAL_PERCENT {
        recommendations.push("Immediate attention required - disk nearly full".to_string());
    }
    if free_gb < LOW_FREE_GB {
        recommendations.push("Critical: Less than 1GB free space".to_string());
    }

    Ok(DiskAssessment {
        path: path.to_string_lossy().to_string(),
        total_gb: bytes_to_gb(space.total_bytes),
        used_gb: bytes_to_gb(space.used_bytes),
        free_gb,
        usage_percent,
        health_status: DiskHealth::from_usage(usage_percent),
        recommendations,
        analysis_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    })
}

/// Assessments for every mount that exists and can be measured; the rest are skipped.
pub fn analyze_mounts(probe: &dyn HostProbe, mounts: &[PathBuf]) -> Vec<DiskAssessment> {
    mounts
        .iter()
        .filter(|mount| exists(mount))
        .filter_map(|mount| match analyze_disk_usage(probe, mount) {
            Ok(assessment) => Some(assessment),
            Err(err) => {
                debug!("skipping mount {}: {}", mount.display(), err);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::{assess_disk, candidate_mount_points, resolve_platform_root};
    use crate::error::AtlasError;
    use crate::model::{DiskHealth, DiskSpace, BYTES_PER_GB};

    fn space(total_gb: u64, used_gb: u64) -> DiskSpace {
        DiskSpace {
            total_bytes: total_gb * BYTES_PER_GB,
            used_bytes: used_gb * BYTES_PER_GB,
            free_bytes: (total_gb - used_gb) * BYTES_PER_GB,
        }
    }

    #[test]
    fn boundaries_map_to_the_lower_tier() {
        assert_eq!(DiskHealth::from_usage(70.0), DiskHealth::Healthy);
        assert_eq!(DiskHealth::from_usage(70.01), DiskHealth::Concern);
        assert_eq!(DiskHealth::from_usage(80.0), DiskHealth::Concern);
        assert_eq!(DiskHealth::from_usage(80.5), DiskHealth::Warning);
        assert_eq!(DiskHealth::from_usage(90.0), DiskHealth::Warning);
        assert_eq!(DiskHealth::from_usage(90.01), DiskHealth::Critical);
        assert_eq!(DiskHealth::from_usage(0.0), DiskHealth::Healthy);
    }

    #[test]
    fn status_is_monotone_in_usage() {
        let mut previous = DiskHealth::Healthy;
        for step in 0..=1000 {
            let status = DiskHealth::from_usage(f64::from(step) / 10.0);
            assert!(status >= previous);
            previous = status;
        }
    }

    #[test]
    fn healthy_disk_has_no_recommendations() {
        let assessment = assess_disk(Path::new("/"), space(500, 200)).expect("assess");
        assert_eq!(assessment.usage_percent, 40.0);
        assert_eq!(assessment.health_status, DiskHealth::Healthy);
        assert!(assessment.recommendations.is_empty());
        assert_eq!(assessment.used_gb + assessment.free_gb, assessment.total_gb);
    }

    #[test]
    fn reserved_blocks_do_not_count_as_used() {
        let reserved = DiskSpace {
            total_bytes: 100 * BYTES_PER_GB,
            used_bytes: 68 * BYTES_PER_GB,
            free_bytes: 27 * BYTES_PER_GB,
        };
        let assessment = assess_disk(Path::new("/"), reserved).expect("assess");

        assert_eq!(assessment.usage_percent, 68.0);
        assert_eq!(assessment.health_status, DiskHealth::Healthy);
        assert_eq!(assessment.free_gb, 27.0);
        assert!(assessment.used_gb + assessment.free_gb < assessment.total_gb);
    }

    #[test]
    fn all_recommendations_can_fire_together() {
        let nearly_full = DiskSpace {
            total_bytes: 8 * BYTES_PER_GB,
            used_bytes: 8 * BYTES_PER_GB - BYTES_PER_GB / 2,
            free_bytes: BYTES_PER_GB / 2,
        };
        let assessment = assess_disk(Path::new("/var"), nearly_full).expect("assess");

        assert_eq!(assessment.health_status, DiskHealth::Critical);
        assert_eq!(assessment.free_gb, 0.5);
        assert_eq!(
            assessment.recommendations,
            vec![
                "Consider cleanup operations".to_string(),
                "Immediate attention required - disk nearly full".to_string(),
                "Critical: Less than 1GB free space".to_string(),
            ]
        );
    }

    #[test]
    fn warning_disk_gets_cleanup_hint_only() {
        let assessment = assess_disk(Path::new("/home"), space(100, 85)).expect("assess");
        assert_eq!(assessment.health_status, DiskHealth::Warning);
        assert_eq!(
            assessment.recommendations,
            vec!["Consider cleanup operations".to_string()]
        );
    }

    #[test]
    fn zero_capacity_volume_is_an_error() {
        let err = assess_disk(Path::new("/proc"), space(0, 0)).expect_err("empty volume");
        assert!(matches!(err, AtlasError::EmptyVolume(_)));
    }

    #[cfg(unix)]
    #[test]
    fn unix_paths_pass_through_and_mount_set_is_fixed() {
        assert_eq!(resolve_platform_root(Path::new("/")), PathBuf::from("/"));
        assert_eq!(
            candidate_mount_points(),
            vec![
                PathBuf::from("/"),
                PathBuf::from("/home"),
                PathBuf::from("/var"),
                PathBuf::from("/tmp"),
            ]
        );
    }
}
