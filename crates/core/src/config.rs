use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cleanup::CleanupOptions;
use crate::disk::candidate_mount_points;
use crate::error::AtlasError;
use crate::large_files::LargeFileOptions;
use crate::probe::SysinfoProbe;
use crate::walker::WalkOptions;

/// Engine settings. Every field is optional in the JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AtlasConfig {
    pub large_file_min_size_mb: u64,
    pub large_file_max_results: usize,
    pub cleanup_max_depth: usize,
    pub cleanup_max_candidates: usize,
    pub cpu_sample_interval_ms: u64,
    /// Wall-clock budget per scan; unbounded when absent.
    pub scan_deadline_secs: Option<u64>,
    /// Glob or substring patterns skipped by both scanners.
    pub excludes: Vec<String>,
    /// Mounts inspected by the health check; platform defaults when absent.
    pub health_mount_points: Option<Vec<PathBuf>>,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            large_file_min_size_mb: 100,
            large_file_max_results: 20,
            cleanup_max_depth: 3,
            cleanup_max_candidates: 20,
            cpu_sample_interval_ms: 1000,
            scan_deadline_secs: None,
            excludes: Vec::new(),
            health_mount_points: None,
        }
    }
}

impl AtlasConfig {
    /// Reads a JSON config file. `None` yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("rejected config {}", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.large_file_max_results == 0 {
            return Err(AtlasError::Config(
                "large_file_max_results must be at least 1".to_string(),
            ));
        }
        if self.cleanup_max_candidates == 0 {
            return Err(AtlasError::Config(
                "cleanup_max_candidates must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            excludes: self.excludes.clone(),
            ..WalkOptions::default()
        }
        .with_timeout(self.scan_deadline_secs.map(Duration::from_secs))
    }

    /// Request arguments win over configured values.
    pub fn large_file_options(
        &self,
        min_size_mb: Option<u64>,
        max_results: Option<usize>,
    ) -> LargeFileOptions {
        LargeFileOptions {
            min_size_mb: min_size_mb.unwrap_or(self.large_file_min_size_mb),
            max_results: max_results.unwrap_or(self.large_file_max_results),
            walk: self.walk_options(),
            scan_id: None,
        }
    }

    pub fn cleanup_options(&self, deep_analysis: bool) -> CleanupOptions {
        CleanupOptions {
            deep_analysis,
            max_depth: self.cleanup_max_depth,
            max_candidates: self.cleanup_max_candidates,
            walk: self.walk_options(),
            scan_id: None,
        }
    }

    pub fn mount_points(&self) -> Vec<PathBuf> {
        self.health_mount_points
            .clone()
            .unwrap_or_else(candidate_mount_points)
    }

    pub fn probe(&self) -> SysinfoProbe {
        SysinfoProbe::new(Duration::from_millis(self.cpu_sample_interval_ms))
    }
}
