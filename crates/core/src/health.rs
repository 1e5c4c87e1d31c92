//! Host health score.
//!
//! The score is 100 minus the sum of independent penalty rules. Each rule looks
//! at one signal and yields at most one penalty, so no condition is counted
//! twice. The result saturates at 0.

use std::path::PathBuf;

use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use crate::disk::analyze_mounts;
use crate::model::{AppliedPenalty, DiskAssessment, HealthReport, HealthStatus, SystemStats};
use crate::probe::HostProbe;
use crate::system::get_system_stats;

const MAX_SCORE: u32 = 100;

#[derive(Debug, Clone, PartialEq)]
struct Penalty {
    rule_id: &'static str,
    delta: u32,
    issue: String,
    recommendation: Option<String>,
}

impl Penalty {
    fn new(rule_id: &'static str, delta: u32, issue: impl Into<String>) -> Self {
        Self {
            rule_id,
            delta,
            issue: issue.into(),
            recommendation: None,
        }
    }

    fn recommend(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }
}

impl HealthStatus {
    pub fn from_score(score: u32) -> Self {
        match score {
            90.. => Self::Excellent,
            70..=89 => Self::Good,
            50..=69 => Self::Fair,
            30..=49 => Self::Poor,
            _ => Self::Critical,
        }
    }
}

fn cpu_rule(usage_percent: f64) -> Option<Penalty> {
    if usage_percent > 90.0 {
        Some(
            Penalty::new("cpu_critical", 20, "High CPU usage")
                .recommend("Investigate high CPU processes"),
        )
    } else if usage_percent > 70.0 {
        Some(Penalty::new("cpu_elevated", 10, "Elevated CPU usage"))
    } else {
        None
    }
}

fn memory_rule(used_percent: f64) -> Option<Penalty> {
    if used_percent > 90.0 {
        Some(
            Penalty::new("memory_critical", 25, "Critical memory usage")
                .recommend("Close unnecessary applications or add more RAM"),
        )
    } else if used_percent > 80.0 {
        Some(Penalty::new("memory_high", 15, "High memory usage"))
    } else {
        None
    }
}

fn disk_rule(disks: &[DiskAssessment]) -> Option<Penalty> {
    let critical = disks
        .iter()
        .filter(|disk| disk.usage_percent > 90.0)
        .count();
    if critical > 0 {
        return Some(
            Penalty::new(
                "disk_critical",
                30,
                format!("Critical disk space on {critical} drives"),
            )
            .recommend("Immediate cleanup required for critical drives"),
        );
    }

    let warning = disks
        .iter()
        .filter(|disk| disk.usage_percent > 80.0)
        .count();
    if warning > 0 {
        return Some(
            Penalty::new(
                "disk_warning",
                15,
                format!("Low disk space on {warning} drives"),
            )
            .recommend("Consider cleanup operations"),
        );
    }
    None
}

/// Scores the given readings. CPU and memory rules are skipped without stats.
pub fn score_health(stats: Option<SystemStats>, disks: Vec<DiskAssessment>) -> HealthReport {
    let penalties = [
        stats.as_ref().and_then(|s| cpu_rule(s.cpu.usage_percent)),
        stats.as_ref().and_then(|s| memory_rule(s.memory.used_percent)),
        disk_rule(&disks),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>();

    let total_penalty = penalties.iter().map(|penalty| penalty.delta).sum::<u32>();
    let health_score = MAX_SCORE.saturating_sub(total_penalty);
    let status = HealthStatus::from_score(health_score);

    HealthReport {
        health_score,
        status,
        issues: penalties.iter().map(|penalty| penalty.issue.clone()).collect(),
        recommendations: penalties
            .iter()
            .filter_map(|penalty| penalty.recommendation.clone())
            .collect(),
        penalties: penalties
            .iter()
            .map(|penalty| AppliedPenalty {
                rule_id: penalty.rule_id.to_string(),
                delta: penalty.delta,
                issue: penalty.issue.clone(),
            })
            .collect(),
        system_stats: stats,
        disk_analysis: disks,
        summary: format!(
            "System health: {} ({health_score}/{MAX_SCORE})",
            status.label().to_uppercase()
        ),
        check_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

pub fn system_health_check(probe: &dyn HostProbe, mounts: &[PathBuf]) -> HealthReport {
    let stats = match get_system_stats(probe) {
        Ok(stats) => Some(stats),
        Err(err) => {
            warn!("system stats unavailable for health check: {err}");
            None
        }
    };
    let disks = analyze_mounts(probe, mounts);
    let report = score_health(stats, disks);
    info!(
        "health check: score {} ({:?}), {} disk(s), {} issue(s)",
        report.health_score,
        report.status,
        report.disk_analysis.len(),
        report.issues.len()
    );
    report
}
