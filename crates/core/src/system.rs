use chrono::{SecondsFormat, Utc};
use tracing::info;

use crate::error::Result;
use crate::model::{Probed, SystemHealth, SystemStats};
use crate::probe::HostProbe;

const HIGH_CPU_PERCENT: f64 = 90.0;
const HIGH_MEMORY_PERCENT: f64 = 90.0;

/// CPU and memory are required; load, disk and network readings degrade to
/// absent or `{"status": "unavailable"}`.
pub fn get_system_stats(probe: &dyn HostProbe) -> Result<SystemStats> {
    let cpu = probe.cpu()?;
    let memory = probe.memory()?;

    let mut health_issues = Vec::new();
    if cpu.usage_percent > HIGH_CPU_PERCENT {
        health_issues.push("High CPU usage".to_string());
    }
    if memory.used_percent > HIGH_MEMORY_PERCENT {
        health_issues.push("High memory usage".to_string());
    }
    let health_status = if health_issues.is_empty() {
        SystemHealth::Healthy
    } else {
        SystemHealth::AttentionNeeded
    };

    let stats = SystemStats {
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        cpu,
        memory,
        load_average: probe.load_average(),
        disk_io: Probed::from(probe.disk_io()),
        network_io: Probed::from(probe.network_io()),
        health_status,
        health_issues,
    };
    info!(
        "system stats: cpu {:.1}%, memory {:.1}%, {:?}",
        stats.cpu.usage_percent, stats.memory.used_percent, stats.health_status
    );
    Ok(stats)
}
