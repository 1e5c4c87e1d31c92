use crate::model::{DiskHealth, HealthReport, Probed};

pub fn render_health_markdown(report: &HealthReport) -> String {
    let mut out = String::new();
    out.push_str("# Storage Atlas Health Check\n\n");
    out.push_str(&format!(
        "- Score: `{}/100`\n- Status: `{}`\n- Checked at: `{}`\n\n",
        report.health_score,
        report.status.label(),
        report.check_timestamp
    ));

    out.push_str("## Host\n\n");
    match &report.system_stats {
        None => out.push_str("System statistics were unavailable.\n\n"),
        Some(stats) => {
            out.push_str(&format!(
                "- CPU: {:.1}% across {} logical core(s)\n- Memory: {:.1}% used of {:.2} GB\n",
                stats.cpu.usage_percent,
                stats.cpu.count_logical,
                stats.memory.used_percent,
                stats.memory.total_gb
            ));
            if let Some(load) = &stats.load_average {
                out.push_str(&format!(
                    "- Load average: {:.2} / {:.2} / {:.2}\n",
                    load.one, load.five, load.fifteen
                ));
            }
            if let Probed::Available(io) = &stats.disk_io {
                out.push_str(&format!(
                    "- Disk I/O: {:.2} MB read, {:.2} MB written\n",
                    io.read_mb, io.write_mb
                ));
            }
            if let Probed::Available(net) = &stats.network_io {
                out.push_str(&format!(
                    "- Network: {:.2} MB sent, {:.2} MB received\n",
                    net.sent_mb, net.recv_mb
                ));
            }
            out.push('\n');
        }
    }

    out.push_str("## Disks\n\n");
    if report.disk_analysis.is_empty() {
        out.push_str("No mount points could be measured.\n\n");
    } else {
        for disk in &report.disk_analysis {
            out.push_str(&format!(
                "- `{}`: {:.2}% used, {:.2} GB free of {:.2} GB, status `{}`\n",
                disk.path,
                disk.usage_percent,
                disk.free_gb,
                disk.total_gb,
                disk_health_label(disk.health_status)
            ));
            for recommendation in &disk.recommendations {
                out.push_str(&format!("  - {recommendation}\n"));
            }
        }
        out.push('\n');
    }

    out.push_str("## Issues\n\n");
    if report.penalties.is_empty() {
        out.push_str("No issues detected.\n\n");
    } else {
        for penalty in &report.penalties {
            out.push_str(&format!(
                "- {} (`{}`, -{})\n",
                penalty.issue, penalty.rule_id, penalty.delta
            ));
        }
        out.push('\n');
    }

    if !report.recommendations.is_empty() {
        out.push_str("## Recommendations\n\n");
        for recommendation in &report.recommendations {
            out.push_str(&format!("- {recommendation}\n"));
        }
    }

    out
}

fn disk_health_label(status: DiskHealth) -> &'static str {
    match status {
        DiskHealth::Healthy => "healthy",
        DiskHealth::Concern => "concern",
        DiskHealth::Warning => "warning",
        DiskHealth::Critical => "critical",
    }
}
