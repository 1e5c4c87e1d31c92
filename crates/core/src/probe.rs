//! Host counters: CPU, memory, load, I/O, and per-volume capacity.
//!
//! The engine only talks to [`HostProbe`]; [`SysinfoProbe`] is the production
//! implementation and tests substitute fixed readings.

#[cfg(target_os = "linux")]
use std::fs;
#[cfg(unix)]
use std::io;
use std::path::Path;
#[cfg(not(unix))]
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

#[cfg(unix)]
use nix::sys::statvfs::statvfs;
#[cfg(not(unix))]
use sysinfo::Disks;
use sysinfo::{Networks, System, MINIMUM_CPU_UPDATE_INTERVAL};
use tracing::warn;

use crate::error::{AtlasError, Result};
use crate::model::{
    bytes_to_gb, bytes_to_mb, round_to, CpuStats, DiskIoStats, DiskSpace, LoadAverage,
    MemoryStats, NetworkIoStats,
};

pub trait HostProbe {
    fn cpu(&self) -> Result<CpuStats>;

    fn memory(&self) -> Result<MemoryStats>;

    /// `None` on platforms without a load average.
    fn load_average(&self) -> Option<LoadAverage>;

    fn disk_io(&self) -> Option<DiskIoStats>;

    fn network_io(&self) -> Option<NetworkIoStats>;

    /// Capacity of the volume that backs `path`.
    fn disk_space(&self, path: &Path) -> Result<DiskSpace>;
}

#[derive(Debug, Clone)]
pub struct SysinfoProbe {
    pub cpu_sample_interval: Duration,
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self {
            cpu_sample_interval: Duration::from_secs(1),
        }
    }
}

impl SysinfoProbe {
    pub fn new(cpu_sample_interval: Duration) -> Self {
        Self {
            cpu_sample_interval,
        }
    }
}

impl HostProbe for SysinfoProbe {
    fn cpu(&self) -> Result<CpuStats> {
        let mut system = System::new();
        system.refresh_cpu();
        thread::sleep(self.cpu_sample_interval.max(MINIMUM_CPU_UPDATE_INTERVAL));
        system.refresh_cpu();

        let count_logical = system.cpus().len();
        if count_logical == 0 {
            return Err(AtlasError::unavailable("cpu", "no processors reported"));
        }
        Ok(CpuStats {
            usage_percent: round_to(f64::from(system.global_cpu_info().cpu_usage()), 1),
            count_logical,
            count_physical: system.physical_core_count(),
        })
    }

    fn memory(&self) -> Result<MemoryStats> {
        let mut system = System::new();
        system.refresh_memory();

        let total = system.total_memory();
        if total == 0 {
            return Err(AtlasError::unavailable("memory", "total memory reported as zero"));
        }
        let available = system.available_memory();
        let used_percent = round_to(
            total.saturating_sub(available) as f64 / total as f64 * 100.0,
            1,
        );
        Ok(MemoryStats {
            total_gb: bytes_to_gb(total),
            available_gb: bytes_to_gb(available),
            used_percent,
            free_percent: round_to(100.0 - used_percent, 2),
        })
    }

    fn load_average(&self) -> Option<LoadAverage> {
        if !cfg!(unix) {
            return None;
        }
        let load = System::load_average();
        Some(LoadAverage {
            one: load.one,
            five: load.five,
            fifteen: load.fifteen,
        })
    }

    /// System-wide counters from `/proc/diskstats` on Linux; elsewhere the sum
    /// over live processes, without operation counts.
    fn disk_io(&self) -> Option<DiskIoStats> {
        system_disk_io()
    }

    fn network_io(&self) -> Option<NetworkIoStats> {
        let networks = Networks::new_with_refreshed_list();
        if networks.list().is_empty() {
            warn!("network i/o counters unavailable: no interfaces listed");
            return None;
        }

        let mut sent = 0_u64;
        let mut received = 0_u64;
        let mut packets_sent = 0_u64;
        let mut packets_recv = 0_u64;
        for data in networks.list().values() {
            sent = sent.saturating_add(data.total_transmitted());
            received = received.saturating_add(data.total_received());
            packets_sent = packets_sent.saturating_add(data.total_packets_transmitted());
            packets_recv = packets_recv.saturating_add(data.total_packets_received());
        }
        Some(NetworkIoStats {
            sent_mb: bytes_to_mb(sent),
            recv_mb: bytes_to_mb(received),
            packets_sent,
            packets_recv,
        })
    }

    #[cfg(unix)]
    fn disk_space(&self, path: &Path) -> Result<DiskSpace> {
        let stats = statvfs(path).map_err(|errno| AtlasError::io(path, io::Error::from(errno)))?;
        let block_size = match u64::from(stats.fragment_size()) {
            0 => u64::from(stats.block_size()),
            fragment => fragment,
        };
        Ok(capacity_from_blocks(BlockCounts {
            block_size,
            blocks: u64::from(stats.blocks()),
            blocks_free: u64::from(stats.blocks_free()),
            blocks_available: u64::from(stats.blocks_available()),
        }))
    }

    #[cfg(not(unix))]
    fn disk_space(&self, path: &Path) -> Result<DiskSpace> {
        let target = path
            .canonicalize()
            .map_err(|err| AtlasError::io(path, err))?;
        let disks = Disks::new_with_refreshed_list();
        let mounts = disks
            .list()
            .iter()
            .map(|disk| {
                (
                    disk.mount_point().to_path_buf(),
                    disk.total_space(),
                    disk.available_space(),
                )
            })
            .collect::<Vec<_>>();

        let &(_, total, available) = best_mount(&target, &mounts).ok_or_else(|| {
            AtlasError::unavailable(
                "disk space",
                format!("no mounted volume contains {}", target.display()),
            )
        })?;
        Ok(DiskSpace {
            total_bytes: total,
            used_bytes: total.saturating_sub(available),
            free_bytes: available,
        })
    }
}

/// `statvfs` counters, all in units of `block_size`.
#[derive(Debug, Clone, Copy)]
struct BlockCounts {
    block_size: u64,
    blocks: u64,
    blocks_free: u64,
    blocks_available: u64,
}

/// Root-reserved blocks count as neither used nor free, as `df` reports them.
fn capacity_from_blocks(counts: BlockCounts) -> DiskSpace {
    let BlockCounts {
        block_size,
        blocks,
        blocks_free,
        blocks_available,
    } = counts;
    DiskSpace {
        total_bytes: blocks.saturating_mul(block_size),
        used_bytes: blocks.saturating_sub(blocks_free).saturating_mul(block_size),
        free_bytes: blocks_available.saturating_mul(block_size),
    }
}

/// Mount point, total bytes, available bytes.
#[cfg(not(unix))]
type MountCapacity = (PathBuf, u64, u64);

/// Longest mount point that is a path prefix of `target`.
#[cfg(not(unix))]
fn best_mount<'a>(target: &Path, mounts: &'a [MountCapacity]) -> Option<&'a MountCapacity> {
    mounts
        .iter()
        .filter(|(mount, _, _)| target.starts_with(mount))
        .max_by_key(|(mount, _, _)| mount.as_os_str().len())
}

#[cfg(any(target_os = "linux", test))]
const SECTOR_BYTES: u64 = 512;

#[cfg(target_os = "linux")]
fn system_disk_io() -> Option<DiskIoStats> {
    let content = match fs::read_to_string("/proc/diskstats") {
        Ok(content) => content,
        Err(err) => {
            warn!("disk i/o counters unavailable: {err}");
            return None;
        }
    };
    let sys_block = Path::new("/sys/block");
    parse_diskstats(&content, |name| sys_block.join(name).exists())
}

#[cfg(not(target_os = "linux"))]
fn system_disk_io() -> Option<DiskIoStats> {
    let mut system = System::new();
    system.refresh_processes();
    if system.processes().is_empty() {
        warn!("disk i/o counters unavailable: no processes visible");
        return None;
    }

    let (read, written) = system
        .processes()
        .values()
        .map(|process| process.disk_usage())
        .fold((0_u64, 0_u64), |(read, written), usage| {
            (
                read.saturating_add(usage.total_read_bytes),
                written.saturating_add(usage.total_written_bytes),
            )
        });
    Some(DiskIoStats {
        read_mb: bytes_to_mb(read),
        write_mb: bytes_to_mb(written),
        read_count: None,
        write_count: None,
    })
}

/// Sums whole-disk rows of `/proc/diskstats`; partitions are left out so no
/// sector is counted twice. `None` when no row qualifies.
#[cfg(any(target_os = "linux", test))]
fn parse_diskstats(content: &str, is_whole_disk: impl Fn(&str) -> bool) -> Option<DiskIoStats> {
    let mut totals: Option<(u64, u64, u64, u64)> = None;
    for line in content.lines() {
        let fields = line.split_whitespace().collect::<Vec<_>>();
        if fields.len() < 10 || !is_whole_disk(fields[2]) {
            continue;
        }
        let counter = |index: usize| fields[index].parse::<u64>().ok();
        let (Some(reads), Some(sectors_read), Some(writes), Some(sectors_written)) =
            (counter(3), counter(5), counter(7), counter(9))
        else {
            continue;
        };
        let (read_count, read_sectors, write_count, write_sectors) =
            totals.get_or_insert((0, 0, 0, 0));
        *read_count = read_count.saturating_add(reads);
        *read_sectors = read_sectors.saturating_add(sectors_read);
        *write_count = write_count.saturating_add(writes);
        *write_sectors = write_sectors.saturating_add(sectors_written);
    }

    totals.map(|(reads, read_sectors, writes, write_sectors)| DiskIoStats {
        read_mb: bytes_to_mb(read_sectors.saturating_mul(SECTOR_BYTES)),
        write_mb: bytes_to_mb(write_sectors.saturating_mul(SECTOR_BYTES)),
        read_count: Some(reads),
        write_count: Some(writes),
    })
}
