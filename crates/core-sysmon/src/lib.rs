//! System-metrics collector reading kernel statistics files.
//!
//! Sources: `stat` (per-core CPU tick counters), `meminfo`, and `net/dev`
//! under a configurable root (default `/proc`). CPU usage percentages are
//! computed from tick deltas between consecutive samples, so the first
//! sample always reports 0% usage.
//!
//! The root is injectable so tests can point the monitor at fixture
//! files; off-Linux hosts surface `ErrorKind::System` from `sample`
//! instead of fabricating zeros.

use core_error::{EngineError, Result};
use std::path::PathBuf;

/// Raw tick counters for one CPU line in `stat`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct CpuTicks {
    user: u64,
    nice: u64,
    system: u64,
    idle: u64,
    iowait: u64,
    irq: u64,
    softirq: u64,
}

impl CpuTicks {
    fn total(&self) -> u64 {
        self.user + self.nice + self.system + self.idle + self.iowait + self.irq + self.softirq
    }

    fn idle_total(&self) -> u64 {
        self.idle + self.iowait
    }
}

/// Usage for one core, or the aggregate when `id` is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuStats {
    pub id: Option<usize>,
    pub usage_percent: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryStats {
    pub total_kb: u64,
    pub free_kb: u64,
    pub available_kb: u64,
    pub buffers_kb: u64,
    pub cached_kb: u64,
    pub swap_total_kb: u64,
    pub swap_free_kb: u64,
    pub usage_percent: f32,
    pub swap_percent: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetDevStats {
    pub name: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// One full sample across all sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SysSample {
    pub aggregate: CpuStats,
    pub cpus: Vec<CpuStats>,
    pub memory: MemoryStats,
    pub net: Vec<NetDevStats>,
}

#[derive(Debug)]
pub struct SysMonitor {
    root: PathBuf,
    prev_aggregate: Option<CpuTicks>,
    prev_cpus: Vec<CpuTicks>,
}

impl SysMonitor {
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Point the monitor at an alternate statistics root (tests).
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prev_aggregate: None,
            prev_cpus: Vec::new(),
        }
    }

    /// Read all sources once and fold in deltas against the previous
    /// sample.
    pub fn sample(&mut self) -> Result<SysSample> {
        let (aggregate_ticks, cpu_ticks) = self.read_cpu()?;
        let memory = self.read_memory()?;
        let net = self.read_net().unwrap_or_default();

        let aggregate = CpuStats {
            id: None,
            usage_percent: usage_between(self.prev_aggregate, aggregate_ticks),
        };
        let cpus = cpu_ticks
            .iter()
            .enumerate()
            .map(|(id, &ticks)| CpuStats {
                id: Some(id),
                usage_percent: usage_between(self.prev_cpus.get(id).copied(), ticks),
            })
            .collect();

        self.prev_aggregate = Some(aggregate_ticks);
        self.prev_cpus = cpu_ticks;

        tracing::trace!(
            target: "sysmon",
            cpu = aggregate.usage_percent,
            mem = memory.usage_percent,
            "sample"
        );
        Ok(SysSample {
            aggregate,
            cpus,
            memory,
            net,
        })
    }

    fn read(&self, name: &str) -> Result<String> {
        let path = self.root.join(name);
        std::fs::read_to_string(&path)
            .map_err(|e| EngineError::from_io(&format!("read {}", path.display()), &e))
    }

    fn read_cpu(&self) -> Result<(CpuTicks, Vec<CpuTicks>)> {
        let stat = self.read("stat")?;
        let mut aggregate = None;
        let mut cpus = Vec::new();
        for line in stat.lines() {
            let mut parts = line.split_whitespace();
            let Some(label) = parts.next() else { continue };
            if !label.starts_with("cpu") {
                continue;
            }
            let ticks = parse_cpu_ticks(parts)?;
            if label == "cpu" {
                aggregate = Some(ticks);
            } else {
                cpus.push(ticks);
            }
        }
        let aggregate =
            aggregate.ok_or_else(|| EngineError::parse("stat has no aggregate cpu line"))?;
        Ok((aggregate, cpus))
    }

    fn read_memory(&self) -> Result<MemoryStats> {
        let meminfo = self.read("meminfo")?;
        let mut stats = MemoryStats::default();
        for line in meminfo.lines() {
            let mut parts = line.split_whitespace();
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            let value: u64 = value.parse().unwrap_or(0);
            match key {
                "MemTotal:" => stats.total_kb = value,
                "MemFree:" => stats.free_kb = value,
                "MemAvailable:" => stats.available_kb = value,
                "Buffers:" => stats.buffers_kb = value,
                "Cached:" => stats.cached_kb = value,
                "SwapTotal:" => stats.swap_total_kb = value,
                "SwapFree:" => stats.swap_free_kb = value,
                _ => {}
            }
        }
        if stats.total_kb == 0 {
            return Err(EngineError::parse("meminfo has no MemTotal"));
        }
        stats.usage_percent =
            (stats.total_kb.saturating_sub(stats.available_kb)) as f32 / stats.total_kb as f32
                * 100.0;
        if stats.swap_total_kb > 0 {
            stats.swap_percent = (stats.swap_total_kb.saturating_sub(stats.swap_free_kb)) as f32
                / stats.swap_total_kb as f32
                * 100.0;
        }
        Ok(stats)
    }

    fn read_net(&self) -> Result<Vec<NetDevStats>> {
        let dev = self.read("net/dev")?;
        let mut devices = Vec::new();
        // First two lines are headers.
        for line in dev.lines().skip(2) {
            let Some((name, counters)) = line.split_once(':') else {
                continue;
            };
            let fields: Vec<&str> = counters.split_whitespace().collect();
            // rx_bytes is field 0, tx_bytes is field 8.
            if fields.len() < 9 {
                continue;
            }
            devices.push(NetDevStats {
                name: name.trim().to_string(),
                rx_bytes: fields[0].parse().unwrap_or(0),
                tx_bytes: fields[8].parse().unwrap_or(0),
            });
        }
        Ok(devices)
    }
}

impl Default for SysMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_cpu_ticks<'a>(mut parts: impl Iterator<Item = &'a str>) -> Result<CpuTicks> {
    let mut next = |label: &'static str| -> Result<u64> {
        parts
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| EngineError::parse(format!("stat cpu line missing {label}")))
    };
    Ok(CpuTicks {
        user: next("user")?,
        nice: next("nice")?,
        system: next("system")?,
        idle: next("idle")?,
        iowait: next("iowait").unwrap_or(0),
        irq: next("irq").unwrap_or(0),
        softirq: next("softirq").unwrap_or(0),
    })
}

/// Busy share of the tick delta between two samples, 0..=100. No prior
/// sample (or a counter wrap) reads as 0%.
fn usage_between(prev: Option<CpuTicks>, current: CpuTicks) -> f32 {
    let Some(prev) = prev else { return 0.0 };
    let total = current.total().saturating_sub(prev.total());
    if total == 0 {
        return 0.0;
    }
    let idle = current.idle_total().saturating_sub(prev.idle_total());
    (total.saturating_sub(idle)) as f32 / total as f32 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write_fixtures(dir: &Path, stat: &str, meminfo: &str, netdev: &str) {
        fs::create_dir_all(dir.join("net")).unwrap();
        fs::write(dir.join("stat"), stat).unwrap();
        fs::write(dir.join("meminfo"), meminfo).unwrap();
        fs::write(dir.join("net/dev"), netdev).unwrap();
    }

    const MEMINFO: &str = "MemTotal:       16000 kB\nMemFree:         4000 kB\nMemAvailable:    8000 kB\nBuffers:          500 kB\nCached:          2000 kB\nSwapTotal:       1000 kB\nSwapFree:         750 kB\n";
    const NETDEV: &str = "Inter-|   Receive                                                |  Transmit\n face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n  eth0: 1000 10 0 0 0 0 0 0 2000 20 0 0 0 0 0 0\n";

    #[test]
    fn first_sample_reports_zero_usage_then_deltas() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(
            dir.path(),
            "cpu  100 0 100 800 0 0 0\ncpu0 100 0 100 800 0 0 0\n",
            MEMINFO,
            NETDEV,
        );
        let mut monitor = SysMonitor::with_root(dir.path());
        let first = monitor.sample().unwrap();
        assert_eq!(first.aggregate.usage_percent, 0.0);
        assert_eq!(first.cpus.len(), 1);

        // 100 more busy ticks, 100 more idle: 50% over the interval.
        write_fixtures(
            dir.path(),
            "cpu  150 0 150 900 0 0 0\ncpu0 150 0 150 900 0 0 0\n",
            MEMINFO,
            NETDEV,
        );
        let second = monitor.sample().unwrap();
        assert!((second.aggregate.usage_percent - 50.0).abs() < 0.01);
        assert!((second.cpus[0].usage_percent - 50.0).abs() < 0.01);
    }

    #[test]
    fn memory_percentages_derive_from_available() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path(), "cpu  1 0 1 1 0 0 0\n", MEMINFO, NETDEV);
        let mut monitor = SysMonitor::with_root(dir.path());
        let sample = monitor.sample().unwrap();
        assert_eq!(sample.memory.total_kb, 16000);
        assert!((sample.memory.usage_percent - 50.0).abs() < 0.01);
        assert!((sample.memory.swap_percent - 25.0).abs() < 0.01);
    }

    #[test]
    fn net_devices_are_parsed_past_headers() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path(), "cpu  1 0 1 1 0 0 0\n", MEMINFO, NETDEV);
        let mut monitor = SysMonitor::with_root(dir.path());
        let sample = monitor.sample().unwrap();
        assert_eq!(sample.net.len(), 1);
        assert_eq!(sample.net[0].name, "eth0");
        assert_eq!(sample.net[0].rx_bytes, 1000);
        assert_eq!(sample.net[0].tx_bytes, 2000);
    }

    #[test]
    fn missing_root_surfaces_system_error() {
        let mut monitor = SysMonitor::with_root("/nonexistent-sysmon-root");
        let err = monitor.sample().unwrap_err();
        assert_eq!(err.kind(), core_error::ErrorKind::System);
    }

    #[test]
    fn malformed_stat_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path(), "intr 12345\n", MEMINFO, NETDEV);
        let mut monitor = SysMonitor::with_root(dir.path());
        let err = monitor.sample().unwrap_err();
        assert_eq!(err.kind(), core_error::ErrorKind::Parse);
    }
}
