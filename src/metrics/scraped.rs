//! Parsers for the kernel and cgroup pseudo-files read from inside a container.

use crate::error::ParseError;
use crate::types::{CpuMetric, DiskMetric, MemoryMetric, NetworkMetric};

pub const CPU_USAGE_PATH: &str = "/sys/fs/cgroup/cpuacct/cpuacct.usage";
pub const MEMORY_STAT_PATH: &str = "/sys/fs/cgroup/memory/memory.stat";
pub const NETSTAT_PATH: &str = "/proc/net/netstat";
pub const DISKSTATS_PATH: &str = "/proc/diskstats";

/// bytes per sector in /proc/diskstats
pub const SECTOR_SIZE: i64 = 512;

fn parse_i64(field: &str, value: &str) -> Result<i64, ParseError> {
    value
        .parse::<i64>()
        .map_err(|e| ParseError::invalid_number(field, value, e))
}

/// `cpuacct.usage` holds a single decimal nanosecond counter.
pub fn parse_cpuacct_usage(content: &str) -> Result<CpuMetric, ParseError> {
    let cputime_nanos = parse_i64("cpuacct.usage", content.trim())?;
    Ok(CpuMetric { cputime_nanos })
}

/// `memory.stat` is `<key> <value>` per line. Only the hierarchical totals are kept.
pub fn parse_memory_stat(content: &str) -> Result<MemoryMetric, ParseError> {
    let mut metric = MemoryMetric::default();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let [key, value] = parts.as_slice() else {
            continue;
        };

        let slot = match *key {
            "total_rss" => &mut metric.rss,
            "total_cache" => &mut metric.cache,
            "total_swap" => &mut metric.swap,
            _ => continue,
        };
        *slot = parse_i64(key, value)?;
    }

    Ok(metric)
}

/// `/proc/net/netstat` comes in header/value line pairs. The values for the
/// `IpExt:` header are on the following line, aligned by column.
pub fn parse_netstat(content: &str) -> Result<NetworkMetric, ParseError> {
    let mut lines = content.lines();

    let header: Vec<&str> = lines
        .by_ref()
        .map(|line| line.split_whitespace().collect::<Vec<_>>())
        .find(|tokens| tokens.first() == Some(&"IpExt:"))
        .ok_or_else(|| ParseError::Missing("IpExt header".to_string()))?;

    let values: Vec<&str> = lines
        .next()
        .map(|line| line.split_whitespace().collect())
        .ok_or_else(|| ParseError::Missing("IpExt values line".to_string()))?;

    let column = |name: &str| -> Result<i64, ParseError> {
        let idx = header
            .iter()
            .position(|h| *h == name)
            .ok_or_else(|| ParseError::Missing(format!("IpExt column {}", name)))?;
        let value = values
            .get(idx)
            .ok_or_else(|| ParseError::Missing(format!("IpExt value for {}", name)))?;
        parse_i64(name, value)
    };

    Ok(NetworkMetric {
        in_bytes: column("InOctets")?,
        out_bytes: column("OutOctets")?,
    })
}

/// `/proc/diskstats`: field 2 is the device name, 5 sectors read, 9 sectors written.
///
/// Only the first line for `device` counts. A listing without that device yields zeros.
pub fn parse_diskstats(content: &str, device: &str) -> Result<DiskMetric, ParseError> {
    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.get(2) != Some(&device) {
            continue;
        }

        let bytes = |idx: usize, what: &str| -> Result<i64, ParseError> {
            let field = format!("{} sectors {}", device, what);
            let raw = fields
                .get(idx)
                .ok_or_else(|| ParseError::Missing(field.clone()))?;
            let sectors = parse_i64(&field, raw)?;
            sectors
                .checked_mul(SECTOR_SIZE)
                .ok_or(ParseError::Overflow { field, value: sectors })
        };

        return Ok(DiskMetric {
            read_bytes: bytes(5, "read")?,
            written_bytes: bytes(9, "written")?,
        });
    }

    Ok(DiskMetric::default())
}
