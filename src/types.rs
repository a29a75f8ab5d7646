use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub build_mode: String,
    pub tick_interval: Duration,
    pub watched_namespace: String,
    pub scrape_timeout: Duration,
    pub disk_device: String,
    pub strict_scrape: bool,
    pub prune_missing_pods: bool,
    pub dump_pods: bool,
    pub dump_nodes: bool,
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.build_mode == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            build_mode: "debug".to_string(),
            tick_interval: Duration::from_secs(5),
            watched_namespace: String::new(),
            scrape_timeout: Duration::from_secs(10),
            disk_device: "vda".to_string(),
            strict_scrape: false,
            prune_missing_pods: true,
            dump_pods: false,
            dump_nodes: false,
        }
    }
}

/// Declared quantities of one resource block (requests or limits), as written in the pod spec.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ResourceQuantities {
    pub cpu: Option<String>,
    pub memory: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ContainerSpec {
    pub name: String,
    pub requests: ResourceQuantities,
    pub limits: ResourceQuantities,
}

/// Identity of a listed pod.
#[derive(Debug, Clone, PartialEq)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub node_name: Option<String>,
    pub phase: String,
    pub running: bool,
    pub containers: Vec<ContainerSpec>,
}

impl PodInfo {
    pub fn primary_container(&self) -> Option<&ContainerSpec> {
        self.containers.first()
    }
}

/// Cumulative CPU time from cgroup cpuacct.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CpuMetric {
    pub cputime_nanos: i64,
}

/// cgroup memory.stat counters, in bytes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoryMetric {
    pub rss: i64,
    pub cache: i64,
    pub swap: i64,
}

/// IpExt InOctets/OutOctets.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NetworkMetric {
    pub in_bytes: i64,
    pub out_bytes: i64,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiskMetric {
    pub read_bytes: i64,
    pub written_bytes: i64,
}

/// cgroup counters of one container.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContainerCounters {
    pub cpu: CpuMetric,
    pub mem: MemoryMetric,
}

/// Counters scraped from one pod.
///
/// cpuacct and memory cgroups are per container, so those are kept per container name.
/// Network and disk counters are read once through the primary container: every
/// container of a pod shares its network namespace and sees the same block devices.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ScrapedMetrics {
    pub containers: BTreeMap<String, ContainerCounters>,
    pub net: NetworkMetric,
    pub disk: DiskMetric,
}

impl ScrapedMetrics {
    /// Zeroes for a container that has not been scraped yet.
    pub fn container(&self, name: &str) -> ContainerCounters {
        self.containers.get(name).copied().unwrap_or_default()
    }
}
