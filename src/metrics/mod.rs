// Metrics acquisition and parsing
pub mod base;
pub mod pods;
pub mod nodes;
pub mod scraped;

// Re-export commonly used items
pub use base::{ContainerMetrics, NodeMetricsItem, PodMetricsItem};
pub use pods::{pod_info, record_spec, record_usage, RUNNING_PHASE};
pub use nodes::{summarize_nodes, NodeUsage};
pub use scraped::{
    parse_cpuacct_usage, parse_diskstats, parse_memory_stat, parse_netstat,
    CPU_USAGE_PATH, DISKSTATS_PATH, MEMORY_STAT_PATH, NETSTAT_PATH, SECTOR_SIZE,
};
