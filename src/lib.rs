// Public modules
pub mod types;
pub mod error;
pub mod config;
pub mod parsing;
pub mod table;
pub mod kubernetes;
pub mod metrics;
pub mod collector;
pub mod report;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use types::*;
pub use error::{ClusterError, CollectorError, ParseError, ScrapeError};
pub use config::{load_config, load_config_with_env, EnvironmentProvider, SystemEnvironment, MockEnvironment};
pub use parsing::{parse_cpu_to_millicores, parse_memory_to_bytes, bytes_to_mib, MEMORY_UNIT_DIVISOR};
pub use table::{ContainerResources, Metric, ResourceTable};
pub use kubernetes::{ClusterHandle, KubeCluster, MockCluster};
pub use metrics::*;
pub use collector::ResourceManager;
pub use report::TickReport;
