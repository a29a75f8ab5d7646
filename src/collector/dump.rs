use tracing::{debug, info};

use crate::error::CollectorError;
use crate::kubernetes::ClusterHandle;
use crate::metrics::nodes::{missing_node_metrics, summarize_nodes, NodeUsage};
use crate::types::PodInfo;
use super::ResourceManager;

impl<C: ClusterHandle> ResourceManager<C> {
    /// Logs node CPU and memory usage as a share of capacity.
    pub async fn dump_nodes(&self) -> Result<Vec<NodeUsage>, CollectorError> {
        let nodes = self
            .cluster
            .list_nodes()
            .await
            .map_err(|source| CollectorError::NodeListing { source })?;

        let metrics = match self.cluster.node_metrics().await {
            Ok(metrics) => metrics,
            Err(e) => {
                debug!(error = %e, "Error getting node metrics");
                Vec::new()
            }
        };

        let usage = summarize_nodes(&nodes, metrics);
        for name in missing_node_metrics(&nodes, &usage) {
            debug!(node = %name, "no metrics reported for node");
        }
        for node in &usage {
            info!(
                node = %node.name,
                cpu_usage = %node.cpu_display(),
                memory_usage = %node.memory_display(),
                "Node usage"
            );
        }

        Ok(usage)
    }

    /// Logs the merged table for running pods in `namespace` (empty = all). Returns how many pods were dumped.
    pub async fn dump_pod_metrics(&self, namespace: &str) -> Result<usize, CollectorError> {
        let pods = self.list_pods().await?;

        let mut dumped = 0;
        for pod in pods
            .iter()
            .filter(|p| p.running && (namespace.is_empty() || p.namespace == namespace))
        {
            self.show_stats(pod);
            dumped += 1;
        }
        Ok(dumped)
    }

    fn show_stats(&self, pod: &PodInfo) {
        let node = pod.node_name.as_deref().unwrap_or("-");
        for (container, res) in self.resources.containers(&pod.name) {
            info!(
                podname = %pod.name,
                container = %container,
                node = %node,
                cpu_usage_milli = res.cpu_usage,
                mem_usage_mib = res.mem_usage,
                cpu_request_milli = res.cpu_request,
                cpu_limit_milli = res.cpu_limit,
                mem_request_mib = res.mem_request,
                mem_limit_mib = res.mem_limit,
                "Dumping Pod usage"
            );
        }
    }
}
