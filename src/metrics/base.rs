use kube::Client;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::ClusterError;

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerMetrics {
    pub name: String,
    pub usage: HashMap<String, String>,
}

impl ContainerMetrics {
    pub fn cpu(&self) -> Option<&str> {
        self.usage.get("cpu").map(|s| s.as_str())
    }

    pub fn memory(&self) -> Option<&str> {
        self.usage.get("memory").map(|s| s.as_str())
    }
}

/// A `metrics.k8s.io/v1beta1` PodMetrics object.
#[derive(Debug, Clone, Deserialize)]
pub struct PodMetricsItem {
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub containers: Vec<ContainerMetrics>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeMetricsItem {
    pub metadata: serde_json::Value,
    pub usage: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct NodeMetricsList {
    pub items: Vec<NodeMetricsItem>,
}

pub fn metadata_name(metadata: &serde_json::Value) -> Option<&str> {
    metadata
        .get("name")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
}

pub async fn get_pod_metrics_http(
    client: &Client,
    namespace: &str,
    pod: &str,
) -> Result<PodMetricsItem, ClusterError> {
    use http::Request as HttpRequest;
    let path = format!(
        "/apis/metrics.k8s.io/v1beta1/namespaces/{}/pods/{}",
        namespace, pod
    );
    let req = HttpRequest::builder()
        .method("GET")
        .uri(path)
        .body(Vec::new())?;
    let item: PodMetricsItem = client.request(req).await?;
    Ok(item)
}

pub async fn list_node_metrics_http(client: &Client) -> Result<Vec<NodeMetricsItem>, ClusterError> {
    use http::Request as HttpRequest;
    let path = "/apis/metrics.k8s.io/v1beta1/nodes";
    let req = HttpRequest::builder()
        .method("GET")
        .uri(path)
        .body(Vec::new())?;
    let list: NodeMetricsList = client.request(req).await?;
    Ok(list.items)
}

pub fn build_node_metrics_map(items: Vec<NodeMetricsItem>) -> HashMap<String, NodeMetricsItem> {
    let mut map = HashMap::new();
    for item in items {
        if let Some(name) = metadata_name(&item.metadata).map(str::to_string) {
            map.insert(name, item);
        }
    }
    map
}
