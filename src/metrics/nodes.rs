use k8s_openapi::api::core::v1::Node;
use std::collections::HashMap;

use crate::parsing::{parse_cpu_to_millicores, parse_memory_to_bytes};
use super::base::{build_node_metrics_map, NodeMetricsItem};

/// Point-in-time utilisation of one node relative to its capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeUsage {
    pub name: String,
    pub cpu_pct: Option<f64>,
    pub memory_pct: Option<f64>,
}

impl NodeUsage {
    pub fn cpu_display(&self) -> String {
        format_percent(self.cpu_pct)
    }

    pub fn memory_display(&self) -> String {
        format_percent(self.memory_pct)
    }
}

pub fn format_percent(pct: Option<f64>) -> String {
    match pct {
        Some(p) => format!("{:.4}%", p),
        None => "-".to_string(),
    }
}

/// Pairs nodes with their metrics. Nodes the metrics server knows nothing about are left out.
pub fn summarize_nodes(nodes: &[Node], metrics: Vec<NodeMetricsItem>) -> Vec<NodeUsage> {
    let metrics_by_node: HashMap<String, NodeMetricsItem> = build_node_metrics_map(metrics);

    nodes
        .iter()
        .filter_map(|node| {
            let name = node.metadata.name.as_ref()?;
            let metrics = metrics_by_node.get(name)?;
            let (cpu_pct, memory_pct) = calculate_node_utilization_percentages(node, metrics);
            Some(NodeUsage {
                name: name.clone(),
                cpu_pct,
                memory_pct,
            })
        })
        .collect()
}

pub fn missing_node_metrics<'a>(nodes: &'a [Node], usage: &[NodeUsage]) -> Vec<&'a str> {
    nodes
        .iter()
        .filter_map(|n| n.metadata.name.as_deref())
        .filter(|name| !usage.iter().any(|u| u.name == *name))
        .collect()
}

fn capacity(node: &Node, key: &str) -> Option<String> {
    node.status
        .as_ref()
        .and_then(|s| s.capacity.as_ref())
        .and_then(|c| c.get(key))
        .map(|q| q.0.clone())
}

fn calculate_node_utilization_percentages(
    node: &Node,
    metrics: &NodeMetricsItem,
) -> (Option<f64>, Option<f64>) {
    let cpu_pct = match (
        metrics.usage.get("cpu").and_then(|c| parse_cpu_to_millicores(c)),
        capacity(node, "cpu").and_then(|c| parse_cpu_to_millicores(&c)),
    ) {
        (Some(used), Some(cap)) if cap > 0 => Some(used as f64 / cap as f64 * 100.0),
        _ => None,
    };

    let memory_pct = match (
        metrics.usage.get("memory").and_then(|m| parse_memory_to_bytes(m)),
        capacity(node, "memory").and_then(|m| parse_memory_to_bytes(&m)),
    ) {
        (Some(used), Some(cap)) if cap > 0 => Some(used as f64 / cap as f64 * 100.0),
        _ => None,
    };

    (cpu_pct, memory_pct)
}
