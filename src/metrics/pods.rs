use k8s_openapi::api::core::v1::{Container, Pod};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;
use tracing::debug;

use crate::parsing::{cpu_quantity_to_millicores, memory_quantity_to_mib};
use crate::table::{Metric, ResourceTable};
use crate::types::{ContainerSpec, PodInfo, ResourceQuantities};
use super::base::PodMetricsItem;

pub const RUNNING_PHASE: &str = "Running";

/// Flattens a listed pod into the fields the collector needs. Pods without a name are dropped.
pub fn pod_info(pod: &Pod) -> Option<PodInfo> {
    let name = pod.metadata.name.clone()?;
    let namespace = pod.metadata.namespace.clone().unwrap_or_default();
    let phase = pod
        .status
        .as_ref()
        .and_then(|s| s.phase.clone())
        .unwrap_or_default();

    let (node_name, containers) = match pod.spec.as_ref() {
        Some(spec) => (
            spec.node_name.clone(),
            spec.containers.iter().map(container_spec).collect(),
        ),
        None => (None, Vec::new()),
    };

    Some(PodInfo {
        name,
        namespace,
        node_name,
        running: phase == RUNNING_PHASE,
        phase,
        containers,
    })
}

fn container_spec(c: &Container) -> ContainerSpec {
    let resources = c.resources.as_ref();
    ContainerSpec {
        name: c.name.clone(),
        requests: quantities(resources.and_then(|r| r.requests.as_ref())),
        limits: quantities(resources.and_then(|r| r.limits.as_ref())),
    }
}

fn quantities(map: Option<&BTreeMap<String, Quantity>>) -> ResourceQuantities {
    let get = |key: &str| map.and_then(|m| m.get(key)).map(|q| q.0.clone());
    ResourceQuantities {
        cpu: get("cpu"),
        memory: get("memory"),
    }
}

/// Writes metrics-server usage for every container present in the snapshot.
///
/// Containers missing from the snapshot keep whatever the table already holds.
pub fn record_usage(table: &mut ResourceTable, pod: &str, metrics: &PodMetricsItem) {
    for container in &metrics.containers {
        let entry = table.container_mut(pod, &container.name);
        entry.set(Metric::CpuUsage, cpu_quantity_to_millicores(container.cpu()));
        entry.set(Metric::MemUsage, memory_quantity_to_mib(container.memory()));
    }
    if metrics.containers.is_empty() {
        debug!(pod = %pod, "metrics snapshot carries no containers");
    }
}

/// Writes declared requests and limits. Undeclared values are recorded as zero.
pub fn record_spec(table: &mut ResourceTable, pod: &PodInfo) {
    for container in &pod.containers {
        let entry = table.container_mut(&pod.name, &container.name);
        entry.set(Metric::CpuLimit, cpu_quantity_to_millicores(container.limits.cpu.as_deref()));
        entry.set(Metric::MemLimit, memory_quantity_to_mib(container.limits.memory.as_deref()));
        entry.set(Metric::CpuRequest, cpu_quantity_to_millicores(container.requests.cpu.as_deref()));
        entry.set(Metric::MemRequest, memory_quantity_to_mib(container.requests.memory.as_deref()));
    }
}
