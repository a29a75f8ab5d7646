use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Values merged from the pod spec and the metrics server.
///
/// CPU is in millicores, memory in the table unit (see [`crate::parsing::bytes_to_mib`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    CpuUsage,
    CpuLimit,
    CpuRequest,
    MemUsage,
    MemLimit,
    MemRequest,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::CpuUsage,
        Metric::CpuLimit,
        Metric::CpuRequest,
        Metric::MemUsage,
        Metric::MemLimit,
        Metric::MemRequest,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::CpuUsage => "cpu_usage",
            Metric::CpuLimit => "cpu_limit",
            Metric::CpuRequest => "cpu_request",
            Metric::MemUsage => "mem_usage",
            Metric::MemLimit => "mem_limit",
            Metric::MemRequest => "mem_request",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown metric {:?}", s))
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ContainerResources {
    pub cpu_usage: i64,
    pub cpu_limit: i64,
    pub cpu_request: i64,
    pub mem_usage: i64,
    pub mem_limit: i64,
    pub mem_request: i64,
}

impl ContainerResources {
    pub fn get(&self, metric: Metric) -> i64 {
        match metric {
            Metric::CpuUsage => self.cpu_usage,
            Metric::CpuLimit => self.cpu_limit,
            Metric::CpuRequest => self.cpu_request,
            Metric::MemUsage => self.mem_usage,
            Metric::MemLimit => self.mem_limit,
            Metric::MemRequest => self.mem_request,
        }
    }

    pub fn set(&mut self, metric: Metric, value: i64) {
        let slot = match metric {
            Metric::CpuUsage => &mut self.cpu_usage,
            Metric::CpuLimit => &mut self.cpu_limit,
            Metric::CpuRequest => &mut self.cpu_request,
            Metric::MemUsage => &mut self.mem_usage,
            Metric::MemLimit => &mut self.mem_limit,
            Metric::MemRequest => &mut self.mem_request,
        };
        *slot = value;
    }
}

/// pod name -> container name -> merged resources.
///
/// Entries are created on first write. Reads of anything never written return zero.
#[derive(Debug, Default, Clone)]
pub struct ResourceTable {
    pods: HashMap<String, HashMap<String, ContainerResources>>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pod: &str, container: &str, metric: Metric) -> i64 {
        self.container(pod, container)
            .map(|c| c.get(metric))
            .unwrap_or(0)
    }

    pub fn set(&mut self, pod: &str, container: &str, metric: Metric, value: i64) {
        self.container_mut(pod, container).set(metric, value);
    }

    pub fn container(&self, pod: &str, container: &str) -> Option<&ContainerResources> {
        self.pods.get(pod).and_then(|containers| containers.get(container))
    }

    pub fn container_mut(&mut self, pod: &str, container: &str) -> &mut ContainerResources {
        self.pods
            .entry(pod.to_string())
            .or_default()
            .entry(container.to_string())
            .or_default()
    }

    /// Containers recorded for `pod`, sorted by name.
    pub fn containers(&self, pod: &str) -> Vec<(&str, &ContainerResources)> {
        let mut containers: Vec<_> = self
            .pods
            .get(pod)
            .map(|m| m.iter().map(|(name, res)| (name.as_str(), res)).collect())
            .unwrap_or_default();
        containers.sort_by(|a, b| a.0.cmp(b.0));
        containers
    }

    pub fn contains_pod(&self, pod: &str) -> bool {
        self.pods.contains_key(pod)
    }

    pub fn pod_names(&self) -> impl Iterator<Item = &str> {
        self.pods.keys().map(|k| k.as_str())
    }

    pub fn retain_pods<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.pods.retain(|name, _| keep(name));
    }

    pub fn len(&self) -> usize {
        self.pods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_entries_read_as_zero() {
        let table = ResourceTable::new();
        for metric in Metric::ALL {
            assert_eq!(table.get("ghost", "c1", metric), 0);
        }
        assert!(table.container("ghost", "c1").is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_set_creates_entries_lazily() {
        let mut table = ResourceTable::new();
        table.set("p1", "c1", Metric::CpuLimit, 200);

        assert!(table.contains_pod("p1"));
        assert_eq!(table.get("p1", "c1", Metric::CpuLimit), 200);
        // sibling fields of a fresh container start at zero
        assert_eq!(table.get("p1", "c1", Metric::CpuUsage), 0);
        assert_eq!(table.get("p1", "c2", Metric::CpuLimit), 0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_reads_are_stable() {
        let mut table = ResourceTable::new();
        table.set("p1", "c1", Metric::MemRequest, 3);
        let first = table.get("p1", "c1", Metric::MemRequest);
        let second = table.get("p1", "c1", Metric::MemRequest);
        assert_eq!(first, second);
    }

    #[test]
    fn test_containers_sorted_and_retain() {
        let mut table = ResourceTable::new();
        table.set("p1", "sidecar", Metric::CpuUsage, 5);
        table.set("p1", "app", Metric::CpuUsage, 7);
        table.set("p2", "app", Metric::CpuUsage, 1);

        let names: Vec<&str> = table.containers("p1").iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["app", "sidecar"]);
        assert!(table.containers("missing").is_empty());

        table.retain_pods(|name| name != "p2");
        assert!(!table.contains_pod("p2"));
        assert_eq!(table.pod_names().collect::<Vec<_>>(), vec!["p1"]);
    }

    #[test]
    fn test_metric_names_round_trip_through_from_str() {
        for metric in Metric::ALL {
            assert_eq!(metric.as_str().parse::<Metric>(), Ok(metric));
        }
        assert!("cpu_throttle".parse::<Metric>().is_err());
        assert_eq!(Metric::MemUsage.to_string(), "mem_usage");
    }
}
