use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::{CollectorError, ParseError, ScrapeError};
use crate::kubernetes::ClusterHandle;
use crate::metrics::{
    parse_cpuacct_usage, parse_diskstats, parse_memory_stat, parse_netstat, pod_info,
    record_spec, record_usage, CPU_USAGE_PATH, DISKSTATS_PATH, MEMORY_STAT_PATH, NETSTAT_PATH,
};
use crate::report::TickReport;
use crate::table::{Metric, ResourceTable};
use crate::types::*;

mod dump;

/// cgroup reads for one container
struct ContainerScrape {
    container: String,
    cpu: Result<CpuMetric, ScrapeError>,
    mem: Result<MemoryMetric, ScrapeError>,
}

/// Results of every in-container read for one pod
struct PodScrape {
    containers: Vec<ContainerScrape>,
    net: Result<NetworkMetric, ScrapeError>,
    disk: Result<DiskMetric, ScrapeError>,
}

/// Owns the resource table and the scraped counters, and refreshes both once per tick.
pub struct ResourceManager<C: ClusterHandle> {
    cluster: C,
    config: Config,
    // pod name -> container name -> merged resources
    resources: ResourceTable,
    // pod name -> scraped counters
    usage: HashMap<String, ScrapedMetrics>,
}

impl<C: ClusterHandle> ResourceManager<C> {
    /// Starts a collector over an already resolved cluster handle. Both tables start empty.
    pub fn start(cluster: C, config: Config) -> Self {
        info!(namespace = %config.watched_namespace, "starting resource manager");
        Self {
            cluster,
            config,
            resources: ResourceTable::new(),
            usage: HashMap::new(),
        }
    }

    pub fn watched_namespace(&self) -> &str {
        &self.config.watched_namespace
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cluster(&self) -> &C {
        &self.cluster
    }

    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    /// Lists every pod in the watched namespace, running or not.
    pub async fn list_pods(&self) -> Result<Vec<PodInfo>, CollectorError> {
        let namespace = &self.config.watched_namespace;
        let pods = self
            .cluster
            .list_pods(namespace)
            .await
            .map_err(|source| CollectorError::Listing {
                namespace: namespace.clone(),
                source,
            })?;
        Ok(pods.iter().filter_map(pod_info).collect())
    }

    /// One collection pass: list, merge spec and usage, scrape. Only running pods are touched.
    pub async fn tick(&mut self) -> Result<TickReport, CollectorError> {
        let started = Instant::now();
        let mut report = TickReport::new(Utc::now());

        let pods = self.list_pods().await?;
        report.pods_listed = pods.len();
        report.duplicate_pod_names = warn_duplicate_names(&pods);

        if self.config.prune_missing_pods {
            report.pods_pruned = self.prune_missing(&pods);
        }

        for pod in pods.iter().filter(|p| p.running) {
            report.pods_running += 1;

            if !self.record_pod_metrics(pod).await {
                report.usage_missing += 1;
            }

            let scrape = self.scrape_pod(pod).await;
            self.apply_scrape(pod, scrape, &mut report)?;
        }

        report.elapsed = started.elapsed();
        info!(
            pods = report.pods_listed,
            running = report.pods_running,
            pruned = report.pods_pruned,
            duplicate_names = report.duplicate_pod_names,
            usage_missing = report.usage_missing,
            scrape_failures = report.scrape_failures,
            malformed = report.malformed_payloads,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "resource tick complete"
        );
        Ok(report)
    }

    /// Drops entries of pods that are no longer listed at all. Returns how many pods were dropped.
    fn prune_missing(&mut self, pods: &[PodInfo]) -> usize {
        let listed: HashSet<&str> = pods.iter().map(|p| p.name.as_str()).collect();
        let gone: HashSet<String> = self
            .resources
            .pod_names()
            .chain(self.usage.keys().map(|k| k.as_str()))
            .filter(|name| !listed.contains(name))
            .map(str::to_string)
            .collect();

        if gone.is_empty() {
            return 0;
        }
        for name in &gone {
            debug!(pod = %name, "pruning pod that is no longer listed");
        }
        self.resources.retain_pods(|name| !gone.contains(name));
        self.usage.retain(|name, _| !gone.contains(name));
        gone.len()
    }

    /// Merges metrics-server usage and the declared spec. Returns false when no usage snapshot was available.
    async fn record_pod_metrics(&mut self, pod: &PodInfo) -> bool {
        let snapshot = match self.cluster.pod_metrics(&pod.namespace, &pod.name).await {
            Ok(metrics) => Some(metrics),
            Err(e) => {
                debug!(pod = %pod.name, namespace = %pod.namespace, error = %e, "no usage snapshot from metrics server");
                None
            }
        };

        if let Some(metrics) = snapshot.as_ref() {
            record_usage(&mut self.resources, &pod.name, metrics);
        }
        record_spec(&mut self.resources, pod);

        snapshot.is_some()
    }

    /// `cat` a file inside one container of the pod, bounded by the scrape timeout.
    async fn read_file(
        &self,
        pod: &PodInfo,
        container: &str,
        path: &'static str,
    ) -> Result<String, ScrapeError> {
        if !pod.running {
            return Err(ScrapeError::NotRunning(pod.name.clone()));
        }

        let command = ["cat", path];
        let exec = self.cluster.exec(&pod.namespace, &pod.name, container, &command);

        match tokio::time::timeout(self.config.scrape_timeout, exec).await {
            Ok(Ok(out)) => Ok(out),
            Ok(Err(source)) => Err(ScrapeError::Exec {
                pod: pod.name.clone(),
                container: container.to_string(),
                path,
                source,
            }),
            Err(_) => Err(ScrapeError::Timeout {
                pod: pod.name.clone(),
                path,
                timeout: self.config.scrape_timeout,
            }),
        }
    }

    async fn scrape<T, F>(
        &self,
        pod: &PodInfo,
        container: &str,
        path: &'static str,
        parse: F,
    ) -> Result<T, ScrapeError>
    where
        F: FnOnce(&str) -> Result<T, ParseError>,
    {
        let out = self.read_file(pod, container, path).await?;
        parse(&out).map_err(|source| ScrapeError::Malformed { path, source })
    }

    async fn scrape_container(&self, pod: &PodInfo, container: &str) -> ContainerScrape {
        let (cpu, mem) = tokio::join!(
            self.scrape(pod, container, CPU_USAGE_PATH, parse_cpuacct_usage),
            self.scrape(pod, container, MEMORY_STAT_PATH, parse_memory_stat),
        );
        ContainerScrape {
            container: container.to_string(),
            cpu,
            mem,
        }
    }

    /// cgroup files in every container, pod-wide files once through the primary one.
    async fn scrape_pod(&self, pod: &PodInfo) -> Result<PodScrape, ScrapeError> {
        let primary = pod
            .primary_container()
            .ok_or_else(|| ScrapeError::NoContainer(pod.name.clone()))?;
        let device = self.config.disk_device.as_str();

        let pod_wide = async {
            tokio::join!(
                self.scrape(pod, &primary.name, NETSTAT_PATH, parse_netstat),
                self.scrape(pod, &primary.name, DISKSTATS_PATH, |content| {
                    parse_diskstats(content, device)
                }),
            )
        };
        let per_container = async {
            let mut scrapes = Vec::with_capacity(pod.containers.len());
            for container in &pod.containers {
                scrapes.push(self.scrape_container(pod, &container.name).await);
            }
            scrapes
        };

        let ((net, disk), containers) = tokio::join!(pod_wide, per_container);
        Ok(PodScrape { containers, net, disk })
    }

    /// Stores every successful group. Failed groups keep their previous value.
    fn apply_scrape(
        &mut self,
        pod: &PodInfo,
        scrape: Result<PodScrape, ScrapeError>,
        report: &mut TickReport,
    ) -> Result<(), CollectorError> {
        let PodScrape { containers, net, disk } = match scrape {
            Ok(scrape) => scrape,
            Err(e) => {
                self.settle::<()>(pod, Err(e), report)?;
                return Ok(());
            }
        };

        for ContainerScrape { container, cpu, mem } in containers {
            if let Some(cpu) = self.settle(pod, cpu, report)? {
                info!(pod = %pod.name, container = %container, cputime_nano = cpu.cputime_nanos, "CPUStat");
                self.counters_mut(&pod.name).containers.entry(container.clone()).or_default().cpu = cpu;
            }

            if let Some(mem) = self.settle(pod, mem, report)? {
                info!(
                    pod = %pod.name,
                    container = %container,
                    rss = mem.rss,
                    cache = mem.cache,
                    swap = mem.swap,
                    "MemoryStat"
                );
                self.counters_mut(&pod.name).containers.entry(container).or_default().mem = mem;
            }
        }

        if let Some(net) = self.settle(pod, net, report)? {
            info!(pod = %pod.name, in_bytes = net.in_bytes, out_bytes = net.out_bytes, "NetworkStat");
            self.counters_mut(&pod.name).net = net;
        }

        if let Some(disk) = self.settle(pod, disk, report)? {
            info!(pod = %pod.name, read_bytes = disk.read_bytes, written_bytes = disk.written_bytes, "DiskStat");
            self.counters_mut(&pod.name).disk = disk;
        }

        Ok(())
    }

    fn counters_mut(&mut self, pod: &str) -> &mut ScrapedMetrics {
        self.usage.entry(pod.to_string()).or_default()
    }

    fn settle<T>(
        &self,
        pod: &PodInfo,
        result: Result<T, ScrapeError>,
        report: &mut TickReport,
    ) -> Result<Option<T>, CollectorError> {
        match result {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_recoverable() => {
                warn!(pod = %pod.name, error = %e, "scrape failed, keeping previous value");
                report.scrape_failures += 1;
                Ok(None)
            }
            Err(e) if self.config.strict_scrape => Err(CollectorError::MalformedPayload {
                pod: pod.name.clone(),
                source: e,
            }),
            Err(e) => {
                error!(pod = %pod.name, error = %e, "malformed payload, keeping previous value");
                report.malformed_payloads += 1;
                Ok(None)
            }
        }
    }

    // ========== merged table accessors ==========

    pub fn metric(&self, pod: &str, container: &str, metric: Metric) -> i64 {
        self.resources.get(pod, container, metric)
    }

    pub fn cpu_request(&self, pod: &str, container: &str) -> i64 {
        self.metric(pod, container, Metric::CpuRequest)
    }

    pub fn cpu_limit(&self, pod: &str, container: &str) -> i64 {
        self.metric(pod, container, Metric::CpuLimit)
    }

    pub fn cpu_usage(&self, pod: &str, container: &str) -> i64 {
        self.metric(pod, container, Metric::CpuUsage)
    }

    pub fn mem_request(&self, pod: &str, container: &str) -> i64 {
        self.metric(pod, container, Metric::MemRequest)
    }

    pub fn mem_limit(&self, pod: &str, container: &str) -> i64 {
        self.metric(pod, container, Metric::MemLimit)
    }

    pub fn mem_usage(&self, pod: &str, container: &str) -> i64 {
        self.metric(pod, container, Metric::MemUsage)
    }

    // ========== scraped counters ==========

    pub fn scraped(&self, pod: &str) -> Option<&ScrapedMetrics> {
        self.usage.get(pod)
    }

    pub fn cpu_metrics(&self, pod: &str, container: &str) -> CpuMetric {
        self.scraped(pod).map(|s| s.container(container).cpu).unwrap_or_default()
    }

    pub fn memory_metrics(&self, pod: &str, container: &str) -> MemoryMetric {
        self.scraped(pod).map(|s| s.container(container).mem).unwrap_or_default()
    }

    pub fn network_metrics(&self, pod: &str) -> NetworkMetric {
        self.scraped(pod).map(|s| s.net).unwrap_or_default()
    }

    pub fn disk_metrics(&self, pod: &str) -> DiskMetric {
        self.scraped(pod).map(|s| s.disk).unwrap_or_default()
    }
}

/// The table is keyed by pod name, so same-named pods from different namespaces
/// share an entry. Returns how many names are affected.
fn warn_duplicate_names(pods: &[PodInfo]) -> usize {
    let mut namespaces: HashMap<&str, Vec<&str>> = HashMap::new();
    for pod in pods {
        namespaces.entry(&pod.name).or_default().push(&pod.namespace);
    }

    let mut duplicates = 0;
    for (name, seen_in) in namespaces.iter().filter(|(_, ns)| ns.len() > 1) {
        warn!(pod = %name, namespaces = ?seen_in, "pod name listed more than once, entries will overwrite each other");
        duplicates += 1;
    }
    duplicates
}
