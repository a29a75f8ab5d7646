use k8s_openapi::api::core::v1::{Container, Pod, PodSpec, PodStatus, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::{BTreeMap, HashMap};

use pod_usage_collector::{
    bytes_to_mib, load_config_with_env, parse_cpu_to_millicores, parse_diskstats,
    parse_memory_stat, parse_netstat, Config, ContainerMetrics, Metric, MockCluster,
    MockEnvironment, PodMetricsItem, ResourceManager, CPU_USAGE_PATH, DISKSTATS_PATH,
    MEMORY_STAT_PATH, NETSTAT_PATH,
};

fn running_pod(name: &str, container: &str, cpu_request: &str, cpu_limit: &str) -> Pod {
    let mut requests = BTreeMap::new();
    requests.insert("cpu".to_string(), Quantity(cpu_request.to_string()));
    let mut limits = BTreeMap::new();
    limits.insert("cpu".to_string(), Quantity(cpu_limit.to_string()));

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            containers: vec![Container {
                name: container.to_string(),
                resources: Some(ResourceRequirements {
                    requests: Some(requests),
                    limits: Some(limits),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            ..Default::default()
        }),
        status: Some(PodStatus {
            phase: Some("Running".to_string()),
            ..Default::default()
        }),
    }
}

fn usage_snapshot(container: &str, cpu: &str, memory: &str) -> PodMetricsItem {
    PodMetricsItem {
        metadata: serde_json::json!({"name": "p1"}),
        containers: vec![ContainerMetrics {
            name: container.to_string(),
            usage: HashMap::from([
                ("cpu".to_string(), cpu.to_string()),
                ("memory".to_string(), memory.to_string()),
            ]),
        }],
    }
}

#[tokio::test]
async fn test_merge_pass_reproduces_unit_caveat() {
    let cluster = MockCluster::new()
        .with_pod(running_pod("p1", "c1", "100m", "200m"))
        .with_pod_metrics("default", "p1", usage_snapshot("c1", "50m", "104857600"));

    let mut mgr = ResourceManager::start(cluster, Config::default());
    mgr.tick().await.unwrap();

    assert_eq!(mgr.cpu_request("p1", "c1"), 100);
    assert_eq!(mgr.cpu_limit("p1", "c1"), 200);
    assert_eq!(mgr.cpu_usage("p1", "c1"), 50);
    assert_eq!(mgr.mem_usage("p1", "c1"), 0);
    assert_eq!(mgr.metric("p1", "c1", "cpu_limit".parse::<Metric>().unwrap()), 200);
}

#[tokio::test]
async fn test_full_tick_with_scraped_counters() {
    let cluster = MockCluster::new()
        .with_pod(running_pod("p1", "c1", "250m", "1"))
        .with_pod_metrics("default", "p1", usage_snapshot("c1", "1500000n", "3Gi"))
        .with_file("p1", CPU_USAGE_PATH, "5000000000\n")
        .with_file("p1", MEMORY_STAT_PATH, "total_rss 4096\ntotal_cache 8192\ntotal_swap 16\n")
        .with_file("p1", NETSTAT_PATH, "IpExt: InOctets OutOctets\nIpExt: 100 200\n")
        .with_file("p1", DISKSTATS_PATH, " 252 0 vda 1 0 8 0 2 0 16 0 0 0 0\n");

    let mut mgr = ResourceManager::start(cluster, Config::default());
    let report = mgr.tick().await.unwrap();

    assert!(!report.has_failures());
    assert_eq!(mgr.cpu_usage("p1", "c1"), 2); // 1.5 millicores rounds up
    assert_eq!(mgr.mem_usage("p1", "c1"), 3); // 3221225472 / 1e9
    assert_eq!(mgr.cpu_limit("p1", "c1"), 1000);

    let scraped = mgr.scraped("p1").unwrap();
    assert_eq!(scraped.container("c1").cpu.cputime_nanos, 5_000_000_000);
    assert_eq!(scraped.container("c1").mem.cache, 8192);
    assert_eq!(scraped.net.out_bytes, 200);
    assert_eq!(scraped.disk.read_bytes, 8 * 512);
    assert_eq!(scraped.disk.written_bytes, 16 * 512);
}

#[test]
fn test_parsers_from_public_api() {
    let mem = parse_memory_stat("total_rss 1000\ntotal_cache 2000\ntotal_swap 0\nunrelated_key 99").unwrap();
    assert_eq!((mem.rss, mem.cache, mem.swap), (1000, 2000, 0));

    let net = parse_netstat("Ip: Forwarding\nIp: 1\nIpExt: InOctets OutOctets\nIpExt: 12345 6789").unwrap();
    assert_eq!((net.in_bytes, net.out_bytes), (12345, 6789));

    let disk = parse_diskstats("8 0 sda 1 1 1 1 1 1 1\n8 0 vda 100 200 4096 300 400 500 300", "vda").unwrap();
    assert_eq!((disk.read_bytes, disk.written_bytes), (4096 * 512, 300 * 512));
}

#[test]
fn test_unit_conversions() {
    assert_eq!(parse_cpu_to_millicores("100m"), Some(100));
    assert_eq!(parse_cpu_to_millicores("0.25"), Some(250));
    for bytes in [0_i64, 1, 999_999_999, 1_000_000_000, 5_500_000_000] {
        assert_eq!(bytes_to_mib(bytes), bytes / 1_000_000_000);
    }
}

#[test]
fn test_config_environment_isolation() {
    let config = load_config_with_env(&MockEnvironment::new()).unwrap();
    assert_eq!(config.watched_namespace, "");
    assert_eq!(config.disk_device, "vda");

    let env = MockEnvironment::new()
        .with_var("WATCHED_NAMESPACE", "workloads")
        .with_var("TICK_INTERVAL_SECONDS", "-1");
    assert!(load_config_with_env(&env).is_err());
}
