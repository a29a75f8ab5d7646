use anyhow::{Context, Result};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use pod_usage_collector::{load_config, Config, KubeCluster, ResourceManager};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = load_config()?;
    init_tracing(&cfg);
    info!(
        namespace = %cfg.watched_namespace,
        interval_secs = cfg.tick_interval.as_secs(),
        build_mode = %cfg.build_mode,
        "configuration loaded"
    );

    // No degraded mode without a cluster connection
    let cluster = KubeCluster::try_default()
        .await
        .context("failed to resolve cluster credentials")?;

    let mut mgr = ResourceManager::start(cluster, cfg.clone());

    let mut ticker = interval(cfg.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        info!("ClusterCtrler Ticking");

        match mgr.tick().await {
            Ok(report) if report.has_failures() => {
                warn!(failures = report.total_failures(), "tick finished with failures");
            }
            Ok(_) => {}
            Err(e) => {
                error!(error = %e, "tick failed, retrying next interval");
                continue;
            }
        }

        if cfg.dump_nodes {
            if let Err(e) = mgr.dump_nodes().await {
                warn!(error = %e, "node dump failed");
            }
        }
        if cfg.dump_pods {
            if let Err(e) = mgr.dump_pod_metrics(&cfg.watched_namespace).await {
                warn!(error = %e, "pod dump failed");
            }
        }
    }
}

fn init_tracing(cfg: &Config) {
    let default_level = if cfg.is_production() { "info" } else { "debug" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);

    let _ = if cfg.is_production() {
        builder.json().with_writer(std::io::stderr).try_init()
    } else {
        builder.with_writer(std::io::stdout).try_init()
    };
}
