use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::time::Duration;
use crate::types::Config;

/// Trait for abstracting environment variable access
pub trait EnvironmentProvider {
    fn get_var(&self, key: &str) -> Option<String>;
}

/// Production implementation using std::env
pub struct SystemEnvironment;

impl EnvironmentProvider for SystemEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Mock implementation for testing
#[derive(Debug, Default)]
pub struct MockEnvironment {
    vars: HashMap<String, String>,
}

impl MockEnvironment {
    pub fn new() -> Self {
        Self {
            vars: HashMap::new(),
        }
    }

    pub fn set_var<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn with_var<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set_var(key, value);
        self
    }
}

impl EnvironmentProvider for MockEnvironment {
    fn get_var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn load_config() -> Result<Config> {
    load_config_with_env(&SystemEnvironment)
}

pub fn load_config_with_env<E: EnvironmentProvider>(env: &E) -> Result<Config> {
    let defaults = Config::default();

    let build_mode = env.get_var("BUILD_MODE")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(defaults.build_mode);

    let tick_interval = positive_seconds(env, "TICK_INTERVAL_SECONDS", defaults.tick_interval)?;
    let scrape_timeout = positive_seconds(env, "SCRAPE_TIMEOUT_SECONDS", defaults.scrape_timeout)?;

    // empty means all namespaces
    let watched_namespace = env.get_var("WATCHED_NAMESPACE")
        .map(|v| v.trim().to_string())
        .unwrap_or_default();

    let disk_device = env.get_var("DISK_DEVICE")
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or(defaults.disk_device);

    Ok(Config {
        build_mode,
        tick_interval,
        watched_namespace,
        scrape_timeout,
        disk_device,
        strict_scrape: flag(env, "STRICT_SCRAPE", defaults.strict_scrape),
        prune_missing_pods: flag(env, "PRUNE_MISSING_PODS", defaults.prune_missing_pods),
        dump_pods: flag(env, "DUMP_PODS", defaults.dump_pods),
        dump_nodes: flag(env, "DUMP_NODES", defaults.dump_nodes),
    })
}

fn positive_seconds<E: EnvironmentProvider>(env: &E, key: &str, default: Duration) -> Result<Duration> {
    let Some(raw) = env.get_var(key) else {
        return Ok(default);
    };
    let secs: u64 = raw.trim()
        .parse()
        .with_context(|| format!("Invalid {}", key))?;
    if secs == 0 {
        return Err(anyhow!("{} must be greater than zero", key));
    }
    Ok(Duration::from_secs(secs))
}

fn flag<E: EnvironmentProvider>(env: &E, key: &str, default: bool) -> bool {
    env.get_var(key)
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}
