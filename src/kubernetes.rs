use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{AttachParams, ListParams};
use kube::{Api, Client};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ClusterError;
use crate::metrics::base::{get_pod_metrics_http, list_node_metrics_http, NodeMetricsItem, PodMetricsItem};

/// Largest stdout or stderr accepted from one exec. The pseudo-files read are a few KiB.
pub const MAX_EXEC_OUTPUT: u64 = 1024 * 1024;

/// Everything the collector needs from the cluster: listing, metrics server snapshots and exec.
#[async_trait]
pub trait ClusterHandle: Send + Sync {
    /// Lists pods in `namespace`; an empty namespace lists every namespace.
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, ClusterError>;

    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterError>;

    /// May fail for a pod that exists; the metrics server lags behind pod starts.
    async fn pod_metrics(&self, namespace: &str, pod: &str) -> Result<PodMetricsItem, ClusterError>;

    async fn node_metrics(&self) -> Result<Vec<NodeMetricsItem>, ClusterError>;

    /// Runs `command` in `container` of `pod` and returns its stdout.
    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        command: &[&str],
    ) -> Result<String, ClusterError>;
}

/// Production handle backed by a `kube::Client`.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
}

impl KubeCluster {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Resolves credentials from the in-cluster environment or the local kubeconfig.
    pub async fn try_default() -> Result<Self, ClusterError> {
        Ok(Self::new(Client::try_default().await?))
    }

    fn pods(&self, namespace: &str) -> Api<Pod> {
        if namespace.is_empty() {
            Api::all(self.client.clone())
        } else {
            Api::namespaced(self.client.clone(), namespace)
        }
    }
}

#[async_trait]
impl ClusterHandle for KubeCluster {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, ClusterError> {
        let pods = self.pods(namespace).list(&ListParams::default()).await?;
        Ok(pods.items)
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterError> {
        let node_api: Api<Node> = Api::all(self.client.clone());
        let nodes = node_api.list(&ListParams::default()).await?;
        Ok(nodes.items)
    }

    async fn pod_metrics(&self, namespace: &str, pod: &str) -> Result<PodMetricsItem, ClusterError> {
        get_pod_metrics_http(&self.client, namespace, pod).await
    }

    async fn node_metrics(&self) -> Result<Vec<NodeMetricsItem>, ClusterError> {
        list_node_metrics_http(&self.client).await
    }

    async fn exec(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
        command: &[&str],
    ) -> Result<String, ClusterError> {
        let pod_api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = AttachParams::default()
            .container(container)
            .stdin(false)
            .stdout(true)
            .stderr(true);
        let mut attached = pod_api.exec(pod, command.to_vec(), &params).await?;

        let mut stdout = attached
            .stdout()
            .ok_or_else(|| ClusterError::Unavailable("exec stdout not attached".to_string()))?;
        let mut stderr = attached
            .stderr()
            .ok_or_else(|| ClusterError::Unavailable("exec stderr not attached".to_string()))?;
        let status = attached.take_status();

        let (out, err_out) = tokio::join!(
            read_capped(&mut stdout, "stdout", MAX_EXEC_OUTPUT),
            read_capped(&mut stderr, "stderr", MAX_EXEC_OUTPUT),
        );
        let (out, err_out) = (out?, err_out?);

        let status = match status {
            Some(status) => status.await,
            None => None,
        };
        attached
            .join()
            .await
            .map_err(|e| ClusterError::CommandFailed(e.to_string()))?;

        if let Some(status) = status {
            if status.status.as_deref() == Some("Failure") {
                let reason = if err_out.trim().is_empty() {
                    status.message.unwrap_or_else(|| "unknown failure".to_string())
                } else {
                    err_out.trim().to_string()
                };
                return Err(ClusterError::CommandFailed(reason));
            }
        }

        Ok(out)
    }
}

/// Reads at most `limit` bytes. Anything longer is an error, never a silently truncated payload.
async fn read_capped<R>(reader: R, stream: &'static str, limit: u64) -> Result<String, ClusterError>
where
    R: AsyncRead + Unpin,
{
    let mut out = String::new();
    reader.take(limit + 1).read_to_string(&mut out).await?;
    if out.len() as u64 > limit {
        return Err(ClusterError::OutputTooLarge { stream, limit });
    }
    Ok(out)
}

#[derive(Debug, Default)]
struct MockState {
    pods: Vec<Pod>,
    nodes: Vec<Node>,
    pod_metrics: HashMap<(String, String), PodMetricsItem>,
    node_metrics: Vec<NodeMetricsItem>,
    files: HashMap<(String, String), Result<String, String>>,
    fail_listing: bool,
    exec_delay: Option<Duration>,
    exec_calls: Vec<String>,
}

/// In-memory cluster for tests. Files are served to `cat <path>` keyed by pod name,
/// or by `pod/container` when one container must differ from the rest of the pod.
#[derive(Debug, Default)]
pub struct MockCluster {
    state: Mutex<MockState>,
}

impl MockCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // a panicking test thread must not hide the state from the others
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn with_pod(self, pod: Pod) -> Self {
        self.set_pod(pod);
        self
    }

    pub fn with_node(self, node: Node) -> Self {
        self.state().nodes.push(node);
        self
    }

    pub fn with_pod_metrics<N, P>(self, namespace: N, pod: P, metrics: PodMetricsItem) -> Self
    where
        N: Into<String>,
        P: Into<String>,
    {
        self.state().pod_metrics.insert((namespace.into(), pod.into()), metrics);
        self
    }

    pub fn with_node_metrics(self, metrics: NodeMetricsItem) -> Self {
        self.state().node_metrics.push(metrics);
        self
    }

    pub fn with_file<P, C>(self, pod: P, path: &str, content: C) -> Self
    where
        P: Into<String>,
        C: Into<String>,
    {
        self.set_file(pod, path, content);
        self
    }

    pub fn with_container_file<C>(self, pod: &str, container: &str, path: &str, content: C) -> Self
    where
        C: Into<String>,
    {
        self.set_file(format!("{}/{}", pod, container), path, content);
        self
    }

    pub fn with_exec_error<P, M>(self, pod: P, path: &str, message: M) -> Self
    where
        P: Into<String>,
        M: Into<String>,
    {
        self.set_exec_error(pod, path, message);
        self
    }

    pub fn with_exec_delay(self, delay: Duration) -> Self {
        self.state().exec_delay = Some(delay);
        self
    }

    /// Adds the pod, replacing any listed pod with the same name and namespace.
    pub fn set_pod(&self, pod: Pod) {
        let mut state = self.state();
        state.pods.retain(|p| {
            p.metadata.name != pod.metadata.name || p.metadata.namespace != pod.metadata.namespace
        });
        state.pods.push(pod);
    }

    pub fn remove_pod(&self, name: &str) {
        self.state().pods.retain(|p| p.metadata.name.as_deref() != Some(name));
    }

    pub fn set_file<P, C>(&self, pod: P, path: &str, content: C)
    where
        P: Into<String>,
        C: Into<String>,
    {
        self.state().files.insert((pod.into(), path.to_string()), Ok(content.into()));
    }

    pub fn set_exec_error<P, M>(&self, pod: P, path: &str, message: M)
    where
        P: Into<String>,
        M: Into<String>,
    {
        self.state().files.insert((pod.into(), path.to_string()), Err(message.into()));
    }

    pub fn set_fail_listing(&self, fail: bool) {
        self.state().fail_listing = fail;
    }

    /// `pod/container:path` for every exec served so far.
    pub fn exec_calls(&self) -> Vec<String> {
        self.state().exec_calls.clone()
    }
}

#[async_trait]
impl ClusterHandle for MockCluster {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>, ClusterError> {
        let state = self.state();
        if state.fail_listing {
            return Err(ClusterError::Unavailable("connection refused".to_string()));
        }
        Ok(state
            .pods
            .iter()
            .filter(|p| namespace.is_empty() || p.metadata.namespace.as_deref() == Some(namespace))
            .cloned()
            .collect())
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ClusterError> {
        let state = self.state();
        if state.fail_listing {
            return Err(ClusterError::Unavailable("connection refused".to_string()));
        }
        Ok(state.nodes.clone())
    }

    async fn pod_metrics(&self, namespace: &str, pod: &str) -> Result<PodMetricsItem, ClusterError> {
        self.state()
            .pod_metrics
            .get(&(namespace.to_string(), pod.to_string()))
            .cloned()
            .ok_or_else(|| {
                ClusterError::Unavailable(format!("podmetrics.metrics.k8s.io \"{}\" not found", pod))
            })
    }

    async fn node_metrics(&self) -> Result<Vec<NodeMetricsItem>, ClusterError> {
        Ok(self.state().node_metrics.clone())
    }

    async fn exec(
        &self,
        _namespace: &str,
        pod: &str,
        container: &str,
        command: &[&str],
    ) -> Result<String, ClusterError> {
        let path = match command {
            ["cat", path] => path.to_string(),
            other => return Err(ClusterError::CommandFailed(format!("unsupported command {:?}", other))),
        };

        let (delay, result) = {
            let mut state = self.state();
            state.exec_calls.push(format!("{}/{}:{}", pod, container, path));
            let result = state
                .files
                .get(&(format!("{}/{}", pod, container), path.clone()))
                .or_else(|| state.files.get(&(pod.to_string(), path.clone())))
                .cloned();
            (state.exec_delay, result)
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match result {
            Some(Ok(content)) => Ok(content),
            Some(Err(message)) => Err(ClusterError::CommandFailed(message)),
            None => Err(ClusterError::CommandFailed(format!(
                "cat: {}: No such file or directory",
                path
            ))),
        }
    }
}
