//! Pod and node builders shared by the unit tests.

use k8s_openapi::api::core::v1::{
    Container, Node, NodeStatus, Pod, PodSpec, PodStatus, ResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::collections::BTreeMap;

/// `None` for an empty list, so an undeclared block stays undeclared.
pub(crate) fn quantities(pairs: &[(&str, &str)]) -> Option<BTreeMap<String, Quantity>> {
    if pairs.is_empty() {
        return None;
    }
    Some(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Quantity(v.to_string())))
            .collect(),
    )
}

/// Running pod in `default` with one container `c1` and no resources, unless told otherwise.
pub(crate) struct TestPod {
    name: String,
    namespace: String,
    phase: String,
    node: Option<String>,
    containers: Vec<String>,
    requests: Vec<(String, String)>,
    limits: Vec<(String, String)>,
}

impl TestPod {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: "default".to_string(),
            phase: "Running".to_string(),
            node: None,
            containers: vec!["c1".to_string()],
            requests: Vec::new(),
            limits: Vec::new(),
        }
    }

    pub(crate) fn namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub(crate) fn phase(mut self, phase: &str) -> Self {
        self.phase = phase.to_string();
        self
    }

    pub(crate) fn node(mut self, node: &str) -> Self {
        self.node = Some(node.to_string());
        self
    }

    pub(crate) fn containers(mut self, names: &[&str]) -> Self {
        self.containers = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Applied to every container.
    pub(crate) fn requests(mut self, pairs: &[(&str, &str)]) -> Self {
        self.requests = owned(pairs);
        self
    }

    /// Applied to every container.
    pub(crate) fn limits(mut self, pairs: &[(&str, &str)]) -> Self {
        self.limits = owned(pairs);
        self
    }

    pub(crate) fn build(self) -> Pod {
        let requests = borrowed(&self.requests);
        let limits = borrowed(&self.limits);
        let resources = if requests.is_empty() && limits.is_empty() {
            None
        } else {
            Some(ResourceRequirements {
                requests: quantities(&requests),
                limits: quantities(&limits),
                ..Default::default()
            })
        };

        Pod {
            metadata: ObjectMeta {
                name: Some(self.name),
                namespace: Some(self.namespace),
                ..Default::default()
            },
            spec: Some(PodSpec {
                node_name: self.node,
                containers: self
                    .containers
                    .into_iter()
                    .map(|name| Container {
                        name,
                        resources: resources.clone(),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            }),
            status: Some(PodStatus {
                phase: Some(self.phase),
                ..Default::default()
            }),
        }
    }
}

fn owned(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

fn borrowed(pairs: &[(String, String)]) -> Vec<(&str, &str)> {
    pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
}

pub(crate) fn test_node(name: &str, cpu: &str, memory: &str) -> Node {
    Node {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        status: Some(NodeStatus {
            capacity: quantities(&[("cpu", cpu), ("memory", memory)]),
            ..Default::default()
        }),
        ..Default::default()
    }
}
