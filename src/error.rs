use std::num::ParseIntError;
use std::time::Duration;

use thiserror::Error;

/// Failures talking to the cluster, the metrics server or a container.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),

    #[error("build request: {0}")]
    Request(#[from] http::Error),

    #[error("exec stream error: {0}")]
    Io(#[from] std::io::Error),

    #[error("command failed: {0}")]
    CommandFailed(String),

    #[error("exec {stream} exceeded {limit} bytes")]
    OutputTooLarge { stream: &'static str, limit: u64 },

    #[error("{0}")]
    Unavailable(String),
}

/// A payload was present but did not have the expected shape.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid integer {value:?} for {field}")]
    InvalidNumber {
        field: String,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("missing {0}")]
    Missing(String),

    #[error("{field} value {value} overflows 64 bits")]
    Overflow { field: String, value: i64 },
}

impl ParseError {
    pub(crate) fn invalid_number(field: &str, value: &str, source: ParseIntError) -> Self {
        ParseError::InvalidNumber {
            field: field.to_string(),
            value: value.to_string(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("pod {0} is not running")]
    NotRunning(String),

    #[error("pod {0} has no containers")]
    NoContainer(String),

    #[error("exec `cat {path}` in {pod}/{container} failed: {source}")]
    Exec {
        pod: String,
        container: String,
        path: &'static str,
        #[source]
        source: ClusterError,
    },

    #[error("exec `cat {path}` in {pod} timed out after {timeout:?}")]
    Timeout {
        pod: String,
        path: &'static str,
        timeout: Duration,
    },

    #[error("malformed {path}: {source}")]
    Malformed {
        path: &'static str,
        #[source]
        source: ParseError,
    },
}

impl ScrapeError {
    /// Absence, permission and transport problems clear up on their own; a malformed payload does not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ScrapeError::Malformed { .. })
    }
}

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("failed to list pods in namespace {namespace:?}: {source}")]
    Listing {
        namespace: String,
        #[source]
        source: ClusterError,
    },

    #[error("failed to list nodes: {source}")]
    NodeListing {
        #[source]
        source: ClusterError,
    },

    #[error("malformed payload scraped from pod {pod}: {source}")]
    MalformedPayload {
        pod: String,
        #[source]
        source: ScrapeError,
    },
}
