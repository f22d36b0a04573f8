use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A metadata fetch failed. `op` names the accessor (`listShards`, ...).
#[derive(Debug, Error)]
#[error("{op}: {kind}")]
pub struct GatewayError {
    pub op: &'static str,
    #[source]
    pub kind: GatewayErrorKind,
}

#[derive(Debug, Error)]
pub enum GatewayErrorKind {
    /// Transport, authorization or server-side failure.
    #[error("fetch failed: {0}")]
    Fetch(#[source] BoxError),
    #[error("not found: {0}")]
    NotFound(String),
    /// The response did not have the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl GatewayError {
    pub fn fetch(op: &'static str, source: impl Into<BoxError>) -> Self {
        Self { op, kind: GatewayErrorKind::Fetch(source.into()) }
    }
    pub fn not_found(op: &'static str, what: impl Into<String>) -> Self {
        Self { op, kind: GatewayErrorKind::NotFound(what.into()) }
    }
    pub fn decode(op: &'static str, detail: impl Into<String>) -> Self {
        Self { op, kind: GatewayErrorKind::Decode(detail.into()) }
    }
    /// Only fetch failures may succeed on a second attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self.kind, GatewayErrorKind::Fetch(_))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("no shards in cluster; ideal chunks per shard is undefined")]
    NoShards,
    #[error("{ns} has no chunks; average chunk size is undefined")]
    DivisionUndefined { ns: String },
}

#[derive(Debug, Error)]
pub enum ReportError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("analysis of {ns} failed")]
    Analysis {
        ns: String,
        #[source]
        source: AnalysisError,
    },
    #[error("worker pool: {0}")]
    WorkerPool(String),
}
