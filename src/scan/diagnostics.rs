use std::fmt;

use serde::Serialize;
use tracing::warn;

/// Non-fatal conditions observed during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    AncestorNotFound { node: String, hops: usize },
    CountMismatch { early: u64, late: u64 },
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AncestorNotFound { node, hops } => write!(
                f,
                "no early container above {node} after {hops} hops; scrolling to the node itself"
            ),
            Self::CountMismatch { early, late } => write!(
                f,
                "early/late count mismatch {early}/{late}; rubber banding may be off"
            ),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    anomalies: Vec<Anomaly>,
}

impl Diagnostics {
    pub fn report(&mut self, anomaly: Anomaly) {
        warn!(anomaly = %anomaly, "scan anomaly");
        self.anomalies.push(anomaly);
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }
}
