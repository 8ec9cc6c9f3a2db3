use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressKind {
    Early,
    Late,
}

impl ProgressKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Early => "early",
            Self::Late => "late",
        }
    }
}

/// Paired early/late counts. Both only ever grow during one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressCounter {
    pub early_count: u64,
    pub late_count: u64,
}

impl ProgressCounter {
    pub fn on_classified(&mut self, kind: ProgressKind) {
        let count = match kind {
            ProgressKind::Early => {
                self.early_count += 1;
                self.early_count
            }
            ProgressKind::Late => {
                self.late_count += 1;
                self.late_count
            }
        };

        if count == 1 {
            info!(kind = kind.as_str(), "found first item");
        }
        if count % 10 == 0 {
            debug!(kind = kind.as_str(), count, "item count");
        }
    }

    pub fn skew(&self) -> i64 {
        self.early_count as i64 - self.late_count as i64
    }

    pub fn is_balanced(&self) -> bool {
        self.early_count == self.late_count
    }
}
