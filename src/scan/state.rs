use serde::Serialize;

use super::progress::{ProgressCounter, ProgressKind};

/// Shared state of the single scan running on a page.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanState {
    pub progress: ProgressCounter,
    pub target_found: bool,
    pub first_scroll_done: bool,
    /// Best-known target scroll position; only moves up once set.
    pub anchor: Option<i64>,
    pub last_activity_ms: u64,
}

impl ScanState {
    pub fn started_at(now_ms: u64) -> Self {
        Self {
            last_activity_ms: now_ms,
            ..Self::default()
        }
    }

    pub fn record_progress(&mut self, kind: ProgressKind, now_ms: u64) {
        self.progress.on_classified(kind);
        self.touch(now_ms);
    }

    pub fn touch(&mut self, now_ms: u64) {
        self.last_activity_ms = self.last_activity_ms.max(now_ms);
    }

    pub fn idle_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_activity_ms)
    }

    pub fn skew(&self) -> i64 {
        self.progress.skew()
    }
}
