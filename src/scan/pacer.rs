use serde::Serialize;
use tracing::debug;

use super::host::{PageHost, TimerId, TimerKind};
use super::progress::ProgressKind;
use super::state::ScanState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PacerDecision {
    Scheduled,
    Coalesced,
    HeldBack,
    Disabled,
}

/// Rubber-banded, throttled "load more" trigger.
///
/// Early events may race ahead of late ones by `early_skew_max`; late events
/// only re-trigger loading once the skew is back within `late_skew_max`.
#[derive(Debug, Clone)]
pub struct LoadPacer {
    early_skew_max: i64,
    late_skew_max: i64,
    throttle_ms: u64,
    pending: Option<TimerId>,
    requests: u64,
}

impl LoadPacer {
    pub fn new(early_skew_max: i64, late_skew_max: i64, throttle_ms: u64) -> Self {
        Self {
            early_skew_max,
            late_skew_max,
            throttle_ms,
            pending: None,
            requests: 0,
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn maybe_trigger_load_more<H: PageHost>(
        &mut self,
        host: &mut H,
        state: &ScanState,
        kind: ProgressKind,
    ) -> PacerDecision {
        if state.target_found {
            return PacerDecision::Disabled;
        }

        let skew = state.skew();
        let bound = match kind {
            ProgressKind::Early => self.early_skew_max,
            ProgressKind::Late => self.late_skew_max,
        };
        if skew > bound {
            debug!(skew, bound, "holding back load-more");
            return PacerDecision::HeldBack;
        }

        if self.pending.is_some() {
            return PacerDecision::Coalesced;
        }

        self.pending = Some(host.schedule_after(self.throttle_ms, TimerKind::LoadMore));
        PacerDecision::Scheduled
    }

    /// Returns false when `timer` is not the pending throttle timer.
    pub fn on_timer<H: PageHost>(&mut self, host: &mut H, state: &ScanState, timer: TimerId) -> bool {
        if self.pending != Some(timer) {
            return false;
        }
        self.pending = None;

        // A trigger that fires after the target turned up is stale.
        if !state.target_found {
            host.request_more_content();
            self.requests += 1;
            debug!(requests = self.requests, "requested more content");
        }
        true
    }

    pub fn cancel<H: PageHost>(&mut self, host: &mut H) {
        if let Some(timer) = self.pending.take() {
            host.cancel_timer(timer);
        }
    }
}
