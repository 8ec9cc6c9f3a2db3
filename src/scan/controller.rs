use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::classifier::{Classification, NodeClassifier};
use super::converger::{ScrollConverger, ScrollMovement};
use super::diagnostics::{Anomaly, Diagnostics};
use super::host::{MutationRecord, PageHost, TimerId, TimerKind};
use super::indicator::ScanIndicator;
use super::pacer::{LoadPacer, PacerDecision};
use super::progress::ProgressKind;
use super::rules::RuleTable;
use super::state::ScanState;

pub const DEFAULT_EARLY_SKEW_MAX: i64 = 50;
pub const DEFAULT_LATE_SKEW_MAX: i64 = 10;
pub const DEFAULT_THROTTLE_MS: u64 = 1_000;
pub const DEFAULT_SETTLE_MS: u64 = 15_000;
pub const DEFAULT_MAX_ANCESTOR_HOPS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_early_skew_max")]
    pub early_skew_max: i64,
    #[serde(default = "default_late_skew_max")]
    pub late_skew_max: i64,
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_max_ancestor_hops")]
    pub max_ancestor_hops: usize,
    #[serde(default = "today")]
    pub rules_as_of: NaiveDate,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            early_skew_max: DEFAULT_EARLY_SKEW_MAX,
            late_skew_max: DEFAULT_LATE_SKEW_MAX,
            throttle_ms: DEFAULT_THROTTLE_MS,
            settle_ms: DEFAULT_SETTLE_MS,
            max_ancestor_hops: DEFAULT_MAX_ANCESTOR_HOPS,
            rules_as_of: today(),
        }
    }
}

fn default_early_skew_max() -> i64 {
    DEFAULT_EARLY_SKEW_MAX
}

fn default_late_skew_max() -> i64 {
    DEFAULT_LATE_SKEW_MAX
}

fn default_throttle_ms() -> u64 {
    DEFAULT_THROTTLE_MS
}

fn default_settle_ms() -> u64 {
    DEFAULT_SETTLE_MS
}

fn default_max_ancestor_hops() -> usize {
    DEFAULT_MAX_ANCESTOR_HOPS
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOutcome {
    /// A target was found and trailing mutations died down.
    Settled,
    /// Content stopped arriving before any target turned up.
    Exhausted,
}

impl ScanOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Settled => "settled",
            Self::Exhausted => "exhausted",
        }
    }
}

/// Scanning -> Settling -> Stopped, plus Scanning -> Stopped when the feed
/// runs dry. Each live phase owns the one liveness timer it waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Scanning { liveness: TimerId },
    Settling { settle: TimerId },
    Stopped { outcome: ScanOutcome },
}

impl ScanPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scanning { .. } => "scanning",
            Self::Settling { .. } => "settling",
            Self::Stopped { .. } => "stopped",
        }
    }

    fn liveness_timer(&self) -> Option<TimerId> {
        match *self {
            Self::Scanning { liveness } => Some(liveness),
            Self::Settling { settle } => Some(settle),
            Self::Stopped { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub phase: &'static str,
    pub outcome: Option<ScanOutcome>,
    pub early_count: u64,
    pub late_count: u64,
    pub target_found: bool,
    pub target_candidates: u64,
    pub anchor: Option<i64>,
    pub load_more_requests: u64,
    pub skipped_nodes: u64,
    pub anomalies: Vec<Anomaly>,
}

pub struct ScanController {
    config: ScanConfig,
    classifier: NodeClassifier,
    state: ScanState,
    phase: ScanPhase,
    pacer: LoadPacer,
    converger: ScrollConverger,
    indicator: ScanIndicator,
    diagnostics: Diagnostics,
    target_candidates: u64,
    skipped_nodes: u64,
}

impl ScanController {
    /// Starts a scan; the host's subscription must already be live.
    pub fn start<H: PageHost>(host: &mut H, config: ScanConfig, rules: &RuleTable) -> Self {
        let classifier = NodeClassifier::new(rules, config.rules_as_of);
        let liveness = host.schedule_after(config.settle_ms, TimerKind::Settle);

        info!(
            rules = classifier.rules().len(),
            rules_as_of = %config.rules_as_of,
            settle_ms = config.settle_ms,
            "started scan"
        );

        Self {
            pacer: LoadPacer::new(config.early_skew_max, config.late_skew_max, config.throttle_ms),
            converger: ScrollConverger::new(config.max_ancestor_hops),
            state: ScanState::started_at(host.now_ms()),
            phase: ScanPhase::Scanning { liveness },
            indicator: ScanIndicator::default(),
            diagnostics: Diagnostics::default(),
            target_candidates: 0,
            skipped_nodes: 0,
            classifier,
            config,
        }
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn classifier(&self) -> &NodeClassifier {
        &self.classifier
    }

    pub fn is_stopped(&self) -> bool {
        matches!(self.phase, ScanPhase::Stopped { .. })
    }

    pub fn anomalies(&self) -> &[Anomaly] {
        self.diagnostics.anomalies()
    }

    pub fn summary(&self) -> ScanSummary {
        ScanSummary {
            phase: self.phase.as_str(),
            outcome: match self.phase {
                ScanPhase::Stopped { outcome } => Some(outcome),
                _ => None,
            },
            early_count: self.state.progress.early_count,
            late_count: self.state.progress.late_count,
            target_found: self.state.target_found,
            target_candidates: self.target_candidates,
            anchor: self.state.anchor,
            load_more_requests: self.pacer.requests(),
            skipped_nodes: self.skipped_nodes,
            anomalies: self.diagnostics.anomalies().to_vec(),
        }
    }

    pub fn on_mutations<H: PageHost>(&mut self, host: &mut H, batch: &[MutationRecord<H::Node>]) {
        if self.is_stopped() {
            return;
        }
        for record in batch {
            for &node in &record.added_nodes {
                self.on_inserted(host, node);
            }
        }
    }

    fn on_inserted<H: PageHost>(&mut self, host: &mut H, node: H::Node) {
        let shape = host.node_shape(node);
        if !self.classifier.is_candidate(shape) {
            self.skipped_nodes += 1;
            return;
        }
        match self.classifier.classify(shape) {
            Classification::EarlyItem => self.on_progress(host, ProgressKind::Early),
            Classification::LateItem => self.on_progress(host, ProgressKind::Late),
            Classification::TargetItem => self.on_target(host, node),
            Classification::Unclassified => {}
        }
    }

    fn on_progress<H: PageHost>(&mut self, host: &mut H, kind: ProgressKind) {
        self.state.record_progress(kind, host.now_ms());
        if self.state.target_found {
            return;
        }

        let decision = self.pacer.maybe_trigger_load_more(host, &self.state, kind);
        if decision == PacerDecision::Scheduled {
            debug!(skew = self.state.skew(), "scheduled load-more");
        }
        self.indicator.tick(host);
    }

    fn on_target<H: PageHost>(&mut self, host: &mut H, node: H::Node) {
        self.state.touch(host.now_ms());
        self.target_candidates += 1;

        if let ScanPhase::Scanning { liveness } = self.phase {
            self.begin_settling(host, liveness);
        }

        let outcome =
            self.converger
                .on_target_candidate(host, &self.classifier, &mut self.state, node);
        if let Some(anomaly) = outcome.anomaly {
            self.diagnostics.report(anomaly);
        }
        if outcome.movement == ScrollMovement::Reverted {
            debug!(candidate = %host.describe(node), "kept earlier target");
        }
    }

    fn begin_settling<H: PageHost>(&mut self, host: &mut H, liveness: TimerId) {
        self.state.target_found = true;
        self.pacer.cancel(host);
        self.indicator.remove(host);
        host.cancel_timer(liveness);

        let settle = host.schedule_after(self.config.settle_ms, TimerKind::Settle);
        self.phase = ScanPhase::Settling { settle };

        info!(
            early = self.state.progress.early_count,
            late = self.state.progress.late_count,
            settle_ms = self.config.settle_ms,
            "found first target; settling"
        );
    }

    pub fn on_timer<H: PageHost>(&mut self, host: &mut H, timer: TimerId) {
        if self.pacer.on_timer(host, &self.state, timer) {
            return;
        }
        if self.phase.liveness_timer() != Some(timer) {
            debug!(timer = timer.0, "ignoring stale timer");
            return;
        }

        let now = host.now_ms();
        let idle = self.state.idle_ms(now);
        if idle < self.config.settle_ms {
            let rearmed = host.schedule_after(self.config.settle_ms - idle, TimerKind::Settle);
            self.phase = match self.phase {
                ScanPhase::Scanning { .. } => ScanPhase::Scanning { liveness: rearmed },
                ScanPhase::Settling { .. } => ScanPhase::Settling { settle: rearmed },
                stopped @ ScanPhase::Stopped { .. } => stopped,
            };
            debug!(
                idle_ms = idle,
                early = self.state.progress.early_count,
                late = self.state.progress.late_count,
                "rescheduled liveness check"
            );
            return;
        }

        let outcome = match self.phase {
            ScanPhase::Settling { .. } => ScanOutcome::Settled,
            _ => ScanOutcome::Exhausted,
        };
        self.stop(host, outcome);
    }

    fn stop<H: PageHost>(&mut self, host: &mut H, outcome: ScanOutcome) {
        host.disconnect();
        self.pacer.cancel(host);
        self.indicator.remove(host);
        self.phase = ScanPhase::Stopped { outcome };

        info!(
            outcome = outcome.as_str(),
            early = self.state.progress.early_count,
            late = self.state.progress.late_count,
            skipped = self.skipped_nodes,
            anchor = ?self.state.anchor,
            "disconnected mutation observer"
        );

        if !self.state.progress.is_balanced() {
            self.diagnostics.report(Anomaly::CountMismatch {
                early: self.state.progress.early_count,
                late: self.state.progress.late_count,
            });
        }
    }
}
