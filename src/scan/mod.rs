mod classifier;
mod controller;
mod converger;
mod diagnostics;
mod host;
mod indicator;
mod pacer;
mod progress;
mod rules;
mod state;

pub use classifier::{Classification, NodeClassifier};
pub use controller::{ScanConfig, ScanController, ScanOutcome, ScanPhase};
pub use diagnostics::Anomaly;
pub use host::{MutationRecord, NodeShape, PageHost, TimerId, TimerKind};
pub use rules::{RuleCategory, RuleTable, SignatureRule};
