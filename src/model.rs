use serde::{Deserialize, Serialize};

pub const TRACE_VERSION: u32 = 1;
pub const REPORT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedLayout {
    #[default]
    Grid,
    List,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowSpec {
    #[serde(default)]
    pub watched: bool,
    #[serde(default)]
    pub layout: Option<FeedLayout>,
    #[serde(default)]
    pub late_delay_ms: Option<u64>,
    #[serde(default)]
    pub progress_delay_ms: Option<u64>,
    #[serde(default)]
    pub detached_progress: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageTrace {
    pub manifest_version: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_viewport_height")]
    pub viewport_height: i64,
    #[serde(default = "default_row_height")]
    pub row_height: i64,
    #[serde(default = "default_rows_per_load")]
    pub initial_rows: usize,
    #[serde(default = "default_rows_per_load")]
    pub rows_per_load: usize,
    #[serde(default = "default_load_latency_ms")]
    pub load_latency_ms: u64,
    #[serde(default = "default_late_delay_ms")]
    pub late_delay_ms: u64,
    #[serde(default = "default_progress_delay_ms")]
    pub progress_delay_ms: u64,
    #[serde(default)]
    pub layout: FeedLayout,
    pub rows: Vec<RowSpec>,
}

fn default_viewport_height() -> i64 {
    900
}

fn default_row_height() -> i64 {
    300
}

fn default_rows_per_load() -> usize {
    12
}

fn default_load_latency_ms() -> u64 {
    400
}

fn default_late_delay_ms() -> u64 {
    250
}

fn default_progress_delay_ms() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub trace_path: String,
    pub trace_sha256: String,
    pub rules_as_of: String,
    pub active_rules: Vec<String>,
    pub phase: String,
    pub outcome: Option<String>,
    pub early_count: u64,
    pub late_count: u64,
    pub final_skew: i64,
    pub target_found: bool,
    pub target_candidates: u64,
    pub anchor: Option<i64>,
    pub anchor_row: Option<usize>,
    pub expected_first_watched_row: Option<usize>,
    pub converged: bool,
    pub load_more_requests: u64,
    #[serde(default)]
    pub skipped_nodes: u64,
    pub rows_loaded: usize,
    pub virtual_elapsed_ms: u64,
    pub anomalies: Vec<String>,
}
