use anyhow::Result;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::model::ScanReport;
use crate::util::{latest_json_file, read_json};

pub fn run(args: StatusArgs) -> Result<()> {
    let reports_dir = args.cache_root.join("reports");

    info!(cache_root = %args.cache_root.display(), "status requested");

    let Some(report_path) = latest_json_file(&reports_dir)? else {
        warn!(path = %reports_dir.display(), "no scan reports found");
        return Ok(());
    };
    let report: ScanReport = read_json(&report_path)?;

    info!(
        path = %report_path.display(),
        run_id = %report.run_id,
        generated_at = %report.generated_at,
        trace = %report.trace_path,
        trace_sha256 = %report.trace_sha256,
        rules_as_of = %report.rules_as_of,
        phase = %report.phase,
        outcome = %report.outcome.as_deref().unwrap_or_default(),
        early = report.early_count,
        late = report.late_count,
        target_found = report.target_found,
        anchor_row = ?report.anchor_row,
        expected_row = ?report.expected_first_watched_row,
        converged = report.converged,
        load_more_requests = report.load_more_requests,
        skipped_nodes = report.skipped_nodes,
        rows_loaded = report.rows_loaded,
        elapsed_ms = report.virtual_elapsed_ms,
        "loaded latest scan report"
    );

    for anomaly in &report.anomalies {
        warn!(anomaly = %anomaly, "recorded anomaly");
    }

    Ok(())
}
