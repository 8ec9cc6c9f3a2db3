use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::ReplayArgs;
use crate::model::{PageTrace, REPORT_VERSION, ScanReport};
use crate::page::{Delivery, SimulatedPage};
use crate::scan::{PageHost, RuleTable, ScanConfig, ScanController};
use crate::util::{now_utc_string, read_json, sha256_file, utc_compact_string, write_json_pretty};

pub fn run(args: ReplayArgs) -> Result<()> {
    let started = Utc::now();
    let run_id = format!("scan-{}", utc_compact_string(started));

    let trace: PageTrace = read_json(&args.trace)?;
    let trace_sha256 = sha256_file(&args.trace)?;
    let rules = RuleTable::load_or_builtin(args.rules_path.as_deref())?;

    let config = ScanConfig {
        early_skew_max: args.early_skew_max,
        late_skew_max: args.late_skew_max,
        throttle_ms: args.throttle_ms,
        settle_ms: args.settle_ms,
        max_ancestor_hops: args.max_ancestor_hops,
        rules_as_of: args.as_of.unwrap_or_else(|| started.date_naive()),
    };
    rules.ensure_coverage(config.rules_as_of)?;

    info!(
        run_id = %run_id,
        trace = %args.trace.display(),
        title = %trace.title,
        rows = trace.rows.len(),
        "starting replay"
    );

    let mut page = SimulatedPage::new(trace)
        .with_context(|| format!("failed to open page from {}", args.trace.display()))?;
    let rules_as_of = config.rules_as_of;
    let controller = replay(&mut page, config, &rules, args.deadline_ms)?;

    let report = build_report(
        &run_id,
        &args.trace.display().to_string(),
        trace_sha256,
        rules_as_of.to_string(),
        &page,
        &controller,
    );

    if !report.converged {
        warn!(
            anchor_row = ?report.anchor_row,
            expected_row = ?report.expected_first_watched_row,
            "scan did not land on the first watched row"
        );
    }

    let report_path = args.report_path.clone().unwrap_or_else(|| {
        args.cache_root
            .join("reports")
            .join(format!("scan_{}.json", utc_compact_string(started)))
    });
    write_json_pretty(&report_path, &report)?;

    info!(path = %report_path.display(), "wrote scan report");
    info!(
        outcome = report.outcome.as_deref().unwrap_or_default(),
        early = report.early_count,
        late = report.late_count,
        anchor_row = ?report.anchor_row,
        load_more_requests = report.load_more_requests,
        skipped = report.skipped_nodes,
        elapsed_ms = report.virtual_elapsed_ms,
        "replay completed"
    );

    Ok(())
}

/// Drives one scan over `page` until it stops. The subscription is live
/// before the page delivers its first rows.
pub fn replay(
    page: &mut SimulatedPage,
    config: ScanConfig,
    rules: &RuleTable,
    deadline_ms: u64,
) -> Result<ScanController> {
    let mut controller = ScanController::start(page, config, rules);

    while !controller.is_stopped() {
        let Some(delivery) = page.next_delivery() else {
            bail!("page went quiet while the scan was still {}", controller.phase().as_str());
        };
        if page.now_ms() > deadline_ms {
            bail!(
                "scan still {} after {deadline_ms} ms of page time",
                controller.phase().as_str()
            );
        }

        match delivery {
            Delivery::Mutations(batch) => controller.on_mutations(page, &batch),
            Delivery::Timer(timer) => controller.on_timer(page, timer),
        }
    }

    Ok(controller)
}

fn build_report(
    run_id: &str,
    trace_path: &str,
    trace_sha256: String,
    rules_as_of: String,
    page: &SimulatedPage,
    controller: &ScanController,
) -> ScanReport {
    let summary = controller.summary();
    let anchor_row = summary.anchor.and_then(|anchor| page.row_at_anchor(anchor));
    let expected = page.first_watched_row();
    let converged = match (summary.anchor, expected) {
        (Some(anchor), Some(row)) => anchor == page.end_aligned_top(row),
        (None, None) => true,
        _ => false,
    };

    ScanReport {
        manifest_version: REPORT_VERSION,
        run_id: run_id.to_string(),
        generated_at: now_utc_string(),
        trace_path: trace_path.to_string(),
        trace_sha256,
        rules_as_of,
        active_rules: controller
            .classifier()
            .rules()
            .iter()
            .map(|rule| rule.id.clone())
            .collect(),
        phase: summary.phase.to_string(),
        outcome: summary.outcome.map(|outcome| outcome.as_str().to_string()),
        early_count: summary.early_count,
        late_count: summary.late_count,
        final_skew: controller.state().skew(),
        target_found: summary.target_found,
        target_candidates: summary.target_candidates,
        anchor: summary.anchor,
        anchor_row,
        expected_first_watched_row: expected,
        converged,
        load_more_requests: summary.load_more_requests,
        skipped_nodes: summary.skipped_nodes,
        rows_loaded: page.rows_loaded(),
        virtual_elapsed_ms: page.now_ms(),
        anomalies: summary
            .anomalies
            .iter()
            .map(|anomaly| anomaly.to_string())
            .collect(),
    }
}
