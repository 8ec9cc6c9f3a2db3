use super::*;

fn trace(rows: Vec<RowSpec>) -> PageTrace {
    PageTrace {
        manifest_version: TRACE_VERSION,
        title: "fixture".to_string(),
        viewport_height: 900,
        row_height: 300,
        initial_rows: 4,
        rows_per_load: 4,
        load_latency_ms: 400,
        late_delay_ms: 250,
        progress_delay_ms: 300,
        layout: FeedLayout::Grid,
        rows,
    }
}

fn plain_rows(count: usize) -> Vec<RowSpec> {
    (0..count).map(|_| RowSpec::default()).collect()
}

fn inserted(delivery: Option<Delivery>) -> Vec<PageNodeId> {
    match delivery {
        Some(Delivery::Mutations(records)) => records
            .into_iter()
            .flat_map(|record| record.added_nodes)
            .collect(),
        other => panic!("expected mutations, got {other:?}"),
    }
}

#[test]
fn rejects_malformed_traces() {
    assert!(SimulatedPage::new(trace(Vec::new())).is_err());

    let mut wrong_version = trace(plain_rows(2));
    wrong_version.manifest_version = 7;
    assert!(SimulatedPage::new(wrong_version).is_err());

    let mut flat = trace(plain_rows(2));
    flat.row_height = 0;
    assert!(SimulatedPage::new(flat).is_err());
}

#[test]
fn rejects_traces_whose_geometry_or_delays_would_overflow() {
    let mut tall = trace(plain_rows(2));
    tall.row_height = i64::MAX / 2;
    let err = SimulatedPage::new(tall).expect_err("huge rows are rejected");
    assert!(err.to_string().contains("heights"));

    let mut slow_row = plain_rows(3);
    slow_row[1].late_delay_ms = Some(u64::MAX);
    let err = SimulatedPage::new(trace(slow_row)).expect_err("huge row delay is rejected");
    assert!(err.to_string().contains("row 1 late_delay_ms"));

    let mut slow_load = trace(plain_rows(2));
    slow_load.load_latency_ms = u64::MAX;
    assert!(SimulatedPage::new(slow_load).is_err());

    let mut slow_marker = trace(plain_rows(2));
    slow_marker.progress_delay_ms = MAX_DELAY_MS + 1;
    assert!(SimulatedPage::new(slow_marker).is_err());
}

#[test]
fn largest_accepted_trace_keeps_geometry_in_range() {
    let mut big = trace(plain_rows(8));
    big.row_height = MAX_HEIGHT_PX;
    big.viewport_height = MAX_HEIGHT_PX;
    big.late_delay_ms = MAX_DELAY_MS;
    let mut page = SimulatedPage::new(big).expect("limits are inclusive");

    inserted(page.next_delivery());
    assert_eq!(page.document_height(), 4 * MAX_HEIGHT_PX);
    assert_eq!(page.end_aligned_top(3), 3 * MAX_HEIGHT_PX);
    assert_eq!(page.max_scroll_top(), 3 * MAX_HEIGHT_PX);

    inserted(page.next_delivery());
    assert_eq!(page.now_ms(), MAX_DELAY_MS);
}

#[test]
fn timer_far_in_the_future_does_not_overflow_the_clock() {
    let mut page = SimulatedPage::new(trace(plain_rows(6))).expect("valid trace");
    inserted(page.next_delivery());

    let never = page.schedule_after(u64::MAX, TimerKind::Settle);
    let soon = page.schedule_after(10, TimerKind::LoadMore);

    // Late markers land at 250 ms, the short timer first.
    assert_eq!(page.next_delivery(), Some(Delivery::Timer(soon)));
    inserted(page.next_delivery());
    assert_eq!(page.next_delivery(), Some(Delivery::Timer(never)));
    assert_eq!(page.now_ms(), u64::MAX);

    // The next batch and its late markers all pin to the end of time.
    page.request_more_content();
    assert_eq!(inserted(page.next_delivery()).len(), 2 * 4);
    assert_eq!(page.rows_loaded(), 6);
    assert_eq!(page.now_ms(), u64::MAX);
    assert!(page.next_delivery().is_none());
}

#[test]
fn initial_rows_arrive_as_one_batch_then_late_markers() {
    let mut page = SimulatedPage::new(trace(plain_rows(10))).expect("valid trace");

    let first = inserted(page.next_delivery());
    assert_eq!(page.now_ms(), 0);
    assert_eq!(first.len(), 4 * 3);
    assert_eq!(page.rows_loaded(), 4);
    assert!(first.iter().any(|&node| page.node_shape(node).is_none()));

    let late = inserted(page.next_delivery());
    assert_eq!(page.now_ms(), 250);
    assert_eq!(late.len(), 4);
    for node in late {
        let shape = page.node_shape(node).expect("late marker is an element");
        assert_eq!(shape.local_name, NOW_PLAYING);
    }

    assert!(page.next_delivery().is_none());
}

#[test]
fn progress_markers_can_overtake_earlier_rows() {
    let rows = vec![
        RowSpec {
            watched: true,
            progress_delay_ms: Some(900),
            ..RowSpec::default()
        },
        RowSpec::default(),
        RowSpec {
            watched: true,
            progress_delay_ms: Some(100),
            ..RowSpec::default()
        },
    ];
    let mut page = SimulatedPage::new(trace(rows)).expect("valid trace");

    inserted(page.next_delivery());
    let early_progress = inserted(page.next_delivery());
    assert_eq!(page.now_ms(), 100);
    assert_eq!(page.tree().row(early_progress[0]), Some(2));

    inserted(page.next_delivery());
    let late_progress = inserted(page.next_delivery());
    assert_eq!(page.now_ms(), 900);
    assert_eq!(page.tree().row(late_progress[0]), Some(0));
    assert_eq!(page.first_watched_row(), Some(0));
}

#[test]
fn load_more_is_single_flight_and_scrolls_to_bottom() {
    let mut page = SimulatedPage::new(trace(plain_rows(10))).expect("valid trace");
    inserted(page.next_delivery());

    page.request_more_content();
    page.request_more_content();
    assert_eq!(page.load_more_requests(), 2);
    assert_eq!(page.scroll_top(), 4 * 300 - 900);

    inserted(page.next_delivery());
    let next = inserted(page.next_delivery());
    assert_eq!(page.now_ms(), 400);
    assert_eq!(next.len(), 4 * 3);
    assert_eq!(page.rows_loaded(), 8);

    while page.next_delivery().is_some() {}
    assert_eq!(page.rows_loaded(), 8);
}

#[test]
fn end_alignment_clamps_to_scrollable_range() {
    let mut page = SimulatedPage::new(trace(plain_rows(4))).expect("valid trace");
    inserted(page.next_delivery());

    assert_eq!(page.max_scroll_top(), 300);
    assert_eq!(page.end_aligned_top(0), 0);
    assert_eq!(page.end_aligned_top(2), 0);
    assert_eq!(page.end_aligned_top(3), 300);

    page.scroll_to(5_000);
    assert_eq!(page.scroll_top(), 300);
    page.scroll_to(-10);
    assert_eq!(page.scroll_top(), 0);
}

#[test]
fn cancelled_timers_never_fire() {
    let mut page = SimulatedPage::new(trace(plain_rows(1))).expect("valid trace");
    let kept = page.schedule_after(500, TimerKind::Settle);
    let dropped = page.schedule_after(100, TimerKind::LoadMore);
    page.cancel_timer(dropped);

    let mut fired = Vec::new();
    while let Some(delivery) = page.next_delivery() {
        if let Delivery::Timer(timer) = delivery {
            fired.push(timer);
        }
    }
    assert_eq!(fired, vec![kept]);
    assert_eq!(page.now_ms(), 500);
}

#[test]
fn disconnected_page_stops_delivering_mutations() {
    let mut page = SimulatedPage::new(trace(plain_rows(2))).expect("valid trace");
    page.disconnect();
    let timer = page.schedule_after(1_000, TimerKind::Settle);

    assert_eq!(page.next_delivery(), Some(Delivery::Timer(timer)));
    assert!(!page.is_connected());
    assert_eq!(page.rows_loaded(), 2);
}

#[test]
fn detached_progress_has_no_container_ancestor() {
    let rows = vec![RowSpec {
        watched: true,
        detached_progress: true,
        ..RowSpec::default()
    }];
    let mut page = SimulatedPage::new(trace(rows)).expect("valid trace");
    inserted(page.next_delivery());
    inserted(page.next_delivery());
    let progress = inserted(page.next_delivery())[0];

    let mut ancestors = Vec::new();
    let mut current = page.parent(progress);
    while let Some(node) = current {
        ancestors.push(page.node_shape(node).map(|shape| shape.local_name.to_string()));
        current = page.parent(node);
    }
    assert_eq!(
        ancestors,
        vec![
            Some("ytd-section-list-renderer".to_string()),
            Some("ytd-app".to_string()),
            Some("html".to_string()),
        ]
    );
}
