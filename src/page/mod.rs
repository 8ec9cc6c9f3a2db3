use std::collections::{BTreeMap, HashMap};

use anyhow::{Result, bail};
use tracing::debug;

use crate::model::{FeedLayout, PageTrace, RowSpec, TRACE_VERSION};
use crate::scan::{MutationRecord, NodeShape, PageHost, TimerId, TimerKind};

mod tree;
#[cfg(test)]
mod tests;

pub use tree::{NodeTree, PageNodeId};

const RESUME_PLAYBACK: &str = "ytd-thumbnail-overlay-resume-playback-renderer";
const NOW_PLAYING: &str = "ytd-thumbnail-overlay-now-playing-renderer";

const MAX_HEIGHT_PX: i64 = 1_000_000;
const MAX_ROWS: usize = 1_000_000;
/// One virtual day; anything longer is a broken trace, not a slow page.
const MAX_DELAY_MS: u64 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageEvent {
    Insert(PageNodeId),
    LoadRows,
    Timer(TimerId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Mutations(Vec<MutationRecord<PageNodeId>>),
    Timer(TimerId),
}

/// Virtual-clock stand-in for a lazily loading subscriptions feed.
///
/// Rows load in batches; each row's container, late marker and progress
/// marker are inserted at their own times, so progress markers of later rows
/// can reach the observer before those of earlier rows.
#[derive(Debug)]
pub struct SimulatedPage {
    trace: PageTrace,
    tree: NodeTree,
    feed: PageNodeId,
    now_ms: u64,
    seq: u64,
    queue: BTreeMap<(u64, u64), PageEvent>,
    timers: HashMap<TimerId, (u64, u64)>,
    next_timer: u64,
    scroll_top: i64,
    rows_loaded: usize,
    load_in_flight: bool,
    connected: bool,
    highlighted: Vec<PageNodeId>,
    indicator: Option<u16>,
    load_more_requests: u64,
}

impl SimulatedPage {
    pub fn new(trace: PageTrace) -> Result<Self> {
        validate_trace(&trace)?;

        let mut tree = NodeTree::default();
        let html = tree.element("html", &[], None, None);
        let app = tree.element("ytd-app", &["style-scope"], Some(html), None);
        let feed = tree.element(
            "ytd-section-list-renderer",
            &["style-scope", "ytd-two-column-browse-results-renderer"],
            Some(app),
            None,
        );

        let mut page = Self {
            trace,
            tree,
            feed,
            now_ms: 0,
            seq: 0,
            queue: BTreeMap::new(),
            timers: HashMap::new(),
            next_timer: 0,
            scroll_top: 0,
            rows_loaded: 0,
            load_in_flight: true,
            connected: true,
            highlighted: Vec::new(),
            indicator: None,
            load_more_requests: 0,
        };
        page.push_event(0, PageEvent::LoadRows);
        Ok(page)
    }

    pub fn rows_loaded(&self) -> usize {
        self.rows_loaded
    }

    pub fn load_more_requests(&self) -> u64 {
        self.load_more_requests
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn indicator(&self) -> Option<u16> {
        self.indicator
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn highlighted_rows(&self) -> Vec<usize> {
        self.highlighted
            .iter()
            .filter_map(|&node| self.tree.row(node))
            .collect()
    }

    /// First watched row among the rows the page has loaded so far.
    pub fn first_watched_row(&self) -> Option<usize> {
        self.trace.rows[..self.rows_loaded]
            .iter()
            .position(|row| row.watched)
    }

    pub fn document_height(&self) -> i64 {
        (self.rows_loaded as i64).saturating_mul(self.trace.row_height)
    }

    pub fn max_scroll_top(&self) -> i64 {
        self.document_height()
            .saturating_sub(self.trace.viewport_height)
            .max(0)
    }

    /// Scroll offset that puts the bottom of `row` at the bottom of the viewport.
    pub fn end_aligned_top(&self, row: usize) -> i64 {
        let bottom = (row as i64)
            .saturating_add(1)
            .saturating_mul(self.trace.row_height);
        bottom
            .saturating_sub(self.trace.viewport_height)
            .clamp(0, self.max_scroll_top())
    }

    /// Topmost highlighted row sitting exactly at `top`.
    pub fn row_at_anchor(&self, top: i64) -> Option<usize> {
        self.highlighted_rows()
            .into_iter()
            .filter(|&row| self.end_aligned_top(row) == top)
            .min()
    }

    /// Pops the next observable event, applying internal page work on the way.
    pub fn next_delivery(&mut self) -> Option<Delivery> {
        loop {
            let (&(due, _), _) = self.queue.first_key_value()?;
            self.now_ms = self.now_ms.max(due);

            let Some((_, event)) = self.queue.pop_first() else {
                return None;
            };
            match event {
                PageEvent::LoadRows => self.load_rows(),
                PageEvent::Timer(timer) => {
                    self.timers.remove(&timer);
                    return Some(Delivery::Timer(timer));
                }
                PageEvent::Insert(node) => {
                    let mut records = vec![MutationRecord::inserted(vec![node])];
                    while let Some((&(next_due, _), &PageEvent::Insert(next))) =
                        self.queue.first_key_value()
                    {
                        if next_due != due {
                            break;
                        }
                        self.queue.pop_first();
                        records.push(MutationRecord::inserted(vec![next]));
                    }
                    if self.connected {
                        return Some(Delivery::Mutations(records));
                    }
                }
            }
        }
    }

    fn push_event(&mut self, due: u64, event: PageEvent) -> (u64, u64) {
        self.seq += 1;
        let key = (due, self.seq);
        self.queue.insert(key, event);
        key
    }

    fn load_rows(&mut self) {
        let start = self.rows_loaded;
        let count = if start == 0 {
            self.trace.initial_rows
        } else {
            self.trace.rows_per_load
        };
        let end = (start + count).min(self.trace.rows.len());

        for row in start..end {
            let spec = self.trace.rows[row].clone();
            self.insert_row(row, &spec);
        }
        self.rows_loaded = end;
        self.load_in_flight = false;
        debug!(from = start, to = end, "loaded rows");
    }

    fn insert_row(&mut self, row: usize, spec: &RowSpec) {
        let at = self.now_ms;
        let row_id = Some(row);
        let (container_name, container_class) = match spec.layout.unwrap_or(self.trace.layout) {
            FeedLayout::Grid => ("ytd-rich-grid-media", "ytd-rich-item-renderer"),
            FeedLayout::List => ("ytd-shelf-renderer", "ytd-item-section-renderer"),
        };

        let container = self.tree.element(
            container_name,
            &["style-scope", container_class],
            Some(self.feed),
            row_id,
        );
        let thumbnail = self.tree.element(
            "ytd-thumbnail",
            &["style-scope", container_name],
            Some(container),
            row_id,
        );
        let title = self
            .tree
            .text(&format!("Video {}", row + 1), Some(container), row_id);
        for node in [container, thumbnail, title] {
            self.push_event(at, PageEvent::Insert(node));
        }

        let late = self.tree.element(
            NOW_PLAYING,
            &["style-scope", "ytd-thumbnail"],
            Some(thumbnail),
            row_id,
        );
        let late_delay = spec.late_delay_ms.unwrap_or(self.trace.late_delay_ms);
        self.push_event(at.saturating_add(late_delay), PageEvent::Insert(late));

        if spec.watched {
            let parent = if spec.detached_progress {
                self.feed
            } else {
                thumbnail
            };
            let progress = self.tree.element(
                RESUME_PLAYBACK,
                &["style-scope", "ytd-thumbnail"],
                Some(parent),
                row_id,
            );
            let progress_delay = spec.progress_delay_ms.unwrap_or(self.trace.progress_delay_ms);
            self.push_event(at.saturating_add(progress_delay), PageEvent::Insert(progress));
        }
    }
}

fn validate_trace(trace: &PageTrace) -> Result<()> {
    if trace.manifest_version != TRACE_VERSION {
        bail!(
            "unsupported trace version {} (expected {TRACE_VERSION})",
            trace.manifest_version
        );
    }
    if trace.viewport_height <= 0 || trace.row_height <= 0 {
        bail!(
            "trace needs positive viewport and row heights (got {} and {})",
            trace.viewport_height,
            trace.row_height
        );
    }
    if trace.viewport_height > MAX_HEIGHT_PX || trace.row_height > MAX_HEIGHT_PX {
        bail!(
            "trace heights must not exceed {MAX_HEIGHT_PX} px (got {} and {})",
            trace.viewport_height,
            trace.row_height
        );
    }
    if trace.rows.is_empty() {
        bail!("trace has no rows");
    }
    if trace.rows.len() > MAX_ROWS {
        bail!("trace has {} rows (limit {MAX_ROWS})", trace.rows.len());
    }
    if trace.initial_rows == 0 || trace.rows_per_load == 0 {
        bail!("trace must load at least one row per batch");
    }

    let delays = [
        ("load_latency_ms", trace.load_latency_ms),
        ("late_delay_ms", trace.late_delay_ms),
        ("progress_delay_ms", trace.progress_delay_ms),
    ];
    for (field, delay) in delays {
        if delay > MAX_DELAY_MS {
            bail!("trace {field} {delay} exceeds {MAX_DELAY_MS} ms");
        }
    }
    for (index, row) in trace.rows.iter().enumerate() {
        for (field, delay) in [
            ("late_delay_ms", row.late_delay_ms),
            ("progress_delay_ms", row.progress_delay_ms),
        ] {
            if let Some(delay) = delay.filter(|&delay| delay > MAX_DELAY_MS) {
                bail!("row {index} {field} {delay} exceeds {MAX_DELAY_MS} ms");
            }
        }
    }
    Ok(())
}

impl PageHost for SimulatedPage {
    type Node = PageNodeId;

    fn node_shape(&self, node: PageNodeId) -> Option<NodeShape<'_>> {
        self.tree.shape(node)
    }

    fn parent(&self, node: PageNodeId) -> Option<PageNodeId> {
        self.tree.parent(node)
    }

    fn describe(&self, node: PageNodeId) -> String {
        self.tree.describe(node)
    }

    fn now_ms(&self) -> u64 {
        self.now_ms
    }

    fn schedule_after(&mut self, delay_ms: u64, kind: TimerKind) -> TimerId {
        self.next_timer += 1;
        let timer = TimerId(self.next_timer);
        let key = self.push_event(self.now_ms.saturating_add(delay_ms), PageEvent::Timer(timer));
        self.timers.insert(timer, key);
        debug!(timer = timer.0, ?kind, delay_ms, "scheduled timer");
        timer
    }

    fn cancel_timer(&mut self, timer: TimerId) {
        if let Some(key) = self.timers.remove(&timer) {
            self.queue.remove(&key);
        }
    }

    fn scroll_top(&self) -> i64 {
        self.scroll_top
    }

    fn scroll_into_view(&mut self, node: PageNodeId) {
        if let Some(row) = self.tree.row(node) {
            self.scroll_top = self.end_aligned_top(row);
        }
    }

    fn scroll_to(&mut self, top: i64) {
        self.scroll_top = top.clamp(0, self.max_scroll_top());
    }

    fn request_more_content(&mut self) {
        self.load_more_requests += 1;
        self.scroll_top = self.max_scroll_top();
        if !self.load_in_flight && self.rows_loaded < self.trace.rows.len() {
            self.load_in_flight = true;
            let due = self.now_ms.saturating_add(self.trace.load_latency_ms);
            self.push_event(due, PageEvent::LoadRows);
        }
    }

    fn highlight(&mut self, node: PageNodeId) {
        self.highlighted.push(node);
    }

    fn show_indicator(&mut self, rotation_deg: u16) {
        self.indicator = Some(rotation_deg);
    }

    fn update_indicator(&mut self, rotation_deg: u16) {
        self.indicator = Some(rotation_deg);
    }

    fn remove_indicator(&mut self) {
        self.indicator = None;
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }
}
