use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    LoadMore,
    Settle,
}

/// Structural view of an element node. Text and comment nodes have none.
#[derive(Debug, Clone, Copy)]
pub struct NodeShape<'a> {
    pub local_name: &'a str,
    pub classes: &'a [String],
}

impl NodeShape<'_> {
    pub fn has_class(&self, class_name: &str) -> bool {
        self.classes.iter().any(|class| class == class_name)
    }
}

/// One structural change record; only inserted nodes matter to the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord<N> {
    pub added_nodes: Vec<N>,
}

impl<N> MutationRecord<N> {
    pub fn inserted(added_nodes: Vec<N>) -> Self {
        Self { added_nodes }
    }
}

/// Everything the scan needs from the page it runs in.
///
/// The host owns the mutation subscription and delivers batches and timer
/// expiries to [`crate::scan::ScanController`] one at a time.
pub trait PageHost {
    type Node: Copy + Eq + fmt::Debug;

    fn node_shape(&self, node: Self::Node) -> Option<NodeShape<'_>>;
    fn parent(&self, node: Self::Node) -> Option<Self::Node>;
    fn describe(&self, node: Self::Node) -> String;

    fn now_ms(&self) -> u64;
    fn schedule_after(&mut self, delay_ms: u64, kind: TimerKind) -> TimerId;
    fn cancel_timer(&mut self, timer: TimerId);

    fn scroll_top(&self) -> i64;
    /// Scrolls so the bottom edge of `node` meets the bottom of the viewport.
    fn scroll_into_view(&mut self, node: Self::Node);
    fn scroll_to(&mut self, top: i64);
    fn request_more_content(&mut self);

    fn highlight(&mut self, node: Self::Node);
    fn show_indicator(&mut self, rotation_deg: u16);
    fn update_indicator(&mut self, rotation_deg: u16);
    fn remove_indicator(&mut self);

    fn disconnect(&mut self);
}
