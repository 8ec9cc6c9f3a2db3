use serde::Serialize;
use tracing::debug;

use super::classifier::{Classification, NodeClassifier};
use super::diagnostics::Anomaly;
use super::host::PageHost;
use super::state::ScanState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollMovement {
    Bootstrapped,
    MovedUp,
    Unchanged,
    Reverted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateOutcome<N> {
    pub container: N,
    pub movement: ScrollMovement,
    pub anomaly: Option<Anomaly>,
}

/// Keeps the scroll anchor on the topmost target seen so far.
///
/// After the first candidate the anchor may only move up, so candidates that
/// arrive out of document order still converge on the first target.
#[derive(Debug, Clone)]
pub struct ScrollConverger {
    max_ancestor_hops: usize,
}

impl ScrollConverger {
    pub fn new(max_ancestor_hops: usize) -> Self {
        Self { max_ancestor_hops }
    }

    pub fn on_target_candidate<H: PageHost>(
        &self,
        host: &mut H,
        classifier: &NodeClassifier,
        state: &mut ScanState,
        node: H::Node,
    ) -> CandidateOutcome<H::Node> {
        let (container, anomaly) = match self.find_container(host, classifier, node) {
            Ok(container) => (container, None),
            Err(hops) => (
                node,
                Some(Anomaly::AncestorNotFound {
                    node: host.describe(node),
                    hops,
                }),
            ),
        };

        host.highlight(container);

        let old_pos = host.scroll_top();
        host.scroll_into_view(container);

        if !state.first_scroll_done {
            state.first_scroll_done = true;
            let pos = host.scroll_top();
            state.anchor = Some(pos);
            debug!(pos, "bootstrapped scroll anchor");
            return CandidateOutcome {
                container,
                movement: ScrollMovement::Bootstrapped,
                anomaly,
            };
        }

        let new_pos = host.scroll_top();
        let movement = if new_pos > old_pos {
            host.scroll_to(old_pos);
            ScrollMovement::Reverted
        } else if new_pos < old_pos {
            ScrollMovement::MovedUp
        } else {
            ScrollMovement::Unchanged
        };

        let pos = host.scroll_top();
        state.anchor = Some(state.anchor.map_or(pos, |anchor| anchor.min(pos)));
        debug!(old_pos, new_pos, pos, ?movement, "converged scroll anchor");

        CandidateOutcome {
            container,
            movement,
            anomaly,
        }
    }

    /// Walks up to the early container holding `node`; `Err` carries the hops taken.
    fn find_container<H: PageHost>(
        &self,
        host: &H,
        classifier: &NodeClassifier,
        node: H::Node,
    ) -> Result<H::Node, usize> {
        let mut current = node;
        let mut hops = 0;
        loop {
            if classifier.classify(host.node_shape(current)) == Classification::EarlyItem {
                return Ok(current);
            }
            if hops >= self.max_ancestor_hops {
                return Err(hops);
            }
            match host.parent(current) {
                Some(parent) => {
                    current = parent;
                    hops += 1;
                }
                None => return Err(hops),
            }
        }
    }
}
