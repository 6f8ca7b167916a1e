//! Owned, serializable export of a tracked lookup.

use std::time::Instant;

use serde::Serialize;

use crate::common::Id;

use super::forest::{HopForest, HopRef};

/// Serializable view of one hop and everything discovered beneath it.
///
/// Children are sorted by peer id so exports are stable across runs.
#[derive(Debug, Clone, Serialize)]
pub struct HopSnapshot {
    pub peer: Id,
    /// False for a stub recording an extra edge to a peer whose canonical
    /// hop lives elsewhere in the forest.
    pub canonical: bool,
    /// Milliseconds between the start of the lookup and the first report
    /// of this hop.
    pub first_seen_ms: u64,
    pub children: Vec<HopSnapshot>,
}

/// Serializable view of a whole lookup at a quiescent point.
#[derive(Debug, Clone, Serialize)]
pub struct LookupSnapshot {
    /// Answered RPC rounds recorded over the lookup.
    pub rounds: u64,
    /// Distinct peers seen anywhere in the forest.
    pub unique_peers: usize,
    /// Empty until the driver stored its final result set.
    pub closest_peers: Vec<Id>,
    pub roots: Vec<HopSnapshot>,
}

impl HopSnapshot {
    pub(crate) fn collect(forest: &HopForest, hop: HopRef, started: Instant) -> Self {
        let node = forest.get(hop);

        let mut children = node
            .children()
            .map(|child| HopSnapshot::collect(forest, child, started))
            .collect::<Vec<_>>();
        children.sort_by_key(|child| child.peer);

        HopSnapshot {
            peer: node.peer(),
            canonical: node.is_canonical(),
            first_seen_ms: node
                .first_seen()
                .saturating_duration_since(started)
                .as_millis() as u64,
            children,
        }
    }
}
