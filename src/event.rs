//! Structured events emitted while a lookup is being tracked.
//!
//! The tracker never logs through a global logger; it hands every event to
//! the [EventSink] it was constructed with. The default [TracingSink]
//! forwards to [tracing], so installing a `tracing-subscriber` is enough to
//! see the usual telemetry.

use tracing::trace;

use crate::common::Id;

/// One structured event out of a [LookupTracker](crate::LookupTracker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupEvent {
    /// One answered RPC round was recorded.
    RoundRecorded {
        cause: Id,
        /// Number of peers the cause reported, before self-edge filtering.
        reported: usize,
        /// Total rounds recorded so far, this one included.
        round: u64,
    },
    /// An edge from `cause` to `peer` was recorded in the forest.
    PeerLinked {
        peer: Id,
        cause: Id,
        /// Whether the hop the edge points at is the canonical instance of
        /// this peer. False means the peer was already known and the edge
        /// goes to a stub.
        canonical: bool,
    },
    /// The final closest-peer set was stored.
    ClosestPeersSet { count: usize },
}

/// Where a tracker sends its [LookupEvent]s.
pub trait EventSink: Send + Sync {
    fn record(&self, event: LookupEvent);
}

/// Default sink, forwards every event to [tracing] at TRACE level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: LookupEvent) {
        match event {
            LookupEvent::RoundRecorded {
                cause,
                reported,
                round,
            } => {
                trace!(?cause, reported, round, "Recorded lookup round");
            }
            LookupEvent::PeerLinked {
                peer,
                cause,
                canonical,
            } => {
                trace!(?peer, ?cause, canonical, "Linked discovered peer");
            }
            LookupEvent::ClosestPeersSet { count } => {
                trace!(count, "Stored closest peers");
            }
        }
    }
}
