//! Track which peer caused which other peers to be discovered during one
//! iterative lookup.

mod forest;
mod snapshot;

use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use crate::common::Id;
use crate::event::{EventSink, LookupEvent, TracingSink};

use forest::HopForest;
pub use snapshot::{HopSnapshot, LookupSnapshot};

/// Discovery provenance of one iterative lookup.
///
/// The tracker owns a forest of hops rooted at the directly contacted seed
/// peers. Worker threads report every answered RPC round through
/// [record_discovery](LookupTracker::record_discovery); peers rediscovered
/// through multiple paths are deduplicated by an identity index, so cyclic
/// neighbor graphs never inflate the forest.
///
/// One tracker belongs to exactly one lookup and is never reused. The
/// metric accessors take a consistent snapshot, but their results are only
/// meaningful once the driver has stopped recording rounds.
pub struct LookupTracker {
    started: Instant,
    sink: Arc<dyn EventSink>,
    state: RwLock<State>,
}

struct State {
    forest: HopForest,
    closest_peers: Option<Vec<Id>>,
    rounds: u64,
}

impl LookupTracker {
    pub fn new() -> Self {
        LookupTracker {
            started: Instant::now(),
            sink: Arc::new(TracingSink),
            state: RwLock::new(State {
                forest: HopForest::new(),
                closest_peers: None,
                rounds: 0,
            }),
        }
    }

    // === Options ===

    /// Replace the default [TracingSink] with a custom event sink.
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    // === Getters ===

    /// Instant this tracker, and so the lookup, started.
    pub fn started_at(&self) -> Instant {
        self.started
    }

    /// Number of answered RPC rounds recorded so far.
    pub fn total_rounds(&self) -> u64 {
        self.read().rounds
    }

    /// Number of distinct peers seen anywhere in the forest.
    pub fn unique_peers(&self) -> usize {
        self.read().forest.unique_peers()
    }

    /// Whether `peer` has a canonical hop in the forest.
    pub fn contains(&self, peer: &Id) -> bool {
        self.read().forest.canonical(peer).is_some()
    }

    /// The final closest-peer set, once
    /// [set_closest_peers](LookupTracker::set_closest_peers) was called.
    pub fn closest_peers(&self) -> Option<Vec<Id>> {
        self.read().closest_peers.clone()
    }

    // === Public Methods ===

    /// Record one answered RPC round: `cause` responded and reported
    /// `discovered`.
    ///
    /// The first sighting of a peer anywhere in the forest creates its
    /// canonical hop; later sightings only record the extra edge through a
    /// stub, whichever thread gets there first wins. A cause that was
    /// itself discovered earlier extends its existing hop; an unseen cause
    /// becomes a new forest root. A reported peer equal to the cause is
    /// silently dropped.
    ///
    /// Must only be called for peers that actually produced a response; an
    /// unresponsive remote is never a cause, the same admission rule the
    /// routing table applies.
    pub fn record_discovery(&self, cause: Id, discovered: &[Id]) {
        let mut events = Vec::with_capacity(discovered.len() + 1);

        {
            let mut state = self.write();

            state.rounds += 1;
            events.push(LookupEvent::RoundRecorded {
                cause,
                reported: discovered.len(),
                round: state.rounds,
            });

            let parent = state.forest.resolve_cause(cause);

            for peer in discovered {
                if *peer == cause {
                    continue;
                }

                let (_, canonical) = state.forest.add_discovery(parent, *peer);

                events.push(LookupEvent::PeerLinked {
                    peer: *peer,
                    cause,
                    canonical,
                });
            }
        }

        // Emitted after the guard is dropped so a sink may call back into
        // this tracker.
        for event in events {
            self.sink.record(event);
        }
    }

    /// Store the final closest-peer result of the lookup, once, after the
    /// driver terminated.
    pub fn set_closest_peers(&self, peers: Vec<Id>) {
        let count = peers.len();

        {
            let mut state = self.write();
            state.closest_peers = Some(peers);
        }

        self.sink.record(LookupEvent::ClosestPeersSet { count });
    }

    /// Longest discovery chain beneath any seed peer; how many rounds, at
    /// most, the lookup needed along a single path. 0 for an empty forest.
    pub fn max_depth(&self) -> usize {
        self.read().forest.max_depth()
    }

    /// The number of relay hops needed to reach the hardest member of
    /// `targets`: the maximum over targets of the minimum distance from
    /// any seed root.
    ///
    /// A target that is itself a seed contributes a distance only when
    /// another root's subtree rediscovered it. None when no member of the
    /// set needed a relay hop.
    pub fn hops_to_reach(&self, targets: &[Id]) -> Option<usize> {
        self.read().forest.hops_to_reach(targets)
    }

    /// Owned, serializable view of everything recorded so far.
    pub fn snapshot(&self) -> LookupSnapshot {
        let state = self.read();

        let mut roots = state
            .forest
            .roots()
            .map(|root| HopSnapshot::collect(&state.forest, root, self.started))
            .collect::<Vec<_>>();
        roots.sort_by_key(|root| root.peer);

        LookupSnapshot {
            rounds: state.rounds,
            unique_peers: state.forest.unique_peers(),
            closest_peers: state.closest_peers.clone().unwrap_or_default(),
            roots,
        }
    }

    // === Private Methods ===

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().expect("lookup tracker lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().expect("lookup tracker lock poisoned")
    }
}

impl Default for LookupTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for LookupTracker {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupTracker")
            .field("started", &self.started)
            .field("rounds", &self.total_rounds())
            .finish_non_exhaustive()
    }
}
