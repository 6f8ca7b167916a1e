//! Drive a tracker the way the enclosing iterative lookup would: an
//! in-memory neighbor graph, one worker thread per in-flight request, and a
//! remote that hangs on every RPC.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::thread;

use hoptrace::{HopSnapshot, Id, LookupTracker, ID_SIZE};

fn id(n: u8) -> Id {
    Id([n; ID_SIZE])
}

/// Counts (canonical, stub) occurrences of `peer` in a snapshot subtree.
fn occurrences(root: &HopSnapshot, peer: &Id) -> (usize, usize) {
    let mut counts = if root.peer == *peer {
        if root.canonical {
            (1, 0)
        } else {
            (0, 1)
        }
    } else {
        (0, 0)
    };

    for child in &root.children {
        let (canonical, stubs) = occurrences(child, peer);
        counts.0 += canonical;
        counts.1 += stubs;
    }

    counts
}

/// In-memory network: responsive peers answer with their neighbor list,
/// unresponsive peers time out.
struct Network {
    neighbors: HashMap<Id, Vec<Id>>,
    unresponsive: HashSet<Id>,
}

impl Network {
    fn contact(&self, peer: &Id) -> Option<Vec<Id>> {
        if self.unresponsive.contains(peer) {
            return None;
        }

        Some(self.neighbors.get(peer).cloned().unwrap_or_default())
    }
}

/// Iterative driver loop: contact every frontier peer on its own worker
/// thread, record a round per response, and admit a peer to the simulated
/// routing table only after it responded.
fn run_lookup(network: &Network, candidates: &[Id], tracker: &Arc<LookupTracker>) -> HashSet<Id> {
    let mut admitted = HashSet::new();
    let mut contacted = HashSet::new();
    let mut frontier = candidates.to_vec();

    while !frontier.is_empty() {
        let round = thread::scope(|scope| {
            let handles = frontier
                .iter()
                .map(|&peer| {
                    let tracker = Arc::clone(tracker);

                    scope.spawn(move || {
                        let response = network.contact(&peer);

                        if let Some(discovered) = &response {
                            tracker.record_discovery(peer, discovered);
                        }

                        (peer, response)
                    })
                })
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|handle| handle.join().expect("worker panicked"))
                .collect::<Vec<_>>()
        });

        let mut next = Vec::new();

        for (peer, response) in round {
            contacted.insert(peer);

            if let Some(discovered) = response {
                admitted.insert(peer);

                for peer in discovered {
                    if !contacted.contains(&peer) && !next.contains(&peer) {
                        next.push(peer);
                    }
                }
            }
        }

        frontier = next;
    }

    admitted
}

#[test]
fn iterative_lookup_with_an_unresponsive_candidate() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    //  1 -- 3 -- 6 -- 8
    //    -- 4
    //  2 -- 4
    //    -- 5 -- 7 -- 1 (cycles back to a seed)
    //  9 hangs on every request
    let network = Network {
        neighbors: vec![
            (id(1), vec![id(3), id(4)]),
            (id(2), vec![id(4), id(5)]),
            (id(3), vec![id(6)]),
            (id(4), vec![]),
            (id(5), vec![id(7)]),
            (id(6), vec![id(8)]),
            (id(7), vec![id(1)]),
            (id(8), vec![]),
        ]
        .into_iter()
        .collect(),
        unresponsive: vec![id(9)].into_iter().collect(),
    };

    let tracker = Arc::new(LookupTracker::new());
    let admitted = run_lookup(&network, &[id(1), id(2), id(9)], &tracker);

    // The hanging peer was dialed but never answered, so it is neither
    // admitted nor anywhere in the forest.
    assert!(!admitted.contains(&id(9)));
    assert!(!tracker.contains(&id(9)));

    assert_eq!(admitted.len(), 8);
    assert_eq!(tracker.total_rounds(), 8);
    assert_eq!(tracker.unique_peers(), 8);

    // Longest chains: 1-3-6-8 and 2-5-7-(1).
    assert_eq!(tracker.max_depth(), 3);

    // Seed 1 is only reachable through the cycle under seed 2.
    assert_eq!(tracker.hops_to_reach(&[id(1)]), Some(3));

    tracker.set_closest_peers(vec![id(4), id(5), id(8)]);
    assert_eq!(
        tracker.closest_peers().map(|peers| peers.len()),
        Some(3)
    );
    assert_eq!(tracker.hops_to_reach(&[id(4), id(5), id(8)]), Some(3));

    // Every peer has exactly one canonical hop, however many paths led to it.
    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.roots.len(), 2);

    for n in 1..=8 {
        let (canonical, _) = snapshot
            .roots
            .iter()
            .map(|root| occurrences(root, &id(n)))
            .fold((0, 0), |acc, counts| (acc.0 + counts.0, acc.1 + counts.1));

        assert_eq!(canonical, 1, "peer {} must have one canonical hop", n);
    }

    // Peer 4 was reported by both seeds: one canonical hop, one stub edge.
    let (canonical, stubs) = snapshot
        .roots
        .iter()
        .map(|root| occurrences(root, &id(4)))
        .fold((0, 0), |acc, counts| (acc.0 + counts.0, acc.1 + counts.1));
    assert_eq!((canonical, stubs), (1, 1));
}

#[test]
fn concurrent_rediscovery_keeps_one_canonical_hop_per_peer() {
    const CAUSES: u8 = 8;
    const SHARED: u8 = 20;

    let shared = (0..SHARED)
        .map(|n| id(100 + n))
        .collect::<Vec<_>>();

    let tracker = Arc::new(LookupTracker::new());

    thread::scope(|scope| {
        for n in 0..CAUSES {
            let tracker = Arc::clone(&tracker);
            let shared = shared.clone();

            scope.spawn(move || {
                tracker.record_discovery(id(n), &shared);
            });
        }
    });

    assert_eq!(tracker.total_rounds(), u64::from(CAUSES));
    assert_eq!(tracker.unique_peers(), usize::from(CAUSES + SHARED));
    assert_eq!(tracker.max_depth(), 1);

    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.roots.len(), usize::from(CAUSES));

    for peer in &shared {
        let (canonical, stubs) = snapshot
            .roots
            .iter()
            .map(|root| occurrences(root, peer))
            .fold((0, 0), |acc, counts| (acc.0 + counts.0, acc.1 + counts.1));

        assert_eq!(canonical, 1);
        assert_eq!(stubs, usize::from(CAUSES) - 1);
    }
}
