//! Arena-backed forest of discovery hops.
//!
//! Hops live in a flat arena and refer to each other through [HopRef]
//! indices, so traversals walk plain data without touching any lock; the
//! owning tracker serializes access to the whole forest instead.

use std::collections::HashMap;
use std::time::Instant;

use crate::common::Id;

/// Stable index of a [Hop] in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HopRef(usize);

/// One peer's place in the discovery forest.
///
/// A hop's peer is the peer that was discovered; its children are the peers
/// it, in turn, caused to be discovered.
#[derive(Debug)]
pub(crate) struct Hop {
    peer: Id,
    canonical: bool,
    first_seen: Instant,
    children: HashMap<Id, HopRef>,
}

impl Hop {
    pub fn peer(&self) -> Id {
        self.peer
    }

    /// True for the single authoritative instance of this peer anywhere in
    /// the forest. Stubs only carry an extra discovery edge and never get
    /// children of their own.
    pub fn is_canonical(&self) -> bool {
        self.canonical
    }

    pub fn first_seen(&self) -> Instant {
        self.first_seen
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn children(&self) -> impl Iterator<Item = HopRef> + '_ {
        self.children.values().copied()
    }
}

#[derive(Debug)]
pub(crate) struct HopForest {
    arena: Vec<Hop>,
    /// One root per peer that was contacted directly, keyed by its id.
    roots: HashMap<Id, HopRef>,
    /// Identity index: the canonical hop for every peer seen so far.
    canonical: HashMap<Id, HopRef>,
}

impl HopForest {
    pub fn new() -> Self {
        HopForest {
            arena: Vec::new(),
            roots: HashMap::new(),
            canonical: HashMap::new(),
        }
    }

    // === Getters ===

    pub fn get(&self, hop: HopRef) -> &Hop {
        &self.arena[hop.0]
    }

    pub fn canonical(&self, peer: &Id) -> Option<HopRef> {
        self.canonical.get(peer).copied()
    }

    pub fn roots(&self) -> impl Iterator<Item = HopRef> + '_ {
        self.roots.values().copied()
    }

    /// Number of distinct peers seen anywhere in the forest.
    pub fn unique_peers(&self) -> usize {
        self.canonical.len()
    }

    // === Public Methods ===

    /// Resolve the canonical hop for a cause peer, seeding a new root when
    /// the peer was never seen before.
    pub fn resolve_cause(&mut self, peer: Id) -> HopRef {
        if let Some(hop) = self.canonical(&peer) {
            assert!(
                self.get(hop).canonical,
                "non-canonical hop in the identity index"
            );

            return hop;
        }

        let hop = self.alloc(peer, true);
        self.roots.insert(peer, hop);
        self.canonical.insert(peer, hop);

        hop
    }

    /// Record that `parent`'s peer caused `peer` to be discovered.
    ///
    /// The first sighting anywhere in the forest creates and registers the
    /// canonical hop for `peer`; every later sighting creates a stub that
    /// only carries the edge. Repeating an existing (parent, peer) edge
    /// keeps the hop already linked there.
    ///
    /// Returns the linked hop and whether it is canonical.
    pub fn add_discovery(&mut self, parent: HopRef, peer: Id) -> (HopRef, bool) {
        debug_assert!(self.get(parent).peer != peer, "self edge reached the forest");

        if let Some(&existing) = self.get(parent).children.get(&peer) {
            return (existing, self.get(existing).canonical);
        }

        let (hop, is_canonical) = if self.canonical.contains_key(&peer) {
            (self.alloc(peer, false), false)
        } else {
            let hop = self.alloc(peer, true);
            self.canonical.insert(peer, hop);

            (hop, true)
        };

        self.arena[parent.0].children.insert(peer, hop);

        (hop, is_canonical)
    }

    /// Number of discovery levels beneath `hop`: a leaf reports 0, a chain
    /// A - B - C reports 2 from A.
    pub fn depth(&self, hop: HopRef) -> usize {
        let children = &self.get(hop).children;

        if children.is_empty() {
            return 0;
        }

        1 + children
            .values()
            .map(|&child| self.depth(child))
            .max()
            .unwrap_or(0)
    }

    /// Maximum [depth](HopForest::depth) over all roots, 0 for an empty forest.
    pub fn max_depth(&self) -> usize {
        self.roots
            .values()
            .map(|&root| self.depth(root))
            .max()
            .unwrap_or(0)
    }

    /// Minimum number of edges from `hop` down to a hop representing
    /// `target`, or None when the subtree does not contain it.
    ///
    /// Stubs match like any other hop; they are exactly how alternate paths
    /// to an already-known peer are recorded.
    pub fn shortest_distance(&self, hop: HopRef, target: &Id) -> Option<usize> {
        let children = &self.get(hop).children;

        if children.contains_key(target) {
            return Some(1);
        }

        children
            .values()
            .filter_map(|&child| self.shortest_distance(child, target))
            .min()
            .map(|distance| distance + 1)
    }

    /// For every target, the minimum distance from any root to the target;
    /// the aggregate is the maximum of those per-target minima.
    ///
    /// The root representing the target itself is skipped, so a seed peer
    /// contributes a distance only when some other root's subtree
    /// rediscovered it. None when no member of the set needed a relay hop.
    pub fn hops_to_reach(&self, targets: &[Id]) -> Option<usize> {
        targets
            .iter()
            .filter_map(|target| self.min_distance_from_roots(target))
            .max()
    }

    // === Private Methods ===

    fn min_distance_from_roots(&self, target: &Id) -> Option<usize> {
        let mut shortest: Option<usize> = None;

        for (root_peer, root) in &self.roots {
            if root_peer == target {
                continue;
            }

            if let Some(distance) = self.shortest_distance(*root, target) {
                if shortest.map_or(true, |shortest| distance < shortest) {
                    shortest = Some(distance);
                }
            }
        }

        shortest
    }

    fn alloc(&mut self, peer: Id, canonical: bool) -> HopRef {
        let hop = HopRef(self.arena.len());

        self.arena.push(Hop {
            peer,
            canonical,
            first_seen: Instant::now(),
            children: HashMap::new(),
        });

        hop
    }
}
