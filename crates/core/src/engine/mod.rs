//! The serialization-graph engine.
//!
//! The engine maintains a directed graph over observed transactions where an
//! edge `a -> b` means "a must be ordered before b in any serialization" of
//! the monitored execution. Three operations mutate the graph:
//!
//! 1. **Edge insertion** ([`SerializationGraph::record_dependency`]) --
//!    tentatively inserts an edge, re-checks acyclicity over the whole
//!    graph, and rolls the insertion back if it would close a cycle. A
//!    closed cycle is a non-serializable execution, i.e. an atomicity
//!    violation; the destination's method descriptor is appended to the
//!    caller's violation sink and a DOT dump of the offending graph is
//!    written best-effort.
//! 2. **Garbage collection** ([`SerializationGraph::reclaim`]) -- a
//!    breadth-first sweep from a root that removes finished nodes with no
//!    remaining incoming edges, decrementing successors' in-degrees as it
//!    goes. Eligibility is checked once per dequeue; nodes that become
//!    eligible later are picked up by a later sweep.
//! 3. **Merge** ([`SerializationGraph::merge`]) -- given the predecessors of
//!    a new transaction, either returns an existing predecessor that
//!    already happens-after all the others (found via reverse-graph
//!    reachability), or creates one synthetic unary node and links every
//!    predecessor to it. This keeps dependency fan-in from growing the
//!    graph quadratically.
//!
//! # Concurrency
//!
//! One engine-wide [`parking_lot::Mutex`] serializes every operation,
//! dominator search and label issuance included. Internal traversals
//! therefore always observe a consistent snapshot, and labels are strictly
//! increasing across all threads.
//!
//! # Error model
//!
//! Expected conditions are values, not errors: a rejected edge is reported
//! through [`EdgeOutcome::Rejected`] (and the violation sink), an empty
//! merge input through `None`. Only the diagnostic dump can fail, and that
//! failure is logged and swallowed.

use std::collections::VecDeque;
use std::path::PathBuf;

use hashbrown::HashSet;
use parking_lot::Mutex;

use crate::graph::digraph::DiGraph;
use crate::txn::{TxnArena, TxnId, TxnNode};

pub mod dump;

pub use dump::DumpError;

/// Result of [`SerializationGraph::record_dependency`].
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// The edge was inserted and the graph remains acyclic.
    Added,
    /// Self-edge, absent or deleted endpoint, or the edge already exists.
    Ignored,
    /// The edge would have closed a cycle and was rolled back.
    Rejected,
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct Options {
    /// Directory that receives `{src}_{dest}cycle.dot` dump files.
    pub dump_dir: PathBuf,
    /// Set to `false` to skip diagnostic dumps entirely.
    pub dump_enabled: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            dump_dir: PathBuf::from("."),
            dump_enabled: true,
        }
    }
}

/// Everything behind the engine-wide lock.
#[derive(Debug)]
struct EngineState {
    arena: TxnArena,
    graph: DiGraph<TxnId>,
    next_label: u64,
}

/// The transaction dependency graph of one monitored execution.
///
/// Shared freely across instrumentation threads; every public operation
/// takes the engine-wide lock for its full duration.
#[derive(Debug)]
pub struct SerializationGraph {
    state: Mutex<EngineState>,
    options: Options,
}

impl Default for SerializationGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SerializationGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::with_options(Options::default())
    }

    #[must_use]
    pub fn with_options(options: Options) -> Self {
        Self {
            state: Mutex::new(EngineState {
                arena: TxnArena::default(),
                graph: DiGraph::default(),
                next_label: 1,
            }),
            options,
        }
    }

    /// Register a transaction observed by the instrumentation layer.
    ///
    /// The node starts unfinished with no edges; its display identity is
    /// the decimal rendering of its label.
    pub fn begin_transaction(
        &self,
        name: &str,
        owner_thread: u64,
        method_info: Option<&str>,
    ) -> TxnId {
        let mut state = self.state.lock();
        Self::alloc_node(&mut state, None, name, owner_thread, method_info)
    }

    /// Like [`Self::begin_transaction`], with a caller-supplied display
    /// identity for diagnostics and dump-file names.
    pub fn begin_transaction_with_id(
        &self,
        id: &str,
        name: &str,
        owner_thread: u64,
        method_info: Option<&str>,
    ) -> TxnId {
        let mut state = self.state.lock();
        Self::alloc_node(&mut state, Some(id), name, owner_thread, method_info)
    }

    /// Record the dependency `src -> dest` ("src must serialize before
    /// dest").
    ///
    /// Self-edges, absent or deleted endpoints, and duplicate edges are
    /// ignored. Otherwise the edge is inserted tentatively and the whole
    /// graph is re-checked for acyclicity; if the edge closes a cycle it is
    /// rolled back, `dest`'s method descriptor (when present) is added to
    /// `violations`, and a DOT dump of the pre-rollback graph is written.
    ///
    /// The graph is acyclic after every return, whatever the outcome.
    pub fn record_dependency(
        &self,
        src: TxnId,
        dest: TxnId,
        violations: Option<&mut HashSet<String>>,
    ) -> EdgeOutcome {
        let mut state = self.state.lock();
        self.record_dependency_locked(&mut state, src, dest, violations)
    }

    fn record_dependency_locked(
        &self,
        state: &mut EngineState,
        src: TxnId,
        dest: TxnId,
        violations: Option<&mut HashSet<String>>,
    ) -> EdgeOutcome {
        if src == dest {
            return EdgeOutcome::Ignored;
        }
        let endpoints_live = state.arena.get(src).is_some_and(|node| !node.deleted)
            && state.arena.get(dest).is_some_and(|node| !node.deleted);
        if !endpoints_live || state.graph.has_edge(&src, &dest) {
            return EdgeOutcome::Ignored;
        }

        state.graph.add_edge(src, dest);
        if let Some(node) = state.arena.get_mut(dest) {
            node.in_edge_count += 1;
        }

        if state.graph.has_cycle() {
            // Dump first: the rejected edge must still be in the snapshot.
            self.dump_cycle(state, src, dest);

            state.graph.remove_edge(&src, &dest);
            if let Some(node) = state.arena.get_mut(dest) {
                node.in_edge_count -= 1;
            }

            tracing::warn!(%src, %dest, "dependency rejected: closes a cycle");
            if let Some(sink) = violations {
                if let Some(info) = state
                    .arena
                    .get(dest)
                    .and_then(|node| node.method_info.clone())
                {
                    sink.insert(info);
                }
            }
            return EdgeOutcome::Rejected;
        }

        tracing::trace!(%src, %dest, "dependency recorded");
        EdgeOutcome::Added
    }

    /// Mark a transaction finished. No-op for deleted or unknown handles.
    pub fn mark_finished(&self, id: TxnId) {
        let mut state = self.state.lock();
        if let Some(node) = state.arena.get_mut(id) {
            if !node.deleted && !node.finished {
                node.finished = true;
                tracing::trace!(%id, "transaction finished");
            }
        }
    }

    /// Garbage-collect finished, unreferenced nodes reachable from `root`.
    ///
    /// Breadth-first: a dequeued node that is finished, has no incoming
    /// edges, and is not yet deleted is removed from the graph and marked
    /// deleted; each of its successors loses one incoming edge and is
    /// enqueued. Ineligible nodes are skipped, not retried -- a later
    /// `reclaim` picks them up once more transactions finish.
    pub fn reclaim(&self, root: TxnId) {
        let mut state = self.state.lock();
        let state = &mut *state;

        let mut queue = VecDeque::from([root]);
        let mut reclaimed = 0_usize;

        while let Some(id) = queue.pop_front() {
            if !state.arena.get(id).is_some_and(TxnNode::is_collectible) {
                continue;
            }

            let successors: Vec<TxnId> = state
                .graph
                .neighbors(&id)
                .into_iter()
                .flatten()
                .copied()
                .collect();
            for succ in &successors {
                if let Some(node) = state.arena.get_mut(*succ) {
                    node.in_edge_count -= 1;
                }
            }
            queue.extend(successors);

            state.graph.remove_vertex(&id);
            if let Some(node) = state.arena.get_mut(id) {
                node.deleted = true;
            }
            reclaimed += 1;
        }

        tracing::debug!(%root, reclaimed, "garbage collection pass complete");
    }

    /// Obtain the node representing a transaction that happens after every
    /// node in `predecessors`.
    ///
    /// Deleted and unknown predecessors are dropped first; `None` when
    /// nothing remains. If one surviving predecessor already happens-after
    /// all the others through existing edges, it is returned as-is and the
    /// graph is left untouched. Otherwise a synthetic unary node is created
    /// (next label, no method descriptor) and an edge is recorded from each
    /// predecessor to it.
    pub fn merge(&self, predecessors: &[TxnId], name: &str, owner_thread: u64) -> Option<TxnId> {
        let mut state = self.state.lock();
        let state = &mut *state;

        let live: Vec<TxnId> = predecessors
            .iter()
            .copied()
            .filter(|id| state.arena.get(*id).is_some_and(|node| !node.deleted))
            .collect();

        if live.is_empty() {
            return None;
        }

        if let Some(dominator) = Self::happens_after_node(&state.graph, &live) {
            tracing::debug!(%dominator, "merge subsumed by dominating predecessor");
            return Some(dominator);
        }

        let merged = Self::alloc_node(state, None, name, owner_thread, None);
        for pred in live {
            // Violations are not collected on merge edges.
            self.record_dependency_locked(state, pred, merged, None);
        }

        tracing::debug!(%merged, "merge created unary node");
        Some(merged)
    }

    /// Find a candidate that happens-after every other candidate, if any.
    ///
    /// For each candidate not yet ruled out, collect its ancestors (reverse
    /// reachability); the candidate dominates iff every input candidate is
    /// among them. Any candidate found inside another's ancestor set can
    /// never dominate and is skipped in later rounds, bounding the work to
    /// one reverse traversal per undecided candidate.
    fn happens_after_node(graph: &DiGraph<TxnId>, candidates: &[TxnId]) -> Option<TxnId> {
        let reverse = graph.reverse();
        let mut ruled_out: HashSet<TxnId> = HashSet::new();

        for candidate in candidates {
            if ruled_out.contains(candidate) {
                continue;
            }

            let ancestors = reverse.reachable_from(candidate);

            let mut dominates = true;
            for other in candidates {
                if ancestors.contains(other) {
                    ruled_out.insert(*other);
                } else {
                    dominates = false;
                }
            }

            if dominates {
                return Some(*candidate);
            }
            tracing::trace!(%candidate, "candidate does not dominate");
        }

        None
    }

    fn alloc_node(
        state: &mut EngineState,
        id: Option<&str>,
        name: &str,
        owner_thread: u64,
        method_info: Option<&str>,
    ) -> TxnId {
        let label = state.next_label;
        state.next_label += 1;

        let node = TxnNode::new(
            id.map_or_else(|| label.to_string(), str::to_owned),
            label,
            name.to_owned(),
            owner_thread,
            method_info.map(str::to_owned),
        );
        let handle = state.arena.alloc(node);
        state.graph.add_vertex(handle);

        tracing::trace!(%handle, label, "transaction node allocated");
        handle
    }

    fn dump_cycle(&self, state: &EngineState, src: TxnId, dest: TxnId) {
        if !self.options.dump_enabled {
            return;
        }
        match dump::write_cycle_dump(&self.options.dump_dir, &state.graph, &state.arena, src, dest)
        {
            Ok(path) => tracing::debug!(path = %path.display(), "cycle dump written"),
            Err(DumpError::Io(err)) => {
                tracing::error!(%err, "failed to write cycle dump");
            }
        }
    }

    // -- Introspection ---------------------------------------------------

    /// Snapshot of a node's current state, or `None` for unknown handles.
    #[must_use]
    pub fn node(&self, id: TxnId) -> Option<TxnNode> {
        self.state.lock().arena.get(id).cloned()
    }

    #[must_use]
    pub fn has_edge(&self, src: TxnId, dest: TxnId) -> bool {
        self.state.lock().graph.has_edge(&src, &dest)
    }

    /// Every currently-recorded edge.
    #[must_use]
    pub fn edges(&self) -> Vec<(TxnId, TxnId)> {
        self.state
            .lock()
            .graph
            .edges()
            .map(|(src, dest)| (*src, *dest))
            .collect()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.state.lock().graph.edge_count()
    }

    /// Number of nodes still present in the adjacency map.
    #[must_use]
    pub fn live_node_count(&self) -> usize {
        self.state.lock().graph.vertex_count()
    }

    #[must_use]
    pub fn is_acyclic(&self) -> bool {
        self.state.lock().graph.is_acyclic()
    }
}
