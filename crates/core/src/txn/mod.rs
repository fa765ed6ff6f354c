//! Transaction nodes and the arena that owns them.
//!
//! A transaction (a critical section of the monitored program) is one node
//! of the serialization graph. Nodes are shared between the graph store and
//! the instrumentation layer, so they live in a central [`TxnArena`] and are
//! addressed through stable [`TxnId`] handles. Garbage collection marks a
//! slot `deleted` instead of freeing it; an outstanding handle therefore
//! never dangles, it merely points at an inert node.

use core::fmt;

/// Stable handle to a transaction node in the arena.
///
/// Handles are issued by the arena and stay valid for the lifetime of the
/// engine, including after the node has been garbage-collected.
#[cfg_attr(feature = "serde", derive(::serde::Serialize, ::serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TxnId(u32);

impl TxnId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// One transaction of the monitored program.
///
/// Identity (`id`, `label`, `name`, `owner_thread`, `method_info`) is fixed
/// at creation. The lifecycle flags move in one direction only:
/// `finished` flips to `true` when the critical section exits, `deleted`
/// flips to `true` when garbage collection reclaims the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxnNode {
    /// Display identity, used in diagnostics and dump-file names.
    pub id: String,
    /// Monotone sequence number assigned at creation.
    pub label: u64,
    /// Human-readable description of the transaction.
    pub name: String,
    /// Thread of the monitored program that produced the transaction.
    pub owner_thread: u64,
    /// Descriptor of the syntactic method this transaction models.
    /// Synthetic merge nodes have none.
    pub method_info: Option<String>,
    pub finished: bool,
    pub deleted: bool,
    /// Number of live incoming edges currently recorded in the graph.
    pub in_edge_count: u64,
}

impl TxnNode {
    #[must_use]
    pub fn new(
        id: String,
        label: u64,
        name: String,
        owner_thread: u64,
        method_info: Option<String>,
    ) -> Self {
        Self {
            id,
            label,
            name,
            owner_thread,
            method_info,
            finished: false,
            deleted: false,
            in_edge_count: 0,
        }
    }

    /// A node may be reclaimed once its transaction has finished and no
    /// recorded edge points at it anymore.
    #[must_use]
    pub const fn is_collectible(&self) -> bool {
        self.finished && self.in_edge_count == 0 && !self.deleted
    }
}

/// Append-only arena of transaction nodes, addressed by [`TxnId`].
///
/// Slots are never reused.
#[derive(Debug, Default)]
pub struct TxnArena {
    nodes: Vec<TxnNode>,
}

impl TxnArena {
    /// Store a node and hand out its handle.
    pub fn alloc(&mut self, node: TxnNode) -> TxnId {
        let id = TxnId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(node);
        id
    }

    #[must_use]
    pub fn get(&self, id: TxnId) -> Option<&TxnNode> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: TxnId) -> Option<&mut TxnNode> {
        self.nodes.get_mut(id.index())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
