//! Runtime detection of atomicity violations via serialization graphs.
//!
//! `atomon_core` is the dynamic-analysis engine of an atomicity checker: an
//! instrumentation layer (not part of this crate) observes the critical
//! sections of a running program and reports them here as **transactions**.
//! The engine maintains a directed serialization graph over those
//! transactions, where an edge `a -> b` means "a must be ordered before b in
//! any valid serialization". As long as the graph stays acyclic the observed
//! execution is serializable; an edge that would close a cycle is the
//! signature of an atomicity violation.
//!
//! Three mechanisms keep the graph both sound and small:
//!
//! 1. **Cycle guard** -- every edge insertion re-checks acyclicity and rolls
//!    itself back on failure, so the persisted graph never contains a cycle.
//! 2. **Garbage collection** -- finished transactions with no remaining
//!    incoming edges are reclaimed by a breadth-first sweep.
//! 3. **Happens-after merging** -- when a new transaction depends on several
//!    predecessors, an existing predecessor that already dominates the
//!    others is reused instead of widening the graph with redundant edges
//!    (unary-transaction compression).
//!
//! # Entry point
//!
//! The engine is a single shared [`SerializationGraph`]; instrumentation
//! threads call into it concurrently:
//!
//! ```rust,ignore
//! use atomon_core::SerializationGraph;
//!
//! let graph = SerializationGraph::new();
//!
//! let a = graph.begin_transaction("sync block", thread_id, Some("Counter.inc"));
//! let b = graph.begin_transaction("sync block", thread_id, Some("Counter.dec"));
//!
//! let mut violations = hashbrown::HashSet::new();
//! graph.record_dependency(a, b, Some(&mut violations));
//!
//! graph.mark_finished(a);
//! graph.reclaim(a);
//! ```
//!
//! On a rejected edge the engine also writes a `{src}_{dest}cycle.dot`
//! graph dump (best-effort, see [`engine::dump`]).
//!
//! # Crate features
//!
//! - **`serde`** -- enables `Serialize`/`Deserialize` derives on the public
//!   value types (`TxnId`, `EdgeOutcome`, `DiGraph`).

pub mod engine;
pub mod graph;
pub mod txn;

pub use engine::{EdgeOutcome, Options, SerializationGraph};
pub use txn::{TxnId, TxnNode};
