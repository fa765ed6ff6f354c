//! Directed-graph store used by the serialization engine.

pub mod digraph;

pub use digraph::DiGraph;
