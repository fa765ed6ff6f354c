use std::path::Path;

use atomon_core::{Options, SerializationGraph, TxnId};

/// Engine whose cycle dumps land in `dir` instead of the working directory.
pub fn engine_in(dir: &Path) -> SerializationGraph {
    SerializationGraph::with_options(Options {
        dump_dir: dir.to_path_buf(),
        dump_enabled: true,
    })
}

/// Begin `n` transactions named `t1..tn`, all owned by thread 0.
pub fn begin_nodes(engine: &SerializationGraph, n: usize) -> Vec<TxnId> {
    (1..=n)
        .map(|i| engine.begin_transaction(&format!("t{i}"), 0, None))
        .collect()
}

/// Begin `n` transactions and chain them: `t1 -> t2 -> ... -> tn`.
pub fn begin_chain(engine: &SerializationGraph, n: usize) -> Vec<TxnId> {
    let nodes = begin_nodes(engine, n);
    for window in nodes.windows(2) {
        engine.record_dependency(window[0], window[1], None);
    }
    nodes
}
