//! Best-effort DOT dump of the serialization graph on cycle detection.
//!
//! The dump runs on the pre-rollback snapshot, so the rejected edge is still
//! present and gets emphasized. Failures are reported to the caller, which
//! logs them and carries on; diagnostics never affect graph correctness.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use derive_more::From;

use crate::graph::digraph::DiGraph;
use crate::txn::{TxnArena, TxnId};

/// Error raised while writing a cycle dump.
#[derive(Debug, From)]
pub enum DumpError {
    Io(io::Error),
}

/// Write `{src_id}_{dest_id}cycle.dot` into `dir`, overwriting any previous
/// file of the same name.
///
/// The file holds one `src -> dest;` line per recorded edge, a styling line
/// that marks the rejected destination, and a `penwidth` emphasis on the
/// rejected edge itself.
///
/// # Errors
///
/// Returns [`DumpError::Io`] if the file cannot be created or written.
pub(crate) fn write_cycle_dump(
    dir: &Path,
    graph: &DiGraph<TxnId>,
    arena: &TxnArena,
    src: TxnId,
    dest: TxnId,
) -> Result<PathBuf, DumpError> {
    let src_id = display_id(arena, src);
    let dest_id = display_id(arena, dest);

    let path = dir.join(format!("{src_id}_{dest_id}cycle.dot"));
    let mut out = BufWriter::new(File::create(&path)?);

    writeln!(out, "digraph G {{")?;
    writeln!(
        out,
        "{dest_id}[shape=diamond, penwidth=3, style=filled, fillcolor=\"#9ACEEB\"];"
    )?;

    for (edge_src, edge_dest) in graph.edges() {
        let emphasis = if (*edge_src, *edge_dest) == (src, dest) {
            "[penwidth=5]"
        } else {
            ""
        };
        writeln!(
            out,
            "  {} -> {}{emphasis};",
            display_id(arena, *edge_src),
            display_id(arena, *edge_dest)
        )?;
    }

    writeln!(out, "}}")?;
    out.flush()?;

    Ok(path)
}

/// The node's display identity, or the raw handle for a forged id.
fn display_id(arena: &TxnArena, id: TxnId) -> String {
    arena
        .get(id)
        .map_or_else(|| id.to_string(), |node| node.id.clone())
}
