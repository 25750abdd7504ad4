//! Fixture helpers shared by the integration test files: writing descriptor
//! and graph files into a `tempfile::TempDir` in the grammar `parser.rs`
//! expects.

use std::fs;
use std::path::{Path, PathBuf};

/// One graph-file line: `name start report p7..p0 [succ...]`, patterns
/// always zero since no test here exercises pattern matching itself.
pub fn state_line(name: &str, succs: &[usize]) -> String {
    let succ_str: String = succs.iter().map(|s| format!(" {s}")).collect();
    format!("{name} 0 0 00000000 00000000 00000000 00000000 00000000 00000000 00000000 00000000{succ_str}")
}

/// A chain `s1 -> s2 -> ... -> sn`, `n-1` edges.
pub fn chain_lines(n: usize) -> Vec<String> {
    (1..=n)
        .map(|i| {
            let succs: Vec<usize> = if i < n { vec![i + 1] } else { vec![] };
            state_line(&format!("s{i}"), &succs)
        })
        .collect()
}

/// A ring `s1 -> s2 -> ... -> sn -> s1`, `n` edges.
pub fn ring_lines(n: usize) -> Vec<String> {
    (1..=n)
        .map(|i| {
            let next = if i < n { i + 1 } else { 1 };
            state_line(&format!("s{i}"), &[next])
        })
        .collect()
}

pub fn write_graph_file(dir: &Path, filename: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(filename);
    fs::write(&path, lines.join("\n") + "\n").expect("write graph fixture");
    path
}

/// Write a descriptor file listing `entries` (`nstate`, `nedge`, graph file
/// name relative to `dir`), returning the descriptor file's own path.
pub fn write_descriptor(dir: &Path, filename: &str, entries: &[(usize, usize, &str)]) -> PathBuf {
    let mut body = format!("{}\n", entries.len());
    for (nstate, nedge, graph_name) in entries {
        body.push_str(&format!("{nstate} {nedge} {graph_name}\n"));
    }
    let path = dir.join(filename);
    fs::write(&path, body).expect("write descriptor fixture");
    path
}
