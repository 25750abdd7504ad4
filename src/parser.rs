//! Descriptor-file and graph-file parsing.
//!
//! Both grammars are line-oriented with `%`-prefixed comment lines skipped
//! wherever they appear, matching the original implementation's scanner
//! rather than restricting comments to file headers.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::automaton::AutomatonDescriptor;
use crate::error::{ApMapError, InputError, Result};
use crate::graph::{Graph, StateMeta};

fn open(path: &Path) -> Result<BufReader<File>> {
    let f = File::open(path).map_err(|source| InputError::Open { path: path.display().to_string(), source })?;
    Ok(BufReader::new(f))
}

/// Read non-comment lines from `reader`, skipping any line whose first
/// non-whitespace byte is `%`. Returns `None` at end of file.
fn next_line(reader: &mut BufReader<File>, file: &str, lineno: &mut usize) -> Result<Option<String>> {
    loop {
        let mut buf = String::new();
        let n = reader
            .read_line(&mut buf)
            .map_err(|source| InputError::Open { path: file.to_string(), source })?;
        if n == 0 {
            return Ok(None);
        }
        *lineno += 1;
        let trimmed = buf.trim_end_matches(['\n', '\r']);
        if trimmed.trim_start().starts_with('%') {
            continue;
        }
        return Ok(Some(trimmed.to_string()));
    }
}

/// Parse a descriptor file into the batch of automata it lists, per the
/// grammar in the external interfaces: an integer header `N`, followed by
/// `N` lines of `nstate nedge graph_path`. Comment lines (`%`) are skipped
/// wherever they occur. `graph_path` is resolved relative to the
/// descriptor file's own directory, not the process's working directory.
pub fn read_map_file(path: &Path) -> Result<Vec<AutomatonDescriptor>> {
    let file = path.display().to_string();
    let mut reader = open(path)?;
    let mut lineno = 0usize;
    let base = path.parent().map(Path::to_path_buf).unwrap_or_default();

    let header = next_line(&mut reader, &file, &mut lineno)?
        .ok_or_else(|| InputError::PrematureEof { file: file.clone(), line: lineno })?;
    let ngraph: usize = header
        .split_whitespace()
        .next()
        .and_then(|tok| tok.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .ok_or_else(|| InputError::BadHeader { file: file.clone() })?;

    let mut automata = Vec::with_capacity(ngraph);
    for index in 0..ngraph {
        let line = next_line(&mut reader, &file, &mut lineno)?
            .ok_or_else(|| InputError::PrematureEof { file: file.clone(), line: lineno })?;

        let mut fields = line.split_whitespace();
        let nstate: usize = fields
            .next()
            .and_then(|tok| tok.parse().ok())
            .ok_or_else(|| InputError::BadSize { file: file.clone(), index })?;
        let nedge: usize = fields
            .next()
            .and_then(|tok| tok.parse().ok())
            .ok_or_else(|| InputError::BadSize { file: file.clone(), index })?;
        let graph_path = fields.next().ok_or_else(|| InputError::BadSize { file: file.clone(), index })?;

        let resolved = base.join(graph_path);
        automata.push(AutomatonDescriptor::new(nstate, nedge, resolved));
    }

    Ok(automata)
}

/// Read a graph file into `graph`, which must already be reset to the
/// `(nvtxs, nedges)` capacity declared for this automaton in the
/// descriptor file. One non-comment line per state, in order `1..nvtxs`:
/// `name start report p7 p6 p5 p4 p3 p2 p1 p0 [succ1 succ2 ...]`, patterns
/// in hex, successors 1-based. The total successor count across all lines
/// must equal `graph.adjncy`'s declared capacity exactly.
pub fn read_graph_file(path: &Path, graph: &mut Graph) -> Result<()> {
    let file = path.display().to_string();
    let mut reader = open(path)?;
    let mut lineno = 0usize;
    let nvtxs = graph.nvtxs;
    let nedges = graph.nedges;

    graph.meta.clear();
    graph.adjncy.clear();

    for v in 0..nvtxs {
        let line = next_line(&mut reader, &file, &mut lineno)?
            .ok_or_else(|| InputError::PrematureEof { file: file.clone(), line: lineno })?;

        let mut tokens = line.split_whitespace();

        let name = tokens.next().ok_or_else(|| InputError::IncompletePattern { file: file.clone(), index: v })?;
        if name.is_empty() {
            return Err(InputError::EmptyName { file: file.clone(), index: v }.into());
        }
        let name = name.to_string();

        let start_tok = tokens.next().ok_or_else(|| InputError::IncompletePattern { file: file.clone(), index: v })?;
        let start = start_tok != "0";

        let report_tok = tokens.next().ok_or_else(|| InputError::IncompletePattern { file: file.clone(), index: v })?;
        let report = report_tok != "0";

        let mut pattern = [0u32; 8];
        for slot in pattern.iter_mut() {
            let word = tokens.next().ok_or_else(|| InputError::IncompletePattern { file: file.clone(), index: v })?;
            *slot = u32::from_str_radix(word, 16)
                .map_err(|_| InputError::IncompletePattern { file: file.clone(), index: v })?;
        }

        graph.meta.push(StateMeta { name, start, report, pattern });
        graph.xadj[v] = graph.adjncy.len();

        for tok in tokens {
            let edge: i64 = tok
                .parse()
                .map_err(|_| InputError::EdgeOutOfBounds { file: file.clone(), index: v, edge: 0, nstate: nvtxs })?;
            if edge < 1 || edge as usize > nvtxs {
                return Err(InputError::EdgeOutOfBounds { file: file.clone(), index: v, edge, nstate: nvtxs }.into());
            }
            if graph.adjncy.len() == nedges {
                return Err(InputError::EdgeCountMismatch { file: file.clone(), declared: nedges, found: nedges + 1 }
                    .into());
            }
            graph.adjncy.push(edge as usize - 1);
        }
    }
    graph.xadj[nvtxs] = graph.adjncy.len();

    if graph.adjncy.len() != nedges {
        return Err(InputError::EdgeCountMismatch { file, declared: nedges, found: graph.adjncy.len() }.into());
    }

    Ok(())
}

/// Load every descriptor file named on the command line into one batch,
/// preserving the order files were given but concatenating their automata.
pub fn load_batch(paths: &[PathBuf]) -> Result<Vec<AutomatonDescriptor>> {
    let mut all = Vec::new();
    for path in paths {
        all.extend(read_map_file(path)?);
    }
    if all.is_empty() {
        return Err(ApMapError::Internal("no automata listed across the given descriptor files".to_string()));
    }
    Ok(all)
}
