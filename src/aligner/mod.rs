//! Exact partial-order alignment of a sequence against the whole graph.
//!
//! No suffix trees involved: every node gets a full affine-gap score row,
//! computed in a topological wave driven by a ready-queue. Much slower than
//! the fuzzy index, but exact; doubles as the correctness oracle.

use std::collections::VecDeque;
use std::time::Instant;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::info;

use crate::alignment::{Alignment, Strategy};
use crate::config::Config;
use crate::errors::FuzzalnError;
use crate::graph::SequenceGraph;

/// Floor low enough that no real score beats it, high enough that penalty
/// arithmetic cannot wrap.
const UNREACHABLE: i32 = i32::MIN / 2;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Move {
    /// Gap in the sequence: advance in the graph without consuming input
    Horizontal,

    /// Consume one input character while advancing to the recorded
    /// predecessor
    Diagonal,

    /// Gap in the graph: consume one input character in place
    Vertical,
}

/// Aligns the sequence exactly against the graph, processing nodes in a
/// ready-queue wave: a node whose predecessor rows are not all computed yet
/// is re-queued. An iteration cap turns an unsatisfiable dependency (a cycle
/// reachable from the head) into an error instead of a hang.
pub fn align(
    graph: &SequenceGraph,
    sequence: &[u8],
    config: &Config,
) -> Result<Alignment, FuzzalnError> {
    info!("Brute force aligning {} positions", sequence.len());

    let start = Instant::now();
    let len = sequence.len();
    let graph_size = graph.node_count();

    let mut results: FxHashMap<u32, Vec<i32>> = FxHashMap::default();
    let mut gaps: FxHashMap<u32, Vec<bool>> = FxHashMap::default();
    let mut back_pointers: FxHashMap<u32, Vec<Move>> = FxHashMap::default();
    let mut paths: FxHashMap<u32, Vec<u32>> = FxHashMap::default();

    let mut max = UNREACHABLE;
    let mut last_node = None;

    // The head row is the standard affine first row
    let mut head_row = vec![0i32; len + 1];
    for i in 1..head_row.len() {
        head_row[i] = head_row[i - 1]
            - if i == 1 {
                config.gap_open
            } else {
                config.gap_extend
            };
    }
    results.insert(graph.head(), head_row);
    gaps.insert(graph.head(), vec![false; len + 1]);

    let mut queue: VecDeque<u32> = VecDeque::new();
    let mut waiting: FxHashSet<u32> = FxHashSet::default();
    for neighbour in graph.outgoing(graph.head()) {
        queue.push_back(neighbour);
        waiting.insert(neighbour);
    }

    let pop_cap = graph_size * graph_size + graph_size;
    let mut pops = 0usize;

    while let Some(curr) = queue.pop_front() {
        pops += 1;
        if pops > pop_cap {
            return Err(FuzzalnError::GraphError);
        }

        let mut values = vec![UNREACHABLE; len + 1];
        values[0] = 0;
        let mut my_gaps = vec![false; len + 1];
        let mut my_back = vec![Move::Vertical; len + 1];
        let mut my_paths = vec![0u32; len + 1];
        let mut wait = false;

        for neighbour in graph.incoming(curr) {
            let (Some(prev), Some(prev_gaps)) = (results.get(&neighbour), gaps.get(&neighbour))
            else {
                wait = true;
                break;
            };

            for i in 1..=len {
                let vertical = values[i - 1]
                    - if i == 1
                        || values[i - 1] == values[i - 2] - config.gap_extend
                        || values[i - 1] == values[i - 2] - config.gap_open
                    {
                        config.gap_extend
                    } else {
                        config.gap_open
                    };

                let horizontal = prev[i]
                    - if prev_gaps[i] {
                        config.gap_extend
                    } else {
                        config.gap_open
                    };

                let diagonal = prev[i - 1] + config.score(sequence[i - 1], graph.value(curr));

                let my_max = vertical.max(horizontal).max(diagonal);
                if my_max > values[i] {
                    values[i] = my_max;
                    if my_max == horizontal {
                        my_gaps[i] = true;
                        my_back[i] = Move::Horizontal;
                        my_paths[i] = neighbour;
                    } else if my_max == diagonal {
                        my_gaps[i] = false;
                        my_back[i] = Move::Diagonal;
                        my_paths[i] = neighbour;
                    } else {
                        my_gaps[i] = false;
                        my_back[i] = Move::Vertical;
                    }
                }
            }
        }

        if wait {
            queue.push_back(curr);
            continue;
        }

        for neighbour in graph.outgoing(curr) {
            if !waiting.contains(&neighbour) && !results.contains_key(&neighbour) {
                queue.push_back(neighbour);
                waiting.insert(neighbour);
            }
        }

        if values[len] > max {
            max = values[len];
            last_node = Some(curr);
        }

        results.insert(curr, values);
        gaps.insert(curr, my_gaps);
        back_pointers.insert(curr, my_back);
        paths.insert(curr, my_paths);
        waiting.remove(&curr);
    }

    let Some(mut node) = last_node else {
        // Nothing beyond the sentinel head: nothing to align to
        return Ok(Alignment::degenerate(
            -config.gap_penalty(graph_size),
            Strategy::BruteForce,
            len,
            graph_size,
            start.elapsed(),
        ));
    };

    // Backtrack from the best-scoring final column
    let mut positions = vec![0u32; len];
    let mut index = len;
    while index > 0 && node != graph.head() {
        let (Some(back), Some(path)) = (back_pointers.get(&node), paths.get(&node)) else {
            return Err(FuzzalnError::AlignmentError);
        };

        match back[index] {
            Move::Diagonal => {
                positions[index - 1] = node;
                node = path[index];
                index -= 1;
            }
            Move::Vertical => {
                positions[index - 1] = 0;
                index -= 1;
            }
            Move::Horizontal => {
                node = path[index];
            }
        }
    }

    Ok(Alignment {
        score: max,
        elapsed: start.elapsed(),
        strategy: Strategy::BruteForce,
        sequence_length: len,
        graph_size,
        positions,
    })
}
