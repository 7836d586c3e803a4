use std::fmt::{Display, Formatter};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which engine produced an alignment.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strategy {
    /// Context suffix-tree search followed by the candidate path finder
    FuzzySearch,

    /// Exact partial-order alignment against the whole graph
    BruteForce,
}

impl Display for Strategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FuzzySearch => write!(f, "Fuzzy search"),
            Self::BruteForce => write!(f, "Brute force"),
        }
    }
}

/// The mapping of an input sequence onto graph node indices.
///
/// `positions` holds one entry per input character; 0 is the sentinel head
/// index and marks a position no node aligns to (a gap).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alignment {
    pub score: i32,
    pub elapsed: Duration,
    pub strategy: Strategy,
    pub sequence_length: usize,
    pub graph_size: usize,
    pub positions: Vec<u32>,
}

impl Alignment {
    /// An all-gap alignment carrying a deterministic minimum score, returned
    /// whenever no viable path through the graph exists.
    pub fn degenerate(
        score: i32,
        strategy: Strategy,
        sequence_length: usize,
        graph_size: usize,
        elapsed: Duration,
    ) -> Self {
        Alignment {
            score,
            elapsed,
            strategy,
            sequence_length,
            graph_size,
            positions: vec![0; sequence_length],
        }
    }

    pub fn is_all_gaps(&self) -> bool {
        self.positions.iter().all(|&p| p == 0)
    }
}

impl Display for Alignment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} alignment of {} positions against {} nodes: score {} ({:.3?})",
            self.strategy, self.sequence_length, self.graph_size, self.score, self.elapsed
        )
    }
}
