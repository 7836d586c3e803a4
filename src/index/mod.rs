//! The fuzzy search index: two context suffix trees plus the candidate
//! machinery that turns per-position search results into an alignment.

pub mod path;

use std::collections::BTreeSet;
use std::time::Instant;

use itertools::Itertools;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::alignment::Alignment;
use crate::config::Config;
use crate::context::SuffixTree;
use crate::graph::{ContextSide, SequenceGraph};

/// A graph node index paired with its search score.
///
/// The derived order is primarily by score with ties broken by index, so a
/// `BTreeSet` of candidates supports score-window range queries directly.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Candidate {
    pub score: i32,
    pub node: u32,
}

/// Near-optimal candidate nodes for one input position.
pub type CandidateSet = BTreeSet<Candidate>;

#[derive(Debug, Serialize, Deserialize)]
pub struct FuzzySearchIndex {
    config: Config,
    graph: SequenceGraph,
    left_contexts: SuffixTree,
    right_contexts: SuffixTree,
}

impl FuzzySearchIndex {
    /// Indexes every non-sentinel node's left contexts into the left tree
    /// and right contexts into the right tree.
    pub fn build(graph: SequenceGraph, config: Config) -> Self {
        info!("Building index for {} nodes", graph.node_count());

        let mut left_contexts = SuffixTree::new();
        for (ix, contexts) in graph
            .contexts(ContextSide::Left, config.context_length)
            .iter()
            .enumerate()
            .skip(1)
        {
            for context in contexts {
                left_contexts.add_suffix(context, ix as u32);
            }
        }

        let mut right_contexts = SuffixTree::new();
        for (ix, contexts) in graph
            .contexts(ContextSide::Right, config.context_length)
            .iter()
            .enumerate()
            .skip(1)
        {
            for context in contexts {
                right_contexts.add_suffix(context, ix as u32);
            }
        }

        info!(
            "Finished building indexes ({} left / {} right tree nodes)",
            left_contexts.node_count(),
            right_contexts.node_count()
        );

        FuzzySearchIndex {
            config,
            graph,
            left_contexts,
            right_contexts,
        }
    }

    pub fn graph(&self) -> &SequenceGraph {
        &self.graph
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the approximate context searches for every position of the input
    /// and combines them into per-position candidate sets.
    pub fn fuzzy_context_search(&self, sequence: &[u8]) -> Vec<CandidateSet> {
        if self.config.parallel {
            debug!("Searching contexts with per-position fork/join");
        }

        let len = sequence.len();
        let context_length = self.config.context_length;

        let mut per_position = Vec::with_capacity(len);
        for i in 0..len {
            // Near the sequence ends neither side can supply a full-length
            // context; force the searches to work with what is there
            let force = i <= context_length && len - i - 1 < context_length;

            let left_query: Vec<u8> = sequence[i.saturating_sub(context_length)..i]
                .iter()
                .rev()
                .copied()
                .collect();
            let right_query = &sequence[i + 1..len.min(i + 1 + context_length)];

            let (left, right) = if self.config.parallel {
                rayon::join(
                    || self.left_contexts.search(&left_query, force, &self.config),
                    || self.right_contexts.search(right_query, force, &self.config),
                )
            } else {
                (
                    self.left_contexts.search(&left_query, force, &self.config),
                    self.right_contexts.search(right_query, force, &self.config),
                )
            };

            per_position.push(self.combine_scores(&left.scores, &right.scores));
        }

        per_position
    }

    /// Merges the left and right score maps of one position: nodes scored by
    /// both sides sum, then only candidates within the error margin of the
    /// true maximum survive.
    fn combine_scores(
        &self,
        left: &FxHashMap<u32, i32>,
        right: &FxHashMap<u32, i32>,
    ) -> CandidateSet {
        let all: CandidateSet = left
            .keys()
            .chain(right.keys())
            .unique()
            .map(|&node| {
                let score =
                    left.get(&node).copied().unwrap_or(0) + right.get(&node).copied().unwrap_or(0);
                Candidate { score, node }
            })
            .collect();

        // The maximum must be known before pruning; a running-maximum filter
        // would make the result depend on map iteration order
        let Some(max) = all.iter().map(|c| c.score).max() else {
            return CandidateSet::new();
        };

        let window_start = Candidate {
            score: max - self.config.error_margin,
            node: 0,
        };
        let window_end = Candidate {
            score: max,
            node: u32::MAX,
        };

        all.range(window_start..=window_end).copied().collect()
    }

    /// Full fuzzy alignment: context search, candidate combination and the
    /// most-probable-path reconstruction.
    pub fn align(&self, sequence: &[u8]) -> Alignment {
        info!(
            "Aligning {} positions with error margin {}",
            sequence.len(),
            self.config.error_margin
        );

        let start = Instant::now();
        let candidates = self.fuzzy_context_search(sequence);

        self.find_most_probable_path(&candidates, sequence, start)
    }
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashMap;

    use super::FuzzySearchIndex;
    use crate::config::Config;
    use crate::graph::SequenceGraph;

    fn chain_index(seq: &[u8], config: Config) -> FuzzySearchIndex {
        let mut graph = SequenceGraph::new();
        graph.add_sequence(seq);
        FuzzySearchIndex::build(graph, config)
    }

    #[test]
    fn test_combine_sums_shared_nodes() {
        let index = chain_index(b"ACGT", Config::default());

        let left = FxHashMap::from_iter([(1, 3), (2, 1)]);
        let right = FxHashMap::from_iter([(1, 2)]);

        let combined = index.combine_scores(&left, &right);
        let best = combined.iter().next_back().unwrap();

        assert_eq!((best.node, best.score), (1, 5));
    }

    #[test]
    fn test_combine_respects_error_margin() {
        let config = Config {
            error_margin: 2,
            ..Config::default()
        };
        let index = chain_index(b"ACGT", config);

        let left = FxHashMap::from_iter([(1, 10), (2, 8), (3, 7), (4, 1)]);
        let right = FxHashMap::default();

        let combined = index.combine_scores(&left, &right);
        let nodes: Vec<u32> = combined.iter().map(|c| c.node).collect();

        // Within [8, 10]; the range-query result is ordered by score
        assert_eq!(nodes, vec![2, 1]);
    }

    #[test]
    fn test_combine_is_iteration_order_independent() {
        let config = Config {
            error_margin: 1,
            ..Config::default()
        };
        let index = chain_index(b"ACGT", config);

        // A low score seen "before" the maximum must still be pruned
        let left = FxHashMap::from_iter([(5, 1), (6, 9), (7, 10)]);
        let right = FxHashMap::default();

        let combined = index.combine_scores(&left, &right);
        let nodes: Vec<u32> = combined.iter().map(|c| c.node).collect();

        assert_eq!(nodes, vec![6, 7]);
    }

    #[test]
    fn test_candidates_locate_chain_positions() {
        let config = Config {
            context_length: 3,
            error_margin: 0,
            ..Config::default()
        };
        let index = chain_index(b"ACGTA", config);

        let candidates = index.fuzzy_context_search(b"ACGTA");

        assert_eq!(candidates.len(), 5);
        for (i, set) in candidates.iter().enumerate() {
            let best = set.iter().next_back().unwrap();
            assert_eq!(best.node, i as u32 + 1, "position {i}");
        }
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let sequential = chain_index(
            b"ACGTACGT",
            Config {
                parallel: false,
                ..Config::default()
            },
        );
        let parallel = chain_index(
            b"ACGTACGT",
            Config {
                parallel: true,
                ..Config::default()
            },
        );

        let query = b"ACGTTCGT";
        assert_eq!(
            sequential.fuzzy_context_search(query),
            parallel.fuzzy_context_search(query)
        );
    }
}
