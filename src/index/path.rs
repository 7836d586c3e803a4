//! Reconstruction of the most probable path through the per-position
//! candidate sets.

use std::time::Instant;

use tracing::debug;

use crate::alignment::{Alignment, Strategy};
use crate::index::{CandidateSet, FuzzySearchIndex};

impl FuzzySearchIndex {
    /// Dynamic program over the candidate rows: each candidate picks the
    /// best-scoring predecessor within the lookback window, penalized by the
    /// graph distance between the two nodes and by skipped input positions.
    pub fn find_most_probable_path(
        &self,
        candidates: &[CandidateSet],
        sequence: &[u8],
        start: Instant,
    ) -> Alignment {
        debug!("Finding most probable path");

        let config = self.config();
        let graph_size = self.graph().node_count();
        let max_distance = config.max_distance;

        if sequence.is_empty() {
            return Alignment::degenerate(0, Strategy::FuzzySearch, 0, graph_size, start.elapsed());
        }

        let limit = -(sequence.len() as i32) * config.gap_open;
        // Provably below any reachable score when heuristics are off
        let unreachable = -2 * config.error_margin - 1;

        let mut scores: Vec<Vec<i32>> = Vec::with_capacity(candidates.len());
        let mut indexes: Vec<Vec<u32>> = Vec::with_capacity(candidates.len());
        let mut back: Vec<Vec<Option<(usize, usize)>>> = Vec::with_capacity(candidates.len());

        // Base cases: the first row is scored by substitution alone
        let first_row = &candidates[0];
        scores.push(
            first_row
                .iter()
                .map(|c| config.score(self.graph().value(c.node), sequence[0]))
                .collect(),
        );
        indexes.push(first_row.iter().map(|c| c.node).collect());
        back.push(vec![None; first_row.len()]);

        for i in 1..candidates.len() {
            let row = &candidates[i];
            let mut row_scores = Vec::with_capacity(row.len());
            let mut row_indexes = Vec::with_capacity(row.len());
            let mut row_back = Vec::with_capacity(row.len());

            for candidate in row {
                let mut best = if config.heuristics { limit } else { unreachable };
                let mut best_back = None;
                let base_score = config.score(self.graph().value(candidate.node), sequence[i]);

                for k in i.saturating_sub(max_distance)..i {
                    for l in 0..scores[k].len() {
                        let mut distance =
                            self.graph()
                                .distance(indexes[k][l], candidate.node, max_distance);
                        if distance == max_distance && config.heuristics {
                            // A capped distance is implausible; penalize as if
                            // the jump crossed the whole graph
                            distance = graph_size;
                        }

                        let score = base_score + scores[k][l]
                            - config.gap_penalty(distance)
                            - config.gap_penalty(i - k);

                        if score > best {
                            best = score;
                            best_back = Some((k, l));
                        }
                    }
                }

                row_scores.push(best);
                row_indexes.push(candidate.node);
                row_back.push(best_back);
            }

            scores.push(row_scores);
            indexes.push(row_indexes);
            back.push(row_back);
        }

        // Walk back from the end of the input until a usable row is found,
        // counting the skipped positions as an initial gap
        let mut row_nr = scores.len() - 1;
        let mut initial_gap_length = 1usize;
        while scores[row_nr].is_empty() || scores[row_nr].iter().all(|&s| s <= limit) {
            initial_gap_length += 1;
            if row_nr == 0 {
                return Alignment::degenerate(
                    -config.gap_penalty(graph_size),
                    Strategy::FuzzySearch,
                    sequence.len(),
                    graph_size,
                    start.elapsed(),
                );
            }
            row_nr -= 1;
        }

        let mut col_nr = scores[row_nr]
            .iter()
            .enumerate()
            .max_by_key(|(_, &s)| s)
            .map(|(ix, _)| ix)
            .unwrap_or(0);
        let max = scores[row_nr][col_nr];

        let mut positions = vec![0u32; sequence.len()];
        loop {
            positions[row_nr] = indexes[row_nr][col_nr];
            match back[row_nr][col_nr] {
                Some((k, l)) => {
                    row_nr = k;
                    col_nr = l;
                }
                None => break,
            }
        }

        let elapsed = start.elapsed();
        if !config.heuristics && max < config.max_alignment_score(sequence) - config.error_margin {
            // Not confidently alignable; report the deterministic minimum
            return Alignment::degenerate(
                config.max_alignment_score(sequence) - config.gap_penalty(graph_size),
                Strategy::FuzzySearch,
                sequence.len(),
                graph_size,
                elapsed,
            );
        }

        Alignment {
            score: max - config.gap_penalty(initial_gap_length),
            elapsed,
            strategy: Strategy::FuzzySearch,
            sequence_length: sequence.len(),
            graph_size,
            positions,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::time::Instant;

    use super::super::{Candidate, FuzzySearchIndex};
    use crate::alignment::Strategy;
    use crate::config::Config;
    use crate::graph::SequenceGraph;

    fn chain_index(seq: &[u8], config: Config) -> FuzzySearchIndex {
        let mut graph = SequenceGraph::new();
        graph.add_sequence(seq);
        FuzzySearchIndex::build(graph, config)
    }

    fn rows(entries: &[&[(i32, u32)]]) -> Vec<BTreeSet<Candidate>> {
        entries
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&(score, node)| Candidate { score, node })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_path_follows_chain() {
        let config = Config {
            heuristics: true,
            ..Config::default()
        };
        let index = chain_index(b"ACGT", config);

        let candidates = rows(&[
            &[(3, 1)],
            &[(3, 2)],
            &[(3, 3)],
            &[(3, 4)],
        ]);

        let alignment = index.find_most_probable_path(&candidates, b"ACGT", Instant::now());

        assert_eq!(alignment.positions, vec![1, 2, 3, 4]);
        assert_eq!(alignment.strategy, Strategy::FuzzySearch);
        assert_eq!(alignment.sequence_length, 4);
        // Four matches, every step adjacent: no gap penalties at all
        assert_eq!(alignment.score, 4);
    }

    #[test]
    fn test_path_prefers_adjacent_over_distant_candidates() {
        let mut graph = SequenceGraph::new();
        let (first, last) = graph.add_sequence(b"ACGTACGT").unwrap();
        assert_eq!((first, last), (1, 8));
        let config = Config {
            heuristics: true,
            max_distance: 4,
            ..Config::default()
        };
        let index = FuzzySearchIndex::build(graph, config);

        // Position 1 offers both the true successor (node 2, "C") and a
        // distant lookalike (node 6, also "C")
        let candidates = rows(&[
            &[(3, 1)],
            &[(3, 2), (3, 6)],
            &[(3, 3)],
        ]);

        let alignment = index.find_most_probable_path(&candidates, b"ACG", Instant::now());

        assert_eq!(alignment.positions, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_rows_degenerate_to_all_gaps() {
        let config = Config {
            heuristics: true,
            ..Config::default()
        };
        let index = chain_index(b"ACGT", config);

        let candidates = rows(&[&[], &[], &[]]);
        let alignment = index.find_most_probable_path(&candidates, b"AAA", Instant::now());

        assert!(alignment.is_all_gaps());
        assert_eq!(
            alignment.score,
            -index.config().gap_penalty(index.graph().node_count())
        );
    }

    #[test]
    fn test_trailing_empty_rows_are_skipped_and_penalized() {
        let config = Config {
            heuristics: true,
            gap_open: 2,
            gap_extend: 1,
            ..Config::default()
        };
        let index = chain_index(b"ACGT", config);

        let candidates = rows(&[
            &[(3, 1)],
            &[(3, 2)],
            &[],
            &[],
        ]);

        let alignment = index.find_most_probable_path(&candidates, b"ACAA", Instant::now());

        // Two skipped rows: initial gap length 3
        assert_eq!(alignment.positions, vec![1, 2, 0, 0]);
        assert_eq!(alignment.score, 2 - index.config().gap_penalty(3));
    }

    #[test]
    fn test_low_confidence_without_heuristics_degenerates() {
        let config = Config {
            heuristics: false,
            error_margin: 0,
            ..Config::default()
        };
        let index = chain_index(b"ACGT", config);

        // Only a mismatching candidate is on offer; the best achievable
        // score stays below the self-alignment score minus the margin
        let candidates = rows(&[&[(1, 3)]]);
        let alignment = index.find_most_probable_path(&candidates, b"A", Instant::now());

        assert!(alignment.is_all_gaps());
        assert_eq!(
            alignment.score,
            index.config().max_alignment_score(b"A")
                - index.config().gap_penalty(index.graph().node_count())
        );
    }
}
