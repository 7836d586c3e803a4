//! Scoring and search configuration shared by both alignment engines.

use serde::{Deserialize, Serialize};

/// Substitution scores, affine gap penalties and search knobs.
///
/// One instance is threaded through index construction, the suffix tree
/// searches and both path reconstruction strategies, so that all of them
/// agree on a single scoring model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Score for aligning a character to itself
    pub match_score: i32,

    /// Score for aligning two different characters
    pub mismatch_score: i32,

    /// Penalty for opening a gap
    pub gap_open: i32,

    /// Penalty for extending an already-open gap
    pub gap_extend: i32,

    /// Candidates scoring within this margin of the per-position maximum
    /// survive pruning
    pub error_margin: i32,

    /// Number of neighbour characters indexed on each side of a graph node
    pub context_length: usize,

    /// Lookback window of the candidate path finder, and the cap on bounded
    /// graph-distance queries
    pub max_distance: usize,

    /// Allow the position-scaled score floor and the distance-cap penalty in
    /// the path finder
    pub heuristics: bool,

    /// Run the left and right context searches of a position as a fork/join
    /// pair
    pub parallel: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            match_score: 1,
            mismatch_score: -1,
            gap_open: 2,
            gap_extend: 1,
            error_margin: 2,
            context_length: 6,
            max_distance: 10,
            heuristics: true,
            parallel: false,
        }
    }
}

impl Config {
    pub fn score(&self, a: u8, b: u8) -> i32 {
        if a == b {
            self.match_score
        } else {
            self.mismatch_score
        }
    }

    /// Upper bound on any single substitution score. Used as the admissible
    /// per-character bound of the branch-and-bound search.
    pub fn max_pairwise_score(&self) -> i32 {
        self.match_score.max(self.mismatch_score)
    }

    /// Affine penalty for a jump of the given length. A length-1 jump is the
    /// normal alignment step and is free.
    pub fn gap_penalty(&self, length: usize) -> i32 {
        if length <= 1 {
            0
        } else {
            self.gap_open + (length as i32 - 2) * self.gap_extend
        }
    }

    /// Score of the sequence aligned perfectly to itself
    pub fn max_alignment_score(&self, seq: &[u8]) -> i32 {
        seq.iter().map(|&c| self.score(c, c)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    #[test]
    fn test_gap_penalty_is_affine() {
        let config = Config {
            gap_open: 3,
            gap_extend: 1,
            ..Config::default()
        };

        assert_eq!(config.gap_penalty(0), 0);
        assert_eq!(config.gap_penalty(1), 0);
        assert_eq!(config.gap_penalty(2), 3);
        assert_eq!(config.gap_penalty(5), 6);
    }

    #[test]
    fn test_max_alignment_score() {
        let config = Config::default();
        assert_eq!(config.max_alignment_score(b"ACGT"), 4 * config.match_score);
    }
}
