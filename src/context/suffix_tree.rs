//! Character tries over per-node context strings, with a branch-and-bound
//! approximate search.
//!
//! The trie is stored as an arena of nodes addressed by `u32` id (the root is
//! id 0); a parent maps characters to child ids. Trees are mutated only while
//! the index is built and are read-only during search, so concurrent searches
//! need no locking as long as each carries its own score rows.

use std::collections::BTreeMap;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Floor for searches forced to accept short contexts near sequence ends.
/// Low enough to never prune, high enough to survive further arithmetic.
const FORCED_FLOOR: i32 = i32::MIN / 4;

/// Mutable state threaded through the branch-and-bound recursion.
///
/// Passing it by reference lets sibling subtrees observe bounds tightened by
/// earlier ones, which is where most of the pruning comes from.
#[derive(Debug)]
pub struct SearchAccumulator {
    /// Best score recorded per graph node index
    pub scores: FxHashMap<u32, i32>,

    /// Best leaf score seen anywhere in the search so far
    pub max_score: i32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TreeNode {
    children: BTreeMap<u8, u32>,
    indexes: FxHashSet<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuffixTree {
    nodes: Vec<TreeNode>,
    max_depth: usize,
}

impl Default for SuffixTree {
    fn default() -> Self {
        Self::new()
    }
}

impl SuffixTree {
    pub fn new() -> Self {
        SuffixTree {
            nodes: vec![TreeNode::default()],
            max_depth: 0,
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Inserts a context string character by character, tagging the terminal
    /// trie node with the graph node index. Re-inserting is absorbed by the
    /// set semantics of the terminal tag.
    pub fn add_suffix(&mut self, context: &[u8], node_ix: u32) {
        let mut curr = 0usize;
        for &c in context {
            curr = match self.nodes[curr].children.get(&c) {
                Some(&child) => child as usize,
                None => {
                    let child = self.nodes.len() as u32;
                    self.nodes.push(TreeNode::default());
                    self.nodes[curr].children.insert(c, child);
                    child as usize
                }
            };
        }

        self.nodes[curr].indexes.insert(node_ix);
        self.max_depth = self.max_depth.max(context.len());
    }

    /// Follows exactly matching children. When the query is exhausted, or the
    /// walk reaches a leaf early, returns the cumulative index set of the
    /// subtree reached; `None` when a required character has no child.
    pub fn strict_search(&self, query: &[u8]) -> Option<FxHashSet<u32>> {
        let mut curr = 0usize;
        for &c in query {
            if self.nodes[curr].children.is_empty() {
                break;
            }

            match self.nodes[curr].children.get(&c) {
                Some(&child) => curr = child as usize,
                None => return None,
            }
        }

        Some(self.subtree_indexes(curr))
    }

    fn subtree_indexes(&self, node: usize) -> FxHashSet<u32> {
        let mut out = FxHashSet::default();
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            out.extend(self.nodes[n].indexes.iter().copied());
            stack.extend(self.nodes[n].children.values().map(|&v| v as usize));
        }

        out
    }

    /// Branch-and-bound affine-gap alignment of the query against every path
    /// of the tree. Returns the accumulator with the best score recorded per
    /// tagged graph node.
    ///
    /// A non-forced search only reports candidates scoring within the error
    /// margin of the query's perfect self-alignment; a forced search (short
    /// context near a sequence end) reports whatever aligns best.
    pub fn search(&self, query: &[u8], force: bool, config: &Config) -> SearchAccumulator {
        let mut acc = SearchAccumulator {
            scores: FxHashMap::default(),
            max_score: if force {
                FORCED_FLOOR
            } else {
                config.max_alignment_score(query) - config.error_margin
            },
        };

        // Standard affine first row: the path-so-far is all gap
        let mut row = vec![0i32; query.len() + 1];
        for i in 1..row.len() {
            row[i] = row[i - 1]
                - if i == 1 {
                    config.gap_open
                } else {
                    config.gap_extend
                };
        }
        let gaps = vec![false; query.len() + 1];

        self.search_node(0, query, &row, &gaps, 0, config, &mut acc);

        acc
    }

    #[allow(clippy::too_many_arguments)]
    fn search_node(
        &self,
        node: usize,
        query: &[u8],
        row: &[i32],
        gaps: &[bool],
        depth: usize,
        config: &Config,
        acc: &mut SearchAccumulator,
    ) {
        let current_max = row.iter().copied().max().unwrap_or(i32::MIN);

        // Admissible upper bound: every remaining tree character can at best
        // contribute the maximum pairwise score
        let remaining = self.max_depth.saturating_sub(depth) as i32;
        if current_max + remaining * config.max_pairwise_score() < acc.max_score {
            return;
        }

        let n = &self.nodes[node];
        if n.children.is_empty() {
            for &ix in &n.indexes {
                if current_max >= acc.max_score
                    && acc.scores.get(&ix).is_none_or(|&s| current_max > s)
                {
                    acc.scores.insert(ix, current_max);
                }
            }
            acc.max_score = acc.max_score.max(current_max);
            return;
        }

        for (&c, &child) in &n.children {
            let mut my_row = vec![0i32; row.len()];
            let mut my_gaps = vec![false; gaps.len()];
            my_row[0] = row[0]
                - if depth == 0 {
                    config.gap_open
                } else {
                    config.gap_extend
                };

            for i in 1..row.len() {
                let vertical = my_row[i - 1] - vertical_gap_penalty(&my_row, i, config);

                let mut horizontal = row[i] - config.gap_open;
                if i == row.len() - 1 && depth >= row.len().saturating_sub(2) {
                    // Trailing characters of the tree path align for free once
                    // the query is exhausted
                    horizontal = row[i];
                }
                if gaps[i] {
                    horizontal = row[i] - config.gap_extend;
                }

                let diagonal = row[i - 1] + config.score(query[i - 1], c);

                my_row[i] = vertical.max(horizontal).max(diagonal);
                // Only a strict horizontal win marks a gap; ties go to the
                // diagonal/vertical interpretation
                my_gaps[i] = horizontal > vertical.max(diagonal);
            }

            self.search_node(child as usize, query, &my_row, &my_gaps, depth + 1, config, acc);
        }
    }
}

/// Open vs. extend for a vertical move, decided from the score delta itself;
/// the gap flag alone is ambiguous when the two penalties are equal.
fn vertical_gap_penalty(row: &[i32], i: usize, config: &Config) -> i32 {
    if i == 1
        || row[i - 1] == row[i - 2] - config.gap_open
        || row[i - 1] == row[i - 2] - config.gap_extend
    {
        config.gap_extend
    } else {
        config.gap_open
    }
}

#[cfg(test)]
mod tests {
    use rustc_hash::FxHashSet;

    use super::SuffixTree;
    use crate::config::Config;

    fn test_config() -> Config {
        Config {
            match_score: 1,
            mismatch_score: -1,
            gap_open: 2,
            gap_extend: 1,
            error_margin: 1,
            ..Config::default()
        }
    }

    #[test]
    fn test_strict_search_finds_inserted_context() {
        let mut tree = SuffixTree::new();
        tree.add_suffix(b"ACG", 3);
        tree.add_suffix(b"ACT", 4);
        tree.add_suffix(b"ACG", 7);

        assert_eq!(
            tree.strict_search(b"ACG"),
            Some(FxHashSet::from_iter([3, 7]))
        );
        assert_eq!(tree.strict_search(b"ACT"), Some(FxHashSet::from_iter([4])));
        assert_eq!(tree.strict_search(b"AGG"), None);
    }

    #[test]
    fn test_strict_search_prefix_returns_subtree_union() {
        let mut tree = SuffixTree::new();
        tree.add_suffix(b"ACG", 3);
        tree.add_suffix(b"ACT", 4);

        assert_eq!(
            tree.strict_search(b"AC"),
            Some(FxHashSet::from_iter([3, 4]))
        );
    }

    #[test]
    fn test_strict_search_past_leaf_returns_leaf_set() {
        let mut tree = SuffixTree::new();
        tree.add_suffix(b"AC", 2);

        // Query longer than the stored context stops at the leaf
        assert_eq!(
            tree.strict_search(b"ACGT"),
            Some(FxHashSet::from_iter([2]))
        );
    }

    #[test]
    fn test_add_suffix_is_idempotent() {
        let mut tree = SuffixTree::new();
        tree.add_suffix(b"ACG", 3);
        let before = tree.node_count();
        tree.add_suffix(b"ACG", 3);

        assert_eq!(tree.node_count(), before);
        assert_eq!(tree.strict_search(b"ACG"), Some(FxHashSet::from_iter([3])));
    }

    #[test]
    fn test_search_scores_exact_match_perfectly() {
        let config = test_config();
        let mut tree = SuffixTree::new();
        tree.add_suffix(b"ACGT", 1);
        tree.add_suffix(b"AGGT", 2);

        let acc = tree.search(b"ACGT", true, &config);

        assert_eq!(acc.scores.get(&1), Some(&4));
        assert_eq!(acc.max_score, 4);
    }

    #[test]
    fn test_search_margin_prunes_distant_contexts() {
        let config = test_config();
        let mut tree = SuffixTree::new();
        tree.add_suffix(b"ACGT", 1);
        tree.add_suffix(b"TTTT", 2);

        // Non-forced search requires scores within the margin of a perfect
        // self-alignment; the all-mismatch context cannot qualify
        let acc = tree.search(b"ACGT", false, &config);

        assert_eq!(acc.scores.get(&1), Some(&4));
        assert!(!acc.scores.contains_key(&2));
    }

    #[test]
    fn test_search_tolerates_single_mismatch_when_forced() {
        let config = test_config();
        let mut tree = SuffixTree::new();
        tree.add_suffix(b"AGGT", 2);

        let acc = tree.search(b"ACGT", true, &config);

        // Three matches, one mismatch
        assert_eq!(acc.scores.get(&2), Some(&2));
    }

    #[test]
    fn test_bound_is_admissible() {
        // Seeding the search with a lower starting threshold (forced) must
        // never report a better score for a node than the pruned variant
        // would have found for the nodes it retains
        let config = test_config();
        let mut tree = SuffixTree::new();
        tree.add_suffix(b"ACGT", 1);
        tree.add_suffix(b"ACGA", 2);
        tree.add_suffix(b"ACTT", 3);
        tree.add_suffix(b"GGGG", 4);

        let relaxed = tree.search(b"ACGT", true, &config);
        let bounded = tree.search(b"ACGT", false, &config);

        assert_eq!(bounded.max_score, relaxed.max_score);
        for (node, score) in &bounded.scores {
            assert_eq!(relaxed.scores.get(node), Some(score));
        }
    }

    #[test]
    fn test_search_empty_query_with_force() {
        let config = test_config();
        let mut tree = SuffixTree::new();
        tree.add_suffix(b"AC", 1);

        let acc = tree.search(b"", true, &config);

        // The whole tree path is one long gap, but something is reported
        assert!(acc.scores.contains_key(&1));
    }
}
