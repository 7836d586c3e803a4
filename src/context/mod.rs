pub mod suffix_tree;

pub use suffix_tree::{SearchAccumulator, SuffixTree};
