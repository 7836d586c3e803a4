//! The sequence graph the aligners run against.
//!
//! Nodes carry one character each; node 0 is a sentinel head (`#`) every
//! sequence chain hangs off, mirroring the start node convention of POA
//! graphs. Index 0 therefore never names a real character and doubles as the
//! gap marker in alignment output.

use std::collections::VecDeque;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Incoming;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

pub const HEAD_VALUE: u8 = b'#';

/// Which neighbour sequence of a node a context describes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContextSide {
    /// Characters preceding the node, nearest first
    Left,

    /// Characters following the node, in read order
    Right,
}

pub type GraphType = DiGraph<u8, (), u32>;

#[derive(Debug, Serialize, Deserialize)]
pub struct SequenceGraph {
    graph: GraphType,
}

impl Default for SequenceGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceGraph {
    pub fn new() -> Self {
        let mut graph = GraphType::default();
        graph.add_node(HEAD_VALUE);

        SequenceGraph { graph }
    }

    pub fn head(&self) -> u32 {
        0
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn value(&self, node: u32) -> u8 {
        self.graph[NodeIndex::from(node)]
    }

    pub fn outgoing(&self, node: u32) -> impl Iterator<Item = u32> + '_ {
        self.graph
            .neighbors(NodeIndex::from(node))
            .map(|v| v.index() as u32)
    }

    pub fn incoming(&self, node: u32) -> impl Iterator<Item = u32> + '_ {
        self.graph
            .neighbors_directed(NodeIndex::from(node), Incoming)
            .map(|v| v.index() as u32)
    }

    /// Appends the sequence as a chain of nodes hanging off the head.
    /// Returns the indices of the first and last node of the chain.
    pub fn add_sequence<T: AsRef<[u8]>>(&mut self, sequence: T) -> Option<(u32, u32)> {
        let seq = sequence.as_ref();

        let mut first = None;
        let mut prev = NodeIndex::from(0u32);
        for &c in seq {
            let curr = self.graph.add_node(c);
            self.graph.add_edge(prev, curr, ());

            if first.is_none() {
                first = Some(curr.index() as u32);
            }
            prev = curr;
        }

        first.map(|f| (f, prev.index() as u32))
    }

    pub fn add_edge(&mut self, from: u32, to: u32) {
        let (s, t) = (NodeIndex::from(from), NodeIndex::from(to));
        if self.graph.find_edge(s, t).is_none() {
            self.graph.add_edge(s, t, ());
        }
    }

    /// Shortest path length from `from` to `to` following outgoing edges,
    /// capped at `cap`. Returns `cap` when the target is farther than that
    /// (or unreachable).
    pub fn distance(&self, from: u32, to: u32, cap: usize) -> usize {
        if from == to {
            return 0;
        }

        let mut visited = FxHashSet::default();
        let mut queue = VecDeque::new();
        visited.insert(from);
        queue.push_back((from, 0usize));

        while let Some((node, dist)) = queue.pop_front() {
            if dist >= cap {
                continue;
            }

            for next in self.outgoing(node) {
                if next == to {
                    return dist + 1;
                }

                if visited.insert(next) {
                    queue.push_back((next, dist + 1));
                }
            }
        }

        cap
    }

    /// Per-node sets of neighbour-context strings, indexed by node index.
    /// Entry 0 (the sentinel head) is always empty.
    pub fn contexts(&self, side: ContextSide, length: usize) -> Vec<FxHashSet<Vec<u8>>> {
        let mut all = vec![FxHashSet::default(); self.graph.node_count()];
        for node in self.graph.node_indices().skip(1) {
            let mut path = Vec::with_capacity(length);
            self.walk_contexts(
                side,
                node.index() as u32,
                length,
                &mut path,
                &mut all[node.index()],
            );
        }

        all
    }

    fn walk_contexts(
        &self,
        side: ContextSide,
        node: u32,
        length: usize,
        path: &mut Vec<u8>,
        out: &mut FxHashSet<Vec<u8>>,
    ) {
        if path.len() == length {
            out.insert(path.clone());
            return;
        }

        let neighbours: Vec<u32> = match side {
            ContextSide::Left => self.incoming(node).collect(),
            ContextSide::Right => self.outgoing(node).collect(),
        };

        let mut extended = false;
        for next in &neighbours {
            if *next == 0 {
                continue;
            }

            path.push(self.value(*next));
            self.walk_contexts(side, *next, length, path, out);
            path.pop();
            extended = true;
        }

        // The walk ran into the graph boundary; keep whatever accumulated
        if !extended && !path.is_empty() {
            out.insert(path.clone());
        }
    }
}
