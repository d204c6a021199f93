//! Column assignment policies for the sankey layout.
//!
//! Each policy maps a node's depth metadata and the total column count to a
//! column index. They hold no state, so swapping one only reruns the layout.

use crate::config::SankeyAlign;

/// What a policy may look at for one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeDepth {
    /// Longest path length from any source.
    pub depth: usize,
    /// Longest path length to any sink.
    pub height: usize,
    pub has_incoming: bool,
    pub has_outgoing: bool,
    /// Smallest depth among direct successors.
    pub min_successor_depth: Option<usize>,
}

pub type AlignFn = fn(&NodeDepth, usize) -> usize;

pub fn left(node: &NodeDepth, _columns: usize) -> usize {
    node.depth
}

pub fn right(node: &NodeDepth, columns: usize) -> usize {
    columns.saturating_sub(1).saturating_sub(node.height)
}

/// Like `left`, but sinks are pushed to the last column.
pub fn justify(node: &NodeDepth, columns: usize) -> usize {
    if node.has_outgoing {
        node.depth
    } else {
        columns.saturating_sub(1)
    }
}

/// Sources without inputs sit one column before their nearest successor.
pub fn center(node: &NodeDepth, _columns: usize) -> usize {
    if node.has_incoming {
        node.depth
    } else if let Some(min_depth) = node.min_successor_depth {
        min_depth.saturating_sub(1)
    } else {
        0
    }
}

impl SankeyAlign {
    pub fn strategy(self) -> AlignFn {
        match self {
            SankeyAlign::Justify => justify,
            SankeyAlign::Left => left,
            SankeyAlign::Right => right,
            SankeyAlign::Center => center,
        }
    }

    /// Column for `node`, clamped into `0..columns`.
    pub fn column(self, node: &NodeDepth, columns: usize) -> usize {
        (self.strategy())(node, columns).min(columns.saturating_sub(1))
    }
}
