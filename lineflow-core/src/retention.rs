//! Retention policy: how much history each buffer keeps.
//!
//! With [`RetentionPolicy::Bounded`] every line gets a ring buffer sized at
//! `finalize()` from the graph: the largest cumulative lookback among the
//! line's own producer and everything consuming it (directly or
//! transitively), plus one slot for the current sample, plus `extra` slots
//! reserved for look-backs by external consumers.
//!
//! The `1 + extra` slots beyond `required` also bound how far a source may run
//! ahead of the scheduler; `LineGraph::push` refuses samples past that with
//! `Backlog` instead of evicting positions not yet evaluated. A read beyond
//! the bound is a graph-construction bug (an operator whose `min_period`
//! understates its access pattern) and fails with `OutOfRange`.

use serde::{Deserialize, Serialize};

use crate::buffer::Storage;
use crate::graph::node::{LineMeta, LineNode, NodeId};
use crate::graph::topo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionPolicy {
    /// Keep every sample (growth storage).
    #[default]
    Unbounded,
    /// Keep only what the graph needs, plus `extra` samples.
    Bounded { extra: usize },
}

impl RetentionPolicy {
    pub fn bounded() -> Self {
        Self::Bounded { extra: 0 }
    }

    pub fn is_bounded(&self) -> bool {
        matches!(self, Self::Bounded { .. })
    }

    /// Storage for a line that must keep `required` samples of history.
    pub fn storage_for(&self, required: usize) -> Storage {
        match *self {
            Self::Unbounded => Storage::Growth,
            Self::Bounded { extra } => Storage::Ring {
                capacity: required + 1 + extra,
            },
        }
    }
}

/// Minimum history (excluding the current sample) each line must keep.
pub(crate) fn required_history(
    lines: &[LineMeta],
    nodes: &[LineNode],
    order: &[NodeId],
) -> Vec<usize> {
    let consumers = topo::consumers(lines, nodes);

    // Deepest lookback of a node and everything downstream of it.
    let mut need = vec![0usize; nodes.len()];
    for id in order.iter().rev() {
        let node = &nodes[id.index()];
        let own = node
            .outputs
            .iter()
            .map(|l| lines[l.index()].lookback)
            .max()
            .unwrap_or(0);
        let downstream = consumers[id.index()]
            .iter()
            .map(|c| need[c.index()])
            .max()
            .unwrap_or(0);
        need[id.index()] = own.max(downstream);
    }

    let mut required: Vec<usize> = lines.iter().map(|m| m.lookback).collect();
    for (i, node) in nodes.iter().enumerate() {
        for input in &node.inputs {
            let slot = &mut required[input.line.index()];
            *slot = (*slot).max(need[i]);
        }
    }
    required
}
