//! Topological ordering and lookback propagation.

use std::collections::VecDeque;

use super::node::{Input, LineMeta, LineNode, NodeId};
use crate::error::{LineError, Result};

/// Cumulative lookback and warm-up of a node's outputs, derived from the
/// current metadata of its inputs.
pub(crate) fn depth(lines: &[LineMeta], inputs: &[Input], min_period: usize) -> (usize, usize) {
    let mut lookback = 0;
    let mut warmup = 0;
    for input in inputs {
        let meta = &lines[input.line.index()];
        lookback = lookback.max(meta.lookback.saturating_add(input.delay()));
        warmup = warmup.max(meta.warmup.saturating_add(input.delay()));
    }
    (
        lookback.saturating_add(min_period),
        warmup.saturating_add(min_period - 1),
    )
}

/// Direct consumers of every node, indexed by producer.
pub(crate) fn consumers(lines: &[LineMeta], nodes: &[LineNode]) -> Vec<Vec<NodeId>> {
    let mut out = vec![Vec::new(); nodes.len()];
    for (i, node) in nodes.iter().enumerate() {
        for input in &node.inputs {
            if let Some(producer) = lines[input.line.index()].producer {
                out[producer.index()].push(NodeId(i as u32));
            }
        }
    }
    out
}

/// Kahn's algorithm. Ties resolve by node id, so the order is stable while
/// the node set is unchanged.
pub(crate) fn kahn_sort(lines: &[LineMeta], nodes: &[LineNode]) -> Result<Vec<NodeId>> {
    let n = nodes.len();
    let consumers = consumers(lines, nodes);
    let mut in_degree = vec![0usize; n];
    for list in &consumers {
        for c in list {
            in_degree[c.index()] += 1;
        }
    }

    let mut queue: VecDeque<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut sorted = Vec::with_capacity(n);

    while let Some(idx) = queue.pop_front() {
        sorted.push(NodeId(idx as u32));
        for c in &consumers[idx] {
            let c = c.index();
            in_degree[c] -= 1;
            if in_degree[c] == 0 {
                queue.push_back(c);
            }
        }
    }

    if sorted.len() != n {
        return Err(LineError::CycleDetected);
    }
    Ok(sorted)
}

/// DFS upstream from `line`: is `node` among its producers, transitively?
pub(crate) fn depends_on(
    lines: &[LineMeta],
    nodes: &[LineNode],
    line: super::LineId,
    node: NodeId,
) -> bool {
    let mut visited = vec![false; lines.len()];
    let mut stack = vec![line];

    while let Some(current) = stack.pop() {
        let idx = current.index();
        if visited[idx] {
            continue;
        }
        visited[idx] = true;

        if let Some(producer) = lines[idx].producer {
            if producer == node {
                return true;
            }
            stack.extend(nodes[producer.index()].inputs.iter().map(|i| i.line));
        }
    }
    false
}

/// Recompute lookback and warm-up of every node in `order`.
///
/// Warm-up is exact; lookback keeps the larger of the old and new value so a
/// rewiring never silently shrinks what the retention policy relies on.
pub(crate) fn propagate(lines: &mut [LineMeta], nodes: &[LineNode], order: &[NodeId]) {
    for id in order {
        let node = &nodes[id.index()];
        let (lookback, warmup) = depth(lines, &node.inputs, node.min_period);
        for out in &node.outputs {
            let meta = &mut lines[out.index()];
            meta.lookback = meta.lookback.max(lookback);
            meta.warmup = warmup;
        }
    }
}
