//! Graph handles and vertex bookkeeping.

use std::fmt;

use super::op::LineOp;

/// Stable handle of a line (a source or one output of a node).
///
/// Handles are assigned sequentially and never reused within a graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(pub(crate) u32);

impl LineId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line#{}", self.0)
    }
}

/// Stable handle of a computation node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Deepest look-back an input may declare through its offset.
pub const MAX_DELAY: usize = 1 << 20;

/// One consumed line, read `offset` steps behind the evaluated position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Input {
    pub line: LineId,
    pub offset: isize,
}

impl Input {
    pub fn new(line: LineId) -> Self {
        Self { line, offset: 0 }
    }

    /// `offset` must lie in `-MAX_DELAY..=0`; `-1` reads the previous sample.
    pub fn at(line: LineId, offset: isize) -> Self {
        Self { line, offset }
    }

    /// Steps of history added by the offset.
    #[inline]
    pub(crate) fn delay(&self) -> usize {
        self.offset.unsigned_abs()
    }
}

impl From<LineId> for Input {
    fn from(line: LineId) -> Self {
        Self::new(line)
    }
}

#[derive(Debug)]
pub(crate) struct LineMeta {
    pub name: String,
    pub producer: Option<NodeId>,
    /// Cumulative lookback: own `min_period` plus the deepest input chain.
    pub lookback: usize,
    /// First position holding a valid value.
    pub warmup: usize,
}

pub(crate) struct LineNode {
    pub name: String,
    pub op: Box<dyn LineOp>,
    pub inputs: Vec<Input>,
    pub outputs: Vec<LineId>,
    pub min_period: usize,
}

impl fmt::Debug for LineNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LineNode")
            .field("name", &self.name)
            .field("kind", &self.op.kind())
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("min_period", &self.min_period)
            .finish()
    }
}
