//! Error type shared by buffers, the graph and the scheduler.
//!
//! `NotYetValid` is deliberately absent: a line still inside its warm-up holds
//! NaN and readers see `None`, which is not a failure.

use thiserror::Error;

use crate::graph::{LineId, NodeId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LineError {
    /// The addressed position was never produced, lies in the future, or has
    /// been evicted from a ring buffer.
    #[error("position {position} out of range (length {length}, oldest retained {oldest})")]
    OutOfRange {
        position: i64,
        length: usize,
        oldest: usize,
    },

    #[error("adding this edge would create a cycle")]
    CycleDetected,

    #[error("graph is frozen: structure cannot change after finalize()")]
    GraphFrozen,

    #[error("graph has not been finalized")]
    NotFinalized,

    #[error("unknown line {0}")]
    UnknownLine(LineId),

    #[error("unknown node {0}")]
    UnknownNode(NodeId),

    #[error("node {node} has no input slot {slot}")]
    UnknownSlot { node: NodeId, slot: usize },

    #[error("name '{0}' is already used by another line")]
    DuplicateName(String),

    #[error("operator '{op}' expects {expected} input(s), got {actual}")]
    ArityMismatch {
        op: String,
        expected: usize,
        actual: usize,
    },

    #[error("input offset {0} is invalid: offsets must be 0 or negative, at most 1048576 steps back")]
    InvalidOffset(isize),

    #[error("operator '{0}' declares min_period 0; at least one sample is required")]
    InvalidPeriod(String),

    #[error("source {line} has no sample at position {position}")]
    MissingSample { line: LineId, position: usize },

    #[error("source {0} appears more than once in a single push")]
    DuplicateSample(LineId),

    /// A ring-buffered source would run so far ahead of the scheduler that
    /// positions still to be evaluated get evicted.
    #[error("source {line} would hold {pending} unevaluated samples, its ring allows {limit}; evaluate first or raise `extra`")]
    Backlog {
        line: LineId,
        pending: usize,
        limit: usize,
    },

    #[error("line {0} is produced by a node and cannot receive external samples")]
    NotASource(LineId),

    #[error("invalid range {start}..{end}: {reason}")]
    InvalidRange {
        start: usize,
        end: usize,
        reason: String,
    },

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("node '{node}' failed: {message}")]
    Compute { node: String, message: String },
}

impl LineError {
    /// Shorthand for operator failures raised inside `compute_step`/`compute_batch`.
    pub fn compute(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Compute {
            node: node.into(),
            message: message.into(),
        }
    }

    pub fn is_out_of_range(&self) -> bool {
        matches!(self, Self::OutOfRange { .. })
    }
}

pub type Result<T, E = LineError> = std::result::Result<T, E>;
