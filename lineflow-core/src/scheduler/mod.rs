//! Scheduler: drives evaluation of a finalized [`LineGraph`].
//!
//! Two modes share one graph and produce identical values:
//!
//! - **Incremental** ([`Scheduler::step`]): one position per call, nodes
//!   visited once each in topological order. Operator failures are contained
//!   to the failing node (NaN output, `warn!`, counted in [`StepReport`]).
//! - **Batch** ([`Scheduler::run_batch`]): a closed range in one pass, node
//!   by node over whole sub-arrays. The range is all-or-nothing: any operator
//!   failure discards every computed value and leaves committed output as it
//!   was.
//!
//! Batch may continue where incremental stopped (and vice versa) since both
//! read previous output from the committed buffers.

mod batch;
mod incremental;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{LineError, Result};
use crate::graph::LineGraph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerMode {
    #[default]
    Incremental,
    Batch,
}

impl fmt::Display for SchedulerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incremental => write!(f, "incremental"),
            Self::Batch => write!(f, "batch"),
        }
    }
}

/// Where the scheduler is within the current timestep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Waiting for sources to receive the next position.
    #[default]
    AwaitingSample,
    /// Nodes are being evaluated.
    Evaluating,
    /// Every node has produced the current position.
    Settled,
}

/// Outcome of one incremental step.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StepReport {
    /// Position that was evaluated.
    pub position: usize,
    /// Nodes that ran `compute_step` successfully.
    pub evaluated_nodes: usize,
    /// Nodes still inside their warm-up (NaN appended without computing).
    pub warming_nodes: usize,
    /// Operator failures; the failing nodes hold NaN at `position`.
    pub errors: Vec<LineError>,
}

impl StepReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Outcome of one batch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchReport {
    pub start: usize,
    pub end: usize,
    /// Nodes evaluated through their whole-range kernel.
    pub kernel_nodes: usize,
    /// Nodes evaluated by looping `compute_step`.
    pub fallback_nodes: usize,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Default)]
pub struct Scheduler {
    mode: SchedulerMode,
    phase: Phase,
    // Reused across steps.
    windows: Vec<f64>,
    prev: Vec<f64>,
    out: Vec<f64>,
}

impl Scheduler {
    pub fn new(mode: SchedulerMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Scheduler in the mode the graph was finalized with.
    pub fn for_graph(graph: &LineGraph) -> Result<Self> {
        let config = graph.config().ok_or(LineError::NotFinalized)?;
        Ok(Self::new(config.mode))
    }

    pub fn mode(&self) -> SchedulerMode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Evaluate every position for which all sources hold a sample.
    ///
    /// Returns the number of positions evaluated.
    pub fn run(&mut self, graph: &mut LineGraph) -> Result<usize> {
        let start = graph.evaluated();
        let end = graph.available();
        if end <= start {
            return Ok(0);
        }
        match self.mode {
            SchedulerMode::Incremental => {
                for _ in start..end {
                    self.step(graph)?;
                }
            }
            SchedulerMode::Batch => {
                self.run_batch(graph, start..end)?;
            }
        }
        Ok(end - start)
    }
}

/// Attach the node name to an operator error.
pub(crate) fn relabel(err: LineError, node: &str) -> LineError {
    match err {
        LineError::Compute { message, .. } => LineError::compute(node, message),
        other => LineError::compute(node, other.to_string()),
    }
}
