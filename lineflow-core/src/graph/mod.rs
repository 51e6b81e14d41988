//! Line graph: an arena of source lines and computation nodes.
//!
//! Build the graph with [`LineGraph::add_source`] and [`LineGraph::add_node`],
//! then call [`LineGraph::finalize`]. Finalizing computes the topological
//! order, sizes every buffer through the retention policy and freezes the
//! structure; afterwards only external samples ([`LineGraph::push`]) and the
//! scheduler mutate the graph.
//!
//! ```rust,ignore
//! let mut graph = LineGraph::new();
//! let close = graph.add_source("close")?;
//! let fast = graph.add_node("fast", &[close.into()], Sma::new(3))?;
//! graph.finalize(&EngineConfig::default())?;
//!
//! let mut scheduler = Scheduler::for_graph(&graph)?;
//! graph.push(&[(close, 101.5)])?;
//! scheduler.step(&mut graph)?;
//! let sma = graph.outputs(fast)?[0];
//! let value = graph.value_at(sma, 0)?; // None while warming up
//! ```

pub mod node;
pub mod op;
pub(crate) mod topo;

use std::collections::HashMap;

use tracing::{debug, info};

use crate::buffer::SampleBuffer;
use crate::config::EngineConfig;
use crate::error::{LineError, Result};
use crate::ops::FnOp;
use crate::retention;
use crate::scheduler::SchedulerMode;

pub use node::{Input, LineId, NodeId};
pub use op::{BatchInput, LineOp, StepInput};

use node::{LineMeta, LineNode};

#[derive(Debug, Default)]
pub struct LineGraph {
    pub(crate) lines: Vec<LineMeta>,
    pub(crate) nodes: Vec<LineNode>,
    pub(crate) buffers: Vec<SampleBuffer>,
    pub(crate) order: Option<Vec<NodeId>>,
    pub(crate) sources: Vec<LineId>,
    pub(crate) evaluated: usize,
    names: HashMap<String, LineId>,
    required: Vec<usize>,
    config: Option<EngineConfig>,
}

impl LineGraph {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Construction ---

    /// Add a raw line fed by external samples.
    pub fn add_source(&mut self, name: impl Into<String>) -> Result<LineId> {
        self.ensure_mutable()?;
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(LineError::DuplicateName(name));
        }
        let id = self.insert_line(name, None, 0, 0);
        self.sources.push(id);
        debug!("graph_add: source {} ({id})", self.lines[id.index()].name);
        Ok(id)
    }

    /// Add a computation node consuming `inputs`.
    ///
    /// Inputs can only reference lines that already exist and the node's
    /// outputs are created here, so this never closes a cycle; rewiring via
    /// [`connect`](Self::connect) is where cycles are caught.
    pub fn add_node<O>(&mut self, name: impl Into<String>, inputs: &[Input], op: O) -> Result<NodeId>
    where
        O: LineOp + 'static,
    {
        self.add_boxed_node(name, inputs, Box::new(op))
    }

    /// Add a node from an already boxed operator (used by the config factory).
    pub fn add_boxed_node(
        &mut self,
        name: impl Into<String>,
        inputs: &[Input],
        op: Box<dyn LineOp>,
    ) -> Result<NodeId> {
        self.ensure_mutable()?;
        let name = name.into();

        if inputs.len() != op.arity() {
            return Err(LineError::ArityMismatch {
                op: op.kind().to_string(),
                expected: op.arity(),
                actual: inputs.len(),
            });
        }
        let min_period = op.min_period();
        if min_period == 0 {
            return Err(LineError::InvalidPeriod(op.kind().to_string()));
        }
        for input in inputs {
            self.check_input(input)?;
        }

        let line_names: Vec<String> = op
            .outputs()
            .iter()
            .map(|suffix| {
                if suffix.is_empty() {
                    name.clone()
                } else {
                    format!("{name}.{suffix}")
                }
            })
            .collect();
        for (i, line_name) in line_names.iter().enumerate() {
            if self.names.contains_key(line_name) || line_names[..i].contains(line_name) {
                return Err(LineError::DuplicateName(line_name.clone()));
            }
        }

        let id = NodeId(self.nodes.len() as u32);
        let (lookback, warmup) = topo::depth(&self.lines, inputs, min_period);
        let outputs = line_names
            .into_iter()
            .map(|line_name| self.insert_line(line_name, Some(id), lookback, warmup))
            .collect();

        debug!(
            "graph_add: node {name} ({id}) kind={} min_period={min_period} lookback={lookback} warmup={warmup}",
            op.kind()
        );
        self.nodes.push(LineNode {
            name,
            op,
            inputs: inputs.to_vec(),
            outputs,
            min_period,
        });
        self.order = None;
        Ok(id)
    }

    /// Add a single-output node computed by a closure, with no batch kernel.
    pub fn add_fn_node<F>(
        &mut self,
        name: impl Into<String>,
        inputs: &[Input],
        min_period: usize,
        f: F,
    ) -> Result<NodeId>
    where
        F: Fn(&StepInput<'_>) -> f64 + Send + Sync + 'static,
    {
        let op = FnOp::new(inputs.len(), min_period, f);
        self.add_node(name, inputs, op)
    }

    /// Rewire input `slot` of `node`.
    ///
    /// Fails with `CycleDetected` when `input.line` depends on `node`'s own
    /// outputs.
    pub fn connect(&mut self, node: NodeId, slot: usize, input: Input) -> Result<()> {
        self.ensure_mutable()?;
        let current = self.node(node)?;
        if slot >= current.inputs.len() {
            return Err(LineError::UnknownSlot { node, slot });
        }
        self.check_input(&input)?;
        if topo::depends_on(&self.lines, &self.nodes, input.line, node) {
            return Err(LineError::CycleDetected);
        }

        self.nodes[node.index()].inputs[slot] = input;
        self.order = None;
        let order = topo::kahn_sort(&self.lines, &self.nodes)?;
        topo::propagate(&mut self.lines, &self.nodes, &order);
        debug!("graph_connect: {} → {node}[{slot}] offset={}", input.line, input.offset);
        Ok(())
    }

    /// Topological order of the nodes, computed once and cached.
    pub fn topo_order(&mut self) -> Result<&[NodeId]> {
        if self.order.is_none() {
            self.order = Some(topo::kahn_sort(&self.lines, &self.nodes)?);
        }
        Ok(self.order.as_deref().unwrap_or(&[]))
    }

    /// Freeze the structure, size the buffers and cache the evaluation order.
    pub fn finalize(&mut self, config: &EngineConfig) -> Result<()> {
        self.ensure_mutable()?;
        if config.mode == SchedulerMode::Batch && config.retention.is_bounded() {
            return Err(LineError::InvalidConfig(
                "batch mode needs the full history; use unbounded retention".into(),
            ));
        }

        let order = topo::kahn_sort(&self.lines, &self.nodes)?;
        let required = retention::required_history(&self.lines, &self.nodes, &order);
        self.buffers = required
            .iter()
            .map(|&r| SampleBuffer::new(config.retention.storage_for(r)))
            .collect();

        info!(
            lines = self.lines.len(),
            nodes = self.nodes.len(),
            mode = ?config.mode,
            retention = ?config.retention,
            "graph finalized"
        );
        for (meta, need) in self.lines.iter().zip(&required) {
            debug!(
                "retention: {} lookback={} warmup={} required={need}",
                meta.name, meta.lookback, meta.warmup
            );
        }

        self.required = required;
        self.order = Some(order);
        self.config = Some(*config);
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        self.config.is_some()
    }

    /// Configuration passed to `finalize()`.
    pub fn config(&self) -> Option<&EngineConfig> {
        self.config.as_ref()
    }

    // --- Feed interface ---

    /// Append one synchronized timestep to the named sources.
    ///
    /// Every handle is validated before anything is appended; the cursors of
    /// the named sources move together once all values are in. With bounded
    /// retention a source may run at most [`LineGraph::backlog_limit`]
    /// samples ahead of the scheduler (`Backlog` otherwise).
    pub fn push(&mut self, samples: &[(LineId, f64)]) -> Result<()> {
        self.ensure_finalized()?;
        for (i, (line, _)) in samples.iter().enumerate() {
            self.check_source(*line)?;
            if samples[..i].iter().any(|(seen, _)| seen == line) {
                return Err(LineError::DuplicateSample(*line));
            }
            self.check_backlog(*line, 1)?;
        }
        for &(line, value) in samples {
            self.buffers[line.index()].append_deferred(value);
        }
        for (line, _) in samples {
            self.buffers[line.index()].seek_end();
        }
        Ok(())
    }

    /// Forward a source by `count` steps with a filler value.
    ///
    /// Subject to the same backlog limit as [`LineGraph::push`]; nothing is
    /// appended when the limit would be exceeded.
    pub fn extend_source(&mut self, line: LineId, value: f64, count: usize) -> Result<()> {
        self.ensure_finalized()?;
        self.check_source(line)?;
        self.check_backlog(line, count)?;
        self.buffers[line.index()].extend(value, count);
        Ok(())
    }

    // --- Consumer interface ---

    /// Value of `line` at `offset` from its cursor; `None` while not yet valid.
    pub fn value_at(&self, line: LineId, offset: isize) -> Result<Option<f64>> {
        let value = self.buffer(line)?.read(offset)?;
        Ok((!value.is_nan()).then_some(value))
    }

    /// Read-only view of absolute positions `start..end` of `line`.
    pub fn history(&self, line: LineId, start: usize, end: usize) -> Result<&[f64]> {
        self.buffer(line)?.slice(start, end)
    }

    pub fn buffer(&self, line: LineId) -> Result<&SampleBuffer> {
        self.ensure_finalized()?;
        self.buffers
            .get(line.index())
            .ok_or(LineError::UnknownLine(line))
    }

    // --- Queries ---

    pub fn line(&self, name: &str) -> Option<LineId> {
        self.names.get(name).copied()
    }

    pub fn line_name(&self, line: LineId) -> Result<&str> {
        Ok(&self.meta(line)?.name)
    }

    /// All lines in creation order.
    pub fn lines(&self) -> impl Iterator<Item = (LineId, &str)> + '_ {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, m)| (LineId(i as u32), m.name.as_str()))
    }

    pub fn sources(&self) -> &[LineId] {
        &self.sources
    }

    pub fn is_source(&self, line: LineId) -> bool {
        self.meta(line).map(|m| m.producer.is_none()).unwrap_or(false)
    }

    pub fn outputs(&self, node: NodeId) -> Result<&[LineId]> {
        Ok(&self.node(node)?.outputs)
    }

    pub fn node_name(&self, node: NodeId) -> Result<&str> {
        Ok(&self.node(node)?.name)
    }

    pub fn producer(&self, line: LineId) -> Result<Option<NodeId>> {
        Ok(self.meta(line)?.producer)
    }

    /// Cumulative lookback of `line`.
    pub fn lookback(&self, line: LineId) -> Result<usize> {
        Ok(self.meta(line)?.lookback)
    }

    /// First position at which `line` holds a valid value.
    pub fn warmup(&self, line: LineId) -> Result<usize> {
        Ok(self.meta(line)?.warmup)
    }

    /// Samples `line` must retain (history plus the current sample).
    pub fn retention(&self, line: LineId) -> Result<usize> {
        self.ensure_finalized()?;
        self.meta(line)?;
        Ok(self.required[line.index()] + 1)
    }

    /// Unevaluated samples a source can hold before its ring would evict a
    /// position the scheduler still reads: `1 + extra`. `None` for growth
    /// storage, which never evicts.
    pub fn backlog_limit(&self, line: LineId) -> Result<Option<usize>> {
        self.check_source(line)?;
        let capacity = self.buffer(line)?.capacity();
        Ok(capacity.map(|c| c - self.required[line.index()]))
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Positions evaluated so far.
    pub fn evaluated(&self) -> usize {
        self.evaluated
    }

    /// Positions for which every source holds a sample.
    pub fn available(&self) -> usize {
        self.sources
            .iter()
            .filter_map(|s| self.buffers.get(s.index()))
            .map(SampleBuffer::len)
            .min()
            .unwrap_or(0)
    }

    // --- Internal ---

    fn insert_line(
        &mut self,
        name: String,
        producer: Option<NodeId>,
        lookback: usize,
        warmup: usize,
    ) -> LineId {
        let id = LineId(self.lines.len() as u32);
        self.names.insert(name.clone(), id);
        self.lines.push(LineMeta {
            name,
            producer,
            lookback,
            warmup,
        });
        id
    }

    fn meta(&self, line: LineId) -> Result<&LineMeta> {
        self.lines
            .get(line.index())
            .ok_or(LineError::UnknownLine(line))
    }

    fn node(&self, node: NodeId) -> Result<&LineNode> {
        self.nodes
            .get(node.index())
            .ok_or(LineError::UnknownNode(node))
    }

    fn check_input(&self, input: &Input) -> Result<()> {
        self.meta(input.line)?;
        if input.offset > 0 || input.delay() > node::MAX_DELAY {
            return Err(LineError::InvalidOffset(input.offset));
        }
        Ok(())
    }

    fn check_source(&self, line: LineId) -> Result<()> {
        if self.meta(line)?.producer.is_some() {
            return Err(LineError::NotASource(line));
        }
        Ok(())
    }

    fn check_backlog(&self, line: LineId, count: usize) -> Result<()> {
        if let Some(limit) = self.backlog_limit(line)? {
            let held = self.buffers[line.index()].len().saturating_sub(self.evaluated);
            let pending = held.saturating_add(count);
            if pending > limit {
                return Err(LineError::Backlog {
                    line,
                    pending,
                    limit,
                });
            }
        }
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<()> {
        if self.is_frozen() {
            return Err(LineError::GraphFrozen);
        }
        Ok(())
    }

    fn ensure_finalized(&self) -> Result<()> {
        if !self.is_frozen() {
            return Err(LineError::NotFinalized);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{Momentum, Sma};
    use crate::retention::RetentionPolicy;

    fn mean(input: &StepInput<'_>) -> f64 {
        let w = input.window(0);
        w.iter().sum::<f64>() / w.len() as f64
    }

    #[test]
    fn add_source_and_lookup() {
        let mut g = LineGraph::new();
        let close = g.add_source("close").unwrap();
        assert_eq!(g.line("close"), Some(close));
        assert_eq!(g.line_name(close).unwrap(), "close");
        assert!(g.is_source(close));
        assert_eq!(g.lookback(close).unwrap(), 0);
        assert_eq!(g.warmup(close).unwrap(), 0);
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut g = LineGraph::new();
        let close = g.add_source("close").unwrap();
        assert_eq!(
            g.add_source("close"),
            Err(LineError::DuplicateName("close".into()))
        );
        assert!(matches!(
            g.add_node("close", &[close.into()], Sma::new(2)),
            Err(LineError::DuplicateName(_))
        ));
    }

    #[test]
    fn arity_and_offset_validation() {
        let mut g = LineGraph::new();
        let a = g.add_source("a").unwrap();
        let b = g.add_source("b").unwrap();
        assert!(matches!(
            g.add_node("sma", &[a.into(), b.into()], Sma::new(2)),
            Err(LineError::ArityMismatch { .. })
        ));
        assert_eq!(
            g.add_node("sma", &[Input::at(a, 1)], Sma::new(2)).unwrap_err(),
            LineError::InvalidOffset(1)
        );
        assert_eq!(
            g.add_node("sma", &[Input::new(LineId(9))], Sma::new(2))
                .unwrap_err(),
            LineError::UnknownLine(LineId(9))
        );
    }

    #[test]
    fn offsets_beyond_max_delay_rejected() {
        let mut g = LineGraph::new();
        let a = g.add_source("a").unwrap();
        assert_eq!(
            g.add_node("deep", &[Input::at(a, isize::MIN)], Sma::new(2))
                .unwrap_err(),
            LineError::InvalidOffset(isize::MIN)
        );
        let too_deep = -(node::MAX_DELAY as isize) - 1;
        assert_eq!(
            g.add_node("deep", &[Input::at(a, too_deep)], Sma::new(2))
                .unwrap_err(),
            LineError::InvalidOffset(too_deep)
        );
        let n = g
            .add_node("deepest", &[Input::at(a, -(node::MAX_DELAY as isize))], Sma::new(2))
            .unwrap();
        let line = g.outputs(n).unwrap()[0];
        assert_eq!(g.lookback(line).unwrap(), node::MAX_DELAY + 2);
    }

    #[test]
    fn zero_min_period_rejected() {
        let mut g = LineGraph::new();
        let a = g.add_source("a").unwrap();
        assert!(matches!(
            g.add_fn_node("f", &[a.into()], 0, |i| i.current(0)),
            Err(LineError::InvalidPeriod(_))
        ));
    }

    #[test]
    fn cumulative_lookback_and_warmup() {
        let mut g = LineGraph::new();
        let src = g.add_source("src").unwrap();
        let a = g.add_fn_node("a", &[src.into()], 2, mean).unwrap();
        let a_line = g.outputs(a).unwrap()[0];
        let b = g.add_fn_node("b", &[a_line.into()], 3, mean).unwrap();
        let b_line = g.outputs(b).unwrap()[0];

        assert_eq!(g.lookback(a_line).unwrap(), 2);
        assert_eq!(g.lookback(b_line).unwrap(), 5);
        assert_eq!(g.warmup(a_line).unwrap(), 1);
        assert_eq!(g.warmup(b_line).unwrap(), 3);
    }

    #[test]
    fn offset_input_delays_warmup() {
        let mut g = LineGraph::new();
        let src = g.add_source("src").unwrap();
        let n = g
            .add_fn_node("lagged", &[Input::at(src, -2)], 1, |i| i.current(0))
            .unwrap();
        let line = g.outputs(n).unwrap()[0];
        assert_eq!(g.warmup(line).unwrap(), 2);
        assert_eq!(g.lookback(line).unwrap(), 3);
    }

    #[test]
    fn topo_order_is_stable_and_cached() {
        let mut g = LineGraph::new();
        let src = g.add_source("src").unwrap();
        let a = g.add_node("a", &[src.into()], Sma::new(2)).unwrap();
        let a_line = g.outputs(a).unwrap()[0];
        let b = g.add_node("b", &[a_line.into()], Sma::new(2)).unwrap();
        let c = g.add_node("c", &[src.into()], Momentum::new(1)).unwrap();
        let first = g.topo_order().unwrap().to_vec();
        assert_eq!(first, vec![a, c, b]);
        assert_eq!(g.topo_order().unwrap(), first.as_slice());
    }

    #[test]
    fn connect_rejects_cycles() {
        let mut g = LineGraph::new();
        let src = g.add_source("src").unwrap();
        let a = g.add_node("a", &[src.into()], Sma::new(2)).unwrap();
        let a_line = g.outputs(a).unwrap()[0];
        let b = g.add_node("b", &[a_line.into()], Sma::new(2)).unwrap();
        let b_line = g.outputs(b).unwrap()[0];

        assert_eq!(g.connect(a, 0, b_line.into()), Err(LineError::CycleDetected));
        assert_eq!(g.connect(a, 0, a_line.into()), Err(LineError::CycleDetected));
        assert_eq!(
            g.connect(a, 1, src.into()),
            Err(LineError::UnknownSlot { node: a, slot: 1 })
        );
        // Graph untouched after the failed attempts.
        assert_eq!(g.topo_order().unwrap(), &[a, b]);
    }

    #[test]
    fn connect_recomputes_depth_without_shrinking_lookback() {
        let mut g = LineGraph::new();
        let src = g.add_source("src").unwrap();
        let a = g.add_node("a", &[src.into()], Sma::new(4)).unwrap();
        let a_line = g.outputs(a).unwrap()[0];
        let b = g.add_node("b", &[a_line.into()], Sma::new(2)).unwrap();
        let b_line = g.outputs(b).unwrap()[0];
        assert_eq!(g.lookback(b_line).unwrap(), 6);
        assert_eq!(g.warmup(b_line).unwrap(), 4);

        g.connect(b, 0, src.into()).unwrap();
        assert_eq!(g.warmup(b_line).unwrap(), 1);
        assert_eq!(g.lookback(b_line).unwrap(), 6);
    }

    #[test]
    fn finalize_freezes_graph() {
        let mut g = LineGraph::new();
        let src = g.add_source("src").unwrap();
        g.finalize(&EngineConfig::default()).unwrap();
        assert!(g.is_frozen());
        assert_eq!(g.add_source("x"), Err(LineError::GraphFrozen));
        assert!(matches!(
            g.add_node("n", &[src.into()], Sma::new(2)),
            Err(LineError::GraphFrozen)
        ));
        assert_eq!(
            g.finalize(&EngineConfig::default()),
            Err(LineError::GraphFrozen)
        );
    }

    #[test]
    fn batch_mode_rejects_bounded_retention() {
        let mut g = LineGraph::new();
        g.add_source("src").unwrap();
        let config = EngineConfig {
            mode: SchedulerMode::Batch,
            retention: RetentionPolicy::bounded(),
        };
        assert!(matches!(
            g.finalize(&config),
            Err(LineError::InvalidConfig(_))
        ));
        assert!(!g.is_frozen());
    }

    #[test]
    fn push_requires_finalize() {
        let mut g = LineGraph::new();
        let src = g.add_source("src").unwrap();
        assert_eq!(g.push(&[(src, 1.0)]), Err(LineError::NotFinalized));
    }

    #[test]
    fn push_validates_before_appending() {
        let mut g = LineGraph::new();
        let a = g.add_source("a").unwrap();
        let b = g.add_source("b").unwrap();
        let n = g.add_node("n", &[a.into()], Sma::new(1)).unwrap();
        let n_line = g.outputs(n).unwrap()[0];
        g.finalize(&EngineConfig::default()).unwrap();

        assert_eq!(
            g.push(&[(a, 1.0), (a, 2.0)]),
            Err(LineError::DuplicateSample(a))
        );
        assert_eq!(
            g.push(&[(b, 1.0), (n_line, 2.0)]),
            Err(LineError::NotASource(n_line))
        );
        assert!(g.buffer(a).unwrap().is_empty());
        assert!(g.buffer(b).unwrap().is_empty());

        g.push(&[(a, 1.0), (b, 2.0)]).unwrap();
        assert_eq!(g.value_at(a, 0).unwrap(), Some(1.0));
        assert_eq!(g.value_at(b, 0).unwrap(), Some(2.0));
        assert_eq!(g.available(), 1);
    }

    #[test]
    fn extend_source_forwards_with_filler() {
        let mut g = LineGraph::new();
        let a = g.add_source("a").unwrap();
        g.finalize(&EngineConfig::default()).unwrap();
        g.push(&[(a, 1.0)]).unwrap();
        g.extend_source(a, 1.0, 3).unwrap();
        assert_eq!(g.history(a, 0, 4).unwrap(), &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(g.available(), 4);
    }

    #[test]
    fn multi_output_lines_are_suffixed() {
        let mut g = LineGraph::new();
        let src = g.add_source("src").unwrap();
        let ch = g
            .add_node("ch", &[src.into()], crate::ops::Channel::new(3))
            .unwrap();
        let outs = g.outputs(ch).unwrap();
        assert_eq!(outs.len(), 2);
        assert_eq!(g.line_name(outs[0]).unwrap(), "ch.upper");
        assert_eq!(g.line_name(outs[1]).unwrap(), "ch.lower");
        assert_eq!(g.producer(outs[1]).unwrap(), Some(ch));
    }

    #[test]
    fn retention_chain_scenario() {
        // A: 2-sample delta, B: 3-sample average of A.
        let mut g = LineGraph::new();
        let src = g.add_source("src").unwrap();
        let a = g
            .add_fn_node("a", &[src.into()], 2, |i| i.current(0) - i.window(0)[0])
            .unwrap();
        let a_line = g.outputs(a).unwrap()[0];
        let b = g.add_fn_node("b", &[a_line.into()], 3, mean).unwrap();
        let b_line = g.outputs(b).unwrap()[0];
        g.finalize(&EngineConfig {
            mode: SchedulerMode::Incremental,
            retention: RetentionPolicy::bounded(),
        })
        .unwrap();

        assert!(g.retention(b_line).unwrap() >= 5);
        assert_eq!(g.retention(b_line).unwrap(), 6);
        assert_eq!(g.retention(a_line).unwrap(), 6);
        assert_eq!(g.retention(src).unwrap(), 6);
        assert_eq!(g.buffer(b_line).unwrap().capacity(), Some(6));
    }

    #[test]
    fn bounded_source_backlog_is_capped() {
        let mut g = LineGraph::new();
        let src = g.add_source("src").unwrap();
        g.add_node("sma", &[src.into()], Sma::new(3)).unwrap();
        g.finalize(&EngineConfig {
            mode: SchedulerMode::Incremental,
            retention: RetentionPolicy::bounded(),
        })
        .unwrap();
        assert_eq!(g.backlog_limit(src).unwrap(), Some(1));

        g.push(&[(src, 1.0)]).unwrap();
        assert_eq!(
            g.push(&[(src, 2.0)]),
            Err(LineError::Backlog {
                line: src,
                pending: 2,
                limit: 1
            })
        );
        assert_eq!(
            g.extend_source(src, 2.0, 4),
            Err(LineError::Backlog {
                line: src,
                pending: 5,
                limit: 1
            })
        );
        // Rejected appends leave the source untouched.
        assert_eq!(g.buffer(src).unwrap().len(), 1);
        assert_eq!(g.value_at(src, 0).unwrap(), Some(1.0));
    }

    #[test]
    fn growth_sources_have_no_backlog_limit() {
        let mut g = LineGraph::new();
        let src = g.add_source("src").unwrap();
        let n = g.add_node("sma", &[src.into()], Sma::new(3)).unwrap();
        let line = g.outputs(n).unwrap()[0];
        g.finalize(&EngineConfig::default()).unwrap();
        assert_eq!(g.backlog_limit(src).unwrap(), None);
        assert_eq!(g.backlog_limit(line), Err(LineError::NotASource(line)));
        g.extend_source(src, 1.0, 100).unwrap();
        assert_eq!(g.buffer(src).unwrap().len(), 100);
    }
}
