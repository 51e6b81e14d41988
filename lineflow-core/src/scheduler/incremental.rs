//! Incremental evaluation: one position per call.

use tracing::{trace, warn};

use super::{relabel, Phase, Scheduler, StepReport};
use crate::error::{LineError, Result};
use crate::graph::{LineGraph, StepInput};

impl Scheduler {
    /// Evaluate position `graph.evaluated()`.
    ///
    /// Every source must already hold that position. Nodes inside their
    /// warm-up append NaN without running their operator. A read failure while
    /// gathering windows means an operator understated its `min_period` and
    /// aborts the step with `OutOfRange`.
    pub fn step(&mut self, graph: &mut LineGraph) -> Result<StepReport> {
        self.phase = Phase::AwaitingSample;
        if !graph.is_frozen() {
            return Err(LineError::NotFinalized);
        }
        let t = graph.evaluated;
        for &source in &graph.sources {
            if graph.buffers[source.index()].len() <= t {
                return Err(LineError::MissingSample {
                    line: source,
                    position: t,
                });
            }
        }

        self.phase = Phase::Evaluating;
        let mut report = StepReport {
            position: t,
            ..StepReport::default()
        };
        let order = graph.order.as_deref().ok_or(LineError::NotFinalized)?;

        for id in order {
            let node = &graph.nodes[id.index()];
            let warmup = graph.lines[node.outputs[0].index()].warmup;
            if t < warmup {
                for out in &node.outputs {
                    graph.buffers[out.index()].append(f64::NAN);
                }
                report.warming_nodes += 1;
                continue;
            }

            let period = node.min_period;
            self.windows.clear();
            for input in &node.inputs {
                // t >= warmup guarantees end >= period.
                let end = t + 1 - input.delay();
                let window = graph.buffers[input.line.index()].slice(end - period, end)?;
                self.windows.extend_from_slice(window);
            }

            self.prev.clear();
            for out in &node.outputs {
                let prev = match t {
                    0 => f64::NAN,
                    _ => graph.buffers[out.index()].get(t - 1)?,
                };
                self.prev.push(prev);
            }

            self.out.clear();
            self.out.resize(node.outputs.len(), f64::NAN);
            let input = StepInput::new(t, period, &self.windows, &self.prev);
            match node.op.compute_step(&input, &mut self.out) {
                Ok(()) => report.evaluated_nodes += 1,
                Err(err) => {
                    let err = relabel(err, &node.name);
                    warn!(position = t, node = %node.name, error = %err, "operator failed, writing NaN");
                    self.out.fill(f64::NAN);
                    report.errors.push(err);
                }
            }
            for (out, &value) in node.outputs.iter().zip(&self.out) {
                graph.buffers[out.index()].append(value);
            }
        }

        for &source in &graph.sources {
            graph.buffers[source.index()].seek(t)?;
        }
        graph.evaluated = t + 1;
        self.phase = Phase::Settled;
        trace!(
            position = t,
            evaluated = report.evaluated_nodes,
            warming = report.warming_nodes,
            "step"
        );
        Ok(report)
    }
}
