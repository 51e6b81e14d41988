//! Batch evaluation over a closed range of positions.

use std::borrow::Cow;
use std::ops::Range;

use tracing::debug;

use super::{relabel, BatchReport, Phase, Scheduler};
use crate::error::{LineError, Result};
use crate::graph::{BatchInput, LineGraph, LineId, StepInput};

impl Scheduler {
    /// Evaluate positions `range.start..range.end` node by node.
    ///
    /// Sources must hold every position below `range.end`, and the range may
    /// not skip unevaluated positions (`start <= graph.evaluated()`). Ranges
    /// overlapping already evaluated positions are recomputed in place.
    ///
    /// Every node is computed into scratch first; committed output is only
    /// touched once the whole range succeeded.
    pub fn run_batch(&mut self, graph: &mut LineGraph, range: Range<usize>) -> Result<BatchReport> {
        let Range { start, end } = range;
        let config = graph.config().copied().ok_or(LineError::NotFinalized)?;
        if config.retention.is_bounded() {
            return Err(LineError::InvalidConfig(
                "batch evaluation needs unbounded retention".into(),
            ));
        }
        if start > end {
            return Err(LineError::InvalidRange {
                start,
                end,
                reason: "start is past end".into(),
            });
        }
        if start > graph.evaluated {
            return Err(LineError::InvalidRange {
                start,
                end,
                reason: format!("positions {}..{start} were never evaluated", graph.evaluated),
            });
        }
        for &source in &graph.sources {
            let len = graph.buffers[source.index()].len();
            if len < end {
                return Err(LineError::MissingSample {
                    line: source,
                    position: len,
                });
            }
        }

        let mut report = BatchReport {
            start,
            end,
            ..BatchReport::default()
        };
        if start == end {
            return Ok(report);
        }

        self.phase = Phase::Evaluating;
        let scratch = match compute_range(graph, start, end, &mut report) {
            Ok(scratch) => scratch,
            Err(err) => {
                self.phase = Phase::Settled;
                return Err(err);
            }
        };

        // Commit.
        for (line, values) in scratch.into_iter().enumerate() {
            let Some(values) = values else { continue };
            let buffer = &mut graph.buffers[line];
            let overlap = buffer.len().min(end);
            for (position, &value) in (start..overlap).zip(&values) {
                buffer.set(position, value)?;
            }
            buffer.extend_from_slice(&values[overlap - start..]);
        }

        graph.evaluated = graph.evaluated.max(end);
        let cursor = graph.evaluated - 1;
        for buffer in &mut graph.buffers {
            buffer.seek(cursor)?;
        }
        self.phase = Phase::Settled;
        debug!(
            start,
            end,
            kernel = report.kernel_nodes,
            fallback = report.fallback_nodes,
            "batch committed"
        );
        Ok(report)
    }
}

/// Output of every derived line over `start..end`, indexed by line.
fn compute_range(
    graph: &LineGraph,
    start: usize,
    end: usize,
    report: &mut BatchReport,
) -> Result<Vec<Option<Vec<f64>>>> {
    let order = graph.order.as_deref().ok_or(LineError::NotFinalized)?;
    let mut scratch: Vec<Option<Vec<f64>>> = vec![None; graph.lines.len()];
    let len = end - start;

    for id in order {
        let node = &graph.nodes[id.index()];
        let arity = node.outputs.len();
        let mut outputs = vec![vec![f64::NAN; len]; arity];

        let warmup = graph.lines[node.outputs[0].index()].warmup;
        let first = warmup.max(start);
        if first < end {
            let count = end - first;
            let period = node.min_period;

            let series = node
                .inputs
                .iter()
                .map(|input| {
                    let hi = end - input.delay();
                    let lo = hi - count - (period - 1);
                    line_range(graph, &scratch, input.line, lo, hi, start)
                })
                .collect::<Result<Vec<_>>>()?;
            let series: Vec<&[f64]> = series.iter().map(|s| &**s).collect();

            // Position first - 1 is either committed or still inside the warm-up.
            let prev = node
                .outputs
                .iter()
                .map(|out| match first {
                    0 => Ok(f64::NAN),
                    p if p > start => Ok(f64::NAN),
                    p => graph.buffers[out.index()].get(p - 1),
                })
                .collect::<Result<Vec<_>>>()?;

            let input = BatchInput::new(first, count, period, &series, &prev);
            let mut computed = vec![vec![f64::NAN; count]; arity];
            match node.op.compute_batch(&input, &mut computed) {
                Some(result) => {
                    result.map_err(|err| relabel(err, &node.name))?;
                    report.kernel_nodes += 1;
                }
                None => {
                    step_loop(node.op.as_ref(), &input, &mut computed)
                        .map_err(|err| relabel(err, &node.name))?;
                    report.fallback_nodes += 1;
                }
            }
            for (dst, src) in outputs.iter_mut().zip(computed) {
                dst[first - start..].copy_from_slice(&src);
            }
        }

        for (line, values) in node.outputs.iter().zip(outputs) {
            scratch[line.index()] = Some(values);
        }
    }
    Ok(scratch)
}

/// Values of `line` at positions `lo..hi`: committed samples below `start`,
/// scratch from `start` on. Sources are always read from their buffer.
fn line_range<'a>(
    graph: &'a LineGraph,
    scratch: &'a [Option<Vec<f64>>],
    line: LineId,
    lo: usize,
    hi: usize,
    start: usize,
) -> Result<Cow<'a, [f64]>> {
    let buffer = &graph.buffers[line.index()];
    let Some(fresh) = scratch[line.index()].as_deref() else {
        return buffer.slice(lo, hi).map(Cow::Borrowed);
    };
    if lo >= start {
        Ok(Cow::Borrowed(&fresh[lo - start..hi - start]))
    } else if hi <= start {
        buffer.slice(lo, hi).map(Cow::Borrowed)
    } else {
        let mut joined = buffer.slice(lo, start)?.to_vec();
        joined.extend_from_slice(&fresh[..hi - start]);
        Ok(Cow::Owned(joined))
    }
}

/// Loop `compute_step` over a batch, carrying previous outputs.
fn step_loop(
    op: &dyn crate::graph::LineOp,
    input: &BatchInput<'_>,
    computed: &mut [Vec<f64>],
) -> Result<()> {
    let mut prev: Vec<f64> = (0..computed.len()).map(|k| input.prev(k)).collect();
    let mut out = vec![f64::NAN; computed.len()];
    let mut windows = Vec::with_capacity(input.arity() * input.period());

    for j in 0..input.len() {
        windows.clear();
        for i in 0..input.arity() {
            windows.extend_from_slice(input.window(i, j));
        }
        out.fill(f64::NAN);
        let step = StepInput::new(input.start() + j, input.period(), &windows, &prev);
        op.compute_step(&step, &mut out)?;
        for (series, &value) in computed.iter_mut().zip(&out) {
            series[j] = value;
        }
        prev.copy_from_slice(&out);
    }
    Ok(())
}
