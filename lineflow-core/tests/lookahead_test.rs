//! Look-ahead contamination tests.
//!
//! Invariant: no line value at position t may depend on a source sample at
//! position t+1 or later.
//!
//! Method: evaluate a graph on a truncated series (positions 0..100) and on
//! the full series (0..200). Positions 0..100 must be bit-identical between
//! both runs, in both scheduler modes. Any difference means a line is leaking
//! future data into past values.

use std::collections::BTreeMap;

use lineflow_core::ops::create_op;
use lineflow_core::{EngineConfig, Input, LineGraph, LineId, Scheduler, SchedulerMode};

/// Deterministic pseudo-random walk using a simple LCG.
fn make_series(n: usize, salt: u64) -> Vec<f64> {
    let mut price = 100.0_f64;
    (0..n)
        .map(|i| {
            let seed = (i as u64 ^ salt)
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let change = ((seed >> 33) % 200) as f64 * 0.05 - 5.0;
            price = (price + change).max(10.0);
            price
        })
        .collect()
}

/// One node of every operator kind, chained so derived lines feed others.
fn build(mode: SchedulerMode) -> (LineGraph, [LineId; 2]) {
    let mut g = LineGraph::new();
    let close = g.add_source("close").unwrap();
    let volume = g.add_source("volume").unwrap();

    let add = |g: &mut LineGraph, name: &str, kind: &str, period: f64, inputs: &[Input]| {
        let params = BTreeMap::from([("period".to_string(), period)]);
        let op = create_op(kind, &params).unwrap();
        let node = g.add_boxed_node(name, inputs, op).unwrap();
        g.outputs(node).unwrap()[0]
    };

    let sma = add(&mut g, "sma", "sma", 10.0, &[close.into()]);
    let ema = add(&mut g, "ema", "ema", 5.0, &[sma.into()]);
    add(&mut g, "mom", "momentum", 3.0, &[ema.into()]);
    add(&mut g, "roc", "roc", 4.0, &[close.into()]);
    add(&mut g, "chan", "channel", 20.0, &[Input::at(close, -1)]);
    let sd = add(&mut g, "sd", "stddev", 8.0, &[close.into()]);
    add(&mut g, "bb", "bollinger", 12.0, &[volume.into()]);
    let spread = add(&mut g, "spread", "sub", 1.0, &[close.into(), sma.into()]);
    add(&mut g, "z", "safe_div", 1.0, &[spread.into(), sd.into()]);
    add(&mut g, "turnover", "mul", 1.0, &[close.into(), Input::at(volume, -2)]);
    g.add_fn_node("range_pos", &[close.into()], 6, |i| {
        let w = i.window(0);
        let hi = w.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let lo = w.iter().copied().fold(f64::INFINITY, f64::min);
        if hi > lo {
            (i.current(0) - lo) / (hi - lo)
        } else {
            f64::NAN
        }
    })
    .unwrap();

    g.finalize(&EngineConfig {
        mode,
        ..EngineConfig::default()
    })
    .unwrap();
    (g, [close, volume])
}

fn evaluate(mode: SchedulerMode, close: &[f64], volume: &[f64]) -> LineGraph {
    let (mut g, [c, v]) = build(mode);
    let mut scheduler = Scheduler::for_graph(&g).unwrap();
    for (&x, &y) in close.iter().zip(volume) {
        g.push(&[(c, x), (v, y)]).unwrap();
        if mode == SchedulerMode::Incremental {
            scheduler.step(&mut g).unwrap();
        }
    }
    scheduler.run(&mut g).unwrap();
    g
}

fn assert_no_lookahead(mode: SchedulerMode, truncated_len: usize) {
    let close = make_series(200, 0);
    let volume: Vec<f64> = make_series(200, 0x5eed).iter().map(|v| v * 1000.0).collect();

    let full = evaluate(mode, &close, &volume);
    let truncated = evaluate(mode, &close[..truncated_len], &volume[..truncated_len]);
    assert_eq!(truncated.evaluated(), truncated_len);

    for (line, name) in full.lines() {
        let a = full.history(line, 0, truncated_len).unwrap();
        let b = truncated.history(line, 0, truncated_len).unwrap();
        for t in 0..truncated_len {
            assert!(
                a[t].to_bits() == b[t].to_bits() || (a[t].is_nan() && b[t].is_nan()),
                "{mode}: {name} at {t} differs: full={} truncated={}",
                a[t],
                b[t]
            );
        }
    }
}

#[test]
fn no_lookahead_incremental() {
    assert_no_lookahead(SchedulerMode::Incremental, 100);
}

#[test]
fn no_lookahead_batch() {
    assert_no_lookahead(SchedulerMode::Batch, 100);
}

#[test]
fn no_lookahead_short_prefix() {
    // Shorter than most warm-ups.
    assert_no_lookahead(SchedulerMode::Batch, 7);
    assert_no_lookahead(SchedulerMode::Incremental, 7);
}

#[test]
fn modes_agree_on_full_series() {
    let close = make_series(200, 0);
    let volume = make_series(200, 7);
    let inc = evaluate(SchedulerMode::Incremental, &close, &volume);
    let bat = evaluate(SchedulerMode::Batch, &close, &volume);
    for (line, name) in inc.lines() {
        let a = inc.history(line, 0, 200).unwrap();
        let b = bat.history(line, 0, 200).unwrap();
        for t in 0..200 {
            assert!(
                a[t].to_bits() == b[t].to_bits() || (a[t].is_nan() && b[t].is_nan()),
                "{name} at {t}: {} vs {}",
                a[t],
                b[t]
            );
        }
    }
}
