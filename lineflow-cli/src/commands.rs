//! Command implementations, kept apart from argument parsing so they can be
//! tested without a process boundary.

use std::path::Path;

use anyhow::{bail, Context, Result};
use lineflow_core::{EngineConfig, GraphSpec, LineGraph, Scheduler, SchedulerMode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{info, warn};

/// Sample table loaded from CSV: one column per source, one row per position.
#[derive(Debug, Clone, PartialEq)]
pub struct Samples {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

/// Load the columns named in `sources` from a headered CSV file.
///
/// Extra columns are ignored. Empty cells become NaN.
pub fn load_samples(path: &Path, sources: &[String]) -> Result<Samples> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("open data file {}", path.display()))?;
    let headers = reader.headers()?.clone();

    let mut indices = Vec::with_capacity(sources.len());
    for source in sources {
        match headers.iter().position(|h| h.trim() == source) {
            Some(i) => indices.push(i),
            None => bail!(
                "data file {} has no column '{source}' (columns: {})",
                path.display(),
                headers.iter().collect::<Vec<_>>().join(", ")
            ),
        }
    }

    let mut rows = Vec::new();
    for (n, record) in reader.records().enumerate() {
        let record = record?;
        let row = indices
            .iter()
            .zip(sources)
            .map(|(&i, source)| {
                let cell = record.get(i).unwrap_or("").trim();
                if cell.is_empty() {
                    return Ok(f64::NAN);
                }
                cell.parse::<f64>()
                    .with_context(|| format!("row {}: column '{source}': '{cell}'", n + 1))
            })
            .collect::<Result<Vec<_>>>()?;
        rows.push(row);
    }

    Ok(Samples {
        columns: sources.to_vec(),
        rows,
    })
}

/// Build the graph, feed every row and evaluate in `config.mode`.
///
/// Returns the graph and the number of operator failures (incremental mode
/// only; batch mode fails on the first one).
pub fn evaluate(
    spec: &GraphSpec,
    config: &EngineConfig,
    samples: &Samples,
) -> Result<(LineGraph, usize)> {
    let mut graph = spec.build_with(config)?;
    let sources = samples
        .columns
        .iter()
        .map(|name| {
            graph
                .line(name)
                .with_context(|| format!("graph has no source '{name}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    let mut scheduler = Scheduler::new(config.mode);
    let mut failures = 0;

    let mut row_samples = Vec::with_capacity(sources.len());
    for row in &samples.rows {
        row_samples.clear();
        row_samples.extend(sources.iter().copied().zip(row.iter().copied()));
        graph.push(&row_samples)?;
        if config.mode == SchedulerMode::Incremental {
            let report = scheduler.step(&mut graph)?;
            failures += report.errors.len();
        }
    }
    if config.mode == SchedulerMode::Batch {
        scheduler.run(&mut graph)?;
    }
    Ok((graph, failures))
}

/// Write every line as one CSV column, NaN as an empty cell.
///
/// Ring buffers only hold their newest samples, so under bounded retention
/// the rows cover the window every line still retains.
pub fn write_lines(graph: &LineGraph, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create output file {}", path.display()))?;
    let lines: Vec<_> = graph.lines().collect();

    let mut header = vec!["position".to_string()];
    header.extend(lines.iter().map(|(_, name)| name.to_string()));
    writer.write_record(&header)?;

    let end = graph.evaluated();
    let mut start = 0;
    for &(line, _) in &lines {
        start = start.max(graph.buffer(line)?.oldest());
    }
    let start = start.min(end);
    if start > 0 {
        info!(start, end, "bounded retention: writing the retained window only");
    }

    let histories = lines
        .iter()
        .map(|&(line, _)| graph.history(line, start, end))
        .collect::<Result<Vec<_>, _>>()?;
    for t in start..end {
        let mut record = vec![t.to_string()];
        record.extend(histories.iter().map(|h| {
            let v = h[t - start];
            if v.is_nan() {
                String::new()
            } else {
                v.to_string()
            }
        }));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Print the newest value of every line.
pub fn print_summary(spec: &GraphSpec, graph: &LineGraph, mode: SchedulerMode) -> Result<()> {
    println!("Graph {} ({mode})", &spec.fingerprint()?[..16]);
    println!(
        "  {} lines, {} nodes, {} positions evaluated",
        graph.line_count(),
        graph.node_count(),
        graph.evaluated()
    );
    if graph.evaluated() == 0 {
        return Ok(());
    }
    for (line, name) in graph.lines() {
        let value = match graph.value_at(line, 0)? {
            Some(v) => format!("{v:.6}"),
            None => "-".to_string(),
        };
        println!("  {name:<24} {value:>16}  (warm-up {})", graph.warmup(line)?);
    }
    Ok(())
}

pub fn run(
    config_path: &Path,
    data_path: &Path,
    mode: Option<SchedulerMode>,
    output: Option<&Path>,
) -> Result<()> {
    let spec = GraphSpec::from_file(config_path)?;
    let mut config = spec.engine.config();
    if let Some(mode) = mode {
        config.mode = mode;
    }
    let sources: Vec<String> = spec.sources.iter().map(|s| s.name.clone()).collect();
    let samples = load_samples(data_path, &sources)?;
    info!(rows = samples.rows.len(), mode = %config.mode, "evaluating");

    let (graph, failures) = evaluate(&spec, &config, &samples)?;
    if failures > 0 {
        warn!(failures, "operator failures were replaced with NaN");
    }
    print_summary(&spec, &graph, config.mode)?;

    if let Some(path) = output {
        write_lines(&graph, path)?;
        println!("Lines written to: {}", path.display());
    }
    Ok(())
}

/// Positions where incremental and batch evaluation disagree.
pub fn compare_modes(spec: &GraphSpec, samples: &Samples) -> Result<Vec<(String, usize)>> {
    // Batch needs every sample in memory, so both runs keep full history.
    let incremental = EngineConfig {
        mode: SchedulerMode::Incremental,
        retention: Default::default(),
    };
    let batch = EngineConfig {
        mode: SchedulerMode::Batch,
        retention: Default::default(),
    };

    let (a, _) = evaluate(spec, &incremental, samples)?;
    let (b, _) = evaluate(spec, &batch, samples)?;
    let count = a.evaluated();

    let mut mismatches = Vec::new();
    for (line, name) in a.lines() {
        let left = a.history(line, 0, count)?;
        let right = b.history(line, 0, count)?;
        for (t, (x, y)) in left.iter().zip(right).enumerate() {
            let same = x.to_bits() == y.to_bits() || (x.is_nan() && y.is_nan());
            if !same {
                mismatches.push((name.to_string(), t));
            }
        }
    }
    Ok(mismatches)
}

pub fn verify(config_path: &Path, data_path: &Path) -> Result<()> {
    let spec = GraphSpec::from_file(config_path)?;
    let sources: Vec<String> = spec.sources.iter().map(|s| s.name.clone()).collect();
    let samples = load_samples(data_path, &sources)?;

    let mismatches = compare_modes(&spec, &samples)?;
    if !mismatches.is_empty() {
        for (name, t) in mismatches.iter().take(20) {
            eprintln!("  mismatch: {name} at position {t}");
        }
        bail!(
            "incremental and batch evaluation differ at {} position(s)",
            mismatches.len()
        );
    }
    println!(
        "OK: incremental and batch agree on {} positions",
        samples.rows.len()
    );
    Ok(())
}

/// Deterministic random walk, one column per name, starting at 100.
pub fn synth_samples(rows: usize, seed: u64, columns: &[String]) -> Samples {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut levels = vec![100.0_f64; columns.len()];
    let mut out = Vec::with_capacity(rows);
    for _ in 0..rows {
        for level in levels.iter_mut() {
            let step: f64 = rng.gen_range(-1.0..1.0);
            *level = (*level * (1.0 + 0.01 * step)).max(0.01);
        }
        out.push(levels.clone());
    }
    Samples {
        columns: columns.to_vec(),
        rows: out,
    }
}

pub fn write_samples(samples: &Samples, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("create output file {}", path.display()))?;
    writer.write_record(&samples.columns)?;
    for row in &samples.rows {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn synth(rows: usize, seed: u64, output: &Path, columns: &[String]) -> Result<()> {
    if columns.is_empty() {
        bail!("at least one column is required");
    }
    let samples = synth_samples(rows, seed, columns);
    write_samples(&samples, output)?;
    println!("Wrote {rows} rows to: {}", output.display());
    Ok(())
}
