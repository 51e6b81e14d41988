//! LineFlow CLI: evaluate TOML-declared line graphs over CSV samples.
//!
//! Commands:
//! - `run` evaluates a graph and prints the newest value of every line
//! - `verify` checks that incremental and batch evaluation agree bit for bit
//! - `inspect` prints per-line warm-up, lookback and retention as JSON
//! - `synth` writes a deterministic random-walk CSV

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use lineflow_core::{GraphSpec, SchedulerMode};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lineflow", about = "LineFlow CLI: incremental and batch line graphs")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Incremental,
    Batch,
}

impl From<ModeArg> for SchedulerMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Incremental => SchedulerMode::Incremental,
            ModeArg::Batch => SchedulerMode::Batch,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a graph over a CSV file of samples.
    Run {
        /// Path to the TOML graph file.
        #[arg(long)]
        config: PathBuf,

        /// CSV file with one column per declared source.
        #[arg(long)]
        data: PathBuf,

        /// Override the scheduler mode from the graph file.
        #[arg(long, value_enum)]
        mode: Option<ModeArg>,

        /// Write every line to this CSV file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Evaluate in both modes and fail if any value differs.
    Verify {
        /// Path to the TOML graph file.
        #[arg(long)]
        config: PathBuf,

        /// CSV file with one column per declared source.
        #[arg(long)]
        data: PathBuf,
    },
    /// Print line metadata and the graph fingerprint as JSON.
    Inspect {
        /// Path to the TOML graph file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Generate a deterministic random-walk CSV.
    Synth {
        /// Number of rows.
        #[arg(long, default_value_t = 500)]
        rows: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Output CSV path.
        #[arg(long)]
        output: PathBuf,

        /// Column names.
        #[arg(long, value_delimiter = ',', default_value = "close")]
        columns: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            data,
            mode,
            output,
        } => commands::run(&config, &data, mode.map(Into::into), output.as_deref()),
        Commands::Verify { config, data } => commands::verify(&config, &data),
        Commands::Inspect { config } => run_inspect(&config),
        Commands::Synth {
            rows,
            seed,
            output,
            columns,
        } => commands::synth(rows, seed, &output, &columns),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_inspect(config: &std::path::Path) -> Result<()> {
    let spec = GraphSpec::from_file(config)?;
    let graph = spec.build()?;
    let mut lines = Vec::with_capacity(graph.line_count());
    for (line, name) in graph.lines() {
        lines.push(serde_json::json!({
            "name": name,
            "source": graph.is_source(line),
            "warmup": graph.warmup(line)?,
            "lookback": graph.lookback(line)?,
            "retention": graph.retention(line)?,
            "capacity": graph.buffer(line)?.capacity(),
        }));
    }
    let report = serde_json::json!({
        "fingerprint": spec.fingerprint()?,
        "engine": graph.config(),
        "lines": lines,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
