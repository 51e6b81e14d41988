//! LineFlow Core: the time-series engine under a backtester.
//!
//! - Sample buffers with growth or bounded ring storage behind one addressing
//!   scheme (cursor + relative offset)
//! - Line graph of sources and computation nodes, acyclic, with cumulative
//!   lookback and warm-up per line
//! - Scheduler evaluating the graph incrementally (one sample at a time) or in
//!   batch (a whole range at once) with bit-identical results
//! - Retention policy sizing every ring buffer from the graph
//! - Operator library and a TOML graph specification

pub mod buffer;
pub mod config;
pub mod cursor;
pub mod error;
pub mod graph;
pub mod ops;
pub mod retention;
pub mod scheduler;

pub use buffer::{SampleBuffer, Storage};
pub use config::{EngineConfig, GraphSpec};
pub use error::{LineError, Result};
pub use graph::{Input, LineGraph, LineId, LineOp, NodeId};
pub use retention::RetentionPolicy;
pub use scheduler::{Scheduler, SchedulerMode};
