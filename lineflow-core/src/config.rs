//! Engine configuration and TOML graph specifications.
//!
//! A graph file declares sources and nodes; nodes may only consume lines
//! declared above them.
//!
//! ```toml
//! [engine]
//! mode = "batch"          # or "incremental"
//! retention = "unbounded" # or "bounded"
//! extra = 0
//!
//! [[source]]
//! name = "close"
//!
//! [[node]]
//! name = "fast"
//! kind = "ema"
//! inputs = ["close"]
//! params = { period = 10 }
//!
//! [[node]]
//! name = "change"
//! kind = "sub"
//! inputs = ["close", "close@-1"]
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LineError;
use crate::graph::{Input, LineGraph};
use crate::ops::{create_op, FactoryError};
use crate::retention::RetentionPolicy;
use crate::scheduler::SchedulerMode;

/// Settings fixed at `finalize()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub mode: SchedulerMode,
    pub retention: RetentionPolicy,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse graph TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("write graph TOML: {0}")]
    Write(#[from] toml::ser::Error),
    #[error("serialize graph: {0}")]
    Json(#[from] serde_json::Error),
    #[error("node '{node}': {source}")]
    Factory {
        node: String,
        #[source]
        source: FactoryError,
    },
    #[error("node '{node}': input '{input}' {reason}")]
    BadInput {
        node: String,
        input: String,
        reason: String,
    },
    #[error(transparent)]
    Graph(#[from] LineError),
}

/// Retention as written in a graph file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionKind {
    #[default]
    Unbounded,
    Bounded,
}

/// `[engine]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    pub mode: SchedulerMode,
    pub retention: RetentionKind,
    /// Extra ring slots (bounded only): room for strategy-side look-backs and
    /// for samples pushed ahead of the scheduler.
    pub extra: usize,
}

impl EngineSection {
    pub fn config(&self) -> EngineConfig {
        let retention = match self.retention {
            RetentionKind::Unbounded => RetentionPolicy::Unbounded,
            RetentionKind::Bounded => RetentionPolicy::Bounded { extra: self.extra },
        };
        EngineConfig {
            mode: self.mode,
            retention,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: String,
}

/// Uses `BTreeMap` so the serialized form (and the fingerprint) is
/// deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    pub kind: String,
    pub inputs: Vec<String>,
    #[serde(default)]
    pub params: BTreeMap<String, f64>,
}

/// A complete graph declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSpec {
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default, rename = "source")]
    pub sources: Vec<SourceSpec>,
    #[serde(default, rename = "node")]
    pub nodes: Vec<NodeSpec>,
}

impl GraphSpec {
    /// Load a graph specification from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a graph specification from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Blake3 hex digest of the canonical JSON form.
    ///
    /// Two specifications differing only in whitespace or comments share a
    /// fingerprint; any change to names, wiring or parameters changes it.
    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let json = serde_json::to_string(self)?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    /// Build and finalize the graph with the `[engine]` settings.
    pub fn build(&self) -> Result<LineGraph, ConfigError> {
        self.build_with(&self.engine.config())
    }

    /// Build and finalize the graph with explicit engine settings.
    pub fn build_with(&self, config: &EngineConfig) -> Result<LineGraph, ConfigError> {
        let mut graph = LineGraph::new();
        for source in &self.sources {
            graph.add_source(source.name.as_str())?;
        }
        for node in &self.nodes {
            let op = create_op(&node.kind, &node.params).map_err(|source| {
                ConfigError::Factory {
                    node: node.name.clone(),
                    source,
                }
            })?;
            let inputs = node
                .inputs
                .iter()
                .map(|raw| resolve_input(&graph, &node.name, raw))
                .collect::<Result<Vec<_>, _>>()?;
            graph.add_boxed_node(node.name.as_str(), &inputs, op)?;
        }
        graph.finalize(config)?;
        debug!(
            sources = self.sources.len(),
            nodes = self.nodes.len(),
            "graph built from spec"
        );
        Ok(graph)
    }
}

/// Split `"line@-k"` into the line name and its offset.
pub fn parse_input(raw: &str) -> Result<(&str, isize), String> {
    match raw.rsplit_once('@') {
        None => Ok((raw, 0)),
        Some((name, offset)) => {
            if name.is_empty() {
                return Err("has an empty line name".into());
            }
            let offset = offset
                .trim()
                .parse::<isize>()
                .map_err(|e| format!("has an invalid offset: {e}"))?;
            Ok((name, offset))
        }
    }
}

fn resolve_input(graph: &LineGraph, node: &str, raw: &str) -> Result<Input, ConfigError> {
    let bad = |reason: String| ConfigError::BadInput {
        node: node.to_string(),
        input: raw.to_string(),
        reason,
    };
    let (name, offset) = parse_input(raw).map_err(bad)?;
    let line = graph
        .line(name)
        .ok_or_else(|| bad("names a line that is not declared above this node".into()))?;
    Ok(Input::at(line, offset))
}
