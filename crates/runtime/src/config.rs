// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Server configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! model_path = "./models/resnet50"
//! batch_size = 8
//! mode = "throughput"
//! metrics_history_size = 100
//! send_metrics = false
//! request_timeout_ms = 30000
//! num_threads = 4
//! node_name = "ai-at-edge-worker-01"
//!
//! [identity]
//! app_name = "classification"
//! network_name = "resnet50"
//! network_type = "cnn"
//! device = "alveo"
//! focus = "thr"
//! ```
//!
//! Every field has a default, so a file only needs to name what differs.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use metrics::{Identity, MetricsRecorder, TracingSink, DEFAULT_NODE_NAME};

use crate::RuntimeError;

/// How requests are executed. Fixed for the lifetime of a server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExecutionMode {
    /// One item per request, batch size 1.
    Latency,
    /// Many items per request, batched across lanes.
    Throughput,
}

impl ExecutionMode {
    /// Canonical lowercase name, as written in TOML.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Latency => "latency",
            ExecutionMode::Throughput => "throughput",
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = RuntimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "latency" | "lat" => Ok(ExecutionMode::Latency),
            "throughput" | "thr" => Ok(ExecutionMode::Throughput),
            other => Err(RuntimeError::ConfigError(format!(
                "unknown mode '{other}'; expected 'latency' ('lat') or 'throughput' ('thr')"
            ))),
        }
    }
}

impl TryFrom<String> for ExecutionMode {
    type Error = RuntimeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExecutionMode> for String {
    fn from(mode: ExecutionMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for one inference server instance.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Path to the compiled model handed to the accelerator adapters.
    pub model_path: PathBuf,
    /// Execution batch size.
    pub batch_size: usize,
    /// Execution mode.
    pub mode: ExecutionMode,
    /// Number of metric entries kept for snapshots.
    pub metrics_history_size: usize,
    /// Export per-inference metrics through the tracing sink.
    pub send_metrics: bool,
    /// How long a producer waits for its result.
    pub request_timeout_ms: u64,
    /// Thread count of the backing runtime, reported with the metrics.
    pub num_threads: Option<usize>,
    /// Node name reported with every metric entry.
    pub node_name: String,
    /// Application identity used to build metric UIDs.
    pub identity: Identity,
}

impl ServerConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::ConfigError(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RuntimeError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RuntimeError> {
        toml::to_string_pretty(self)
            .map_err(|e| RuntimeError::ConfigError(format!("TOML serialise error: {e}")))
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), RuntimeError> {
        if self.batch_size == 0 {
            return Err(RuntimeError::ConfigError("batch_size must be at least 1".into()));
        }
        if self.metrics_history_size == 0 {
            return Err(RuntimeError::ConfigError(
                "metrics_history_size must be at least 1".into(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(RuntimeError::ConfigError(
                "request_timeout_ms must be greater than 0".into(),
            ));
        }
        if self.num_threads == Some(0) {
            return Err(RuntimeError::ConfigError("num_threads must be at least 1".into()));
        }
        if self.mode == ExecutionMode::Latency && self.batch_size != 1 {
            return Err(RuntimeError::ConfigError(format!(
                "latency mode requires batch_size 1, got {}",
                self.batch_size
            )));
        }
        Ok(())
    }

    /// Producer wait deadline.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Builds the metrics recorder described by this config.
    pub fn metrics_recorder(&self) -> Result<MetricsRecorder, RuntimeError> {
        let recorder = MetricsRecorder::new(
            self.identity.clone(),
            self.batch_size,
            self.metrics_history_size,
        )?
        .with_node_name(self.node_name.clone())
        .with_num_threads(self.num_threads);

        Ok(if self.send_metrics {
            recorder.with_sink(TracingSink)
        } else {
            recorder
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./model"),
            batch_size: 1,
            mode: ExecutionMode::Throughput,
            metrics_history_size: 100,
            send_metrics: false,
            request_timeout_ms: 30_000,
            num_threads: None,
            node_name: DEFAULT_NODE_NAME.to_string(),
            identity: Identity::default(),
        }
    }
}
