// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Serialized metric records and the snapshot query.
//!
//! Field names follow the wire shape consumed by existing dashboards, hence
//! the `AIF_timestamp`, `app_UID` and `instance_UID` spellings.

use serde::{Deserialize, Deserializer, Serialize};

use crate::MetricsError;

/// Node name reported when none is configured.
pub const DEFAULT_NODE_NAME: &str = "ai-at-edge-worker-01";

/// Descriptive identity of the served application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub app_name: String,
    pub network_name: String,
    pub network_type: String,
    pub device: String,
    pub focus: String,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            app_name: "app".to_string(),
            network_name: "network".to_string(),
            network_type: "type".to_string(),
            device: "device".to_string(),
            focus: "throughput".to_string(),
        }
    }
}

impl Identity {
    /// `app:network:type:device:focus`.
    pub fn app_uid(&self) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.app_name, self.network_name, self.network_type, self.device, self.focus
        )
    }

    /// `app_uid:aif_timestamp`, with the device segment suffixed `_<n>` when
    /// a thread count is configured.
    pub fn instance_uid(&self, aif_timestamp: u64, num_threads: Option<usize>) -> String {
        let device = match num_threads {
            Some(n) => format!("{}_{n}", self.device),
            None => self.device.clone(),
        };
        format!(
            "{}:{}:{}:{}:{}:{aif_timestamp}",
            self.app_name, self.network_name, self.network_type, device, self.focus
        )
    }
}

/// One completed inference, as stored in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    pub app_name: String,
    pub network_name: String,
    pub network_type: String,
    pub device: String,
    pub focus: String,
    #[serde(rename = "AIF_timestamp")]
    pub aif_timestamp: u64,
    pub processing_latency: f64,
    pub data_preparation_latency: f64,
    pub execution_latency: f64,
    pub throughput: f64,
    pub dataset_size: usize,
    pub batch_size: usize,
    #[serde(rename = "app_UID")]
    pub app_uid: String,
    #[serde(rename = "instance_UID")]
    pub instance_uid: String,
    pub node_name: String,
    /// Milliseconds, on the same clock as `AIF_timestamp`.
    pub timestamp: u64,
}

/// One-off initialisation figures, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitEntry {
    pub init: Option<f64>,
    pub warm_up: Option<f64>,
    #[serde(rename = "NUM_THREADS", skip_serializing_if = "Option::is_none", default)]
    pub num_threads: Option<usize>,
}

/// An element of a metrics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SnapshotEntry {
    Metric(MetricEntry),
    Init(InitEntry),
}

/// Which history entries a snapshot returns.
///
/// `count` is only read when `all` is false; the request field may also be
/// spelled `number`. `all` accepts a JSON boolean or a flag string such as
/// `"True"`, `"no"` or `"1"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsQuery {
    #[serde(default, deserialize_with = "bool_or_flag")]
    pub all: bool,
    #[serde(default, alias = "number")]
    pub count: Option<i64>,
}

impl MetricsQuery {
    /// Every stored entry.
    pub fn all() -> Self {
        Self {
            all: true,
            count: None,
        }
    }

    /// The newest `count` entries.
    pub fn last(count: i64) -> Self {
        Self {
            all: false,
            count: Some(count),
        }
    }

    /// Resolves to `None` for "everything" or `Some(n)` for the newest `n`.
    pub fn limit(&self) -> Result<Option<usize>, MetricsError> {
        if self.all {
            return Ok(None);
        }
        match self.count {
            Some(c) if c > 0 => Ok(Some(usize::try_from(c).unwrap_or(usize::MAX))),
            other => Err(MetricsError::InvalidCount { count: other }),
        }
    }
}

/// Parses the usual truthy/falsy spellings, case-insensitive.
fn parse_flag(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "t" | "true" | "on" | "1" => Some(true),
        "n" | "no" | "f" | "false" | "off" | "0" => Some(false),
        _ => None,
    }
}

fn bool_or_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Text(text) => parse_flag(&text).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid boolean flag '{text}'"))
        }),
    }
}
