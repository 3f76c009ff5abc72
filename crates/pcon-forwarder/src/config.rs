//! Forwarder tunables.
//!
//! Every knob has a compiled-in default, can be overridden per-process via
//! environment variables, and can be set from a TOML profile for scripted
//! topologies.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use pcon_core::env::{env_bool, env_f64, env_usize};
use serde::Deserialize;

/// Which queue class guards each egress link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QueueKind {
    /// Plain tail-drop FIFO, no congestion signal.
    Fifo,
    /// Stock CoDel: drops packets on the control-law cadence.
    Codel,
    /// CoDel control law, but raises marks instead of dropping.
    Pcon,
}

impl FromStr for QueueKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FIFO" => Ok(QueueKind::Fifo),
            "CODEL" => Ok(QueueKind::Codel),
            "PCON" => Ok(QueueKind::Pcon),
            other => anyhow::bail!("unknown queue type {other:?}"),
        }
    }
}

/// Per-link queue parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    pub kind: QueueKind,
    /// Packet cap; overflow tail-drops.
    pub max_packets: usize,
    /// CoDel sojourn target in milliseconds.
    pub target_ms: u64,
    /// CoDel observation interval in milliseconds.
    pub interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            kind: QueueKind::Pcon,
            max_packets: 500,
            target_ms: 5,
            interval_ms: 100,
        }
    }
}

impl QueueConfig {
    /// Defaults overridden by `QUEUE_TYPE` and `QUEUE_SIZE_PKTS`.
    pub fn from_env() -> Self {
        let d = Self::default();
        let kind = match std::env::var("QUEUE_TYPE") {
            Ok(v) if !v.is_empty() => v.parse().unwrap_or_else(|_| {
                tracing::warn!(value = %v, "unknown QUEUE_TYPE, using default");
                d.kind
            }),
            _ => d.kind,
        };
        QueueConfig {
            kind,
            max_packets: env_usize("QUEUE_SIZE_PKTS", d.max_packets),
            ..d
        }
    }

    pub fn target(&self) -> Duration {
        Duration::from_millis(self.target_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Strategy tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Start every FIB entry on the lowest-FaceId path instead of an equal split.
    pub init_shortest_path: bool,
    /// Multiplicative weight reduction per received congestion mark.
    pub change_per_mark: f64,
    /// Fraction of Interests that probe the non-chosen paths.
    pub probing_percentage: f64,
    /// Minimum spacing between NACK-driven weight updates, in milliseconds.
    pub fw_update_ms: u64,
    /// Minimum spacing between forwarding-table trace rows, in milliseconds.
    pub fw_write_ms: u64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        StrategyConfig {
            init_shortest_path: true,
            change_per_mark: 0.02,
            probing_percentage: 0.001,
            fw_update_ms: 110,
            fw_write_ms: 20,
        }
    }
}

impl StrategyConfig {
    /// Defaults overridden by `INIT_SHORTEST_PATH`, `CHANGE_PER_MARK` and
    /// `PROBING_PERCENTAGE`.
    pub fn from_env() -> Self {
        let d = Self::default();
        StrategyConfig {
            init_shortest_path: env_bool("INIT_SHORTEST_PATH", d.init_shortest_path),
            change_per_mark: env_f64("CHANGE_PER_MARK", d.change_per_mark),
            probing_percentage: env_f64("PROBING_PERCENTAGE", d.probing_percentage),
            ..d
        }
    }

    pub fn fw_update_interval(&self) -> Duration {
        Duration::from_millis(self.fw_update_ms)
    }

    pub fn fw_write_interval(&self) -> Duration {
        Duration::from_millis(self.fw_write_ms)
    }
}

/// Full per-node forwarder profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ForwarderConfig {
    pub node_id: u32,
    pub strategy: StrategyConfig,
    pub queue: QueueConfig,
}

impl ForwarderConfig {
    pub fn from_env() -> Self {
        ForwarderConfig {
            node_id: 0,
            strategy: StrategyConfig::from_env(),
            queue: QueueConfig::from_env(),
        }
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("invalid forwarder profile")
    }
}
