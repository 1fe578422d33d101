//! The runnable pulse collection agent.
//!
//! Wires the core pipeline to its concrete collaborators: the SQLite-backed
//! durable queue, the reqwest uploader, the scheduler owning both periodic
//! timers, and (absent real sensor hardware) simulated signal feeders.

pub mod pipeline;
pub mod sim;
pub mod uploader;

use std::path::PathBuf;

use serde::Deserialize;

// ─── Configuration ───────────────────────────────────────────────────────────

fn default_sample_interval_ms() -> u64 { 200 }

fn default_report_interval_ms() -> u64 { 1000 }

/// Runtime agent configuration, deserialised from `pulse.toml` layered with
/// `PULSE_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
  /// Collector endpoint receiving batch POSTs.
  pub collector_url: String,

  /// Path of the SQLite queue file.
  pub store_path: PathBuf,

  /// Sampling timer period. 200 ms is the high-frequency variant; 1000 ms
  /// the low-frequency one.
  #[serde(default = "default_sample_interval_ms")]
  pub sample_interval_ms: u64,

  /// Report (upload) timer period.
  #[serde(default = "default_report_interval_ms")]
  pub report_interval_ms: u64,

  /// Participant to configure at startup. When unset, the persisted value
  /// (if any) is used.
  pub participant: Option<String>,
}
