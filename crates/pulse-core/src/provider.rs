//! Provider traits and the shared latest-value cell.
//!
//! A provider is a source of one signal's latest known reading, polled
//! non-blockingly by the assembler. No freshness guarantee is required:
//! readings may be stale or absent, and an absent reading is data (an
//! explicit absent field in the sample), never an error.

use std::{
  fmt,
  sync::{Arc, Mutex, PoisonError},
};

use crate::sample::Vec3;

// ─── Reading types ───────────────────────────────────────────────────────────

/// A location fix, rendered on the wire as `"lat lon"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoFix {
  pub lat: f64,
  pub lon: f64,
}

impl fmt::Display for GeoFix {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.lat, self.lon)
  }
}

/// The latest triaxial readings, each independently absent when its sensor
/// has produced nothing yet.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionSnapshot {
  pub acceleration:   Option<Vec3>,
  pub rotation_rate:  Option<Vec3>,
  pub magnetic_field: Option<Vec3>,
}

/// The latest physiological counters and energy totals.
///
/// The counters are `Option` at this seam so absence stays visible; the
/// assembler flattens them to 0 for the collector.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HealthReading {
  pub heart_rate:     Option<u32>,
  pub step_count:     Option<u32>,
  pub active_energy:  f64,
  pub resting_energy: f64,
}

// ─── Provider traits ─────────────────────────────────────────────────────────

pub trait LocationProvider: Send + Sync {
  /// The latest fix, or `None` when no fix is currently available.
  fn current_location(&self) -> Option<GeoFix>;
}

pub trait MotionProvider: Send + Sync {
  fn current_motion(&self) -> MotionSnapshot;
}

pub trait HealthProvider: Send + Sync {
  fn heart_rate(&self) -> Option<u32>;
  fn step_count(&self) -> Option<u32>;
  fn active_energy(&self) -> f64;
  fn resting_energy(&self) -> f64;
}

pub trait BatteryProvider: Send + Sync {
  /// Charge level in [0, 1], or `None` when monitoring is unavailable.
  fn battery_level(&self) -> Option<f32>;
}

// ─── Latest-value cell ───────────────────────────────────────────────────────

/// A shared last-value slot: feeders publish into it on their own cadence,
/// the assembler reads the most recent value without blocking.
///
/// Cheap to clone — all clones share the same slot. A cell that has never
/// been published yields `None`.
pub struct LatestCell<T>(Arc<Mutex<Option<T>>>);

impl<T> Clone for LatestCell<T> {
  fn clone(&self) -> Self { Self(Arc::clone(&self.0)) }
}

impl<T> Default for LatestCell<T> {
  fn default() -> Self { Self::new() }
}

impl<T> LatestCell<T> {
  pub fn new() -> Self { Self(Arc::new(Mutex::new(None))) }

  /// Replace the current value. The lock is held only for the swap.
  pub fn publish(&self, value: T) {
    *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
  }

  /// Drop the current value, so subsequent reads see an absent reading.
  pub fn clear(&self) {
    *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
  }
}

impl<T: Clone> LatestCell<T> {
  /// A copy of the most recently published value, if any.
  pub fn latest(&self) -> Option<T> {
    self
      .0
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

impl LocationProvider for LatestCell<GeoFix> {
  fn current_location(&self) -> Option<GeoFix> { self.latest() }
}

impl MotionProvider for LatestCell<MotionSnapshot> {
  fn current_motion(&self) -> MotionSnapshot {
    self.latest().unwrap_or_default()
  }
}

impl HealthProvider for LatestCell<HealthReading> {
  fn heart_rate(&self) -> Option<u32> {
    self.latest().and_then(|r| r.heart_rate)
  }

  fn step_count(&self) -> Option<u32> {
    self.latest().and_then(|r| r.step_count)
  }

  fn active_energy(&self) -> f64 {
    self.latest().map(|r| r.active_energy).unwrap_or_default()
  }

  fn resting_energy(&self) -> f64 {
    self.latest().map(|r| r.resting_energy).unwrap_or_default()
  }
}

impl BatteryProvider for LatestCell<f32> {
  fn battery_level(&self) -> Option<f32> { self.latest() }
}
