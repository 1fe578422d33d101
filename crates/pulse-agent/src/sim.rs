//! Simulated signal feeders.
//!
//! The real deployment reads live sensor managers; this module stands in for
//! them so the full pipeline can run end to end without hardware. Each feeder
//! publishes a plausible, deterministic waveform into its latest-value cell
//! on its own cadence — the assembler neither knows nor cares which kind of
//! feeder is behind a cell.

use std::time::Duration;

use pulse_core::{
  provider::{GeoFix, HealthReading, LatestCell, MotionSnapshot},
  sample::Vec3,
};
use tokio::task::JoinHandle;

use crate::pipeline::SignalCells;

/// Spawn one feeder task per signal. Handles are returned so the caller can
/// abort them at shutdown; dropping them detaches the tasks.
pub fn spawn_feeders(cells: &SignalCells) -> Vec<JoinHandle<()>> {
  vec![
    spawn_location(cells.location.clone()),
    spawn_motion(cells.motion.clone()),
    spawn_health(cells.health.clone()),
    spawn_battery(cells.battery.clone()),
  ]
}

fn spawn_location(cell: LatestCell<GeoFix>) -> JoinHandle<()> {
  tokio::spawn(async move {
    let mut ticks = tokio::time::interval(Duration::from_secs(1));
    let mut t = 0u64;
    loop {
      ticks.tick().await;
      // A slow walk around a fixed point.
      let phase = t as f64 * 0.01;
      cell.publish(GeoFix {
        lat: 34.7304 + 0.0002 * phase.sin(),
        lon: -86.5861 + 0.0002 * phase.cos(),
      });
      t += 1;
    }
  })
}

fn spawn_motion(cell: LatestCell<MotionSnapshot>) -> JoinHandle<()> {
  tokio::spawn(async move {
    let mut ticks = tokio::time::interval(Duration::from_millis(100));
    let mut t = 0u64;
    loop {
      ticks.tick().await;
      let phase = t as f64 * 0.3;
      cell.publish(MotionSnapshot {
        acceleration:   Some(Vec3::new(
          0.02 * phase.sin(),
          0.02 * phase.cos(),
          -0.981 + 0.01 * (phase * 2.0).sin(),
        )),
        rotation_rate:  Some(Vec3::new(
          0.1 * phase.cos(),
          0.05 * phase.sin(),
          0.0,
        )),
        magnetic_field: Some(Vec3::new(22.4, -4.1, 41.0)),
      });
      t += 1;
    }
  })
}

fn spawn_health(cell: LatestCell<HealthReading>) -> JoinHandle<()> {
  tokio::spawn(async move {
    let mut ticks = tokio::time::interval(Duration::from_secs(1));
    let mut t = 0u64;
    let mut steps = 0u32;
    loop {
      ticks.tick().await;
      let phase = t as f64 * 0.05;
      steps += 2;
      cell.publish(HealthReading {
        heart_rate:     Some((72.0 + 6.0 * phase.sin()) as u32),
        step_count:     Some(steps),
        active_energy:  t as f64 * 0.08,
        resting_energy: 440.0 + t as f64 * 0.02,
      });
      t += 1;
    }
  })
}

fn spawn_battery(cell: LatestCell<f32>) -> JoinHandle<()> {
  tokio::spawn(async move {
    let mut ticks = tokio::time::interval(Duration::from_secs(5));
    let mut level = 1.0f32;
    loop {
      ticks.tick().await;
      cell.publish(level);
      level = (level - 0.0001).max(0.05);
    }
  })
}
