//! The sample assembler — turns one poll of every provider into a [`Sample`].

use chrono::{DateTime, FixedOffset, Local, Timelike as _, Utc};

use crate::{
  provider::{BatteryProvider, HealthProvider, LocationProvider, MotionProvider},
  sample::Sample,
};

/// Format an instant as a timezone-normalized sample timestamp.
///
/// The UTC instant is shifted into `offset` and rendered with four fractional
/// digits. Because this is wall-clock local time, callers must not assume
/// monotonicity across DST transitions.
pub fn sample_time(instant: DateTime<Utc>, offset: FixedOffset) -> String {
  let local = instant.with_timezone(&offset);
  // chrono has no four-digit fraction specifier; tenths of a millisecond are
  // appended by hand.
  format!(
    "{}.{:04}",
    local.format("%Y-%m-%d %H:%M:%S"),
    local.nanosecond() % 1_000_000_000 / 100_000
  )
}

/// Pulls the latest value from every provider and stamps it into one
/// immutable [`Sample`].
///
/// Reads never block: a provider with nothing fresh yields an explicit
/// absent field. Assembly is pure with respect to storage — the sampling
/// tick owns the append, so provider-read latency stays isolated from
/// store latency.
pub struct SampleAssembler<L, M, H, B> {
  location: L,
  motion:   M,
  health:   H,
  battery:  B,
}

impl<L, M, H, B> SampleAssembler<L, M, H, B>
where
  L: LocationProvider,
  M: MotionProvider,
  H: HealthProvider,
  B: BatteryProvider,
{
  pub fn new(location: L, motion: M, health: H, battery: B) -> Self {
    Self { location, motion, health, battery }
  }

  /// Assemble one sample stamped with the current local time and
  /// `participant_id`.
  pub fn assemble(&self, participant_id: &str) -> Sample {
    self.assemble_at(participant_id, Utc::now(), *Local::now().offset())
  }

  /// As [`assemble`](Self::assemble), with the instant and offset supplied
  /// by the caller.
  pub fn assemble_at(
    &self,
    participant_id: &str,
    instant: DateTime<Utc>,
    offset: FixedOffset,
  ) -> Sample {
    let motion = self.motion.current_motion();

    Sample {
      time:           sample_time(instant, offset),
      location:       self.location.current_location().map(|fix| fix.to_string()),
      heart_rate:     self.health.heart_rate().unwrap_or(0),
      step_count:     self.health.step_count().unwrap_or(0),
      acceleration:   motion.acceleration,
      gyro:           motion.rotation_rate,
      magnetometer:   motion.magnetic_field,
      battery:        self.battery.battery_level(),
      active_energy:  self.health.active_energy(),
      resting_energy: self.health.resting_energy(),
      participant_id: participant_id.to_owned(),
      sitting_time:   0,
    }
  }
}
