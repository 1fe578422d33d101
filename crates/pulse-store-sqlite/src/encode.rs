//! Conversions between the domain [`Sample`] and the plain-text column
//! representations stored in SQLite.
//!
//! Motion vectors are stored as their fixed-precision renderings (NULL when
//! unavailable) so the columns read the same as the wire format. Battery is
//! widened to REAL by SQLite and narrowed back on read.

use pulse_core::sample::{Sample, Vec3};

use crate::Result;

pub fn encode_vec3(v: Option<Vec3>) -> Option<String> {
  v.map(|v| v.to_string())
}

pub fn decode_vec3(s: Option<String>) -> Result<Option<Vec3>> {
  let v = s.as_deref().map(str::parse::<Vec3>).transpose()?;
  Ok(v)
}

/// Raw values read directly from a `samples` row, in column order.
pub struct RawSample {
  pub time:           String,
  pub location:       Option<String>,
  pub heart_rate:     i64,
  pub step_count:     i64,
  pub acceleration:   Option<String>,
  pub gyro:           Option<String>,
  pub magnetometer:   Option<String>,
  pub battery:        Option<f64>,
  pub active_energy:  f64,
  pub resting_energy: f64,
  pub participant_id: String,
  pub sitting_time:   i64,
}

impl RawSample {
  pub fn into_sample(self) -> Result<Sample> {
    Ok(Sample {
      time:           self.time,
      location:       self.location,
      heart_rate:     self.heart_rate as u32,
      step_count:     self.step_count as u32,
      acceleration:   decode_vec3(self.acceleration)?,
      gyro:           decode_vec3(self.gyro)?,
      magnetometer:   decode_vec3(self.magnetometer)?,
      battery:        self.battery.map(|b| b as f32),
      active_energy:  self.active_energy,
      resting_energy: self.resting_energy,
      participant_id: self.participant_id,
      sitting_time:   self.sitting_time as u32,
    })
  }
}
