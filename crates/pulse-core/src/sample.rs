//! Sample — one assembled, timestamped snapshot of every monitored signal.
//!
//! A sample is write-once: it is built in full by the assembler and never
//! mutated afterwards. On the wire (and in storage) every field is flat, with
//! the collector's exact field names. Motion vectors are rendered as
//! fixed-precision text, with the literal string `unavailable` standing in
//! for a reading the provider never produced — absence is explicit, never a
//! silent zero.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Marker rendered for a motion reading with no current value.
pub const UNAVAILABLE: &str = "unavailable";

// ─── Vec3 ────────────────────────────────────────────────────────────────────

/// A triaxial reading (acceleration, rotation rate, or magnetic field).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
  pub x: f64,
  pub y: f64,
  pub z: f64,
}

impl Vec3 {
  pub fn new(x: f64, y: f64, z: f64) -> Self { Self { x, y, z } }
}

impl fmt::Display for Vec3 {
  /// Fixed three-decimal rendering, e.g. `x:0.012 y:-0.981 z:0.043`.
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "x:{:.3} y:{:.3} z:{:.3}", self.x, self.y, self.z)
  }
}

impl FromStr for Vec3 {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    let mut axes = [0.0f64; 3];
    let mut parts = s.split_whitespace();
    for (axis, prefix) in axes.iter_mut().zip(["x:", "y:", "z:"]) {
      let part = parts
        .next()
        .and_then(|p| p.strip_prefix(prefix))
        .ok_or_else(|| Error::MalformedVec3(s.to_owned()))?;
      *axis = part
        .parse()
        .map_err(|_| Error::MalformedVec3(s.to_owned()))?;
    }
    if parts.next().is_some() {
      return Err(Error::MalformedVec3(s.to_owned()));
    }
    Ok(Self { x: axes[0], y: axes[1], z: axes[2] })
  }
}

/// Serde adapter rendering `Option<Vec3>` as its display string, with the
/// [`UNAVAILABLE`] marker for `None`.
pub mod motion_repr {
  use serde::{Deserialize as _, Deserializer, Serializer, de};

  use super::{UNAVAILABLE, Vec3};

  pub fn serialize<S: Serializer>(
    v: &Option<Vec3>,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    match v {
      Some(v) => serializer.serialize_str(&v.to_string()),
      None => serializer.serialize_str(UNAVAILABLE),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<Option<Vec3>, D::Error> {
    let s = String::deserialize(deserializer)?;
    if s == UNAVAILABLE {
      return Ok(None);
    }
    s.parse().map(Some).map_err(de::Error::custom)
  }
}

// ─── Sample ──────────────────────────────────────────────────────────────────

/// One assembled snapshot of all monitored signals plus the participant id.
///
/// Field names under serde are exactly the collector's flat field set.
/// `heart_rate` and `step_count` default to 0 when the health provider has no
/// reading (wire compatibility with the collector); `location`, the motion
/// vectors and `battery` carry explicit absences instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
  /// Local wall-clock time (UTC shifted by the local offset at assembly
  /// time), `YYYY-MM-DD HH:MM:SS.ffff`. Wall-clock based — not guaranteed
  /// monotonic across DST transitions.
  pub time: String,

  /// `"lat lon"` text, or absent when no fix was available.
  pub location: Option<String>,

  #[serde(rename = "heartrate")]
  pub heart_rate: u32,

  #[serde(rename = "stepcount")]
  pub step_count: u32,

  #[serde(with = "motion_repr")]
  pub acceleration: Option<Vec3>,

  /// Rotation rate.
  #[serde(with = "motion_repr")]
  pub gyro: Option<Vec3>,

  /// Magnetic field.
  #[serde(with = "motion_repr")]
  pub magnetometer: Option<Vec3>,

  /// Battery charge in [0, 1]; absent when monitoring is unavailable.
  pub battery: Option<f32>,

  #[serde(rename = "activeenergy")]
  pub active_energy: f64,

  #[serde(rename = "restingenergy")]
  pub resting_energy: f64,

  /// May be empty if no participant has been configured yet.
  #[serde(rename = "participantid")]
  pub participant_id: String,

  /// Reserved for a future derived metric; always 0.
  #[serde(rename = "sittingtime")]
  pub sitting_time: u32,
}
