//! Tests for the assembler, the coordinator state machine and the session
//! lifecycle, against in-memory mock implementations of the trait seams.

use std::sync::{
  Arc, Mutex,
  atomic::{AtomicBool, AtomicUsize, Ordering},
};

use chrono::{FixedOffset, TimeZone as _, Utc};
use thiserror::Error;
use tokio::sync::Notify;

use crate::{
  assembler::{SampleAssembler, sample_time},
  coordinator::{TickOutcome, UploadCoordinator, UploadSlot},
  lifecycle::{SessionAction, SessionEvent, SessionLifecycle, SessionState},
  provider::{GeoFix, HealthReading, LatestCell, MotionSnapshot},
  queue::SampleQueue,
  sample::{Sample, UNAVAILABLE, Vec3},
  uploader::BatchUploader,
};

fn sample(heart_rate: u32) -> Sample {
  Sample {
    time: "2026-08-28 09:41:00.0000".into(),
    location: None,
    heart_rate,
    step_count: 0,
    acceleration: None,
    gyro: None,
    magnetometer: None,
    battery: None,
    active_energy: 0.0,
    resting_energy: 0.0,
    participant_id: "P1".into(),
    sitting_time: 0,
  }
}

// ─── Mocks ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
#[error("mock storage failure")]
struct MockStorageError;

#[derive(Default)]
struct MockQueue {
  samples:    Mutex<Vec<Sample>>,
  fail_drain: AtomicBool,
}

impl MockQueue {
  fn len(&self) -> usize { self.samples.lock().unwrap().len() }
}

impl SampleQueue for MockQueue {
  type Error = MockStorageError;

  async fn append(&self, sample: Sample) -> Result<(), MockStorageError> {
    self.samples.lock().unwrap().push(sample);
    Ok(())
  }

  async fn drain(&self) -> Result<Vec<Sample>, MockStorageError> {
    if self.fail_drain.load(Ordering::Relaxed) {
      return Err(MockStorageError);
    }
    Ok(std::mem::take(&mut *self.samples.lock().unwrap()))
  }

  async fn participant_id(&self) -> Result<Option<String>, MockStorageError> {
    Ok(None)
  }

  async fn set_participant_id(&self, _id: &str) -> Result<(), MockStorageError> {
    Ok(())
  }
}

#[derive(Debug, Error)]
#[error("mock transport failure")]
struct MockTransportError;

#[derive(Clone, Copy)]
enum UploadMode {
  Succeed,
  Fail,
  /// Record the batch, then park until [`MockUploader::release`] is called.
  Hold,
}

struct MockUploader {
  mode:    UploadMode,
  batches: Mutex<Vec<Vec<Sample>>>,
  calls:   AtomicUsize,
  gate:    Notify,
}

impl MockUploader {
  fn new(mode: UploadMode) -> Self {
    Self {
      mode,
      batches: Mutex::new(Vec::new()),
      calls: AtomicUsize::new(0),
      gate: Notify::new(),
    }
  }

  fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }

  fn release(&self) { self.gate.notify_one(); }
}

impl BatchUploader for MockUploader {
  type Error = MockTransportError;

  async fn upload(&self, batch: &[Sample]) -> Result<(), MockTransportError> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.batches.lock().unwrap().push(batch.to_vec());
    match self.mode {
      UploadMode::Succeed => Ok(()),
      UploadMode::Fail => Err(MockTransportError),
      UploadMode::Hold => {
        self.gate.notified().await;
        Ok(())
      }
    }
  }
}

fn coordinator(
  queue: Arc<MockQueue>,
  uploader: Arc<MockUploader>,
) -> UploadCoordinator<MockQueue, MockUploader> {
  UploadCoordinator::new(queue, uploader, UploadSlot::new())
}

// ─── Timestamp formatting ────────────────────────────────────────────────────

#[test]
fn sample_time_applies_offset_and_four_digit_fraction() {
  let instant = Utc.with_ymd_and_hms(2026, 3, 1, 23, 30, 5).unwrap();
  // 23:30:05 UTC + 02:00 → next day 01:30:05 local.
  let offset = FixedOffset::east_opt(2 * 3600).unwrap();
  assert_eq!(sample_time(instant, offset), "2026-03-02 01:30:05.0000");
}

#[test]
fn sample_time_renders_subsecond_precision() {
  let instant = Utc
    .with_ymd_and_hms(2026, 8, 28, 12, 0, 0)
    .unwrap()
    .checked_add_signed(chrono::Duration::milliseconds(123))
    .unwrap();
  let offset = FixedOffset::west_opt(0).unwrap();
  assert_eq!(sample_time(instant, offset), "2026-08-28 12:00:00.1230");
}

// ─── Motion rendering ────────────────────────────────────────────────────────

#[test]
fn vec3_renders_fixed_precision() {
  let v = Vec3::new(0.0123, -0.98066, 0.5);
  assert_eq!(v.to_string(), "x:0.012 y:-0.981 z:0.500");
}

#[test]
fn vec3_roundtrips_through_text() {
  let v = Vec3::new(1.25, -2.5, 0.0);
  let parsed: Vec3 = v.to_string().parse().unwrap();
  assert_eq!(parsed, v);
}

#[test]
fn vec3_rejects_malformed_text() {
  assert!("x:1.0 y:2.0".parse::<Vec3>().is_err());
  assert!("1.0 2.0 3.0".parse::<Vec3>().is_err());
  assert!("x:a y:b z:c".parse::<Vec3>().is_err());
  assert!("x:1 y:2 z:3 w:4".parse::<Vec3>().is_err());
}

// ─── Wire format ─────────────────────────────────────────────────────────────

#[test]
fn sample_serializes_with_collector_field_names() {
  let mut s = sample(72);
  s.step_count = 1500;
  s.battery = Some(0.81);
  let value = serde_json::to_value(&s).unwrap();
  let obj = value.as_object().unwrap();

  let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
  keys.sort_unstable();
  assert_eq!(keys, [
    "acceleration",
    "activeenergy",
    "battery",
    "gyro",
    "heartrate",
    "location",
    "magnetometer",
    "participantid",
    "restingenergy",
    "sittingtime",
    "stepcount",
    "time",
  ]);

  assert_eq!(obj["heartrate"], 72);
  assert_eq!(obj["stepcount"], 1500);
  assert_eq!(obj["location"], serde_json::Value::Null);
  assert_eq!(obj["acceleration"], UNAVAILABLE);
  assert_eq!(obj["participantid"], "P1");
  assert_eq!(obj["sittingtime"], 0);
}

#[test]
fn present_motion_serializes_as_rendered_tuple() {
  let mut s = sample(60);
  s.acceleration = Some(Vec3::new(0.01, -0.98, 0.04));
  let value = serde_json::to_value(&s).unwrap();
  assert_eq!(value["acceleration"], "x:0.010 y:-0.980 z:0.040");

  let back: Sample = serde_json::from_value(value).unwrap();
  assert_eq!(back, s);
}

// ─── Assembler ───────────────────────────────────────────────────────────────

fn cells() -> (
  LatestCell<GeoFix>,
  LatestCell<MotionSnapshot>,
  LatestCell<HealthReading>,
  LatestCell<f32>,
) {
  (LatestCell::new(), LatestCell::new(), LatestCell::new(), LatestCell::new())
}

#[test]
fn assemble_with_partial_readings() {
  let (location, motion, health, battery) = cells();
  health.publish(HealthReading {
    heart_rate: Some(72),
    step_count: Some(1500),
    ..Default::default()
  });
  battery.publish(0.81);

  let assembler = SampleAssembler::new(
    location.clone(),
    motion.clone(),
    health.clone(),
    battery.clone(),
  );
  let s = assembler.assemble("P1");

  assert_eq!(s.heart_rate, 72);
  assert_eq!(s.step_count, 1500);
  assert_eq!(s.location, None);
  assert_eq!(s.acceleration, None);
  assert_eq!(s.gyro, None);
  assert_eq!(s.magnetometer, None);
  assert_eq!(s.battery, Some(0.81));
  assert_eq!(s.participant_id, "P1");
  assert_eq!(s.sitting_time, 0);
}

#[test]
fn assemble_with_no_readings_yields_explicit_absences() {
  let (location, motion, health, battery) = cells();
  let assembler = SampleAssembler::new(location, motion, health, battery);
  let s = assembler.assemble("");

  // Counters flatten to 0; everything else is an explicit absence.
  assert_eq!(s.heart_rate, 0);
  assert_eq!(s.step_count, 0);
  assert_eq!(s.active_energy, 0.0);
  assert!(s.location.is_none());
  assert!(s.battery.is_none());
  assert!(s.participant_id.is_empty());
}

#[test]
fn assemble_reads_latest_published_values() {
  let (location, motion, health, battery) = cells();
  location.publish(GeoFix { lat: 34.72, lon: -86.64 });
  motion.publish(MotionSnapshot {
    acceleration: Some(Vec3::new(0.0, 0.0, -1.0)),
    ..Default::default()
  });

  let assembler = SampleAssembler::new(
    location.clone(),
    motion.clone(),
    health.clone(),
    battery.clone(),
  );
  let s = assembler.assemble_at(
    "P2",
    Utc.with_ymd_and_hms(2026, 8, 28, 9, 41, 0).unwrap(),
    FixedOffset::west_opt(5 * 3600).unwrap(),
  );

  assert_eq!(s.time, "2026-08-28 04:41:00.0000");
  assert_eq!(s.location.as_deref(), Some("34.72 -86.64"));
  assert_eq!(s.acceleration, Some(Vec3::new(0.0, 0.0, -1.0)));
  // Gyro and magnetometer were never published in the snapshot.
  assert_eq!(s.gyro, None);

  // A newer fix replaces the old one on the next assembly.
  location.publish(GeoFix { lat: 34.73, lon: -86.64 });
  let s2 = assembler.assemble("P2");
  assert_eq!(s2.location.as_deref(), Some("34.73 -86.64"));
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn report_tick_with_empty_queue_stays_idle() {
  let queue = Arc::new(MockQueue::default());
  let uploader = Arc::new(MockUploader::new(UploadMode::Succeed));
  let c = coordinator(queue, uploader.clone());

  assert!(matches!(c.report_tick().await.unwrap(), TickOutcome::Empty));
  assert_eq!(uploader.calls(), 0);
}

#[tokio::test]
async fn report_tick_uploads_whole_batch_once() {
  let queue = Arc::new(MockQueue::default());
  let uploader = Arc::new(MockUploader::new(UploadMode::Succeed));
  let c = coordinator(queue.clone(), uploader.clone());

  for hr in [60, 61, 62] {
    queue.append(sample(hr)).await.unwrap();
  }

  match c.report_tick().await.unwrap() {
    TickOutcome::Uploaded(n) => assert_eq!(n, 3),
    other => panic!("expected Uploaded, got {other:?}"),
  }

  let batches = uploader.batches.lock().unwrap();
  assert_eq!(batches.len(), 1);
  assert_eq!(batches[0].len(), 3);
  let rates: Vec<_> = batches[0].iter().map(|s| s.heart_rate).collect();
  assert_eq!(rates, [60, 61, 62]);
  assert_eq!(queue.len(), 0);
}

#[tokio::test]
async fn ticks_while_uploading_are_no_ops() {
  let queue = Arc::new(MockQueue::default());
  let uploader = Arc::new(MockUploader::new(UploadMode::Hold));
  let c = Arc::new(coordinator(queue.clone(), uploader.clone()));

  queue.append(sample(70)).await.unwrap();

  let first = tokio::spawn({
    let c = Arc::clone(&c);
    async move { c.report_tick().await }
  });

  // Let the first tick reach the parked upload.
  while uploader.calls() == 0 {
    tokio::task::yield_now().await;
  }

  // Queue is already empty — the drain happened before completion fired.
  assert_eq!(queue.len(), 0);

  queue.append(sample(71)).await.unwrap();
  assert!(matches!(c.report_tick().await.unwrap(), TickOutcome::Busy));
  assert_eq!(uploader.calls(), 1, "second upload issued while first in flight");

  uploader.release();
  assert!(matches!(first.await.unwrap().unwrap(), TickOutcome::Uploaded(1)));

  // Completion returned the coordinator to Idle; the next tick uploads the
  // sample that accumulated meanwhile.
  assert!(matches!(
    c.report_tick().await.unwrap(),
    TickOutcome::Uploaded(1)
  ));
  assert_eq!(uploader.calls(), 2);
}

#[tokio::test]
async fn failed_upload_drops_batch_exactly_once() {
  let queue = Arc::new(MockQueue::default());
  let uploader = Arc::new(MockUploader::new(UploadMode::Fail));
  let c = coordinator(queue.clone(), uploader.clone());

  queue.append(sample(80)).await.unwrap();
  queue.append(sample(81)).await.unwrap();

  match c.report_tick().await.unwrap() {
    TickOutcome::Failed { dropped, .. } => assert_eq!(dropped, 2),
    other => panic!("expected Failed, got {other:?}"),
  }

  // The lost batch was not re-appended: the next tick finds nothing, and the
  // uploader is not asked to retry it.
  assert_eq!(queue.len(), 0);
  assert!(matches!(c.report_tick().await.unwrap(), TickOutcome::Empty));
  assert_eq!(uploader.calls(), 1);
}

#[tokio::test]
async fn drain_error_releases_the_slot() {
  let queue = Arc::new(MockQueue::default());
  let uploader = Arc::new(MockUploader::new(UploadMode::Succeed));
  let c = coordinator(queue.clone(), uploader.clone());

  queue.fail_drain.store(true, Ordering::Relaxed);
  queue.append(sample(90)).await.unwrap();
  assert!(c.report_tick().await.is_err());

  // The failed tick must not leave the coordinator stuck in Uploading.
  queue.fail_drain.store(false, Ordering::Relaxed);
  assert!(matches!(
    c.report_tick().await.unwrap(),
    TickOutcome::Uploaded(1)
  ));
}

#[tokio::test]
async fn upload_slot_is_exclusive() {
  let slot = UploadSlot::new();
  let permit = slot.try_acquire().expect("first acquire");
  assert!(slot.is_uploading());
  assert!(slot.try_acquire().is_none());
  drop(permit);
  assert!(!slot.is_uploading());
  assert!(slot.try_acquire().is_some());
}

// ─── Session lifecycle ───────────────────────────────────────────────────────

#[test]
fn lifecycle_starts_sampling_on_session_start() {
  let mut lc = SessionLifecycle::new();
  assert_eq!(lc.state(), SessionState::Inactive);
  assert_eq!(lc.handle(SessionEvent::Started), SessionAction::StartSampling);
  assert_eq!(lc.state(), SessionState::Active);
}

#[test]
fn lifecycle_flushes_on_expiry_warning_then_stops() {
  let mut lc = SessionLifecycle::new();
  lc.handle(SessionEvent::Started);
  assert_eq!(lc.handle(SessionEvent::WillExpire), SessionAction::FlushPending);
  assert_eq!(lc.state(), SessionState::Expiring);
  assert_eq!(lc.handle(SessionEvent::Invalidated), SessionAction::StopSampling);
  assert_eq!(lc.state(), SessionState::Inactive);
}

#[test]
fn lifecycle_stops_directly_from_active() {
  let mut lc = SessionLifecycle::new();
  lc.handle(SessionEvent::Started);
  assert_eq!(lc.handle(SessionEvent::Invalidated), SessionAction::StopSampling);
  assert_eq!(lc.state(), SessionState::Inactive);
}

#[test]
fn lifecycle_ignores_events_that_do_not_apply() {
  let mut lc = SessionLifecycle::new();
  assert_eq!(lc.handle(SessionEvent::WillExpire), SessionAction::Ignore);
  assert_eq!(lc.handle(SessionEvent::Invalidated), SessionAction::Ignore);

  lc.handle(SessionEvent::Started);
  assert_eq!(lc.handle(SessionEvent::Started), SessionAction::Ignore);
  assert_eq!(lc.state(), SessionState::Active);

  lc.handle(SessionEvent::WillExpire);
  assert_eq!(lc.handle(SessionEvent::Started), SessionAction::Ignore);
  assert_eq!(lc.handle(SessionEvent::WillExpire), SessionAction::Ignore);
  assert_eq!(lc.state(), SessionState::Expiring);
}
