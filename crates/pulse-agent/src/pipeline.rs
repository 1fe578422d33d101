//! The collection pipeline — assembler, queue, coordinator and the scheduler
//! that owns both periodic timers.

use std::{
  future::Future,
  sync::{Arc, Mutex, PoisonError, RwLock},
  time::Duration,
};

use pulse_core::{
  assembler::SampleAssembler,
  coordinator::{TickOutcome, UploadCoordinator, UploadSlot},
  lifecycle::{SessionAction, SessionEvent, SessionLifecycle},
  provider::{GeoFix, HealthReading, LatestCell, MotionSnapshot},
  queue::SampleQueue as _,
};
use pulse_store_sqlite::SqliteQueue;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{AgentConfig, uploader::HttpUploader};

// ─── Signal cells ────────────────────────────────────────────────────────────

/// The four latest-value cells feeders publish into and the assembler reads
/// from. Cheap to clone; clones share the underlying slots.
#[derive(Clone, Default)]
pub struct SignalCells {
  pub location: LatestCell<GeoFix>,
  pub motion:   LatestCell<MotionSnapshot>,
  pub health:   LatestCell<HealthReading>,
  pub battery:  LatestCell<f32>,
}

type Assembler = SampleAssembler<
  LatestCell<GeoFix>,
  LatestCell<MotionSnapshot>,
  LatestCell<HealthReading>,
  LatestCell<f32>,
>;

// ─── Scheduler ───────────────────────────────────────────────────────────────

/// Owns both periodic timer handles and the single `Idle`/`Uploading` flag.
///
/// Timer state is explicit here rather than ambient: the sampling task is
/// started and stopped by the session lifecycle, and stopping aborts the
/// task so no periodic resource leaks across session boundaries.
pub struct Scheduler {
  slot:          UploadSlot,
  sampling_task: Mutex<Option<JoinHandle<()>>>,
  report_task:   Mutex<Option<JoinHandle<()>>>,
}

impl Default for Scheduler {
  fn default() -> Self {
    Self {
      slot:          UploadSlot::new(),
      sampling_task: Mutex::new(None),
      report_task:   Mutex::new(None),
    }
  }
}

impl Scheduler {
  pub fn upload_slot(&self) -> UploadSlot { self.slot.clone() }

  /// Spawn the sampling loop if it is not already running. Returns `false`
  /// when a live task already holds the timer.
  fn spawn_sampling<F>(&self, fut: F) -> bool
  where
    F: Future<Output = ()> + Send + 'static,
  {
    let mut task = self
      .sampling_task
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    if task.as_ref().is_some_and(|t| !t.is_finished()) {
      return false;
    }
    *task = Some(tokio::spawn(fut));
    true
  }

  /// Abort and release the sampling task. Returns `false` if none was
  /// running.
  fn stop_sampling(&self) -> bool {
    let task = self
      .sampling_task
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .take();
    match task {
      Some(t) => {
        t.abort();
        true
      }
      None => false,
    }
  }

  fn spawn_reporting<F>(&self, fut: F) -> bool
  where
    F: Future<Output = ()> + Send + 'static,
  {
    let mut task = self
      .report_task
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    if task.as_ref().is_some_and(|t| !t.is_finished()) {
      return false;
    }
    *task = Some(tokio::spawn(fut));
    true
  }

  fn stop_reporting(&self) {
    if let Some(t) = self
      .report_task
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .take()
    {
      t.abort();
    }
  }

  fn shutdown(&self) {
    self.stop_sampling();
    self.stop_reporting();
  }
}

// ─── Pipeline ────────────────────────────────────────────────────────────────

/// Everything the agent runs: providers → assembler → durable queue →
/// coordinator → uploader, driven by the scheduler's two timers and gated by
/// the session lifecycle.
pub struct CollectionPipeline {
  assembler:       Arc<Assembler>,
  queue:           Arc<SqliteQueue>,
  coordinator:     Arc<UploadCoordinator<SqliteQueue, HttpUploader>>,
  participant:     Arc<RwLock<String>>,
  lifecycle:       Mutex<SessionLifecycle>,
  scheduler:       Scheduler,
  sample_interval: Duration,
  report_interval: Duration,
}

impl CollectionPipeline {
  /// Open the durable queue, read the cached participant id, and wire the
  /// coordinator. Nothing runs until the session starts.
  pub async fn new(
    config: &AgentConfig,
    cells: SignalCells,
  ) -> anyhow::Result<Self> {
    let queue = Arc::new(SqliteQueue::open(&config.store_path).await?);

    // Read once at startup and cache in memory thereafter.
    let participant = queue.participant_id().await?.unwrap_or_default();
    if participant.is_empty() {
      debug!("no participant configured yet; samples carry an empty id");
    }

    let uploader = Arc::new(HttpUploader::new(config.collector_url.clone())?);
    let scheduler = Scheduler::default();
    let coordinator = Arc::new(UploadCoordinator::new(
      Arc::clone(&queue),
      uploader,
      scheduler.upload_slot(),
    ));

    let assembler = Arc::new(SampleAssembler::new(
      cells.location,
      cells.motion,
      cells.health,
      cells.battery,
    ));

    Ok(Self {
      assembler,
      queue,
      coordinator,
      participant: Arc::new(RwLock::new(participant)),
      lifecycle: Mutex::new(SessionLifecycle::new()),
      scheduler,
      sample_interval: Duration::from_millis(config.sample_interval_ms),
      report_interval: Duration::from_millis(config.report_interval_ms),
    })
  }

  /// Persist a new participant identifier and update the in-memory cache;
  /// all subsequent samples carry the new id.
  pub async fn configure_participant(
    &self,
    id: &str,
  ) -> Result<(), pulse_store_sqlite::Error> {
    self.queue.set_participant_id(id).await?;
    *self
      .participant
      .write()
      .unwrap_or_else(PoisonError::into_inner) = id.to_owned();
    info!(participant = id, "participant configured");
    Ok(())
  }

  /// Start the sampling timer. Idempotent.
  pub fn start_collecting(&self) {
    let assembler = Arc::clone(&self.assembler);
    let queue = Arc::clone(&self.queue);
    let participant = Arc::clone(&self.participant);
    let period = self.sample_interval;

    let started = self.scheduler.spawn_sampling(async move {
      let mut ticks = tokio::time::interval(period);
      loop {
        ticks.tick().await;
        let id = participant
          .read()
          .unwrap_or_else(PoisonError::into_inner)
          .clone();
        let sample = assembler.assemble(&id);
        if let Err(error) = queue.append(sample).await {
          // One sample fewer in the next batch; the next tick proceeds.
          warn!(%error, "sample append failed, sample dropped");
        }
      }
    });

    if started {
      info!(period_ms = self.sample_interval.as_millis() as u64, "sampling started");
    } else {
      debug!("sampling already running");
    }
  }

  /// Stop and release the sampling timer. Idempotent.
  pub fn stop_collecting(&self) {
    if self.scheduler.stop_sampling() {
      info!("sampling stopped");
    }
  }

  /// Start the report timer. Each tick is spawned on its own task so a slow
  /// upload never delays the timer; the upload slot turns overlapping ticks
  /// into no-ops.
  pub fn start_reporting(&self) {
    let coordinator = Arc::clone(&self.coordinator);
    let period = self.report_interval;

    self.scheduler.spawn_reporting(async move {
      let mut ticks = tokio::time::interval(period);
      loop {
        ticks.tick().await;
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
          match coordinator.report_tick().await {
            Ok(TickOutcome::Uploaded(n)) => {
              info!(samples = n, "batch uploaded");
            }
            Ok(TickOutcome::Failed { dropped, error }) => {
              // The drained batch is gone; the next tick uploads only what
              // accumulated since.
              warn!(%error, dropped, "upload failed, batch lost");
            }
            Ok(TickOutcome::Busy) => {
              debug!("previous upload still outstanding, tick skipped");
            }
            Ok(TickOutcome::Empty) => debug!("queue empty, nothing to upload"),
            Err(error) => warn!(%error, "drain failed"),
          }
        });
      }
    });
  }

  /// Drive the session lifecycle state machine and act on its verdict.
  pub fn handle_session_event(&self, event: SessionEvent) {
    let action = self
      .lifecycle
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .handle(event);

    match action {
      SessionAction::StartSampling => self.start_collecting(),
      SessionAction::StopSampling => self.stop_collecting(),
      SessionAction::FlushPending => {
        // Every tick awaits its own append, so there is no sample buffered
        // outside the durable queue to flush.
        info!("session expiring, queued samples remain durable");
      }
      SessionAction::Ignore => debug!(?event, "lifecycle event ignored"),
    }
  }

  /// Stop both timers.
  pub fn shutdown(&self) { self.scheduler.shutdown(); }
}
