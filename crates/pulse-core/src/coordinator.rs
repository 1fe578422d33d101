//! The upload coordinator — drains the queue and submits batches, one at a
//! time.
//!
//! The coordinator is a two-state machine, `Idle` and `Uploading`, realised
//! as the [`UploadSlot`] flag. At most one upload is ever outstanding; report
//! ticks arriving while one is in flight are no-ops. This is the pipeline's
//! sole flow-control mechanism.
//!
//! Samples are removed from durable storage *before* the network attempt, so
//! a failed upload loses that batch. Delivery is at most once; the outcome
//! reports how many samples were dropped.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use crate::{queue::SampleQueue, uploader::BatchUploader};

// ─── Upload slot ─────────────────────────────────────────────────────────────

/// The single `Idle`/`Uploading` flag, test-and-set atomically with respect
/// to timer callbacks.
///
/// Created by the scheduler and injected into the coordinator — never
/// ambient state. Cheap to clone; all clones share the flag.
#[derive(Clone, Default)]
pub struct UploadSlot(Arc<AtomicBool>);

impl UploadSlot {
  pub fn new() -> Self { Self::default() }

  /// Attempt the `Idle` → `Uploading` transition. Returns `None` if an
  /// upload is already outstanding.
  pub fn try_acquire(&self) -> Option<UploadPermit> {
    self
      .0
      .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
      .ok()
      .map(|_| UploadPermit(Arc::clone(&self.0)))
  }

  pub fn is_uploading(&self) -> bool { self.0.load(Ordering::Acquire) }
}

/// Held for the duration of one report tick; returns the slot to `Idle` on
/// drop, including on error and panic paths.
pub struct UploadPermit(Arc<AtomicBool>);

impl Drop for UploadPermit {
  fn drop(&mut self) { self.0.store(false, Ordering::Release); }
}

// ─── Coordinator ─────────────────────────────────────────────────────────────

/// What one report tick did.
#[derive(Debug)]
pub enum TickOutcome<E> {
  /// A previous upload is still outstanding; this tick was a no-op.
  Busy,
  /// The queue was empty; nothing to upload.
  Empty,
  /// The batch was delivered.
  Uploaded(usize),
  /// The upload failed after the drain; the batch is gone. Not re-queued.
  Failed { dropped: usize, error: E },
}

pub struct UploadCoordinator<Q, U> {
  queue:    Arc<Q>,
  uploader: Arc<U>,
  slot:     UploadSlot,
}

impl<Q, U> UploadCoordinator<Q, U>
where
  Q: SampleQueue,
  U: BatchUploader,
{
  pub fn new(queue: Arc<Q>, uploader: Arc<U>, slot: UploadSlot) -> Self {
    Self { queue, uploader, slot }
  }

  /// Handle one report-timer tick.
  ///
  /// If no upload is outstanding: drain the queue and, if the batch is
  /// non-empty, submit it. The queue is empty the moment the drain returns —
  /// before the upload completes. The slot is held until the uploader's
  /// completion fires, then released whatever the outcome.
  ///
  /// Drain failures release the slot and propagate as `Q::Error`; upload
  /// failures are an outcome, not an error, because the loss is accepted.
  pub async fn report_tick(&self) -> Result<TickOutcome<U::Error>, Q::Error> {
    let Some(_permit) = self.slot.try_acquire() else {
      return Ok(TickOutcome::Busy);
    };

    let batch = self.queue.drain().await?;
    if batch.is_empty() {
      return Ok(TickOutcome::Empty);
    }

    let n = batch.len();
    match self.uploader.upload(&batch).await {
      Ok(()) => Ok(TickOutcome::Uploaded(n)),
      Err(error) => Ok(TickOutcome::Failed { dropped: n, error }),
    }
  }
}
