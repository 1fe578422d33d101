//! The `SampleQueue` trait — the durable queue seam.
//!
//! The trait is implemented by storage backends (e.g. `pulse-store-sqlite`).
//! The coordinator and the agent pipeline depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use crate::sample::Sample;

/// Abstraction over the durable sample queue.
///
/// The queue decouples producer cadence from upload cadence: samples are
/// appended in collection order and leave the store only through an atomic
/// [`drain`](SampleQueue::drain). It also holds the persisted participant
/// identifier.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait SampleQueue: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist one sample at the tail of the queue.
  ///
  /// A storage failure is a local fault: the sample is dropped and the error
  /// reported to the caller — never retried in-process, so a failing store
  /// cannot starve future sampling ticks.
  fn append(
    &self,
    sample: Sample,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Atomically return all stored samples in insertion order and remove
  /// them, as one logical transaction.
  ///
  /// An append racing a drain lands wholly before the snapshot (and is
  /// included) or wholly after (and is left for the next drain) — never
  /// partially visible. No sample is ever returned by two drains.
  fn drain(
    &self,
  ) -> impl Future<Output = Result<Vec<Sample>, Self::Error>> + Send + '_;

  /// The most recently written participant identifier, or `None` if never
  /// configured.
  fn participant_id(
    &self,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  /// Persist a new participant identifier record. Prior records are kept as
  /// history; reads return the newest.
  fn set_participant_id<'a>(
    &'a self,
    id: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
