//! The `BatchUploader` trait — the outbound transport seam.

use std::future::Future;

use crate::sample::Sample;

/// Serializes one drained batch and performs a single outbound transfer.
///
/// The returned future resolves exactly once per submitted batch, regardless
/// of transport outcome — timeout, connection failure and non-success
/// responses all resolve as `Err`. The uploader never retries: retry, if
/// any, is the coordinator's concern via the next report tick.
pub trait BatchUploader: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn upload<'a>(
    &'a self,
    batch: &'a [Sample],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
