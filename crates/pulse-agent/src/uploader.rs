//! HTTP implementation of [`BatchUploader`] over reqwest.

use std::time::Duration;

use pulse_core::{sample::Sample, uploader::BatchUploader};
use reqwest::Client;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("collector rejected batch: {0}")]
  Status(reqwest::StatusCode),
}

/// POSTs each drained batch as a JSON array of flat field maps.
///
/// One request per batch, 30 s timeout, no retry — the future resolves
/// exactly once, and any transport failure or non-success status resolves as
/// an error. Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct HttpUploader {
  client: Client,
  url:    String,
}

impl HttpUploader {
  pub fn new(collector_url: impl Into<String>) -> Result<Self, UploadError> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()?;
    Ok(Self { client, url: collector_url.into() })
  }
}

impl BatchUploader for HttpUploader {
  type Error = UploadError;

  async fn upload(&self, batch: &[Sample]) -> Result<(), UploadError> {
    let resp = self.client.post(&self.url).json(batch).send().await?;
    if !resp.status().is_success() {
      return Err(UploadError::Status(resp.status()));
    }
    Ok(())
  }
}
