//! Error types for `pulse-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// A stored motion rendering failed to parse back into a vector.
  #[error("malformed motion reading: {0:?}")]
  MalformedVec3(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
