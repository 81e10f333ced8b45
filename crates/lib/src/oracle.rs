//! Image existence checks.

use thiserror::Error;
use tracing::debug;

use crate::engine::{EngineError, ImageEngine};

/// The engine could not answer; distinct from "the image is missing".
#[derive(Debug, Error)]
pub enum OracleError {
  #[error("failed to query image {tag}: {source}")]
  Query {
    tag: String,
    #[source]
    source: EngineError,
  },
}

/// Answers whether a tagged image is present in the engine's store.
pub struct ImageOracle<'a, E> {
  engine: &'a E,
  dry_run: bool,
}

impl<'a, E: ImageEngine> ImageOracle<'a, E> {
  pub fn new(engine: &'a E, dry_run: bool) -> Self {
    Self { engine, dry_run }
  }

  /// Whether `tag` exists.
  ///
  /// In simulation mode this is always `true` and the engine is not contacted.
  pub async fn exists(&self, tag: &str) -> Result<bool, OracleError> {
    if self.dry_run {
      debug!(tag = %tag, "simulation mode, assuming image exists");
      return Ok(true);
    }

    match self.engine.inspect_image(tag).await {
      Ok(()) => {
        debug!(tag = %tag, "image found");
        Ok(true)
      }
      Err(EngineError::ImageNotFound(_)) => {
        debug!(tag = %tag, "image not found");
        Ok(false)
      }
      Err(source) => Err(OracleError::Query {
        tag: tag.to_string(),
        source,
      }),
    }
  }
}
