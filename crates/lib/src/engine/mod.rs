//! The container engine boundary.
//!
//! Everything the pipeline needs from an engine is behind [`ImageEngine`]:
//! start a build and receive its progress messages, or look up an image by
//! tag. [`DockerEngine`] talks to a Docker daemon; [`OfflineEngine`] refuses
//! every request and backs simulation runs.
//!
//! # Submodules
//!
//! - [`context`] - Packing a build context directory into a tar archive
//! - [`docker`] - Docker Engine API implementation

pub mod context;
pub mod docker;

use std::collections::BTreeMap;
use std::path::PathBuf;

use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::build::BuildSpec;

pub use docker::DockerEngine;

/// Errors from talking to the engine.
#[derive(Debug, Error)]
pub enum EngineError {
  /// The engine has no image with this tag.
  #[error("image not found: {0}")]
  ImageNotFound(String),

  /// The engine could not be reached.
  #[error("failed to connect to engine: {0}")]
  Connection(String),

  /// The engine answered with an error, or the response was unreadable.
  #[error("engine api error: {0}")]
  Api(String),

  /// The build context could not be prepared.
  #[error("failed to prepare build context {path}: {message}")]
  Context { path: PathBuf, message: String },

  /// No engine is available in this mode.
  #[error("no image engine available (simulation mode)")]
  Unavailable,
}

/// One raw progress message, shaped like the engine's JSON build stream.
///
/// Normally exactly one of `stream`, `status` or `error` is set; messages with
/// none of them (e.g. the final image id) carry no progress information.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMessage {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub stream: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl EngineMessage {
  pub fn stream(text: impl Into<String>) -> Self {
    Self {
      stream: Some(text.into()),
      ..Default::default()
    }
  }

  pub fn status(id: Option<&str>, status: impl Into<String>) -> Self {
    Self {
      status: Some(status.into()),
      id: id.map(str::to_string),
      ..Default::default()
    }
  }

  pub fn error(message: impl Into<String>) -> Self {
    Self {
      error: Some(message.into()),
      ..Default::default()
    }
  }
}

/// Live sequence of build messages, consumed until exhaustion or first error.
pub type EventStream<'a> = BoxStream<'a, Result<EngineMessage, EngineError>>;

/// What the engine is asked to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
  pub context: PathBuf,
  pub recipe: String,
  pub tag: String,
  pub build_args: BTreeMap<String, String>,
  /// Remove intermediate containers once the build finishes.
  pub remove_intermediate: bool,
}

impl From<&BuildSpec> for BuildRequest {
  fn from(spec: &BuildSpec) -> Self {
    Self {
      context: spec.context.clone(),
      recipe: spec.recipe.clone(),
      tag: spec.tag.clone(),
      build_args: spec.build_args.clone(),
      remove_intermediate: true,
    }
  }
}

/// A container engine that can build and look up images.
///
/// Calls are made one at a time from a single task; implementations need not
/// be thread-safe.
#[allow(async_fn_in_trait)]
pub trait ImageEngine {
  /// Start a build and return its progress messages.
  async fn build_image(&self, request: &BuildRequest) -> Result<EventStream<'_>, EngineError>;

  /// Look up an image by exact tag.
  ///
  /// Returns [`EngineError::ImageNotFound`] when the store has no such image.
  async fn inspect_image(&self, tag: &str) -> Result<(), EngineError>;
}

/// Engine used when nothing may be contacted.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineEngine;

impl ImageEngine for OfflineEngine {
  async fn build_image(&self, _request: &BuildRequest) -> Result<EventStream<'_>, EngineError> {
    Err(EngineError::Unavailable)
  }

  async fn inspect_image(&self, _tag: &str) -> Result<(), EngineError> {
    Err(EngineError::Unavailable)
  }
}
