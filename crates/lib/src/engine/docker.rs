//! Docker Engine API implementation of [`ImageEngine`].

use std::collections::HashMap;

use bollard::Docker;
use bollard::errors::Error as DockerError;
use bollard::image::BuildImageOptions;
use bollard::models::BuildInfo;
use futures::StreamExt;
use tracing::{debug, info};

use crate::engine::context;
use crate::engine::{BuildRequest, EngineError, EngineMessage, EventStream, ImageEngine};

/// A handle to the local Docker daemon.
pub struct DockerEngine {
  client: Docker,
}

impl DockerEngine {
  /// Connect using `DOCKER_HOST` or the platform default socket.
  ///
  /// This only prepares the client; the daemon is first contacted by the
  /// first request.
  pub fn connect() -> Result<Self, EngineError> {
    let client = Docker::connect_with_local_defaults().map_err(|e| EngineError::Connection(e.to_string()))?;
    Ok(Self { client })
  }
}

impl ImageEngine for DockerEngine {
  async fn build_image(&self, request: &BuildRequest) -> Result<EventStream<'_>, EngineError> {
    let archive = context::pack(&request.context, &request.recipe)?;

    // The build stream is lazy; make sure the daemon answers before handing
    // it out.
    self
      .client
      .ping()
      .await
      .map_err(|e| EngineError::Connection(e.to_string()))?;

    info!(
      tag = %request.tag,
      recipe = %request.recipe,
      context_bytes = archive.len(),
      "starting engine build"
    );

    let options = BuildImageOptions {
      dockerfile: request.recipe.clone(),
      t: request.tag.clone(),
      buildargs: request
        .build_args
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect::<HashMap<_, _>>(),
      rm: request.remove_intermediate,
      ..Default::default()
    };

    let stream = self
      .client
      .build_image(options, None, Some(archive.into()))
      .map(|item| match item {
        Ok(info) => Ok(message_from_build_info(info)),
        Err(err) => from_stream_error(err),
      });

    Ok(stream.boxed())
  }

  async fn inspect_image(&self, tag: &str) -> Result<(), EngineError> {
    debug!(tag = %tag, "inspecting image");
    match self.client.inspect_image(tag).await {
      Ok(_) => Ok(()),
      Err(DockerError::DockerResponseServerError { status_code: 404, .. }) => {
        Err(EngineError::ImageNotFound(tag.to_string()))
      }
      Err(err) => Err(from_docker_error(err)),
    }
  }
}

fn message_from_build_info(info: BuildInfo) -> EngineMessage {
  EngineMessage {
    stream: info.stream,
    status: info.status,
    id: info.id,
    error: info.error,
  }
}

/// Errors the daemon reports inside the build stream are build failures, not
/// transport failures.
fn from_stream_error(err: DockerError) -> Result<EngineMessage, EngineError> {
  match err {
    DockerError::DockerStreamError { error } => Ok(EngineMessage::error(error)),
    other => Err(from_docker_error(other)),
  }
}

fn from_docker_error(err: DockerError) -> EngineError {
  match err {
    DockerError::DockerResponseServerError { status_code, message } => {
      EngineError::Api(format!("{} (status {})", message, status_code))
    }
    DockerError::IOError { err } => EngineError::Connection(err.to_string()),
    err @ DockerError::HyperLegacyError { .. } => EngineError::Connection(err.to_string()),
    other => EngineError::Api(other.to_string()),
  }
}
