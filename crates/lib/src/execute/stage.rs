//! Single stage execution.
//!
//! This module runs one [`BuildSpec`] against the engine and produces its
//! [`BuildOutcome`]. Every fault is converted to a failed outcome here; nothing
//! escapes the runner.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::build::{BuildOutcome, BuildSpec, StageFailure};
use crate::engine::{BuildRequest, EngineError, ImageEngine};
use crate::execute::types::RunOptions;
use crate::progress::ProgressEvent;
use crate::report::Reporter;
use crate::sink::{LogSink, SinkError};

pub struct StageRunner<'a, E> {
  engine: &'a E,
  reporter: &'a dyn Reporter,
  options: &'a RunOptions,
}

impl<'a, E: ImageEngine> StageRunner<'a, E> {
  pub fn new(engine: &'a E, reporter: &'a dyn Reporter, options: &'a RunOptions) -> Self {
    Self {
      engine,
      reporter,
      options,
    }
  }

  /// Where this stage's build log goes.
  ///
  /// Verbose runs stream interactively and are not also archived to disk.
  pub fn log_file(&self, spec: &BuildSpec) -> Option<PathBuf> {
    if self.options.verbose {
      return None;
    }
    spec.log_name.as_ref().map(|name| self.options.log_dir.join(name))
  }

  /// Run one stage to its terminal outcome.
  ///
  /// In simulation mode the resolved spec is reported and a tagless success
  /// returned without touching the engine. An engine that emits no events at
  /// all counts as a successful build.
  pub async fn run(&self, spec: &BuildSpec) -> BuildOutcome {
    let log_file = self.log_file(spec);

    if self.options.dry_run {
      debug!(stage = %spec.kind, tag = %spec.tag, "simulating stage");
      self.reporter.plan(spec, log_file.as_deref());
      return BuildOutcome::simulated(spec.kind);
    }

    info!(stage = %spec.kind, tag = %spec.tag, "running stage");

    let mut written = None;
    match self.stream_build(spec, log_file.as_deref(), &mut written).await {
      Ok(()) => {
        info!(stage = %spec.kind, tag = %spec.tag, "stage succeeded");
        self.reporter.stage_succeeded(&spec.tag);
        BuildOutcome::success(spec.kind, spec.tag.clone()).with_log_file(written)
      }
      Err(failure) => {
        warn!(stage = %spec.kind, tag = %spec.tag, error = %failure, "stage failed");
        self.reporter.stage_failed(&failure);
        BuildOutcome::failed(spec.kind, failure).with_log_file(written)
      }
    }
  }

  /// Start the build and feed its events to a sink until exhaustion or the
  /// first error. `written` receives the log path once the sink has opened it.
  ///
  /// The sink (and with it the log file) is only opened once the engine has
  /// answered, so a build that never reaches the engine leaves any earlier log
  /// untouched.
  async fn stream_build(
    &self,
    spec: &BuildSpec,
    log_file: Option<&Path>,
    written: &mut Option<PathBuf>,
  ) -> Result<(), StageFailure> {
    let request = BuildRequest::from(spec);
    let mut events = self.engine.build_image(&request).await.map_err(transport_failure)?;

    let mut sink = None;
    while let Some(item) = events.next().await {
      let message = item.map_err(transport_failure)?;
      if sink.is_none() {
        sink = Some(self.open_sink(spec, log_file, written)?);
      }
      if let (Some(event), Some(active)) = (ProgressEvent::from_message(message), sink.as_mut()) {
        active.record(event).map_err(sink_failure)?;
      }
    }

    if sink.is_none() {
      debug!(tag = %spec.tag, "engine produced no events, treating build as successful");
      self.open_sink(spec, log_file, written)?;
    }
    Ok(())
  }

  fn open_sink(
    &self,
    spec: &BuildSpec,
    log_file: Option<&Path>,
    written: &mut Option<PathBuf>,
  ) -> Result<LogSink<'a>, StageFailure> {
    let sink = LogSink::open(&spec.label, log_file, self.options.verbose, self.reporter).map_err(sink_failure)?;
    *written = sink.path().map(Path::to_path_buf);
    Ok(sink)
  }
}

fn transport_failure(err: EngineError) -> StageFailure {
  StageFailure::transport(err.to_string())
}

fn sink_failure(err: SinkError) -> StageFailure {
  match err {
    SinkError::Build(message) => StageFailure::build(message),
    other => StageFailure::transport(other.to_string()),
  }
}
