//! Test doubles for the engine and reporter seams.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use futures::StreamExt;
use futures::stream;

use crate::build::{BuildSpec, StageFailure};
use crate::engine::{BuildRequest, EngineError, EngineMessage, EventStream, ImageEngine};
use crate::report::Reporter;

/// Engine faults a script can inject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFault {
  Connection,
  Api,
}

impl EngineFault {
  fn into_error(self) -> EngineError {
    match self {
      EngineFault::Connection => EngineError::Connection("connection refused".to_string()),
      EngineFault::Api => EngineError::Api("unexpected response".to_string()),
    }
  }
}

#[derive(Debug, Clone, Default)]
struct BuildScript {
  messages: Vec<EngineMessage>,
  /// Fault returned instead of a stream.
  start_fault: Option<EngineFault>,
  /// Fault yielded after all messages.
  stream_fault: Option<EngineFault>,
  /// Never finish after the scripted messages.
  hang: bool,
}

impl BuildScript {
  fn succeeds(&self) -> bool {
    self.start_fault.is_none()
      && self.stream_fault.is_none()
      && !self.hang
      && self.messages.iter().all(|m| m.error.is_none())
  }
}

/// An in-memory engine that plays back scripted builds and records every call.
///
/// Builds without a script succeed with an empty stream. A build scripted to
/// succeed adds its tag to the image store when it starts.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
  images: Mutex<HashSet<String>>,
  scripts: HashMap<String, BuildScript>,
  inspect_fault: Option<EngineFault>,
  builds: Mutex<Vec<BuildRequest>>,
  inspected: Mutex<Vec<String>>,
}

impl ScriptedEngine {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_image(self, tag: &str) -> Self {
    self.images.lock().unwrap().insert(tag.to_string());
    self
  }

  pub fn with_build(mut self, tag: &str, messages: Vec<EngineMessage>) -> Self {
    self.scripts.entry(tag.to_string()).or_default().messages = messages;
    self
  }

  pub fn with_start_fault(mut self, tag: &str, fault: EngineFault) -> Self {
    self.scripts.entry(tag.to_string()).or_default().start_fault = Some(fault);
    self
  }

  pub fn with_stream_fault(mut self, tag: &str, messages: Vec<EngineMessage>, fault: EngineFault) -> Self {
    let script = self.scripts.entry(tag.to_string()).or_default();
    script.messages = messages;
    script.stream_fault = Some(fault);
    self
  }

  pub fn with_hanging_build(mut self, tag: &str, messages: Vec<EngineMessage>) -> Self {
    let script = self.scripts.entry(tag.to_string()).or_default();
    script.messages = messages;
    script.hang = true;
    self
  }

  pub fn with_inspect_fault(mut self, fault: EngineFault) -> Self {
    self.inspect_fault = Some(fault);
    self
  }

  /// Tags of every build started, in order.
  pub fn built(&self) -> Vec<String> {
    self.builds.lock().unwrap().iter().map(|r| r.tag.clone()).collect()
  }

  pub fn build_requests(&self) -> Vec<BuildRequest> {
    self.builds.lock().unwrap().clone()
  }

  /// Tags of every image lookup, in order.
  pub fn inspected(&self) -> Vec<String> {
    self.inspected.lock().unwrap().clone()
  }

  /// Total number of engine calls of any kind.
  pub fn calls(&self) -> usize {
    self.builds.lock().unwrap().len() + self.inspected.lock().unwrap().len()
  }
}

impl ImageEngine for ScriptedEngine {
  async fn build_image(&self, request: &BuildRequest) -> Result<EventStream<'_>, EngineError> {
    self.builds.lock().unwrap().push(request.clone());
    let script = self.scripts.get(&request.tag).cloned().unwrap_or_default();

    if let Some(fault) = script.start_fault {
      return Err(fault.into_error());
    }
    if script.succeeds() {
      self.images.lock().unwrap().insert(request.tag.clone());
    }

    let messages = stream::iter(script.messages.into_iter().map(Ok));
    let tail = stream::iter(script.stream_fault.map(|f| Err(f.into_error())));

    if script.hang {
      Ok(messages.chain(tail).chain(stream::pending()).boxed())
    } else {
      Ok(messages.chain(tail).boxed())
    }
  }

  async fn inspect_image(&self, tag: &str) -> Result<(), EngineError> {
    self.inspected.lock().unwrap().push(tag.to_string());

    if let Some(fault) = self.inspect_fault {
      return Err(fault.into_error());
    }
    if self.images.lock().unwrap().contains(tag) {
      Ok(())
    } else {
      Err(EngineError::ImageNotFound(tag.to_string()))
    }
  }
}

/// Everything a [`RecordingReporter`] saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
  Started(String),
  Plan { tag: String, log_file: Option<PathBuf> },
  Output(String),
  Status(String),
  BuildError(String),
  LogSaved(PathBuf),
  Succeeded(String),
  Skipped(String),
  Failed(StageFailure),
}

#[derive(Debug, Default)]
pub struct RecordingReporter {
  reports: Mutex<Vec<Report>>,
}

impl RecordingReporter {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn reports(&self) -> Vec<Report> {
    self.reports.lock().unwrap().clone()
  }

  pub fn count(&self, predicate: impl Fn(&Report) -> bool) -> usize {
    self.reports().iter().filter(|r| predicate(r)).count()
  }

  fn push(&self, report: Report) {
    self.reports.lock().unwrap().push(report);
  }
}

impl Reporter for RecordingReporter {
  fn stage_started(&self, label: &str) {
    self.push(Report::Started(label.to_string()));
  }

  fn plan(&self, spec: &BuildSpec, log_file: Option<&Path>) {
    self.push(Report::Plan {
      tag: spec.tag.clone(),
      log_file: log_file.map(Path::to_path_buf),
    });
  }

  fn output(&self, text: &str) {
    self.push(Report::Output(text.to_string()));
  }

  fn status(&self, line: &str) {
    self.push(Report::Status(line.to_string()));
  }

  fn build_error(&self, message: &str) {
    self.push(Report::BuildError(message.to_string()));
  }

  fn log_saved(&self, path: &Path) {
    self.push(Report::LogSaved(path.to_path_buf()));
  }

  fn stage_succeeded(&self, tag: &str) {
    self.push(Report::Succeeded(tag.to_string()));
  }

  fn stage_skipped(&self, tag: &str) {
    self.push(Report::Skipped(tag.to_string()));
  }

  fn stage_failed(&self, failure: &StageFailure) {
    self.push(Report::Failed(failure.clone()));
  }
}
