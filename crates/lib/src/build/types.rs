use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The two image-producing stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
  Compiler,
  Environment,
}

impl StageKind {
  pub fn as_str(self) -> &'static str {
    match self {
      StageKind::Compiler => "compiler",
      StageKind::Environment => "environment",
    }
  }
}

impl fmt::Display for StageKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// An image that must already exist before a stage may run.
///
/// This is a read-only reference to another stage's output tag. The dependent
/// stage never owns or modifies the prerequisite image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prerequisite {
  /// Tag that must be present in the engine's image store.
  pub tag: String,
  /// Command that produces the missing tag.
  pub remedy: String,
}

/// Fully resolved inputs for one stage invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
  pub kind: StageKind,
  /// Human-readable description, e.g. "Building Clang 21 from llvmorg-21.1.2".
  pub label: String,
  /// Directory sent to the engine as the build context.
  pub context: PathBuf,
  /// Recipe (Dockerfile) path relative to the context.
  pub recipe: String,
  pub tag: String,
  pub build_args: BTreeMap<String, String>,
  /// Passed through to the recipe; never scheduled by us.
  pub parallelism: u32,
  /// File name for the persisted build log, if this stage keeps one.
  pub log_name: Option<String>,
  pub requires: Option<Prerequisite>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildStatus {
  Success,
  Failed,
  Skipped,
}

/// Which part of the system a stage failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
  /// The stage's prerequisite image is not in the store.
  PrerequisiteMissing,
  /// The engine reported an error from inside the build.
  Build,
  /// The engine could not be reached, or the build log could not be written.
  Transport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
  pub kind: FailureKind,
  pub message: String,
  /// Command the user can run to fix the failure.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hint: Option<String>,
}

impl StageFailure {
  pub fn prerequisite_missing(prerequisite: &Prerequisite) -> Self {
    Self {
      kind: FailureKind::PrerequisiteMissing,
      message: format!("Base image {} not found", prerequisite.tag),
      hint: Some(prerequisite.remedy.clone()),
    }
  }

  pub fn build(message: impl Into<String>) -> Self {
    Self {
      kind: FailureKind::Build,
      message: message.into(),
      hint: None,
    }
  }

  pub fn transport(message: impl Into<String>) -> Self {
    Self {
      kind: FailureKind::Transport,
      message: message.into(),
      hint: None,
    }
  }

  /// The raw failure text, without any prefix.
  pub fn detail(&self) -> &str {
    &self.message
  }
}

impl fmt::Display for StageFailure {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.kind {
      FailureKind::PrerequisiteMissing => write!(f, "{}", self.message),
      FailureKind::Build => write!(f, "Build failed: {}", self.message),
      FailureKind::Transport => write!(f, "Image engine error: {}", self.message),
    }
  }
}

/// Terminal result of one stage execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOutcome {
  pub stage: StageKind,
  pub status: BuildStatus,
  /// Tag produced (or found, when skipped). `None` for simulated runs.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub tag: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub failure: Option<StageFailure>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub log_file: Option<PathBuf>,
}

impl BuildOutcome {
  pub fn success(stage: StageKind, tag: impl Into<String>) -> Self {
    Self {
      stage,
      status: BuildStatus::Success,
      tag: Some(tag.into()),
      failure: None,
      log_file: None,
    }
  }

  /// Success without an artifact; simulation never claims a real image.
  pub fn simulated(stage: StageKind) -> Self {
    Self {
      stage,
      status: BuildStatus::Success,
      tag: None,
      failure: None,
      log_file: None,
    }
  }

  pub fn skipped(stage: StageKind, tag: impl Into<String>) -> Self {
    Self {
      stage,
      status: BuildStatus::Skipped,
      tag: Some(tag.into()),
      failure: None,
      log_file: None,
    }
  }

  pub fn failed(stage: StageKind, failure: StageFailure) -> Self {
    Self {
      stage,
      status: BuildStatus::Failed,
      tag: None,
      failure: Some(failure),
      log_file: None,
    }
  }

  pub fn with_log_file(mut self, log_file: Option<PathBuf>) -> Self {
    self.log_file = log_file;
    self
  }

  pub fn is_success(&self) -> bool {
    self.status == BuildStatus::Success
  }

  pub fn is_failed(&self) -> bool {
    self.status == BuildStatus::Failed
  }
}
