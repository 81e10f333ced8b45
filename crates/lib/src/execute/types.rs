//! Types for pipeline execution.
//!
//! This module defines the configuration, result and exit status types for
//! running build stages.

use std::path::PathBuf;

use serde::Serialize;

use crate::build::{BuildOutcome, BuildStatus};

/// Configuration for stage execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
  /// Report the plan without contacting the engine.
  pub dry_run: bool,

  /// Stream build output interactively instead of writing log files.
  pub verbose: bool,

  /// Skip a stage whose output image already exists.
  pub skip_existing: bool,

  /// Directory build logs are written to.
  pub log_dir: PathBuf,
}

impl Default for RunOptions {
  fn default() -> Self {
    Self {
      dry_run: false,
      verbose: false,
      skip_existing: false,
      log_dir: PathBuf::from("."),
    }
  }
}

/// Outcomes of every stage attempted, in execution order.
///
/// Stages after the first failure are never attempted and do not appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineResult {
  pub outcomes: Vec<BuildOutcome>,
}

impl PipelineResult {
  /// Returns true if no attempted stage failed.
  pub fn is_success(&self) -> bool {
    !self.outcomes.iter().any(BuildOutcome::is_failed)
  }

  /// The failed outcome, if any. At most one exists.
  pub fn failure(&self) -> Option<&BuildOutcome> {
    self.outcomes.iter().find(|o| o.is_failed())
  }

  pub fn count(&self, status: BuildStatus) -> usize {
    self.outcomes.iter().filter(|o| o.status == status).count()
  }

  pub fn len(&self) -> usize {
    self.outcomes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.outcomes.is_empty()
  }
}

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
  Finished(PipelineResult),
  /// Stopped by an external interrupt before completing.
  Interrupted,
}

impl RunStatus {
  /// Process exit code: 0 on success, 1 on failure, 130 when interrupted.
  pub fn exit_code(&self) -> u8 {
    match self {
      RunStatus::Finished(result) if result.is_success() => 0,
      RunStatus::Finished(_) => 1,
      RunStatus::Interrupted => 130,
    }
  }
}
