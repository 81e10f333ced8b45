//! User-facing progress reporting.
//!
//! The library never prints. Everything a user should see goes through a
//! [`Reporter`]; the CLI renders it to the terminal, tests record it.

use std::path::Path;

use crate::build::{BuildSpec, StageFailure};

pub trait Reporter {
  /// A stage is about to stream its build.
  fn stage_started(&self, label: &str);

  /// Simulation mode: the fully resolved spec that would be built.
  fn plan(&self, spec: &BuildSpec, log_file: Option<&Path>);

  /// Verbatim build output (verbose mode only).
  fn output(&self, text: &str);

  /// Formatted status line (verbose mode only).
  fn status(&self, line: &str);

  /// The engine signalled an in-build error.
  fn build_error(&self, message: &str);

  /// A build log file was closed.
  fn log_saved(&self, path: &Path);

  fn stage_succeeded(&self, tag: &str);

  /// The stage was not built because its image already exists.
  fn stage_skipped(&self, tag: &str);

  fn stage_failed(&self, failure: &StageFailure);
}
