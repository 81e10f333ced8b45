//! Stage pipeline execution.
//!
//! This module provides the entry points for running an ordered list of stage
//! specs. It handles:
//! - Prerequisite gating through the image oracle
//! - Skipping stages whose output already exists
//! - Halting on the first failed stage
//! - Racing the whole run against an external interrupt

mod stage;
pub mod types;

use std::future::Future;

use tracing::{debug, info, warn};

use crate::build::{BuildOutcome, BuildSpec, StageFailure};
use crate::engine::ImageEngine;
use crate::oracle::ImageOracle;
use crate::report::Reporter;

pub use stage::StageRunner;
pub use types::{PipelineResult, RunOptions, RunStatus};

/// Runs stages strictly in order, one at a time.
pub struct Pipeline<'a, E> {
  engine: &'a E,
  reporter: &'a dyn Reporter,
  options: &'a RunOptions,
}

impl<'a, E: ImageEngine> Pipeline<'a, E> {
  pub fn new(engine: &'a E, reporter: &'a dyn Reporter, options: &'a RunOptions) -> Self {
    Self {
      engine,
      reporter,
      options,
    }
  }

  /// Run every stage until one fails.
  ///
  /// Stages after the first failure are not attempted and do not appear in
  /// the result. A skipped stage counts as satisfied.
  pub async fn run_all(&self, stages: &[BuildSpec]) -> PipelineResult {
    info!(
      stage_count = stages.len(),
      dry_run = self.options.dry_run,
      "starting pipeline"
    );

    let runner = StageRunner::new(self.engine, self.reporter, self.options);
    let oracle = ImageOracle::new(self.engine, self.options.dry_run);
    let mut result = PipelineResult::default();

    for spec in stages {
      let outcome = match self.preflight(&oracle, spec).await {
        Some(outcome) => outcome,
        None => runner.run(spec).await,
      };

      let failed = outcome.is_failed();
      result.outcomes.push(outcome);

      if failed {
        warn!(stage = %spec.kind, "stage failed, halting pipeline");
        break;
      }
    }

    info!(
      attempted = result.len(),
      success = result.is_success(),
      "pipeline finished"
    );
    result
  }

  /// Decide a stage without building it, if possible.
  async fn preflight(&self, oracle: &ImageOracle<'_, E>, spec: &BuildSpec) -> Option<BuildOutcome> {
    if let Some(prerequisite) = &spec.requires {
      match oracle.exists(&prerequisite.tag).await {
        Ok(true) => debug!(tag = %prerequisite.tag, "prerequisite present"),
        Ok(false) => {
          return Some(self.fail(spec, StageFailure::prerequisite_missing(prerequisite)));
        }
        Err(err) => return Some(self.fail(spec, StageFailure::transport(err.to_string()))),
      }
    }

    if self.options.skip_existing && !self.options.dry_run {
      match oracle.exists(&spec.tag).await {
        Ok(true) => {
          info!(stage = %spec.kind, tag = %spec.tag, "image exists, skipping stage");
          self.reporter.stage_skipped(&spec.tag);
          return Some(BuildOutcome::skipped(spec.kind, spec.tag.clone()));
        }
        Ok(false) => {}
        Err(err) => return Some(self.fail(spec, StageFailure::transport(err.to_string()))),
      }
    }

    None
  }

  fn fail(&self, spec: &BuildSpec, failure: StageFailure) -> BuildOutcome {
    warn!(stage = %spec.kind, error = %failure, "stage rejected before build");
    self.reporter.stage_failed(&failure);
    BuildOutcome::failed(spec.kind, failure)
  }
}

/// Race a pipeline run against an interrupt.
///
/// When `interrupt` completes first the pipeline future is dropped, which
/// closes any open build log, and [`RunStatus::Interrupted`] is returned.
pub async fn run_interruptible<W, I>(work: W, interrupt: I) -> RunStatus
where
  W: Future<Output = PipelineResult>,
  I: Future<Output = ()>,
{
  tokio::select! {
    result = work => RunStatus::Finished(result),
    () = interrupt => {
      warn!("interrupted, abandoning pipeline");
      RunStatus::Interrupted
    }
  }
}
