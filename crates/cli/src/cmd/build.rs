//! Implementation of the `clangbox build-*` commands.
//!
//! Each command expands into an ordered list of stages, runs them through the
//! pipeline against Docker (or nothing, in dry-run mode) and maps the result
//! to a process exit code.

use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{info, warn};

use clangbox_lib::build::{AllArgs, BuildSpec, BuildStatus, CompilerArgs, EnvironmentArgs, Workflow};
use clangbox_lib::config::ProjectConfig;
use clangbox_lib::engine::{DockerEngine, ImageEngine, OfflineEngine};
use clangbox_lib::execute::{Pipeline, RunOptions, RunStatus, run_interruptible};

use crate::cmd::GlobalArgs;
use crate::output::{ConsoleReporter, format_duration, print_info, print_json, print_stat, print_success, print_warning};

pub fn cmd_build_compiler(args: CompilerArgs, global: &GlobalArgs) -> Result<ExitCode> {
  let status = execute(Workflow::Compiler(args), global)?;
  finish(&status, global)
}

pub fn cmd_build_environment(args: EnvironmentArgs, global: &GlobalArgs) -> Result<ExitCode> {
  let status = execute(Workflow::Environment(args), global)?;
  finish(&status, global)
}

/// Build the compiler image, then the devcontainer on top of it.
pub fn cmd_build_all(args: AllArgs, global: &GlobalArgs) -> Result<ExitCode> {
  let version = args.base_version;
  let text = !global.output.is_json();

  if text {
    print_info(&format!("Building Clang {} and devcontainer...", version));
  }

  let status = execute(Workflow::All(args), global)?;

  if text && !global.dry_run && matches!(&status, RunStatus::Finished(result) if result.is_success()) {
    println!();
    print_success(&format!("Successfully built all containers for Clang {}", version));
  }

  finish(&status, global)
}

/// Plan the workflow and run it to completion or interruption.
fn execute(workflow: Workflow, global: &GlobalArgs) -> Result<RunStatus> {
  let config =
    ProjectConfig::load(global.config.as_deref(), &global.context).context("Failed to load project config")?;
  let stages = workflow
    .stages(&config, &global.context)
    .context("Invalid build request")?;

  info!(
    version = workflow.version(),
    stages = stages.len(),
    context = %global.context.display(),
    "planned build"
  );

  let options = global.run_options();
  let reporter = ConsoleReporter::new(global.output);
  let start = Instant::now();

  let rt = tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .context("Failed to create async runtime")?;

  let status = if options.dry_run {
    rt.block_on(run_stages(&OfflineEngine, &reporter, &options, &stages))
  } else {
    let engine = DockerEngine::connect().context("Failed to connect to Docker")?;
    rt.block_on(run_stages(&engine, &reporter, &options, &stages))
  };

  if !global.output.is_json() && !options.dry_run {
    if let RunStatus::Finished(result) = &status {
      let built = result.count(BuildStatus::Success);
      if built > 0 || result.count(BuildStatus::Skipped) > 0 {
        println!();
        print_stat("Images built", &built.to_string());
        print_stat("Images skipped", &result.count(BuildStatus::Skipped).to_string());
        print_stat("Duration", &format_duration(start.elapsed()));
      }
    }
  }

  Ok(status)
}

async fn run_stages<E: ImageEngine>(
  engine: &E,
  reporter: &ConsoleReporter,
  options: &RunOptions,
  stages: &[BuildSpec],
) -> RunStatus {
  let pipeline = Pipeline::new(engine, reporter, options);
  run_interruptible(pipeline.run_all(stages), interrupted()).await
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
  if let Err(err) = tokio::signal::ctrl_c().await {
    warn!(error = %err, "failed to listen for interrupt");
    std::future::pending::<()>().await;
  }
}

fn finish(status: &RunStatus, global: &GlobalArgs) -> Result<ExitCode> {
  match status {
    RunStatus::Finished(result) => {
      if global.output.is_json() {
        print_json(result)?;
      } else if global.dry_run {
        println!();
        print_info("Dry run - no images built");
      }
    }
    RunStatus::Interrupted => {
      if !global.output.is_json() {
        println!();
      }
      print_warning("Build interrupted by user");
    }
  }

  Ok(ExitCode::from(status.exit_code()))
}
