mod build;

use std::path::PathBuf;

use clap::Args;

use clangbox_lib::consts::CONFIG_ENV_VAR;
use clangbox_lib::execute::RunOptions;

use crate::output::OutputFormat;

pub use build::{cmd_build_all, cmd_build_compiler, cmd_build_environment};

/// Flags shared by every build command.
#[derive(Debug, Args)]
pub struct GlobalArgs {
  /// Print the resolved build plan without contacting the container engine
  #[arg(long, global = true)]
  pub dry_run: bool,

  /// Stream build output to the terminal instead of a log file
  #[arg(short, long, global = true)]
  pub verbose: bool,

  /// Build context directory containing the recipes
  #[arg(long, global = true, default_value = ".")]
  pub context: PathBuf,

  /// Project config file (default: clangbox.toml in the build context)
  #[arg(long, global = true, env = CONFIG_ENV_VAR)]
  pub config: Option<PathBuf>,

  /// Directory build logs are written to
  #[arg(long, global = true, default_value = ".")]
  pub log_dir: PathBuf,

  /// Skip stages whose image already exists
  #[arg(long, global = true)]
  pub skip_existing: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  pub output: OutputFormat,
}

impl GlobalArgs {
  pub fn run_options(&self) -> RunOptions {
    RunOptions {
      dry_run: self.dry_run,
      verbose: self.verbose,
      skip_existing: self.skip_existing,
      log_dir: self.log_dir.clone(),
    }
  }
}
