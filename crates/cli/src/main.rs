//! clangbox: build versioned Clang toolchain images and the devcontainer
//! images layered on top of them.

mod cmd;
mod output;

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use clangbox_lib::build::{AllArgs, CompilerArgs, EnvironmentArgs};

use crate::cmd::GlobalArgs;
use crate::output::print_error;

#[derive(Parser)]
#[command(name = "clangbox")]
#[command(author, version, about = "Build Clang compiler and devcontainer images", long_about = None)]
struct Cli {
  #[command(flatten)]
  global: GlobalArgs,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Build the Clang compiler image from source
  BuildCompiler {
    /// Clang major version to build (e.g. 21)
    #[arg(long = "version", value_name = "VERSION")]
    clang_version: u32,

    /// Git ref to build (default: llvmorg-<VERSION>.1.2)
    #[arg(long)]
    source_ref: Option<String>,

    /// Git repository to clone LLVM from
    #[arg(long)]
    source_url: Option<String>,

    /// Parallel compile jobs inside the build
    #[arg(short = 'j', long)]
    parallelism: Option<u32>,

    /// Appended to the image tag (e.g. "-debug")
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    tag_suffix: String,
  },

  /// Build the devcontainer image on top of an existing compiler image
  BuildEnvironment {
    /// Clang version of the compiler image to build on
    #[arg(long)]
    base_version: u32,

    /// Tag suffix shared by the compiler and devcontainer images
    #[arg(long, default_value = "", allow_hyphen_values = true)]
    tag_suffix: String,
  },

  /// Build the compiler image, then the devcontainer image
  BuildAll {
    /// Clang major version to build (e.g. 21)
    #[arg(long)]
    base_version: u32,

    /// Git ref to build (default: llvmorg-<VERSION>.1.2)
    #[arg(long)]
    source_ref: Option<String>,

    /// Parallel compile jobs inside the build
    #[arg(short = 'j', long)]
    parallelism: Option<u32>,
  },
}

fn main() -> ExitCode {
  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(err) => {
      let code = match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
      };
      let _ = err.print();
      return ExitCode::from(code);
    }
  };

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let Some(command) = cli.command else {
    let _ = Cli::command().print_help();
    return ExitCode::from(1);
  };

  let result = match command {
    Commands::BuildCompiler {
      clang_version,
      source_ref,
      source_url,
      parallelism,
      tag_suffix,
    } => cmd::cmd_build_compiler(
      CompilerArgs {
        version: clang_version,
        source_ref,
        source_url,
        parallelism,
        tag_suffix,
      },
      &cli.global,
    ),
    Commands::BuildEnvironment {
      base_version,
      tag_suffix,
    } => cmd::cmd_build_environment(
      EnvironmentArgs {
        base_version,
        parallelism: None,
        tag_suffix,
      },
      &cli.global,
    ),
    Commands::BuildAll {
      base_version,
      source_ref,
      parallelism,
    } => cmd::cmd_build_all(
      AllArgs {
        base_version,
        source_ref,
        parallelism,
      },
      &cli.global,
    ),
  };

  match result {
    Ok(code) => code,
    Err(err) => {
      print_error(&format!("{:#}", err));
      ExitCode::from(1)
    }
  }
}
