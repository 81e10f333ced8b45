//! Project configuration.
//!
//! Image families, recipe names and build defaults. Every key is optional;
//! anything missing falls back to the built-in defaults, so a project with no
//! config file at all behaves like the stock Clang/devcontainer setup.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{CONFIG_ENV_VAR, CONFIG_FILE_NAME};

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
  /// Image family for compiler tags.
  pub image: String,
  pub recipe: String,
  pub source_url: String,
  /// Prefix of the default source ref (`<prefix>-<version><suffix>`).
  pub ref_prefix: String,
  pub ref_suffix: String,
  pub parallelism: u32,
  /// Log files are named `<log_prefix>-<version>.log`.
  pub log_prefix: String,
}

impl Default for CompilerConfig {
  fn default() -> Self {
    Self {
      image: "clang-ubuntu".to_string(),
      recipe: "Dockerfile.clang.ubuntu".to_string(),
      source_url: "https://github.com/llvm/llvm-project.git".to_string(),
      ref_prefix: "llvmorg".to_string(),
      ref_suffix: ".1.2".to_string(),
      parallelism: 4,
      log_prefix: "build-clang".to_string(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
  pub image: String,
  pub recipe: String,
  /// Build argument through which the recipe receives the compiler image.
  pub base_image_arg: String,
}

impl Default for EnvironmentConfig {
  fn default() -> Self {
    Self {
      image: "devcontainer-clang".to_string(),
      recipe: "Dockerfile.devcontainer.clang".to_string(),
      base_image_arg: "CLANG_BASE_IMAGE".to_string(),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
  pub compiler: CompilerConfig,
  pub environment: EnvironmentConfig,
}

impl ProjectConfig {
  pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Resolve the project config.
  ///
  /// Lookup order: `explicit`, then `$CLANGBOX_CONFIG`, then `clangbox.toml` in
  /// the context directory, then defaults. An explicitly named file that does
  /// not exist is an error; a missing `clangbox.toml` is not.
  pub fn load(explicit: Option<&Path>, context: &Path) -> Result<Self, ConfigError> {
    let named = explicit
      .map(Path::to_path_buf)
      .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from));

    if let Some(path) = named {
      debug!(path = %path.display(), "loading project config");
      return Self::from_file(&path);
    }

    let candidate = context.join(CONFIG_FILE_NAME);
    if candidate.is_file() {
      debug!(path = %candidate.display(), "loading project config from context");
      return Self::from_file(&candidate);
    }

    debug!("no project config found, using defaults");
    Ok(Self::default())
  }
}
