//! Turning user requests into ordered stage specs.
//!
//! All naming conventions live here: image tags, the default source ref, log
//! file names, build arguments and the remedy command shown when a
//! prerequisite image is missing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::build::{BuildSpec, Prerequisite, StageKind};
use crate::config::{CompilerConfig, EnvironmentConfig, ProjectConfig};
use crate::consts::{APP_NAME, MAX_TAG_LEN};

/// Invalid user input, reported before the engine is contacted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpecError {
  #[error("version must be a positive integer, got {0}")]
  InvalidVersion(u32),

  #[error("parallelism must be at least 1")]
  InvalidParallelism,

  #[error("{0} must not be empty")]
  Empty(&'static str),

  #[error("invalid tag suffix '{0}': only letters, digits, '_', '.' and '-' are allowed")]
  InvalidSuffix(String),

  #[error("tag '{tag}' is longer than {max} characters")]
  TagTooLong { tag: String, max: usize },

  #[error("build context {0} is not a directory")]
  MissingContext(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerArgs {
  pub version: u32,
  pub source_ref: Option<String>,
  pub source_url: Option<String>,
  pub parallelism: Option<u32>,
  pub tag_suffix: String,
}

impl CompilerArgs {
  pub fn new(version: u32) -> Self {
    Self {
      version,
      source_ref: None,
      source_url: None,
      parallelism: None,
      tag_suffix: String::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentArgs {
  pub base_version: u32,
  /// Recorded in the plan only; the devcontainer recipe compiles nothing.
  pub parallelism: Option<u32>,
  pub tag_suffix: String,
}

impl EnvironmentArgs {
  pub fn new(base_version: u32) -> Self {
    Self {
      base_version,
      parallelism: None,
      tag_suffix: String::new(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllArgs {
  pub base_version: u32,
  pub source_ref: Option<String>,
  pub parallelism: Option<u32>,
}

/// A user-facing build request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Workflow {
  Compiler(CompilerArgs),
  Environment(EnvironmentArgs),
  All(AllArgs),
}

impl Workflow {
  /// Expand into stage specs, in execution order.
  pub fn stages(&self, config: &ProjectConfig, context: &Path) -> Result<Vec<BuildSpec>, SpecError> {
    if !context.is_dir() {
      return Err(SpecError::MissingContext(context.to_path_buf()));
    }

    match self {
      Workflow::Compiler(args) => Ok(vec![compiler_spec(args, &config.compiler, context)?]),
      Workflow::Environment(args) => Ok(vec![environment_spec(args, config, context)?]),
      Workflow::All(args) => {
        let compiler = CompilerArgs {
          version: args.base_version,
          source_ref: args.source_ref.clone(),
          source_url: None,
          parallelism: args.parallelism,
          tag_suffix: String::new(),
        };
        let environment = EnvironmentArgs {
          base_version: args.base_version,
          parallelism: args.parallelism,
          tag_suffix: String::new(),
        };

        Ok(vec![
          compiler_spec(&compiler, &config.compiler, context)?,
          environment_spec(&environment, config, context)?,
        ])
      }
    }
  }

  /// The compiler version every stage of this request is built around.
  pub fn version(&self) -> u32 {
    match self {
      Workflow::Compiler(args) => args.version,
      Workflow::Environment(args) => args.base_version,
      Workflow::All(args) => args.base_version,
    }
  }
}

pub fn compiler_tag(config: &CompilerConfig, version: u32, suffix: &str) -> String {
  format!("{}:{}{}", config.image, version, suffix)
}

pub fn environment_tag(config: &EnvironmentConfig, version: u32, suffix: &str) -> String {
  format!("{}:{}{}", config.image, version, suffix)
}

pub fn default_source_ref(config: &CompilerConfig, version: u32) -> String {
  format!("{}-{}{}", config.ref_prefix, version, config.ref_suffix)
}

pub fn compiler_log_name(config: &CompilerConfig, version: u32) -> String {
  format!("{}-{}.log", config.log_prefix, version)
}

/// The command that builds the compiler image an environment stage needs.
pub fn compiler_remedy(version: u32, suffix: &str) -> String {
  if suffix.is_empty() {
    format!("{} build-compiler --version {}", APP_NAME, version)
  } else {
    format!("{} build-compiler --version {} --tag-suffix {}", APP_NAME, version, suffix)
  }
}

fn compiler_spec(args: &CompilerArgs, config: &CompilerConfig, context: &Path) -> Result<BuildSpec, SpecError> {
  validate_version(args.version)?;
  validate_suffix(&args.tag_suffix)?;

  let source_ref = args
    .source_ref
    .clone()
    .unwrap_or_else(|| default_source_ref(config, args.version));
  let source_url = args.source_url.clone().unwrap_or_else(|| config.source_url.clone());
  let parallelism = args.parallelism.unwrap_or(config.parallelism);

  if source_ref.trim().is_empty() {
    return Err(SpecError::Empty("source ref"));
  }
  if source_url.trim().is_empty() {
    return Err(SpecError::Empty("source url"));
  }
  if parallelism == 0 {
    return Err(SpecError::InvalidParallelism);
  }

  let tag = compiler_tag(config, args.version, &args.tag_suffix);
  validate_tag_len(&tag)?;

  let build_args = BTreeMap::from([
    ("LLVM_GIT_REF".to_string(), source_ref.clone()),
    ("LLVM_GIT_URL".to_string(), source_url),
    ("NUM_JOBS".to_string(), parallelism.to_string()),
  ]);

  Ok(BuildSpec {
    kind: StageKind::Compiler,
    label: format!("Building Clang {} from {}", args.version, source_ref),
    context: context.to_path_buf(),
    recipe: config.recipe.clone(),
    tag,
    build_args,
    parallelism,
    log_name: Some(compiler_log_name(config, args.version)),
    requires: None,
  })
}

fn environment_spec(args: &EnvironmentArgs, config: &ProjectConfig, context: &Path) -> Result<BuildSpec, SpecError> {
  validate_version(args.base_version)?;
  validate_suffix(&args.tag_suffix)?;

  let parallelism = args.parallelism.unwrap_or(config.compiler.parallelism);
  if parallelism == 0 {
    return Err(SpecError::InvalidParallelism);
  }

  let base_image = compiler_tag(&config.compiler, args.base_version, &args.tag_suffix);
  let tag = environment_tag(&config.environment, args.base_version, &args.tag_suffix);
  validate_tag_len(&tag)?;

  let build_args = BTreeMap::from([(config.environment.base_image_arg.clone(), base_image.clone())]);

  Ok(BuildSpec {
    kind: StageKind::Environment,
    label: format!("Building devcontainer with Clang {}", args.base_version),
    context: context.to_path_buf(),
    recipe: config.environment.recipe.clone(),
    tag,
    build_args,
    parallelism,
    log_name: None,
    requires: Some(Prerequisite {
      tag: base_image,
      remedy: compiler_remedy(args.base_version, &args.tag_suffix),
    }),
  })
}

fn validate_version(version: u32) -> Result<(), SpecError> {
  if version == 0 {
    return Err(SpecError::InvalidVersion(version));
  }
  Ok(())
}

fn validate_suffix(suffix: &str) -> Result<(), SpecError> {
  let valid = suffix
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
  if !valid {
    return Err(SpecError::InvalidSuffix(suffix.to_string()));
  }
  Ok(())
}

fn validate_tag_len(tag: &str) -> Result<(), SpecError> {
  if tag.len() > MAX_TAG_LEN {
    return Err(SpecError::TagTooLong {
      tag: tag.to_string(),
      max: MAX_TAG_LEN,
    });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn plan(workflow: Workflow) -> Vec<BuildSpec> {
    let temp = TempDir::new().unwrap();
    workflow.stages(&ProjectConfig::default(), temp.path()).unwrap()
  }

  mod naming {
    use super::*;

    #[test]
    fn version_21_uses_documented_templates() {
      let stages = plan(Workflow::Compiler(CompilerArgs::new(21)));
      let spec = &stages[0];

      assert_eq!(spec.tag, "clang-ubuntu:21");
      assert_eq!(spec.build_args["LLVM_GIT_REF"], "llvmorg-21.1.2");
      assert_eq!(spec.build_args["LLVM_GIT_URL"], "https://github.com/llvm/llvm-project.git");
      assert_eq!(spec.build_args["NUM_JOBS"], "4");
      assert_eq!(spec.log_name.as_deref(), Some("build-clang-21.log"));
      assert_eq!(spec.label, "Building Clang 21 from llvmorg-21.1.2");
    }

    #[test]
    fn explicit_ref_and_suffix_are_used() {
      let stages = plan(Workflow::Compiler(CompilerArgs {
        version: 20,
        source_ref: Some("main".to_string()),
        source_url: Some("https://example.com/llvm.git".to_string()),
        parallelism: Some(16),
        tag_suffix: "-debug".to_string(),
      }));
      let spec = &stages[0];

      assert_eq!(spec.tag, "clang-ubuntu:20-debug");
      assert_eq!(spec.build_args["LLVM_GIT_REF"], "main");
      assert_eq!(spec.build_args["LLVM_GIT_URL"], "https://example.com/llvm.git");
      assert_eq!(spec.build_args["NUM_JOBS"], "16");
      assert_eq!(spec.parallelism, 16);
    }

    #[test]
    fn same_arguments_give_same_tag() {
      let first = plan(Workflow::Compiler(CompilerArgs::new(19)));
      let second = plan(Workflow::Compiler(CompilerArgs::new(19)));
      assert_eq!(first[0].tag, second[0].tag);
    }

    #[test]
    fn environment_requires_matching_compiler_tag() {
      let stages = plan(Workflow::Environment(EnvironmentArgs {
        base_version: 21,
        parallelism: None,
        tag_suffix: "-rc".to_string(),
      }));
      let spec = &stages[0];

      assert_eq!(spec.tag, "devcontainer-clang:21-rc");
      assert_eq!(spec.build_args["CLANG_BASE_IMAGE"], "clang-ubuntu:21-rc");
      assert!(spec.log_name.is_none());

      let prerequisite = spec.requires.as_ref().unwrap();
      assert_eq!(prerequisite.tag, "clang-ubuntu:21-rc");
      assert_eq!(prerequisite.remedy, "clangbox build-compiler --version 21 --tag-suffix -rc");
    }

    #[test]
    fn remedy_without_suffix_is_plain() {
      assert_eq!(compiler_remedy(21, ""), "clangbox build-compiler --version 21");
    }

    #[test]
    fn config_overrides_families() {
      let temp = TempDir::new().unwrap();
      let mut config = ProjectConfig::default();
      config.compiler.image = "clang-fedora".to_string();
      config.environment.image = "devbox".to_string();

      let stages = Workflow::Environment(EnvironmentArgs::new(18))
        .stages(&config, temp.path())
        .unwrap();

      assert_eq!(stages[0].tag, "devbox:18");
      assert_eq!(stages[0].requires.as_ref().unwrap().tag, "clang-fedora:18");
    }
  }

  mod workflow {
    use super::*;

    #[test]
    fn all_orders_compiler_before_environment() {
      let stages = plan(Workflow::All(AllArgs {
        base_version: 21,
        source_ref: Some("llvmorg-21.1.0".to_string()),
        parallelism: Some(8),
      }));

      let kinds: Vec<_> = stages.iter().map(|s| s.kind).collect();
      assert_eq!(kinds, vec![StageKind::Compiler, StageKind::Environment]);
      assert_eq!(stages[0].build_args["LLVM_GIT_REF"], "llvmorg-21.1.0");
      assert_eq!(stages[0].build_args["NUM_JOBS"], "8");
      assert_eq!(stages[1].requires.as_ref().unwrap().tag, stages[0].tag);
      assert_eq!(stages[1].parallelism, 8);
    }

    #[test]
    fn all_without_parallelism_uses_config_default_for_both() {
      let stages = plan(Workflow::All(AllArgs {
        base_version: 21,
        source_ref: None,
        parallelism: None,
      }));

      assert_eq!(stages[0].parallelism, 4);
      assert_eq!(stages[1].parallelism, 4);
    }

    #[test]
    fn version_reports_base_version() {
      let workflow = Workflow::Environment(EnvironmentArgs::new(17));
      assert_eq!(workflow.version(), 17);
    }
  }

  mod validation {
    use super::*;

    fn plan_result(workflow: Workflow) -> Result<Vec<BuildSpec>, SpecError> {
      let temp = TempDir::new().unwrap();
      workflow.stages(&ProjectConfig::default(), temp.path())
    }

    fn stages_err(workflow: Workflow) -> SpecError {
      plan_result(workflow).unwrap_err()
    }

    #[test]
    fn zero_version_rejected() {
      assert_eq!(
        stages_err(Workflow::Compiler(CompilerArgs::new(0))),
        SpecError::InvalidVersion(0)
      );
    }

    #[test]
    fn zero_parallelism_rejected() {
      let mut args = CompilerArgs::new(21);
      args.parallelism = Some(0);
      assert_eq!(stages_err(Workflow::Compiler(args)), SpecError::InvalidParallelism);
    }

    #[test]
    fn blank_source_ref_rejected() {
      let mut args = CompilerArgs::new(21);
      args.source_ref = Some("  ".to_string());
      assert_eq!(stages_err(Workflow::Compiler(args)), SpecError::Empty("source ref"));
    }

    #[test]
    fn suffix_with_space_rejected() {
      let args = EnvironmentArgs {
        base_version: 21,
        parallelism: None,
        tag_suffix: "bad suffix".to_string(),
      };
      assert!(matches!(
        stages_err(Workflow::Environment(args)),
        SpecError::InvalidSuffix(_)
      ));
    }

    #[test]
    fn overlong_tag_rejected() {
      let mut args = CompilerArgs::new(21);
      args.tag_suffix = "x".repeat(MAX_TAG_LEN);
      assert!(matches!(stages_err(Workflow::Compiler(args)), SpecError::TagTooLong { .. }));
    }

    #[test]
    fn full_tag_length_is_limited() {
      // "clang-ubuntu:21" is 15 characters.
      let mut args = CompilerArgs::new(21);
      args.tag_suffix = "x".repeat(MAX_TAG_LEN - 15);
      assert!(plan_result(Workflow::Compiler(args.clone())).is_ok());

      args.tag_suffix.push('x');
      assert_eq!(
        plan_result(Workflow::Compiler(args)).unwrap_err(),
        SpecError::TagTooLong {
          tag: format!("clang-ubuntu:21{}", "x".repeat(MAX_TAG_LEN - 14)),
          max: MAX_TAG_LEN,
        }
      );
    }

    #[test]
    fn missing_context_rejected() {
      let temp = TempDir::new().unwrap();
      let missing = temp.path().join("missing");

      let err = Workflow::Compiler(CompilerArgs::new(21))
        .stages(&ProjectConfig::default(), &missing)
        .unwrap_err();

      assert_eq!(err, SpecError::MissingContext(missing));
    }
  }
}
