//! Build context packing.
//!
//! The engine receives the context directory as an uncompressed tar archive.
//! Paths listed in `.dockerignore` are left out. Supported entries are
//! relative paths, optionally with `*` and `?` wildcards inside a path
//! component; a match on a directory excludes everything below it. Comment
//! lines and `!` exceptions are ignored.

use std::path::{Component, Path};

use tar::Builder;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::consts::IGNORE_FILE_NAME;
use crate::engine::EngineError;

/// Patterns read from a context's ignore file.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IgnoreList {
  patterns: Vec<Vec<String>>,
}

impl IgnoreList {
  pub fn parse(content: &str) -> Self {
    let mut patterns = Vec::new();

    for line in content.lines() {
      let line = line.trim();
      if line.is_empty() || line.starts_with('#') {
        continue;
      }
      if line.starts_with('!') {
        warn!(pattern = %line, "ignore exceptions are not supported, skipping");
        continue;
      }

      let components: Vec<String> = line
        .split('/')
        .filter(|c| !c.is_empty() && *c != ".")
        .map(str::to_string)
        .collect();
      if !components.is_empty() {
        patterns.push(components);
      }
    }

    Self { patterns }
  }

  pub fn load(context: &Path) -> Result<Self, EngineError> {
    let path = context.join(IGNORE_FILE_NAME);
    if !path.is_file() {
      return Ok(Self::default());
    }
    let content = std::fs::read_to_string(&path).map_err(|e| context_error(context, e))?;
    Ok(Self::parse(&content))
  }

  /// Whether a context-relative path is excluded.
  pub fn is_ignored(&self, relative: &Path) -> bool {
    let components: Vec<&str> = relative
      .components()
      .filter_map(|c| match c {
        Component::Normal(s) => s.to_str(),
        _ => None,
      })
      .collect();

    self.patterns.iter().any(|pattern| {
      pattern.len() <= components.len()
        && pattern
          .iter()
          .zip(&components)
          .all(|(p, c)| wildcard_match(p, c))
    })
  }
}

/// Pack `context` into a tar archive.
///
/// Fails if `recipe` is not a file inside the context. The recipe and the
/// ignore file itself are always included.
pub fn pack(context: &Path, recipe: &str) -> Result<Vec<u8>, EngineError> {
  if !context.join(recipe).is_file() {
    return Err(EngineError::Context {
      path: context.to_path_buf(),
      message: format!("recipe {} not found", recipe),
    });
  }

  let ignore = IgnoreList::load(context)?;
  let always_included = [Path::new(recipe), Path::new(IGNORE_FILE_NAME)];

  let mut builder = Builder::new(Vec::new());
  builder.follow_symlinks(false);

  let walker = WalkDir::new(context)
    .min_depth(1)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|entry| {
      let relative = entry.path().strip_prefix(context).unwrap_or(entry.path());
      always_included.contains(&relative) || !ignore.is_ignored(relative)
    });

  let mut entries = 0usize;
  for entry in walker {
    let entry = entry.map_err(|e| context_error(context, e))?;
    let relative = entry
      .path()
      .strip_prefix(context)
      .map_err(|e| context_error(context, e))?;

    if entry.file_type().is_dir() {
      builder
        .append_dir(relative, entry.path())
        .map_err(|e| context_error(context, e))?;
    } else {
      builder
        .append_path_with_name(entry.path(), relative)
        .map_err(|e| context_error(context, e))?;
    }
    entries += 1;
  }

  let archive = builder.into_inner().map_err(|e| context_error(context, e))?;
  debug!(context = %context.display(), entries, bytes = archive.len(), "packed build context");
  Ok(archive)
}

fn context_error(context: &Path, err: impl std::fmt::Display) -> EngineError {
  EngineError::Context {
    path: context.to_path_buf(),
    message: err.to_string(),
  }
}

/// Match one path component against a pattern with `*` and `?`.
fn wildcard_match(pattern: &str, text: &str) -> bool {
  let p: Vec<char> = pattern.chars().collect();
  let t: Vec<char> = text.chars().collect();
  let (mut pi, mut ti) = (0, 0);
  let mut backtrack: Option<(usize, usize)> = None;

  while ti < t.len() {
    if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
      pi += 1;
      ti += 1;
    } else if pi < p.len() && p[pi] == '*' {
      backtrack = Some((pi, ti));
      pi += 1;
    } else if let Some((star, matched)) = backtrack {
      pi = star + 1;
      ti = matched + 1;
      backtrack = Some((star, matched + 1));
    } else {
      return false;
    }
  }

  p[pi..].iter().all(|&c| c == '*')
}
