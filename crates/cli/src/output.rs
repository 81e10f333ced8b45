//! CLI output formatting utilities.
//!
//! Provides consistent formatting for terminal output including colored status
//! messages, Unicode symbols, and the console implementation of the library's
//! [`Reporter`].

use std::fmt::Display;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use clangbox_lib::build::{BuildSpec, FailureKind, StageFailure};
use clangbox_lib::report::Reporter;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const WARNING: &str = "⚠";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
  pub const SKIP: &str = "~";
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 3600 {
    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
  } else if secs >= 60 {
    let mins = secs / 60;
    let remaining_secs = secs % 60;
    format!("{}m {}s", mins, remaining_secs)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_warning(message: &str) {
  eprintln!(
    "{} {}",
    symbols::WARNING.if_supports_color(Stream::Stderr, |s| s.yellow()),
    message.if_supports_color(Stream::Stderr, |s| s.yellow())
  );
}

pub fn print_info(message: &str) {
  println!(
    "{} {}",
    symbols::INFO.if_supports_color(Stream::Stdout, |s| s.blue()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// Renders pipeline progress to the terminal.
///
/// In JSON mode stdout is reserved for the final result, so everything
/// human-readable goes to stderr instead.
pub struct ConsoleReporter {
  format: OutputFormat,
}

impl ConsoleReporter {
  pub fn new(format: OutputFormat) -> Self {
    Self { format }
  }

  fn stream(&self) -> Stream {
    if self.format.is_json() {
      Stream::Stderr
    } else {
      Stream::Stdout
    }
  }

  fn line(&self, text: impl Display) {
    if self.format.is_json() {
      eprintln!("{}", text);
    } else {
      println!("{}", text);
    }
  }

  fn stat(&self, label: &str, value: impl Display) {
    self.line(format_args!(
      "  {}: {}",
      label.if_supports_color(self.stream(), |s| s.dimmed()),
      value
    ));
  }
}

impl Reporter for ConsoleReporter {
  fn stage_started(&self, label: &str) {
    self.line(format_args!(
      "{} {}...",
      symbols::ARROW.if_supports_color(self.stream(), |s| s.cyan()),
      label.if_supports_color(self.stream(), |s| s.bold())
    ));
  }

  fn plan(&self, spec: &BuildSpec, log_file: Option<&Path>) {
    self.line(format_args!(
      "{} Would build {} ({})",
      symbols::INFO.if_supports_color(self.stream(), |s| s.blue()),
      spec.tag.if_supports_color(self.stream(), |s| s.bold()),
      spec.kind
    ));
    self.stat("Label", &spec.label);
    self.stat("Context", spec.context.display());
    self.stat("Recipe", &spec.recipe);
    for (key, value) in &spec.build_args {
      self.stat("Build arg", format_args!("{}={}", key, value));
    }
    self.stat("Parallelism", spec.parallelism);
    if let Some(prerequisite) = &spec.requires {
      self.stat("Requires", &prerequisite.tag);
    }
    match log_file {
      Some(path) => self.stat("Log file", path.display()),
      None => self.stat("Log file", "none"),
    }
  }

  fn output(&self, text: &str) {
    // Engine output already carries its own newlines.
    let result = if self.format.is_json() {
      let mut err = io::stderr().lock();
      err.write_all(text.as_bytes()).and_then(|()| err.flush())
    } else {
      let mut out = io::stdout().lock();
      out.write_all(text.as_bytes()).and_then(|()| out.flush())
    };
    if let Err(err) = result {
      tracing::debug!(error = %err, "failed to echo build output");
    }
  }

  fn status(&self, line: &str) {
    self.line(line.if_supports_color(self.stream(), |s| s.dimmed()));
  }

  fn build_error(&self, message: &str) {
    print_error(&format!("Build error: {}", message));
  }

  fn log_saved(&self, path: &Path) {
    self.line(format_args!(
      "{} Build log saved to {}",
      symbols::INFO.if_supports_color(self.stream(), |s| s.blue()),
      path.display()
    ));
  }

  fn stage_succeeded(&self, tag: &str) {
    self.line(format_args!(
      "{} Successfully built {}",
      symbols::SUCCESS.if_supports_color(self.stream(), |s| s.green()),
      tag
    ));
  }

  fn stage_skipped(&self, tag: &str) {
    self.line(format_args!(
      "{} Image {} already exists, skipping",
      symbols::SKIP.if_supports_color(self.stream(), |s| s.yellow()),
      tag
    ));
  }

  fn stage_failed(&self, failure: &StageFailure) {
    print_error(&failure.to_string());
    if let Some(hint) = &failure.hint {
      match failure.kind {
        FailureKind::PrerequisiteMissing => eprintln!("Build it first with:\n  {}", hint),
        _ => eprintln!("Try:\n  {}", hint),
      }
    }
  }
}
