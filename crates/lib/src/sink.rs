//! Build log sink.
//!
//! A [`LogSink`] is opened once per stage build and owned by it. It writes
//! build output to an optional log file and, in verbose mode, forwards it to
//! the reporter. The file is closed and its path reported when the sink is
//! dropped, so release happens on every exit path: normal completion, an
//! engine error signal, an I/O failure, or the owning future being cancelled.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use crate::progress::{ProgressEvent, format_status};
use crate::report::Reporter;

#[derive(Debug, Error)]
pub enum SinkError {
  /// The engine signalled an error inside the build.
  #[error("build error: {0}")]
  Build(String),

  #[error("failed to write build log {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

pub struct LogSink<'a> {
  file: Option<(File, PathBuf)>,
  verbose: bool,
  reporter: &'a dyn Reporter,
}

impl<'a> LogSink<'a> {
  /// Announce `label` and open the log file, if any.
  ///
  /// An existing file at `log_file` is truncated.
  pub fn open(
    label: &str,
    log_file: Option<&Path>,
    verbose: bool,
    reporter: &'a dyn Reporter,
  ) -> Result<Self, SinkError> {
    reporter.stage_started(label);

    let file = match log_file {
      Some(path) => {
        let handle = File::create(path).map_err(|source| SinkError::Io {
          path: path.to_path_buf(),
          source,
        })?;
        debug!(path = %path.display(), "opened build log");
        Some((handle, path.to_path_buf()))
      }
      None => None,
    };

    Ok(Self {
      file,
      verbose,
      reporter,
    })
  }

  pub fn path(&self) -> Option<&Path> {
    self.file.as_ref().map(|(_, path)| path.as_path())
  }

  /// Record one event.
  ///
  /// Returns [`SinkError::Build`] for an error signal; the caller must stop
  /// feeding events after any error.
  pub fn record(&mut self, event: ProgressEvent) -> Result<(), SinkError> {
    match event {
      ProgressEvent::TextChunk(text) => {
        if self.verbose {
          self.reporter.output(&text);
        }
        self.write(&text)
      }
      ProgressEvent::StatusUpdate { id, message } => {
        if self.verbose {
          self.reporter.status(&format_status(id.as_deref(), &message));
        }
        Ok(())
      }
      ProgressEvent::ErrorSignal(message) => {
        self.reporter.build_error(&message);
        if let Err(err) = self.write(&format!("ERROR: {}\n", message)) {
          warn!(error = %err, "failed to record build error in log");
        }
        Err(SinkError::Build(message))
      }
    }
  }

  fn write(&mut self, text: &str) -> Result<(), SinkError> {
    let Some((file, path)) = self.file.as_mut() else {
      return Ok(());
    };
    file
      .write_all(text.as_bytes())
      .and_then(|()| file.flush())
      .map_err(|source| SinkError::Io {
        path: path.clone(),
        source,
      })
  }
}

impl Drop for LogSink<'_> {
  fn drop(&mut self) {
    if let Some((mut file, path)) = self.file.take() {
      if let Err(err) = file.flush() {
        warn!(path = %path.display(), error = %err, "failed to flush build log");
      }
      drop(file);
      debug!(path = %path.display(), "closed build log");
      self.reporter.log_saved(&path);
    }
  }
}
