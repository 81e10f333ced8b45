//! Normalized build progress.

use crate::engine::EngineMessage;

/// What an engine emitted mid-build, reduced to the three cases we act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
  /// Build output, kept verbatim (usually newline-terminated).
  TextChunk(String),
  /// Pull/push style status line, optionally tied to a layer id.
  StatusUpdate { id: Option<String>, message: String },
  /// The build failed inside the engine.
  ErrorSignal(String),
}

impl ProgressEvent {
  /// Normalize a raw engine message.
  ///
  /// Output text wins over status, status over error, matching the order the
  /// engine fills these fields in. Messages with none of them yield `None`.
  pub fn from_message(message: EngineMessage) -> Option<Self> {
    if let Some(text) = message.stream {
      Some(ProgressEvent::TextChunk(text))
    } else if let Some(status) = message.status {
      Some(ProgressEvent::StatusUpdate {
        id: message.id,
        message: status,
      })
    } else {
      message.error.map(ProgressEvent::ErrorSignal)
    }
  }
}

/// Format a status update for display.
pub fn format_status(id: Option<&str>, message: &str) -> String {
  match id {
    Some(id) => format!("{}: {}", id, message),
    None => message.to_string(),
  }
}
