use std::path::PathBuf;

/// Errors raised while loading models, tables and parameter files.
///
/// Decoding itself never fails; per-sentence problems are reported through
/// [`DecodeOutcome`](crate::decoder::DecodeOutcome) instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("could not read {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{origin}:{line}: {message}")]
  Format {
    origin: String,
    line: usize,
    message: String,
  },

  #[error("parameter {key}: {message}")]
  Param { key: String, message: String },
}

impl Error {
  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io {
      path: path.into(),
      source,
    }
  }

  pub fn param(key: &str, message: impl Into<String>) -> Self {
    Self::Param {
      key: key.to_string(),
      message: message.into(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
