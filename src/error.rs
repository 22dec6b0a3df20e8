use std::error::Error;
use std::fmt;

/// Recoverable failures crossing the library boundary, mostly from the
/// persistence store. Validation failures are plain `bool`s, and integrity
/// violations (bad index, unknown id) panic instead: they are caller bugs.
#[derive(Debug)]
pub enum BeamlineError {
    String(String),
    Io(std::io::Error),
    Serde(serde_json::Error),
}

impl Error for BeamlineError {}

impl fmt::Display for BeamlineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BeamlineError::String(message) => write!(f, "{message}"),
            BeamlineError::Io(err) => write!(f, "I/O error: {err}"),
            BeamlineError::Serde(err) => write!(f, "JSON error: {err}"),
        }
    }
}

impl From<String> for BeamlineError {
    fn from(err: String) -> Self {
        BeamlineError::String(err)
    }
}

impl From<std::io::Error> for BeamlineError {
    fn from(err: std::io::Error) -> Self {
        BeamlineError::Io(err)
    }
}

impl From<serde_json::Error> for BeamlineError {
    fn from(err: serde_json::Error) -> Self {
        BeamlineError::Serde(err)
    }
}
