use reqwest::StatusCode;
use thiserror::Error;

/// A failed write to (or setup of) a display.
///
/// The rotation loop logs these and carries on; they never reach the caller of `show`.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Display request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Display responded with {0}")]
    Status(StatusCode),
}
