#![doc = include_str!("../README.md")]

mod error;
mod scheduler;
mod sink;

pub use error::SinkError;
pub use scheduler::{DEFAULT_INTERVAL, DisplayScheduler};
pub use sink::{ConsoleDisplay, DisplaySink, MatrixDisplay, Sink};
