use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors which end a feed session.
///
/// Anything that only affects a single remote call is answered on the wire instead
/// (see [`crate::rpc::RpcError`]) and never surfaces here.
#[derive(Error, Debug)]
pub enum Error {
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("The feed closed the connection")]
    ConnectionClosed,
    #[error("Unable to encode response: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// A departure record which could not be turned into a [`crate::Departure`].
#[derive(Error, Debug)]
pub enum DepartureError {
    #[error("Invalid {field} timestamp {value:?}: {source}")]
    InvalidTimestamp {
        field: &'static str,
        value: String,
        source: chrono::ParseError,
    },
}
