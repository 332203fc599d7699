use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::projection::FormattedProjection;
use chrono_tz::Tz;
use futures::{Sink, SinkExt, Stream, StreamExt, stream};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, trace, warn};

/// The socket type of a session opened with [`FeedSession::connect`].
pub type FeedSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A live connection to the departure feed.
///
/// The feed pushes JSON-RPC requests at us;
/// every request is answered before the next message is read.
pub struct FeedSession<S> {
    /// The WebSocket connection to the feed.
    socket: S,
    /// Handles the remote calls and keeps the latest projection.
    dispatcher: Dispatcher,
}

impl FeedSession<FeedSocket> {
    /// Opens a new session against the feed at `url`.
    ///
    /// # Errors
    ///
    /// Fails if the WebSocket handshake can't be completed.
    pub async fn connect(url: &str, timezone: Tz) -> Result<Self, Error> {
        let (socket, response) = tokio_tungstenite::connect_async(url).await?;
        info!(url, status = %response.status(), "Connected to departure feed");

        Ok(Self::new(socket, timezone))
    }
}

impl<S> FeedSession<S>
where
    S: Stream<Item = Result<Message, tungstenite::Error>>
        + Sink<Message, Error = tungstenite::Error>
        + Unpin,
{
    /// Wraps an already established WebSocket.
    pub fn new(socket: S, timezone: Tz) -> Self {
        Self {
            socket,
            dispatcher: Dispatcher::new(timezone),
        }
    }

    /// The projection from the last successfully processed `update` call, if any.
    pub fn latest(&self) -> Option<&FormattedProjection> {
        self.dispatcher.latest()
    }

    /// Processes exactly one inbound message.
    ///
    /// The response (if the message calls for one) has been sent by the time this returns.
    /// The result is `Some` only if the message was an `update` that was processed successfully.
    ///
    /// # Errors
    ///
    /// Any error returned here means that the session is over.
    /// [`Error::ConnectionClosed`] indicates an orderly shutdown by the feed;
    /// [`Error::WebSocket`] covers everything from dropped sockets to protocol violations.
    /// Malformed remote calls are *not* errors at this level; they are answered on the wire.
    pub async fn tick(&mut self) -> Result<Option<FormattedProjection>, Error> {
        let Some(message) = self.socket.next().await else {
            return Err(Error::ConnectionClosed);
        };

        match message? {
            Message::Text(text) => {
                trace!(len = text.len(), "Received message from feed");
                let dispatched = self.dispatcher.handle(&text);

                if let Some(response) = dispatched.response {
                    let body = serde_json::to_string(&response)?;
                    self.socket.send(Message::text(body)).await?;
                }

                Ok(dispatched.projection)
            }
            Message::Close(frame) => {
                debug!(?frame, "Feed sent a close frame");
                Err(Error::ConnectionClosed)
            }
            Message::Binary(data) => {
                warn!(len = data.len(), "Ignoring binary message from feed");
                Ok(None)
            }
            // Pings are answered by tungstenite itself
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => Ok(None),
        }
    }

    /// Processes messages until the next `update` call yields a projection.
    ///
    /// # Errors
    ///
    /// Fails when the session ends; see [`FeedSession::tick`].
    pub async fn next_projection(&mut self) -> Result<FormattedProjection, Error> {
        loop {
            if let Some(projection) = self.tick().await? {
                return Ok(projection);
            }
        }
    }

    /// Turns the session into a stream of projections.
    ///
    /// The stream yields one item per processed `update`.
    /// When the session ends, the error is yielded as the final item.
    pub fn into_stream(self) -> impl Stream<Item = Result<FormattedProjection, Error>> {
        stream::unfold(Some(self), |state| async move {
            let mut session = state?;
            match session.next_projection().await {
                Ok(projection) => Some((Ok(projection), Some(session))),
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
