#![doc = include_str!("../README.md")]

use chrono_tz::Tz;
use futures::{Stream, StreamExt, future, stream};

mod departure;
mod dispatch;
mod error;
mod projection;
pub mod rpc;
mod session;

pub use departure::{Departure, DepartureRecord, Track, UpdatePayload};
pub use dispatch::{Dispatched, Dispatcher};
pub use error::{DepartureError, Error};
pub use projection::{FormattedProjection, TrackSnapshot, TrackSummary, format_departure};
pub use session::{FeedSession, FeedSocket};

/// The WebSocket endpoint serving Bane NOR real-time displays.
const FEED_BASE_URL: &str = "ws://rtd.opm.jbv.no:8080/web_client/ws";

/// Builds the feed URL for a station's departure board.
pub fn feed_url(station: &str) -> String {
    let id = format!("{station}/Departure");
    format!(
        "{FEED_BASE_URL}?display=rtd&hideNotice=false&id={}&noPassengerDisplay=false&wrapperName=landscape",
        urlencoding::encode(&id)
    )
}

/// Watches the departure board of `station`.
///
/// Connects lazily (on first poll) and yields a fresh [`FormattedProjection`]
/// every time the feed pushes an update, whether or not it differs from the last one.
/// Times are rendered in `timezone`.
///
/// The stream ends after yielding an error, either from connecting or from the live session.
/// Nothing is carried over between calls,
/// so restarting after the stream ends is as simple as calling this again.
pub fn watch_departures(
    station: &str,
    timezone: Tz,
) -> impl Stream<Item = Result<FormattedProjection, Error>> {
    watch_url(feed_url(station), timezone)
}

fn watch_url(url: String, timezone: Tz) -> impl Stream<Item = Result<FormattedProjection, Error>> {
    stream::once(async move { FeedSession::connect(&url, timezone).await }).flat_map(
        |connected| match connected {
            Ok(session) => session.into_stream().left_stream(),
            Err(e) => stream::once(future::ready(Err(e))).right_stream(),
        },
    )
}
