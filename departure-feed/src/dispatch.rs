//! Routes inbound remote calls to their handlers.

use crate::departure::{Departure, UpdatePayload};
use crate::projection::{FormattedProjection, TrackSnapshot};
use crate::rpc::{Method, Params, Request, Response, RpcError};
use chrono_tz::Tz;
use serde_json::Value;
use tracing::{debug, trace, warn};

/// The outcome of handling one inbound message.
#[derive(Debug)]
pub struct Dispatched {
    /// What to send back to the feed (nothing for notifications).
    pub response: Option<Response>,
    /// Set only when an `update` call was processed successfully.
    pub projection: Option<FormattedProjection>,
}

/// Handles the remote calls of one feed session.
///
/// Holds the live snapshot and the projection derived from it.
/// Each `update` replaces both wholesale; a failed `update` leaves them untouched.
#[derive(Debug)]
pub struct Dispatcher {
    timezone: Tz,
    snapshot: TrackSnapshot,
    latest: Option<FormattedProjection>,
}

impl Dispatcher {
    pub fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            snapshot: TrackSnapshot::default(),
            latest: None,
        }
    }

    pub fn latest(&self) -> Option<&FormattedProjection> {
        self.latest.as_ref()
    }

    pub fn snapshot(&self) -> &TrackSnapshot {
        &self.snapshot
    }

    /// Handles a single text frame from the feed.
    pub fn handle(&mut self, text: &str) -> Dispatched {
        let request = match Request::parse(text) {
            Ok(request) => request,
            Err(response) => {
                warn!(error = ?response.get_error(), "Rejecting malformed message from feed");
                return Dispatched {
                    response: Some(response),
                    projection: None,
                };
            }
        };

        let method = request.method().parse::<Method>();
        trace!(method = request.method(), "Dispatching remote call");
        let (params, responder) = request.into_parts();

        let (outcome, projection) = match method {
            Ok(Method::Update) => match self.update(params) {
                Ok(projection) => (Ok(Value::Null), Some(projection)),
                Err(e) => (Err(e), None),
            },
            // Liveness checks only need the response; there's nothing to load either.
            Ok(Method::KeepAlive | Method::LoadUrl) => (Ok(Value::Null), None),
            Err(()) => {
                warn!("Feed called an unknown method");
                (Err(RpcError::method_not_found()), None)
            }
        };

        Dispatched {
            response: responder.respond(outcome),
            projection,
        }
    }

    fn update(&mut self, params: Params) -> Result<FormattedProjection, RpcError> {
        let data = params
            .take(0, "data")
            .ok_or_else(|| RpcError::invalid_params().with_data("missing departure data"))?;
        let payload: UpdatePayload = serde_json::from_value(data).map_err(|e| {
            warn!(error = %e, "Departure update has an unexpected shape");
            RpcError::invalid_params().with_data(e.to_string())
        })?;

        let departures = payload
            .departures
            .into_iter()
            .map(Departure::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                warn!(error = %e, "Dropping departure update");
                RpcError::server_error().with_data(e.to_string())
            })?;

        let snapshot = TrackSnapshot::from_departures(departures);
        let projection = FormattedProjection::from_snapshot(&snapshot, self.timezone);
        debug!(tracks = projection.len(), "Processed departure update");
        self.snapshot = snapshot;
        self.latest = Some(projection.clone());

        Ok(projection)
    }
}
