//! JSON-RPC envelopes spoken by the departure feed.
//!
//! The feed is the *client* in RPC terms: it pushes requests at us over the socket,
//! and we answer each one in turn.
//! Both JSON-RPC 1.0 (no `jsonrpc` member) and 2.0 requests are accepted,
//! and responses are shaped after the version of the request they answer.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt::{self, Display};
use std::str::FromStr;

const UPDATE: &str = "update";
const KEEP_ALIVE: &str = "keepAlive";
const LOAD_URL: &str = "loadUrl";

/// The remote calls the feed is known to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// A full replacement of the departure list.
    Update,
    /// Periodic liveness check; answered with `null`.
    KeepAlive,
    /// Asks the client to load other resources; we have nothing to load.
    LoadUrl,
}

impl FromStr for Method {
    type Err = (); // any failure means the method simply doesn't exist
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            UPDATE => Ok(Self::Update),
            KEEP_ALIVE => Ok(Self::KeepAlive),
            LOAD_URL => Ok(Self::LoadUrl),
            _ => Err(()),
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Update => UPDATE,
            Method::KeepAlive => KEEP_ALIVE,
            Method::LoadUrl => LOAD_URL,
        })
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcVersion {
    #[serde(alias = "1.0", rename = "1.0")]
    One,
    #[serde(alias = "2.0", rename = "2.0")]
    Two,
}

/// Parameters of a request, either by position or by name.
#[derive(Deserialize, Debug, Default)]
#[serde(untagged)]
pub enum Params {
    Positional(Vec<Value>),
    Named(Map<String, Value>),
    #[default]
    Absent,
}

impl Params {
    /// Takes the parameter at `index` (positional) or called `name` (named).
    pub fn take(self, index: usize, name: &str) -> Option<Value> {
        match self {
            Params::Positional(mut values) if index < values.len() => Some(values.swap_remove(index)),
            Params::Named(mut values) => values.remove(name),
            Params::Positional(_) | Params::Absent => None,
        }
    }
}

/// A JSON-RPC request as pushed by the feed.
#[derive(Deserialize, Debug)]
pub struct Request {
    /// Absent for JSON-RPC 1.0.
    #[serde(default)]
    jsonrpc: Option<JsonRpcVersion>,
    method: String,
    #[serde(default)]
    params: Params,
    /// `None` when the member is missing; `Some(Value::Null)` when it is an explicit `null`.
    #[serde(default, deserialize_with = "present")]
    id: Option<Value>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl Request {
    /// Parses an inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns a ready-to-send error response when the frame is not JSON
    /// or not a request object.
    pub fn parse(text: &str) -> Result<Request, Response> {
        let value: Value = serde_json::from_str(text).map_err(|e| {
            Response::error(
                JsonRpcVersion::Two,
                RpcError::parse_error().with_data(e.to_string()),
                Value::Null,
            )
        })?;

        let version = match value.get("jsonrpc") {
            Some(_) => JsonRpcVersion::Two,
            None => JsonRpcVersion::One,
        };
        let id = value.get("id").cloned().unwrap_or(Value::Null);

        serde_json::from_value(value).map_err(|e| {
            Response::error(
                version,
                RpcError::invalid_request().with_data(e.to_string()),
                id,
            )
        })
    }

    pub fn version(&self) -> JsonRpcVersion {
        self.jsonrpc.unwrap_or(JsonRpcVersion::One)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Notifications are processed but never answered.
    ///
    /// In 1.0 a `null` id marks a notification; in 2.0 only a missing id does.
    pub fn is_notification(&self) -> bool {
        matches!(
            (self.version(), &self.id),
            (_, None) | (JsonRpcVersion::One, Some(Value::Null))
        )
    }

    /// Splits the request into its parameters and a responder bound to its id.
    pub fn into_parts(self) -> (Params, Responder) {
        let notification = self.is_notification();
        let version = self.version();
        (
            self.params,
            Responder {
                version,
                id: self.id.unwrap_or(Value::Null),
                notification,
            },
        )
    }
}

/// Builds the answer to one particular request.
#[derive(Debug)]
pub struct Responder {
    version: JsonRpcVersion,
    id: Value,
    notification: bool,
}

impl Responder {
    /// Returns `None` for notifications.
    pub fn respond(self, outcome: Result<Value, RpcError>) -> Option<Response> {
        if self.notification {
            return None;
        }
        Some(Response {
            version: self.version,
            outcome,
            id: self.id,
        })
    }
}

/// A JSON-RPC response. Contains _either_ a result or an error.
#[derive(Debug)]
pub struct Response {
    version: JsonRpcVersion,
    outcome: Result<Value, RpcError>,
    id: Value,
}

impl Response {
    pub fn error(version: JsonRpcVersion, error: RpcError, id: Value) -> Self {
        Self {
            version,
            outcome: Err(error),
            id,
        }
    }

    pub fn get_error(&self) -> Option<&RpcError> {
        self.outcome.as_ref().err()
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        match self.version {
            JsonRpcVersion::Two => {
                map.serialize_entry("jsonrpc", &self.version)?;
                match &self.outcome {
                    Ok(result) => map.serialize_entry("result", result)?,
                    Err(error) => map.serialize_entry("error", error)?,
                }
            }
            // 1.0 always carries both members, with the unused one set to null
            JsonRpcVersion::One => match &self.outcome {
                Ok(result) => {
                    map.serialize_entry("result", result)?;
                    map.serialize_entry("error", &Value::Null)?;
                }
                Err(error) => {
                    map.serialize_entry("result", &Value::Null)?;
                    map.serialize_entry("error", error)?;
                }
            },
        }
        map.serialize_entry("id", &self.id)?;
        map.end()
    }
}

/// Error object to be returned in a [`Response`] if something failed.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RpcError {
    /// JSON-RPC error code.
    code: i32,
    /// Short description of what went wrong.
    message: String,
    /// Optional field containing structured error information.
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl RpcError {
    fn new(code: ErrorCode, message: &str) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            data: None,
        }
    }

    /// Set the `data` property on `self`.
    #[must_use]
    pub fn with_data<T: Into<Value>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn parse_error() -> Self {
        Self::new(ErrorCode::ParseError, "Parse error")
    }

    pub fn invalid_request() -> Self {
        Self::new(ErrorCode::InvalidRequest, "Invalid Request")
    }

    pub fn method_not_found() -> Self {
        Self::new(ErrorCode::MethodNotFound, "Method not found")
    }

    pub fn invalid_params() -> Self {
        Self::new(ErrorCode::InvalidParams, "Invalid params")
    }

    /// The handler understood the call but could not process it.
    pub fn server_error() -> Self {
        Self::new(ErrorCode::ServerError, "Server error")
    }

    pub fn code(&self) -> i32 {
        self.code
    }
}

/// Standard JSON-RPC error codes as defined by the [JSON-RPC specification](https://www.jsonrpc.org/specification#error_object)
pub enum ErrorCode {
    /// Invalid JSON was received.
    ParseError,
    /// The JSON received was not a valid request object.
    InvalidRequest,
    /// The method does not exist / is not available.
    MethodNotFound,
    /// Invalid method parameter(s).
    InvalidParams,
    /// Implementation-defined server error.
    ServerError,
}

impl From<ErrorCode> for i32 {
    fn from(error_code: ErrorCode) -> Self {
        match error_code {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::ServerError => -32000,
        }
    }
}
