use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::state_machine::DrainState;

/// Stable domain error code reported by the marketplace server.
///
/// Known codes get their own variant; anything else is preserved verbatim in
/// [`ErrorCode::Other`] so the UI layer can still map it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ErrorCode {
    /// Failure body was absent, malformed, or carried no code.
    #[default]
    Unknown,
    /// Access token expired and must be refreshed.
    AuthExpired,
    /// Access token was rejected outright.
    InvalidToken,
    /// Caller is authenticated but not allowed to perform the action.
    Forbidden,
    /// Requested resource does not exist.
    NotFound,
    /// Resource already exists (for example a duplicate favorite).
    AlreadyExists,
    /// Request payload failed server-side validation.
    InvalidInput,
    /// Server reported an internal failure.
    ServerError,
    /// Code not known to this client.
    Other(String),
}

impl ErrorCode {
    /// Parse a wire code. Blank input maps to [`ErrorCode::Unknown`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "UNKNOWN" => Self::Unknown,
            "AUTH_EXPIRED" => Self::AuthExpired,
            "INVALID_TOKEN" => Self::InvalidToken,
            "FORBIDDEN" => Self::Forbidden,
            "NOT_FOUND" => Self::NotFound,
            "ALREADY_EXISTS" => Self::AlreadyExists,
            "INVALID_INPUT" => Self::InvalidInput,
            "SERVER_ERROR" => Self::ServerError,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Wire representation of the code.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::AuthExpired => "AUTH_EXPIRED",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::InvalidInput => "INVALID_INPUT",
            Self::ServerError => "SERVER_ERROR",
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ErrorCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawCode {
            Text(String),
            Number(i64),
        }

        Ok(match RawCode::deserialize(deserializer)? {
            RawCode::Text(text) => Self::parse(&text),
            RawCode::Number(number) => Self::parse(&number.to_string()),
        })
    }
}

/// Typed outcome of one repository call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkResult<T> {
    /// Call succeeded and produced a domain value.
    Success(T),
    /// Call failed with a domain error code.
    Error(ErrorCode),
}

impl<T> NetworkResult<T> {
    /// Whether the call produced a domain value.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Error code when the call failed.
    pub fn code(&self) -> Option<&ErrorCode> {
        match self {
            Self::Success(_) => None,
            Self::Error(code) => Some(code),
        }
    }

    /// Transform the success value, passing an error code through unchanged.
    pub fn map<U, F>(self, f: F) -> NetworkResult<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Success(value) => NetworkResult::Success(f(value)),
            Self::Error(code) => NetworkResult::Error(code),
        }
    }

    /// Success value, discarding the error code.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            Self::Error(_) => None,
        }
    }

    /// Convert into a `Result` for `?` propagation.
    pub fn into_result(self) -> Result<T, ErrorCode> {
        self.into()
    }
}

impl<T> From<NetworkResult<T>> for Result<T, ErrorCode> {
    fn from(value: NetworkResult<T>) -> Self {
        match value {
            NetworkResult::Success(value) => Ok(value),
            NetworkResult::Error(code) => Err(code),
        }
    }
}

/// Why a transport call failed, before collapsing to an [`ErrorCode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// No response body at all (connectivity failure or empty error response).
    Transport,
    /// Server returned a parseable error body.
    Server(ErrorCode),
    /// Server returned a body that could not be parsed.
    MalformedBody,
}

impl FailureKind {
    /// Domain code this failure reports to callers.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Server(code) => code.clone(),
            Self::Transport | Self::MalformedBody => ErrorCode::Unknown,
        }
    }
}

/// Coarse class of an HTTP status, used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureClass {
    /// Authentication/authorization failure.
    Auth,
    /// Request was rejected as invalid.
    Client,
    /// Server-side or gateway failure.
    Server,
    /// Anything outside the 4xx/5xx ranges.
    Other,
}

/// Map an HTTP status code to a [`FailureClass`].
pub fn classify_status(status: u16) -> FailureClass {
    match status {
        401 | 403 => FailureClass::Auth,
        400..=499 => FailureClass::Client,
        500..=599 => FailureClass::Server,
        _ => FailureClass::Other,
    }
}

/// Reason a presenter could not render a notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The host screen is gone or not attached.
    #[error("notification host is unavailable")]
    HostUnavailable,
    /// Presenter-specific failure.
    #[error("render failed: {0}")]
    Failed(String),
}

/// Faults raised by the client core outside the domain result path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The notification channel was torn down.
    #[error("notification channel is closed")]
    ChannelClosed,
    /// The drain loop attempted a transition its state machine does not allow.
    #[error("cannot apply '{action}' while drain loop is {current:?}")]
    InvalidTransition {
        current: DrainState,
        action: &'static str,
    },
}
