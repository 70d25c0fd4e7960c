use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::error::{ErrorCode, FailureKind, NetworkResult, classify_status};

/// Raw response handed back by the transport before any domain mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransportResponse {
    /// HTTP status, or `None` when the request never reached the server.
    pub status: Option<u16>,
    /// Raw body text when one was received.
    pub body: Option<String>,
}

impl TransportResponse {
    /// A `200 OK` response carrying `body`.
    pub fn ok(body: impl Into<String>) -> Self {
        Self::with_status(200, Some(body.into()))
    }

    pub fn with_status(status: u16, body: Option<String>) -> Self {
        Self {
            status: Some(status),
            body,
        }
    }

    /// Connectivity failure: no status, no body.
    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(200..=299))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<ErrorCode>,
}

/// Classify an error body. Missing or blank bodies are transport failures.
pub fn classify_error_body(body: Option<&str>) -> FailureKind {
    let Some(body) = body.filter(|raw| !raw.trim().is_empty()) else {
        return FailureKind::Transport;
    };

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { code: Some(code) }) => FailureKind::Server(code),
        Ok(ErrorBody { code: None }) => {
            debug!("error body has no code field");
            FailureKind::MalformedBody
        }
        Err(err) => {
            debug!(error = %err, "error body is not valid json");
            FailureKind::MalformedBody
        }
    }
}

/// Convert a transport response into a typed result.
///
/// Successful bodies are decoded as `D` and passed through `project`. Failed
/// responses have their body parsed for a `code` field. Parse faults on either
/// path are absorbed into [`ErrorCode::Unknown`].
pub fn normalize<D, T, F>(raw: TransportResponse, project: F) -> NetworkResult<T>
where
    D: DeserializeOwned,
    F: FnOnce(D) -> T,
{
    if !raw.is_success() {
        return NetworkResult::Error(failure_code(&raw));
    }

    let Some(body) = raw.body.as_deref() else {
        warn!(status = ?raw.status, "successful response carried no body");
        return NetworkResult::Error(ErrorCode::Unknown);
    };

    match serde_json::from_str::<D>(body) {
        Ok(decoded) => NetworkResult::Success(project(decoded)),
        Err(err) => {
            warn!(status = ?raw.status, error = %err, "failed decoding successful response body");
            NetworkResult::Error(ErrorCode::Unknown)
        }
    }
}

/// Normalize a mutation response whose success body is irrelevant.
pub fn normalize_ack(raw: TransportResponse) -> NetworkResult<bool> {
    if raw.is_success() {
        NetworkResult::Success(true)
    } else {
        NetworkResult::Error(failure_code(&raw))
    }
}

fn failure_code(raw: &TransportResponse) -> ErrorCode {
    let kind = classify_error_body(raw.body.as_deref());
    match (&kind, raw.status) {
        (FailureKind::Transport, None) => warn!("request failed without reaching the server"),
        (_, Some(status)) => debug!(
            status,
            class = ?classify_status(status),
            failure = ?kind,
            "request failed"
        ),
        (_, None) => debug!(failure = ?kind, "request failed"),
    }
    kind.code()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct BookDto {
        book_id: u64,
        book_title: String,
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Book {
        id: u64,
        title: String,
    }

    fn to_books(dtos: Vec<BookDto>) -> Vec<Book> {
        dtos.into_iter()
            .map(|dto| Book {
                id: dto.book_id,
                title: dto.book_title,
            })
            .collect()
    }

    #[test]
    fn maps_successful_body_one_to_one() {
        let raw = TransportResponse::ok(r#"[{"bookId":7,"bookTitle":"Dune"}]"#);
        let result = normalize(raw, to_books);
        assert_eq!(
            result,
            NetworkResult::Success(vec![Book {
                id: 7,
                title: "Dune".into(),
            }])
        );
    }

    #[test]
    fn extracts_code_from_failure_body() {
        let raw = TransportResponse::with_status(401, Some(r#"{"code":"AUTH_EXPIRED"}"#.into()));
        let result = normalize(raw, to_books);
        assert_eq!(result, NetworkResult::Error(ErrorCode::AuthExpired));
    }

    #[test]
    fn non_json_failure_body_is_unknown() {
        let raw = TransportResponse::with_status(500, Some("not json".into()));
        let result = normalize(raw, to_books);
        assert_eq!(result, NetworkResult::Error(ErrorCode::Unknown));
    }

    #[test]
    fn missing_failure_body_is_unknown() {
        assert_eq!(
            normalize(TransportResponse::unreachable(), to_books),
            NetworkResult::Error(ErrorCode::Unknown)
        );
        assert_eq!(
            normalize(TransportResponse::with_status(503, None), to_books),
            NetworkResult::Error(ErrorCode::Unknown)
        );
    }

    #[test]
    fn malformed_success_body_is_unknown() {
        let raw = TransportResponse::ok(r#"{"unexpected":true}"#);
        assert_eq!(
            normalize(raw, to_books),
            NetworkResult::Error(ErrorCode::Unknown)
        );
    }

    #[test]
    fn classifies_error_bodies() {
        assert_eq!(classify_error_body(None), FailureKind::Transport);
        assert_eq!(classify_error_body(Some("  ")), FailureKind::Transport);
        assert_eq!(classify_error_body(Some("{}")), FailureKind::MalformedBody);
        assert_eq!(
            classify_error_body(Some(r#"{"code":404}"#)),
            FailureKind::Server(ErrorCode::Other("404".into()))
        );
    }

    #[test]
    fn ack_ignores_success_body() {
        assert_eq!(
            normalize_ack(TransportResponse::with_status(204, None)),
            NetworkResult::Success(true)
        );
        assert_eq!(
            normalize_ack(TransportResponse::with_status(
                409,
                Some(r#"{"code":"ALREADY_EXISTS"}"#.into())
            )),
            NetworkResult::Error(ErrorCode::AlreadyExists)
        );
    }
}
