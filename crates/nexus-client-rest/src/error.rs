use nexus_client_core::OperationError;
use reqwest::StatusCode;
use serde::Deserialize;

/// Error body returned by PostgREST and postgres-meta.
///
/// PostgREST sends `{"message", "code", "details", "hint"}`; postgres-meta
/// sends `{"error"}` for some failures. Only the text is kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiErrorResponse {
    /// The most informative message in the body, if any.
    pub fn error_message(&self) -> Option<&str> {
        let non_empty = |m: &&str| !m.is_empty();
        self.message
            .as_deref()
            .filter(non_empty)
            .or_else(|| self.error.as_deref().filter(non_empty))
    }
}

/// Build an `OperationError` from a non-2xx response.
///
/// The message comes from the JSON body's `message`, then `error`, then the
/// HTTP status text. The kind follows the status code.
pub fn error_from_response(status: StatusCode, body: &[u8]) -> OperationError {
    let parsed = serde_json::from_slice::<ApiErrorResponse>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(ApiErrorResponse::error_message)
        .map(str::to_string)
        .unwrap_or_else(|| status_text(status));
    OperationError::from_status(status.as_u16(), message)
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string)
}

/// A request that never produced a usable response.
pub fn transport_error(err: reqwest::Error) -> OperationError {
    OperationError::backend_unavailable(format!("Request failed: {err}"))
}
