//! Error types for request handling.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

use crate::upstream::ClientError;

/// Result type for proxy handlers.
pub type ProxyResult<T> = Result<T, ProxyError>;

/// Error types for proxy request handling.
///
/// Every variant is scoped to a single in-flight request; none is fatal to
/// the process and none is retried.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// No upstream is configured for the inbound routing key
    /// (subdomain strategy only).
    #[error("no route configured for this host")]
    RouteNotFound {
        /// The configured routes, rendered into the diagnostic body.
        routes: serde_json::Value,
    },

    /// An outbound call failed; surfaced to the client as a generic 502.
    #[error(transparent)]
    Upstream(#[from] ClientError),
}

impl ProxyError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            ProxyError::RouteNotFound { routes } => {
                (status, Json(json!({ "routes": routes }))).into_response()
            }
            ProxyError::Upstream(err) => {
                tracing::error!(error = %err, "upstream request failed");
                (status, Json(json!({ "message": "upstream request failed" }))).into_response()
            }
        }
    }
}
