//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → server.rs (Axum setup, routing key resolution, dispatch)
//!     → auth.rs (/v2/ probe and /v2/auth token relay)
//!     → rewrite.rs (Docker Hub implicit library/ redirect)
//!     → forward.rs (generic upstream forwarding)
//!     → relay.rs (401 normalization, 307/308 Location absolutization)
//!     → Send to client
//! ```

pub mod auth;
pub mod error;
pub mod forward;
pub mod relay;
pub mod rewrite;
pub mod server;

pub use error::{ProxyError, ProxyResult};
pub use server::HttpServer;

use axum::http::header::HeaderValue;
use axum::http::HeaderMap;

use crate::routing::{Resolved, Route};

/// Per-request derived state, created at the start of handling and
/// discarded at the end. Never shared across requests.
#[derive(Debug)]
pub(crate) struct RequestContext<'a> {
    /// The resolved upstream route.
    pub route: &'a Route,

    /// Upstream-relative path (routing prefix stripped).
    pub upstream_path: String,

    /// The stripped routing prefix, empty for subdomain routing.
    pub routing_prefix: String,

    /// Scheme of the original inbound URL.
    pub scheme: String,

    /// Host of the original inbound URL (may include a port).
    pub host: String,

    /// Raw inbound query string, without the leading `?`.
    pub query: Option<String>,

    /// Client-supplied `Authorization` header, relayed to the upstream.
    pub authorization: Option<HeaderValue>,
}

impl<'a> RequestContext<'a> {
    pub(crate) fn new(
        resolved: Resolved<'a>,
        scheme: String,
        host: String,
        query: Option<String>,
        authorization: Option<HeaderValue>,
    ) -> Self {
        Self {
            route: resolved.route,
            upstream_path: resolved.upstream_path,
            routing_prefix: resolved.routing_prefix,
            scheme,
            host,
            query,
            authorization,
        }
    }

    /// Headers for the `/v2/` capability probe and the token fetch:
    /// the client's `Authorization` plus the route's header overrides.
    pub(crate) fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(authorization) = &self.authorization {
            headers.insert(axum::http::header::AUTHORIZATION, authorization.clone());
        }
        headers.extend(self.route.extra_headers().clone());
        headers
    }

    /// The original inbound origin (`scheme://host`), which the proxy
    /// advertises as the token authority in its own challenges.
    pub(crate) fn inbound_origin(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}
