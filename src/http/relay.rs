//! Forwarded-response post-processing.
//!
//! # Responsibilities
//! - Replace upstream 401s with the proxy's own challenge so clients
//!   re-authenticate against the proxy, never the upstream realm
//! - Absolutize relative `Location` headers on 307/308 blob redirects so
//!   the client can follow them directly against the real storage backend
//! - Pass everything else through verbatim

use axum::body::Body;
use axum::http::header::{HeaderValue, LOCATION};
use axum::http::StatusCode;
use axum::response::Response;
use hyper::body::Incoming;

use crate::http::auth;
use crate::http::RequestContext;
use crate::routing::Route;

/// Convert an upstream response into a client response, streaming the body.
pub(crate) fn passthrough(response: hyper::Response<Incoming>) -> Response {
    let (parts, body) = response.into_parts();
    Response::from_parts(parts, Body::new(body))
}

/// Post-process a forwarded response before returning it to the client.
pub(crate) fn postprocess(ctx: &RequestContext<'_>, response: hyper::Response<Incoming>) -> Response {
    if response.status() == StatusCode::UNAUTHORIZED {
        return auth::unauthorized(ctx);
    }

    let mut response = passthrough(response);

    if matches!(
        response.status(),
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
    ) {
        if let Some(absolute) = absolutized_location(ctx.route, response.headers().get(LOCATION)) {
            tracing::debug!(location = %absolute.to_str().unwrap_or(""), "absolutized blob redirect");
            response.headers_mut().insert(LOCATION, absolute);
        }
    }

    response
}

/// Resolve a redirect `Location` against the upstream origin.
///
/// Returns `None` when there is no `Location`, it is already usable as-is,
/// or it cannot be resolved (in which case it passes through unchanged).
fn absolutized_location(route: &Route, location: Option<&HeaderValue>) -> Option<HeaderValue> {
    let location = location?.to_str().ok()?;
    let absolute = route.upstream().join(location).ok()?;
    if absolute.as_str() == location {
        return None;
    }
    HeaderValue::from_str(absolute.as_str()).ok()
}
