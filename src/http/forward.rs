//! Generic upstream request forwarding.
//!
//! # Responsibilities
//! - Rebuild the inbound request against the upstream origin
//! - Copy client headers, overlaying route-specific overrides
//! - Preserve method, body and query string
//!
//! # Design Decisions
//! - Redirects are never followed here: the outbound client is manual, so
//!   307/308 blob redirects reach the relay intact for the client to
//!   follow itself

use axum::body::Body;
use axum::http::header::HOST;
use axum::http::{Request, Uri};
use hyper::body::Incoming;
use hyper::Response;

use crate::http::error::ProxyResult;
use crate::http::RequestContext;
use crate::upstream::{ClientError, HttpClient};

/// Forward a request to `<upstream><upstream_path><query>`.
pub(crate) async fn forward(
    client: &HttpClient,
    ctx: &RequestContext<'_>,
    request: Request<Body>,
) -> ProxyResult<Response<Incoming>> {
    let mut target = format!("{}{}", ctx.route.origin(), ctx.upstream_path);
    if let Some(query) = &ctx.query {
        target.push('?');
        target.push_str(query);
    }
    let target: Uri = target.parse().map_err(ClientError::from)?;

    let (parts, body) = request.into_parts();

    // Version is left to the client, which negotiates per connection.
    let mut outbound = Request::builder()
        .method(parts.method.clone())
        .uri(target)
        .body(body)
        .map_err(ClientError::from)?;

    // Copy client headers except Host, which names the proxy; the client
    // fills in the upstream authority unless the route overrides it.
    let headers = outbound.headers_mut();
    for (name, value) in &parts.headers {
        if name != HOST {
            headers.append(name.clone(), value.clone());
        }
    }
    headers.extend(ctx.route.extra_headers().clone());

    tracing::debug!(
        method = %parts.method,
        upstream = %ctx.route.origin(),
        path = %ctx.upstream_path,
        "forwarding request"
    );

    let response = client.request(outbound).await.map_err(ClientError::from)?;
    Ok(response)
}
