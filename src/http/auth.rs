//! Authentication handshake relay.
//!
//! # Responsibilities
//! - `/v2/` capability probe: forward to the upstream, translate its 401
//!   into the proxy's own challenge
//! - `/v2/auth` token relay: probe the upstream, parse its
//!   `WWW-Authenticate` challenge, and fetch a token from the named realm
//! - Docker Hub scope rewriting (`repository:busybox:pull` →
//!   `repository:library/busybox:pull`)
//!
//! # Design Decisions
//! - The challenge header is parsed by a small escape-aware tokenizer over
//!   `key="quoted value"` parameters rather than a regex
//! - A malformed challenge is recovered locally: the upstream's 401 is
//!   returned unmodified and a warning is logged

use axum::http::header::{CONTENT_TYPE, WWW_AUTHENTICATE};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use url::Url;

use crate::http::error::ProxyResult;
use crate::http::relay::passthrough;
use crate::http::RequestContext;
use crate::upstream::{get_following_redirects, HttpClient};

/// Service name the proxy advertises in its own challenges.
pub const PROXY_SERVICE: &str = "cloudflare-docker-proxy";

/// A parsed `WWW-Authenticate` bearer challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    /// Token endpoint named by the upstream.
    pub realm: String,

    /// Service identifier the token must be scoped to.
    pub service: String,
}

/// Handle `GET /v2/` (and `/v2`): forward the capability probe upstream.
///
/// A 401 from the upstream becomes the proxy's own challenge so clients
/// authenticate against the proxy's `/v2/auth`, never the upstream's realm.
pub(crate) async fn probe(client: &HttpClient, ctx: &RequestContext<'_>) -> ProxyResult<Response> {
    let response = send_probe(client, ctx).await?;

    if response.status() == StatusCode::UNAUTHORIZED {
        return Ok(unauthorized(ctx));
    }
    Ok(passthrough(response))
}

/// Handle `/v2/auth`: relay the token exchange.
///
/// Probes the upstream's `/v2/` to obtain its challenge, rewrites the
/// requested scope for Docker Hub, and fetches a token from the realm the
/// challenge names. The token response is returned to the client verbatim.
pub(crate) async fn token(client: &HttpClient, ctx: &RequestContext<'_>) -> ProxyResult<Response> {
    let response = send_probe(client, ctx).await?;

    // Auth endpoint called against an upstream that doesn't require auth.
    if response.status() != StatusCode::UNAUTHORIZED {
        return Ok(passthrough(response));
    }

    let Some(header) = response
        .headers()
        .get(WWW_AUTHENTICATE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
    else {
        return Ok(passthrough(response));
    };

    let Some(challenge) = parse_challenge(&header) else {
        tracing::warn!(header = %header, "unparseable WWW-Authenticate challenge, relaying upstream 401");
        return Ok(passthrough(response));
    };

    let mut scope = scope_from_query(ctx.query.as_deref());
    if ctx.route.is_docker_hub() {
        scope = scope.map(|s| rewrite_docker_hub_scope(&s));
    }

    let Some(token_uri) = token_uri(&challenge, scope.as_deref()) else {
        tracing::warn!(realm = %challenge.realm, "challenge realm is not a valid URL, relaying upstream 401");
        return Ok(passthrough(response));
    };

    tracing::debug!(realm = %challenge.realm, service = %challenge.service, "relaying token request");

    let mut headers = axum::http::HeaderMap::new();
    if let Some(authorization) = &ctx.authorization {
        headers.insert(axum::http::header::AUTHORIZATION, authorization.clone());
    }
    let token_response = get_following_redirects(client, token_uri, &headers).await?;
    Ok(passthrough(token_response))
}

/// Build the proxy's own 401 challenge (shared with the generic forwarder).
///
/// The realm points back at the proxy's `/v2/auth` on the original inbound
/// origin, making the proxy the token authority from the client's point of
/// view.
pub(crate) fn unauthorized(ctx: &RequestContext<'_>) -> Response {
    unauthorized_for(&ctx.scheme, &ctx.host)
}

pub(crate) fn unauthorized_for(scheme: &str, host: &str) -> Response {
    let realm = if scheme == "https" {
        // Canonical https origins drop the port.
        format!("https://{}/v2/auth", crate::routing::router::hostname(host))
    } else {
        format!("http://{host}/v2/auth")
    };

    let challenge = format!("Bearer realm=\"{realm}\",service=\"{PROXY_SERVICE}\"");

    (
        StatusCode::UNAUTHORIZED,
        [
            (WWW_AUTHENTICATE, challenge),
            (CONTENT_TYPE, "application/json".to_string()),
        ],
        r#"{"message":"UNAUTHORIZED"}"#,
    )
        .into_response()
}

/// Forward the capability probe: GET `<upstream>/v2/` carrying only the
/// client's `Authorization` and the route's header overrides.
async fn send_probe(
    client: &HttpClient,
    ctx: &RequestContext<'_>,
) -> Result<hyper::Response<hyper::body::Incoming>, crate::upstream::ClientError> {
    let uri: Uri = format!("{}/v2/", ctx.route.origin()).parse()?;
    get_following_redirects(client, uri, &ctx.auth_headers()).await
}

/// Parse a `Bearer realm="...",service="..."` challenge.
///
/// Tokenizes comma-separated `key="value"` parameters, decoding `\"` and
/// `\\` escapes; unquoted token values are tolerated. Both `realm` and
/// `service` are required; anything else is a parse failure.
pub fn parse_challenge(header: &str) -> Option<AuthChallenge> {
    let rest = header.trim();
    if !rest.get(..6)?.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let mut rest = rest[6..].trim_start();

    let mut realm = None;
    let mut service = None;

    while !rest.is_empty() {
        let eq = rest.find('=')?;
        let key = rest[..eq].trim();
        rest = &rest[eq + 1..];

        let value;
        if let Some(quoted) = rest.strip_prefix('"') {
            let (unescaped, consumed) = read_quoted(quoted)?;
            value = unescaped;
            rest = &quoted[consumed..];
        } else {
            let end = rest.find(',').unwrap_or(rest.len());
            value = rest[..end].trim().to_string();
            rest = &rest[end..];
        }

        if key.eq_ignore_ascii_case("realm") {
            realm = Some(value);
        } else if key.eq_ignore_ascii_case("service") {
            service = Some(value);
        }

        rest = rest.trim_start();
        rest = match rest.strip_prefix(',') {
            Some(after) => after.trim_start(),
            None if rest.is_empty() => rest,
            None => return None,
        };
    }

    Some(AuthChallenge {
        realm: realm?,
        service: service?,
    })
}

/// Read a quoted string body up to its closing quote, decoding escapes.
/// Returns the decoded value and the byte offset just past the quote.
fn read_quoted(input: &str) -> Option<(String, usize)> {
    let mut value = String::new();
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if escaped {
            value.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            return Some((value, i + 1));
        } else {
            value.push(c);
        }
    }
    None
}

/// Rewrite an unqualified Docker Hub scope into the `library/` namespace.
///
/// Applies only to a three-part `type:name:actions` scope whose name has no
/// namespace; everything else passes through unchanged (idempotent).
pub fn rewrite_docker_hub_scope(scope: &str) -> String {
    let parts: Vec<&str> = scope.split(':').collect();
    if parts.len() == 3 && !parts[1].contains('/') {
        format!("{}:library/{}:{}", parts[0], parts[1], parts[2])
    } else {
        scope.to_string()
    }
}

/// Extract the `scope` parameter from the inbound query string.
fn scope_from_query(query: Option<&str>) -> Option<String> {
    let query = query?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "scope")
        .map(|(_, value)| value.into_owned())
}

/// Build the token request URI from the challenge realm plus the
/// `service` and `scope` query parameters.
///
/// A realm that already carries `service` or `scope` has them replaced,
/// not duplicated; unrelated realm parameters are preserved.
fn token_uri(challenge: &AuthChallenge, scope: Option<&str>) -> Option<Uri> {
    let mut url = Url::parse(&challenge.realm).ok()?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "service" && key != "scope")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    {
        let mut pairs = url.query_pairs_mut();
        pairs.clear();
        for (key, value) in &kept {
            pairs.append_pair(key, value);
        }
        if !challenge.service.is_empty() {
            pairs.append_pair("service", &challenge.service);
        }
        if let Some(scope) = scope {
            pairs.append_pair("scope", scope);
        }
    }
    if url.query() == Some("") {
        url.set_query(None);
    }
    url.as_str().parse().ok()
}
