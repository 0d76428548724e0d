//! Outbound HTTP client for talking to upstream registries.
//!
//! # Design Decisions
//! - One shared hyper-util legacy client over a rustls connector that
//!   accepts both https (real registries) and plain http (test upstreams)
//! - The legacy client never follows redirects, so forwarded requests get
//!   manual redirect handling for free and 307/308 blob redirects reach
//!   the relay intact
//! - The `/v2/` capability probe and the token fetch are the only calls
//!   that follow redirects, via a bounded follow loop

use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, Uri};
use hyper::body::Incoming;
use hyper::Response;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use url::Url;

/// Maximum redirect hops the probe/token follow loop will take.
const MAX_REDIRECTS: usize = 5;

/// Shared outbound client type.
pub type HttpClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Errors from outbound calls.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (connect, TLS, protocol).
    #[error("upstream request failed: {0}")]
    Transport(#[from] hyper_util::client::legacy::Error),

    /// A constructed upstream URL was not a valid URI.
    #[error("invalid upstream URI: {0}")]
    Uri(#[from] axum::http::uri::InvalidUri),

    /// Request construction failed.
    #[error("failed to build upstream request: {0}")]
    Http(#[from] axum::http::Error),

    /// The follow loop exceeded [`MAX_REDIRECTS`].
    #[error("too many redirects fetching {0}")]
    TooManyRedirects(Uri),
}

/// Build the shared outbound client.
pub fn build_client() -> std::io::Result<HttpClient> {
    let connector = HttpsConnectorBuilder::new()
        .with_native_roots()?
        .https_or_http()
        .enable_all_versions()
        .build();

    Ok(Client::builder(TokioExecutor::new()).build(connector))
}

/// Issue a bodyless GET with the given headers, following redirects.
///
/// Relative `Location` values are resolved against the URI they came from.
pub async fn get_following_redirects(
    client: &HttpClient,
    uri: Uri,
    headers: &HeaderMap,
) -> Result<Response<Incoming>, ClientError> {
    let mut uri = uri;

    for _ in 0..MAX_REDIRECTS {
        let mut request = Request::builder()
            .method(Method::GET)
            .uri(uri.clone())
            .body(Body::empty())?;
        request.headers_mut().extend(headers.clone());

        let response = client.request(request).await?;

        if !response.status().is_redirection() {
            return Ok(response);
        }
        let Some(location) = response
            .headers()
            .get(axum::http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
        else {
            return Ok(response);
        };

        uri = resolve_location(&uri, location)?;
        tracing::debug!(next = %uri, "following upstream redirect");
    }

    Err(ClientError::TooManyRedirects(uri))
}

/// Resolve a possibly-relative Location against the URI that returned it.
fn resolve_location(base: &Uri, location: &str) -> Result<Uri, ClientError> {
    match Url::parse(&base.to_string()) {
        Ok(base_url) => match base_url.join(location) {
            Ok(resolved) => Ok(resolved.as_str().parse()?),
            Err(_) => Ok(location.parse()?),
        },
        Err(_) => Ok(location.parse()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_location() {
        let base: Uri = "https://registry-1.docker.io/v2/".parse().unwrap();
        let resolved = resolve_location(&base, "/token?service=x").unwrap();
        assert_eq!(resolved.to_string(), "https://registry-1.docker.io/token?service=x");
    }

    #[test]
    fn test_resolve_absolute_location() {
        let base: Uri = "https://registry-1.docker.io/v2/".parse().unwrap();
        let resolved = resolve_location(&base, "https://auth.docker.io/token").unwrap();
        assert_eq!(resolved.to_string(), "https://auth.docker.io/token");
    }
}
