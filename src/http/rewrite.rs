//! Docker Hub implicit `library/` path rewriting.
//!
//! Docker Hub stores official images under the `library/` namespace but
//! clients request them unqualified (`/v2/busybox/manifests/latest`). The
//! proxy mirrors the upstream convention by redirecting such references to
//! their canonical path. Other registries have no implicit namespace, so
//! the rewrite never fires for them.

use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::http::RequestContext;

/// Issue a 301 to the `library/`-qualified path for unqualified Docker Hub
/// image references. Returns `None` when the request needs no rewrite.
pub(crate) fn library_redirect(ctx: &RequestContext<'_>) -> Option<Response> {
    if !ctx.route.is_docker_hub() {
        return None;
    }

    let path = ctx.upstream_path.as_str();
    if !path.starts_with("/v2/") {
        return None;
    }

    // Registry API shape: /v2/<name>/<resource>/<reference>
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.len() < 3 || segments[0] != "v2" {
        return None;
    }

    // A split segment never contains '/', so an unqualified reference is
    // simply one that isn't already in the library namespace.
    let name = segments[1];
    if name == "library" {
        return None;
    }

    let mut location = format!(
        "{}{}/v2/library/{}",
        ctx.inbound_origin(),
        ctx.routing_prefix,
        &path["/v2/".len()..],
    );
    if let Some(query) = &ctx.query {
        location.push('?');
        location.push_str(query);
    }

    tracing::debug!(%location, "redirecting unqualified Docker Hub reference");

    Some((StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{RouteConfig, DOCKER_HUB_UPSTREAM};
    use crate::routing::RouteTable;

    fn context(upstream_path: &str, prefix: &str, query: Option<&str>, docker_hub: bool) -> Response {
        let upstream = if docker_hub {
            DOCKER_HUB_UPSTREAM
        } else {
            "https://quay.io"
        };
        let table = RouteTable::from_routes(&[RouteConfig::new("r", upstream)]).unwrap();
        let ctx = RequestContext {
            route: table.get("r").unwrap(),
            upstream_path: upstream_path.to_string(),
            routing_prefix: prefix.to_string(),
            scheme: "https".to_string(),
            host: "proxy.example.com".to_string(),
            query: query.map(str::to_string),
            authorization: None,
        };
        match library_redirect(&ctx) {
            Some(response) => response,
            None => (StatusCode::OK, "no rewrite").into_response(),
        }
    }

    fn location(response: &Response) -> Option<&str> {
        response.headers().get(LOCATION).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_unqualified_reference_is_redirected() {
        let response = context("/v2/busybox/manifests/latest", "", None, true);
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            location(&response),
            Some("https://proxy.example.com/v2/library/busybox/manifests/latest")
        );
    }

    #[test]
    fn test_routing_prefix_and_query_preserved() {
        let response = context("/v2/busybox/blobs/sha256:abc", "/docker.io", Some("from=x"), true);
        assert_eq!(
            location(&response),
            Some("https://proxy.example.com/docker.io/v2/library/busybox/blobs/sha256:abc?from=x")
        );
    }

    #[test]
    fn test_library_reference_passes_through() {
        let response = context("/v2/library/busybox/manifests/latest", "", None, true);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_short_paths_pass_through() {
        assert_eq!(context("/v2/", "", None, true).status(), StatusCode::OK);
        assert_eq!(context("/v2/_catalog", "", None, true).status(), StatusCode::OK);
    }

    #[test]
    fn test_never_fires_for_other_registries() {
        let response = context("/v2/busybox/manifests/latest", "", None, false);
        assert_eq!(response.status(), StatusCode::OK);
    }
}
