//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router and middleware stack
//! - Resolve the upstream route for each inbound request
//! - Dispatch to the auth relay, path rewriter or generic forwarder
//! - Serve with graceful shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, HOST, LOCATION};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router as AxumRouter;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::error::{ProxyError, ProxyResult};
use crate::http::{auth, forward, relay, rewrite, RequestContext};
use crate::routing::{RouteError, Router};
use crate::upstream::{build_client, HttpClient};

/// Error constructing the server from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The route table could not be compiled.
    #[error(transparent)]
    Route(#[from] RouteError),

    /// The outbound TLS client could not be built.
    #[error("failed to build outbound client: {0}")]
    Client(#[from] std::io::Error),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    router: Arc<Router>,
    client: HttpClient,
}

/// HTTP server for the registry proxy.
pub struct HttpServer {
    router: AxumRouter,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, StartupError> {
        let router = Arc::new(Router::from_config(&config.routing)?);
        let client = build_client()?;

        let state = AppState { router, client };

        let router = AxumRouter::new()
            .route("/", any(root_redirect))
            .route("/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http());

        Ok(Self { router })
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// `GET /` → 301 to the registry API root on the inbound origin.
async fn root_redirect(request: Request<Body>) -> Response {
    let scheme = inbound_scheme(request.headers());
    let host = inbound_host(&request);
    let location = format!("{scheme}://{host}/v2/");
    (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location)]).into_response()
}

/// Top-level proxy handler: resolve the route, then relay.
async fn proxy_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> ProxyResult<Response> {
    let scheme = inbound_scheme(request.headers());
    let host = inbound_host(&request);
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let authorization = request.headers().get(AUTHORIZATION).cloned();

    let Some(resolved) = state.router.resolve(&host, &path) else {
        tracing::warn!(%host, %path, "no route for host");
        return Err(ProxyError::RouteNotFound {
            routes: state.router.table().listing(),
        });
    };

    let ctx = RequestContext::new(resolved, scheme, host, query, authorization);

    tracing::debug!(
        method = %request.method(),
        %path,
        upstream = %ctx.route.origin(),
        upstream_path = %ctx.upstream_path,
        "proxying request"
    );

    // The two virtual auth endpoints are matched on the upstream-relative
    // path, so they work under both routing strategies.
    match ctx.upstream_path.as_str() {
        "/v2/" | "/v2" => return auth::probe(&state.client, &ctx).await,
        "/v2/auth" => return auth::token(&state.client, &ctx).await,
        _ => {}
    }

    if let Some(redirect) = rewrite::library_redirect(&ctx) {
        return Ok(redirect);
    }

    let response = forward::forward(&state.client, &ctx, request).await?;
    Ok(relay::postprocess(&ctx, response))
}

/// Scheme of the original inbound URL. Behind a TLS-terminating front the
/// standard carrier is `X-Forwarded-Proto`; plain HTTP otherwise.
fn inbound_scheme(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http")
        .to_string()
}

/// Host of the original inbound URL, from the Host header (HTTP/1.1) or
/// the URI authority (HTTP/2).
fn inbound_host(request: &Request<Body>) -> String {
    request
        .headers()
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.to_string()))
        .unwrap_or_default()
}
