//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Canonical Docker Hub upstream origin.
///
/// A route pointing here gets Docker Hub's implicit `library/` namespace
/// handling (path rewrite and token scope rewrite).
pub const DOCKER_HUB_UPSTREAM: &str = "https://registry-1.docker.io";

/// Root configuration for the registry proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Routing strategy and the upstream route table.
    pub routing: RoutingConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// How the routing key is derived from an inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoutingStrategy {
    /// Routing key is the full request hostname; paths pass through unchanged.
    Subdomain,

    /// Routing key is the first path segment when it names a known route;
    /// otherwise the request defaults to the Docker Hub route.
    PathPrefix,
}

/// Routing configuration: strategy plus the route table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Strategy used to pick the routing key.
    pub strategy: RoutingStrategy,

    /// Route definitions mapping routing keys to upstream registries.
    pub routes: Vec<RouteConfig>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            strategy: RoutingStrategy::PathPrefix,
            routes: default_routes(),
        }
    }
}

/// A single route: routing key → upstream registry origin.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Routing key (subdomain or leading path segment, per strategy).
    pub key: String,

    /// Upstream registry origin (scheme + host, no path).
    pub upstream: String,

    /// Headers forced onto forwarded requests for this route.
    /// Used for upstreams that require a literal `Host` (GCR, GHCR).
    #[serde(default)]
    pub extra_headers: HashMap<String, String>,

    /// Force Docker Hub semantics (implicit `library/` handling) on or
    /// off. When unset, detected from the upstream origin. Useful for
    /// Docker Hub mirrors served from another hostname.
    #[serde(default)]
    pub docker_hub: Option<bool>,
}

impl RouteConfig {
    /// Route without header overrides.
    pub fn new(key: impl Into<String>, upstream: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            upstream: upstream.into(),
            extra_headers: HashMap::new(),
            docker_hub: None,
        }
    }

    /// Route that forces a literal `Host` header on forwarded requests.
    pub fn with_host_override(
        key: impl Into<String>,
        upstream: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            upstream: upstream.into(),
            extra_headers: HashMap::from([("Host".to_string(), host.into())]),
            docker_hub: None,
        }
    }
}

/// The standard public-registry table used when no config file is given.
///
/// Keys are registry hostnames, which read naturally as path prefixes
/// (`/ghcr.io/owner/image`). A subdomain deployment supplies its own keys.
fn default_routes() -> Vec<RouteConfig> {
    vec![
        RouteConfig::new("docker.io", DOCKER_HUB_UPSTREAM),
        RouteConfig::new("quay.io", "https://quay.io"),
        RouteConfig::with_host_override("gcr.io", "https://gcr.io", "gcr.io"),
        RouteConfig::new("k8s.gcr.io", "https://k8s.gcr.io"),
        RouteConfig::new("registry.k8s.io", "https://registry.k8s.io"),
        RouteConfig::with_host_override("ghcr.io", "https://ghcr.io", "ghcr.io"),
        RouteConfig::new("docker.cloudsmith.io", "https://docker.cloudsmith.io"),
        RouteConfig::new("public.ecr.aws", "https://public.ecr.aws"),
    ]
}

/// Timeout configuration for inbound request handling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}
