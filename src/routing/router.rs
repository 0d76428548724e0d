//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Derive the routing key from host or path, per configured strategy
//! - Strip the routing prefix from path-prefix requests exactly once
//! - Return the matched route or explicit no-match
//!
//! # Design Decisions
//! - One router parameterized by strategy; both strategies share the same
//!   table and all downstream relay logic
//! - Subdomain strategy: no match is an explicit NotFound (rendered as the
//!   404 route listing)
//! - Path-prefix strategy: unmatched paths default to the Docker Hub route
//!   with the path unchanged

use crate::config::schema::{RoutingConfig, RoutingStrategy};
use crate::routing::table::{Route, RouteError, RouteTable};

/// Strip a trailing `:port` from a Host header value.
///
/// Bracketed IPv6 literals (`[::1]`) keep their brackets and are never
/// split on the colons inside them.
pub(crate) fn hostname(host: &str) -> &str {
    if host.ends_with(']') {
        return host;
    }
    host.rsplit_once(':').map_or(host, |(h, _)| h)
}

/// Result of resolving an inbound request against the route table.
#[derive(Debug)]
pub struct Resolved<'a> {
    /// The matched upstream route.
    pub route: &'a Route,

    /// Path to request from the upstream (routing prefix removed).
    pub upstream_path: String,

    /// The stripped routing prefix (`/<key>`), empty for subdomain routing.
    pub routing_prefix: String,
}

/// Strategy-aware request router over an immutable [`RouteTable`].
#[derive(Debug, Clone)]
pub struct Router {
    table: RouteTable,
    strategy: RoutingStrategy,
}

impl Router {
    /// Compile a router from validated routing configuration.
    pub fn from_config(config: &RoutingConfig) -> Result<Self, RouteError> {
        Ok(Self {
            table: RouteTable::from_routes(&config.routes)?,
            strategy: config.strategy,
        })
    }

    /// The underlying route table.
    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Resolve an inbound host and path to an upstream route.
    ///
    /// Returns `None` only under the subdomain strategy when the hostname
    /// names no configured route.
    pub fn resolve<'a>(&'a self, host: &str, path: &str) -> Option<Resolved<'a>> {
        match self.strategy {
            RoutingStrategy::Subdomain => {
                // Host header may carry a port; routing keys are hostnames.
                let route = self.table.get(hostname(host))?;
                Some(Resolved {
                    route,
                    upstream_path: path.to_string(),
                    routing_prefix: String::new(),
                })
            }
            RoutingStrategy::PathPrefix => {
                let first_segment = path.split('/').find(|s| !s.is_empty());
                if let Some(segment) = first_segment {
                    let prefix = format!("/{segment}");
                    if let (Some(route), Some(remainder)) =
                        (self.table.get(segment), path.strip_prefix(prefix.as_str()))
                    {
                        let upstream_path = if remainder.starts_with('/') {
                            remainder.to_string()
                        } else {
                            format!("/{remainder}")
                        };
                        return Some(Resolved {
                            route,
                            upstream_path,
                            routing_prefix: prefix,
                        });
                    }
                }

                // Unprefixed paths go to Docker Hub; validation guarantees
                // the route exists for this strategy.
                let route = self.table.docker_hub()?;
                Some(Resolved {
                    route,
                    upstream_path: path.to_string(),
                    routing_prefix: String::new(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{ProxyConfig, RouteConfig, DOCKER_HUB_UPSTREAM};

    fn path_prefix_router() -> Router {
        Router::from_config(&ProxyConfig::default().routing).unwrap()
    }

    fn subdomain_router() -> Router {
        let config = RoutingConfig {
            strategy: RoutingStrategy::Subdomain,
            routes: vec![
                RouteConfig::new("docker.example.com", DOCKER_HUB_UPSTREAM),
                RouteConfig::new("quay.example.com", "https://quay.io"),
            ],
        };
        Router::from_config(&config).unwrap()
    }

    #[test]
    fn test_subdomain_resolves_by_hostname() {
        let router = subdomain_router();
        let resolved = router.resolve("quay.example.com", "/v2/org/image/tags/list").unwrap();
        assert_eq!(resolved.route.origin(), "https://quay.io");
        assert_eq!(resolved.upstream_path, "/v2/org/image/tags/list");
        assert_eq!(resolved.routing_prefix, "");
    }

    #[test]
    fn test_subdomain_ignores_port_and_case() {
        let router = subdomain_router();
        assert!(router.resolve("Docker.Example.Com:8080", "/v2/").is_some());
    }

    #[test]
    fn test_hostname_strips_port_but_not_ipv6_colons() {
        assert_eq!(hostname("example.com"), "example.com");
        assert_eq!(hostname("example.com:8080"), "example.com");
        assert_eq!(hostname("[::1]"), "[::1]");
        assert_eq!(hostname("[::1]:8080"), "[::1]");
    }

    #[test]
    fn test_subdomain_handles_ipv6_literal_host() {
        let config = RoutingConfig {
            strategy: RoutingStrategy::Subdomain,
            routes: vec![RouteConfig::new("[::1]", DOCKER_HUB_UPSTREAM)],
        };
        let router = Router::from_config(&config).unwrap();
        assert!(router.resolve("[::1]:8080", "/v2/").is_some());
        assert!(router.resolve("[::1]", "/v2/").is_some());
    }

    #[test]
    fn test_subdomain_unknown_host_is_not_found() {
        let router = subdomain_router();
        assert!(router.resolve("other.example.com", "/v2/").is_none());
    }

    #[test]
    fn test_path_prefix_strips_key_exactly_once() {
        let router = path_prefix_router();
        let resolved = router
            .resolve("proxy.local", "/ghcr.io/v2/owner/image/manifests/latest")
            .unwrap();
        assert_eq!(resolved.route.origin(), "https://ghcr.io");
        assert_eq!(resolved.upstream_path, "/v2/owner/image/manifests/latest");
        assert_eq!(resolved.routing_prefix, "/ghcr.io");
    }

    #[test]
    fn test_path_prefix_defaults_to_docker_hub() {
        let router = path_prefix_router();
        let resolved = router.resolve("proxy.local", "/v2/busybox/manifests/latest").unwrap();
        assert!(resolved.route.is_docker_hub());
        assert_eq!(resolved.upstream_path, "/v2/busybox/manifests/latest");
        assert_eq!(resolved.routing_prefix, "");
    }

    #[test]
    fn test_path_prefix_bare_key_maps_to_root() {
        let router = path_prefix_router();
        let resolved = router.resolve("proxy.local", "/quay.io").unwrap();
        assert_eq!(resolved.upstream_path, "/");
        assert_eq!(resolved.routing_prefix, "/quay.io");
    }
}
