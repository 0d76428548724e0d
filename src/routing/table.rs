//! The immutable route table.
//!
//! # Responsibilities
//! - Store routing key → upstream origin + header overrides
//! - Identify the Docker Hub route (implicit `library/` handling)
//! - Enumerate configured routes for the 404 diagnostic body
//!
//! # Design Decisions
//! - Built once from validated config, immutable at runtime
//! - O(1) key lookup via HashMap, no locking needed
//! - Upstream origins and header overrides pre-parsed at build time

use std::collections::HashMap;

use axum::http::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::config::schema::{RouteConfig, DOCKER_HUB_UPSTREAM};

/// Error building a route table entry from config.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// The upstream origin does not parse as a URL.
    #[error("route {key}: invalid upstream {upstream}")]
    InvalidUpstream {
        /// Routing key of the offending route.
        key: String,
        /// The unparseable upstream value.
        upstream: String,
    },

    /// An extra header name or value is not valid HTTP.
    #[error("route {key}: invalid extra header {name}")]
    InvalidHeader {
        /// Routing key of the offending route.
        key: String,
        /// The offending header name.
        name: String,
    },
}

/// A compiled route: upstream origin plus forced request headers.
#[derive(Debug, Clone)]
pub struct Route {
    key: String,
    upstream: Url,
    extra_headers: HeaderMap,
    docker_hub: bool,
}

impl Route {
    /// Routing key this route was registered under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Upstream origin as a parsed URL (used as a join base for redirects).
    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    /// Upstream origin as a string without a trailing slash, suitable for
    /// prepending an upstream-relative path.
    pub fn origin(&self) -> &str {
        self.upstream.as_str().trim_end_matches('/')
    }

    /// Headers forced onto every request forwarded through this route.
    pub fn extra_headers(&self) -> &HeaderMap {
        &self.extra_headers
    }

    /// Whether this route points at Docker Hub and therefore gets the
    /// implicit `library/` namespace treatment.
    pub fn is_docker_hub(&self) -> bool {
        self.docker_hub
    }
}

/// Immutable mapping from routing key to upstream route.
#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: HashMap<String, Route>,
    docker_hub_key: Option<String>,
}

impl RouteTable {
    /// Compile a route table from validated configuration.
    pub fn from_routes(configs: &[RouteConfig]) -> Result<Self, RouteError> {
        let mut routes = HashMap::with_capacity(configs.len());
        let mut docker_hub_key = None;

        for config in configs {
            let upstream =
                Url::parse(&config.upstream).map_err(|_| RouteError::InvalidUpstream {
                    key: config.key.clone(),
                    upstream: config.upstream.clone(),
                })?;

            let mut extra_headers = HeaderMap::new();
            for (name, value) in &config.extra_headers {
                let header_name =
                    HeaderName::try_from(name.as_str()).map_err(|_| RouteError::InvalidHeader {
                        key: config.key.clone(),
                        name: name.clone(),
                    })?;
                let header_value =
                    HeaderValue::try_from(value.as_str()).map_err(|_| RouteError::InvalidHeader {
                        key: config.key.clone(),
                        name: name.clone(),
                    })?;
                extra_headers.insert(header_name, header_value);
            }

            let docker_hub = config
                .docker_hub
                .unwrap_or_else(|| config.upstream.trim_end_matches('/') == DOCKER_HUB_UPSTREAM);
            if docker_hub && docker_hub_key.is_none() {
                docker_hub_key = Some(config.key.to_lowercase());
            }

            routes.insert(
                config.key.to_lowercase(),
                Route {
                    key: config.key.clone(),
                    upstream,
                    extra_headers,
                    docker_hub,
                },
            );
        }

        Ok(Self {
            routes,
            docker_hub_key,
        })
    }

    /// Look up a route by key (case-insensitive, per HTTP host semantics).
    pub fn get(&self, key: &str) -> Option<&Route> {
        self.routes.get(&key.to_lowercase())
    }

    /// The Docker Hub route, if one is configured.
    pub fn docker_hub(&self) -> Option<&Route> {
        self.docker_hub_key.as_deref().and_then(|k| self.routes.get(k))
    }

    /// Routing key → upstream listing for the 404 diagnostic body.
    pub fn listing(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .routes
            .values()
            .map(|r| (r.key.clone(), serde_json::Value::from(r.origin())))
            .collect();
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ProxyConfig;

    fn default_table() -> RouteTable {
        RouteTable::from_routes(&ProxyConfig::default().routing.routes).unwrap()
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = default_table();
        assert!(table.get("GHCR.IO").is_some());
        assert!(table.get("ghcr.io").is_some());
        assert!(table.get("example.com").is_none());
    }

    #[test]
    fn test_docker_hub_detection() {
        let table = default_table();
        let hub = table.docker_hub().unwrap();
        assert_eq!(hub.key(), "docker.io");
        assert!(hub.is_docker_hub());
        assert!(!table.get("quay.io").unwrap().is_docker_hub());
    }

    #[test]
    fn test_origin_has_no_trailing_slash() {
        let table = default_table();
        assert_eq!(table.get("quay.io").unwrap().origin(), "https://quay.io");
    }

    #[test]
    fn test_extra_headers_compiled() {
        let table = default_table();
        let route = table.get("gcr.io").unwrap();
        assert_eq!(
            route.extra_headers().get("host").map(|v| v.as_bytes()),
            Some(&b"gcr.io"[..])
        );
    }

    #[test]
    fn test_listing_enumerates_every_route() {
        let table = default_table();
        let listing = table.listing();
        assert_eq!(
            listing.get("docker.io").and_then(|v| v.as_str()),
            Some(DOCKER_HUB_UPSTREAM)
        );
        assert_eq!(listing.as_object().unwrap().len(), 8);
    }
}
