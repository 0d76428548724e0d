//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check route keys are unique and non-empty
//! - Check upstream origins parse as bare http(s) origins
//! - Check strategy-specific requirements
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use url::Url;

use crate::config::schema::{ProxyConfig, RoutingStrategy, DOCKER_HUB_UPSTREAM};

/// A single semantic validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A route has an empty routing key.
    #[error("route for upstream {0} has an empty key")]
    EmptyKey(String),

    /// Two routes share the same routing key.
    #[error("duplicate routing key: {0}")]
    DuplicateKey(String),

    /// An upstream does not parse as an absolute URL.
    #[error("route {key}: upstream {upstream} is not a valid URL")]
    InvalidUpstream {
        /// Routing key of the offending route.
        key: String,
        /// The unparseable upstream value.
        upstream: String,
    },

    /// An upstream carries more than scheme and authority.
    #[error("route {key}: upstream {upstream} must be a bare http(s) origin")]
    UpstreamNotOrigin {
        /// Routing key of the offending route.
        key: String,
        /// The offending upstream value.
        upstream: String,
    },

    /// Subdomain strategy with an empty route table can never match.
    #[error("subdomain strategy requires at least one route")]
    NoRoutes,

    /// Path-prefix strategy defaults unmatched paths to Docker Hub,
    /// so a Docker Hub route must exist.
    #[error("path-prefix strategy requires a Docker Hub route ({DOCKER_HUB_UPSTREAM})")]
    MissingDockerHub,
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for route in &config.routing.routes {
        if route.key.is_empty() {
            errors.push(ValidationError::EmptyKey(route.upstream.clone()));
        } else if !seen.insert(route.key.as_str()) {
            errors.push(ValidationError::DuplicateKey(route.key.clone()));
        }

        match Url::parse(&route.upstream) {
            Ok(url) => {
                let scheme_ok = url.scheme() == "http" || url.scheme() == "https";
                let bare_origin = url.host_str().is_some()
                    && (url.path() == "/" || url.path().is_empty())
                    && url.query().is_none();
                if !scheme_ok || !bare_origin {
                    errors.push(ValidationError::UpstreamNotOrigin {
                        key: route.key.clone(),
                        upstream: route.upstream.clone(),
                    });
                }
            }
            Err(_) => errors.push(ValidationError::InvalidUpstream {
                key: route.key.clone(),
                upstream: route.upstream.clone(),
            }),
        }
    }

    match config.routing.strategy {
        RoutingStrategy::Subdomain => {
            if config.routing.routes.is_empty() {
                errors.push(ValidationError::NoRoutes);
            }
        }
        RoutingStrategy::PathPrefix => {
            let has_docker_hub = config.routing.routes.iter().any(|r| {
                r.docker_hub
                    .unwrap_or_else(|| r.upstream.trim_end_matches('/') == DOCKER_HUB_UPSTREAM)
            });
            if !has_docker_hub {
                errors.push(ValidationError::MissingDockerHub);
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let mut config = ProxyConfig::default();
        config
            .routing
            .routes
            .push(RouteConfig::new("docker.io", "https://example.com"));
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::DuplicateKey("docker.io".into())));
    }

    #[test]
    fn test_upstream_with_path_rejected() {
        let mut config = ProxyConfig::default();
        config
            .routing
            .routes
            .push(RouteConfig::new("bad", "https://example.com/v2"));
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::UpstreamNotOrigin { .. }));
    }

    #[test]
    fn test_path_prefix_requires_docker_hub() {
        let mut config = ProxyConfig::default();
        config.routing.routes = vec![RouteConfig::new("quay.io", "https://quay.io")];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::MissingDockerHub));
    }

    #[test]
    fn test_all_errors_collected() {
        let mut config = ProxyConfig::default();
        config.routing.routes = vec![
            RouteConfig::new("", "https://quay.io"),
            RouteConfig::new("bad", "not a url"),
        ];
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3); // empty key, invalid url, missing docker hub
    }
}
