//! Registry proxy library.
//!
//! An HTTP reverse proxy for the OCI/Docker Distribution v2 protocol: it
//! accepts registry client traffic on a single endpoint and relays it to
//! one of several upstream registries, selected by subdomain or path
//! prefix. It forwards authentication challenges, rewrites Docker Hub's
//! implicit `library/` namespace, and propagates blob-storage redirects.
//! The proxy is a stateless pass-through and never stores registry content.

// Core subsystems
pub mod config;
pub mod http;
pub mod routing;
pub mod upstream;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
