//! Observability subsystem.
//!
//! # Design Decisions
//! - Structured logging via tracing; every handler decision logs with
//!   request-shaped fields (host, path, upstream)
//! - Metrics sinks are the hosting environment's concern, not the proxy's

pub mod logging;
