//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path)
//!     → router.rs (derive routing key per strategy)
//!     → table.rs (key → upstream origin + header overrides)
//!     → Return: Resolved { route, upstream_path, routing_prefix } or NotFound
//!
//! Table Compilation (at startup):
//!     RouteConfig[]
//!     → Parse upstream origins and header overrides
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Table compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route
//! - Routing key derivation is the only strategy-specific code; everything
//!   downstream (auth relay, rewrites, forwarding) is shared

pub mod router;
pub mod table;

pub use router::{Resolved, Router};
pub use table::{Route, RouteError, RouteTable};
