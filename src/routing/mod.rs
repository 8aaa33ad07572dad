//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! IpcRequest.url ("/api/users?x=1")
//!     → matcher.rs (routing key "/api")
//!     → router.rs (first rule with that path, its first upstream)
//!     → Return: RouteTarget { url: upstream.url + original url } or None
//! ```
//!
//! # Design Decisions
//! - Routes built at worker start, immutable at runtime
//! - Deterministic: same input always matches same route
//! - First match wins, in configured order

pub mod matcher;
pub mod router;

pub use router::{RouteTarget, Router};
