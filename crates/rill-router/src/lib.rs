#![forbid(unsafe_code)]

//! Path-based routing for Rill.
//!
//! The router is deliberately thin: a thread-local location signal
//! ([`navigate`], [`current_path`], [`configure_router`]), segment-wise
//! pattern matching with `:name` captures ([`match_route`]), and route
//! regions that are plain dynamic containers ([`route`],
//! [`route_prefix`], [`link`]). Matched params reach descendants through
//! the ambient context ([`use_params`]). All rendering, whether server
//! strings, hydration, or client swaps, goes through the shared executors.

mod location;
mod matching;
mod outlet;

pub use location::{configure_router, current_path, navigate};
pub use matching::{RouteParams, match_route};
pub use outlet::{link, route, route_prefix, use_params};
