#![forbid(unsafe_code)]

//! Rill public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users.

pub mod prelude {
    pub use rill_dom as dom;
    pub use rill_reactive as reactive;
    #[cfg(feature = "router")]
    pub use rill_router as router;
    #[cfg(feature = "ssr")]
    pub use rill_ssr as ssr;
    pub use rill_tree as tree;
}
