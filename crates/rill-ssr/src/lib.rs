#![forbid(unsafe_code)]

//! Server-side string target for Rill.
//!
//! Renders a descriptor tree to the markup dialect the client hydrator
//! expects: elements stamped with `data-rill` addresses, `<!---->`
//! separators between adjacent text runs, presence attributes bare, void
//! elements self-closed. [`render_to_string`] is one synchronous pass;
//! [`render_to_string_async`] drives registered resources and re-renders
//! until every suspense boundary settles or the pass budget runs out,
//! reusing the resource cache so settled fetches stay settled.

mod render;

pub use render::{SsrOptions, render_to_string, render_to_string_async, render_to_string_async_with};
