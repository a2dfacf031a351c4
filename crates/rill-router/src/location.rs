//! The process-wide location: one path signal everything else observes.
//!
//! There is no browser history here; the location is just a signal of the
//! current path. [`navigate`] writes it (deduped like any signal write),
//! [`current_path`] reads it tracked, and [`configure_router`] seeds it
//! before a server render so route regions resolve against the requested
//! URL. State is thread-local, matching the single-threaded runtime: each
//! server worker thread routes independently.

use rill_reactive::{ReadSignal, WriteSignal, create_signal};
use tracing::debug;

thread_local! {
    static LOCATION: (ReadSignal<String>, WriteSignal<String>) =
        create_signal(String::from("/"));
}

/// Collapse a path to its canonical spelling: a leading slash, no
/// trailing slash except on the root itself. `""` and `"/"` are both the
/// root.
#[must_use]
pub(crate) fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    if !path.starts_with('/') {
        out.push('/');
    }
    out.push_str(path);
    while out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// Seed the location before rendering, typically once per server request.
///
/// This is a plain signal write: if anything is already subscribed (a
/// long-lived client tree), it reacts like a navigation.
pub fn configure_router(initial: &str) {
    let initial = normalize(initial);
    debug!(path = %initial, "router configured");
    LOCATION.with(|(_, set_path)| set_path.set(initial));
}

/// The current path. Tracked: an effect reading this re-runs on
/// navigation.
#[must_use]
pub fn current_path() -> String {
    LOCATION.with(|(path, _)| path.get())
}

/// Change the current path. Equal paths are silent, like any signal
/// write; otherwise every route region re-matches.
pub fn navigate(to: &str) {
    let to = normalize(to);
    debug!(path = %to, "navigate");
    LOCATION.with(|(_, set_path)| set_path.set(to));
}
