#![forbid(unsafe_code)]

//! A complete round trip through Rill: render a routed app on the
//! "server", load the markup into an in-memory document, hydrate over
//! it, drive it with events, and navigate client-side.
//!
//! Run with: cargo run -p rill-demo
//! Set RUST_LOG=debug to watch hydration claims, route matches, and
//! list reconciliation as they happen.

use rill::prelude::*;
use tracing::info;

fn app() -> tree::VNode {
    tree::el("main")
        .child(
            tree::el("nav")
                .child(router::link("/", [tree::text("counter")]))
                .child(router::link("/about", [tree::text("about")])),
        )
        .child(router::route("/", counter_page))
        .child(router::route("/about", about_page))
        .into()
}

fn counter_page() -> tree::VNode {
    let (count, set_count) = reactive::create_signal(0u32);
    let shown = count.clone();
    tree::el("section")
        .child(
            tree::el("button")
                .on("click", move |_| set_count.update(|n| n + 1))
                .child(tree::text("+1")),
        )
        .child(
            tree::el("p")
                .child(tree::text("count: "))
                .child(tree::dyn_text(move || shown.get().to_string())),
        )
        .into()
}

fn about_page() -> tree::VNode {
    tree::suspense(
        tree::component(|| {
            let version = tree::create_resource("about", || async {
                String::from("rill 0.1.0, rendered twice from one tree")
            });
            tree::el("p")
                .child(tree::dyn_text(move || version.get().unwrap_or_default()))
                .into()
        }),
        tree::text("loading..."),
    )
}

fn find_by_tag(doc: &dom::Document, from: dom::NodeId, tag: &str) -> Option<dom::NodeId> {
    if doc.tag(from).as_deref() == Some(tag) {
        return Some(from);
    }
    doc.children(from)
        .into_iter()
        .find_map(|child| find_by_tag(doc, child, tag))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Server side: route the request and render its markup, driving any
    // resources to completion between passes.
    router::configure_router("/");
    let html = ssr::render_to_string_async(app);
    println!("server markup:\n{html}\n");

    // Client side: read the markup back and hydrate the same app over it.
    let doc = dom::parse_document(&html).expect("server markup parses");
    let mutations_before = doc.mutation_count();
    let created_before = doc.created_count();
    let handle = dom::hydrate(app, &doc, doc.root());
    info!(
        strips = doc.mutation_count() - mutations_before,
        created = doc.created_count() - created_before,
        "hydrated over server markup"
    );

    // Drive it: three clicks on the counter button.
    let button = find_by_tag(&doc, doc.root(), "button").expect("counter button");
    for _ in 0..3 {
        doc.dispatch(button, &tree::Event::new("click"));
    }
    println!("after three clicks:\n{}\n", doc.inner_html(doc.root()));

    // Client-side navigation: swap to the about page and let its
    // resource resolve.
    router::navigate("/about");
    handle.settle();
    println!("after navigating to /about:\n{}", doc.inner_html(doc.root()));
}
