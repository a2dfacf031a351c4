//! Server markup through the reader and into hydration, end to end.
//!
//! The contract under test: markup rendered by `rill-ssr`, parsed back
//! with `parse_document`, then hydrated against the same component tree
//! is adopted wholesale. The only writes on the ledger are the
//! `data-rill` marker strips — no node creation, no text or attribute
//! edits — and the adopted tree is live afterwards.

use std::cell::Cell;
use std::rc::Rc;

use rill_dom::{Document, NodeId, hydrate, parse_document};
use rill_reactive::create_signal;
use rill_tree::{
    HYDRATION_ATTR, VNode, create_resource, dyn_text, dynamic, el, fragment, suspense, text,
};
use rill_ssr::{render_to_string, render_to_string_async};
use tracing_test::traced_test;

/// Number of stamped elements in a rendered page; hydration strips one
/// marker per claimed element.
fn stamp_count(html: &str) -> u64 {
    html.matches(HYDRATION_ATTR).count() as u64
}

/// The server markup with every ` data-rill="..."` stamp removed, which
/// is what the document should serialize to after a clean hydration.
fn strip_stamps(html: &str) -> String {
    let marker = format!(" {HYDRATION_ATTR}=\"");
    let mut out = String::new();
    let mut rest = html;
    while let Some(start) = rest.find(&marker) {
        out.push_str(&rest[..start]);
        let after = &rest[start + marker.len()..];
        let end = after.find('"').expect("unterminated stamp");
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

#[test]
fn matching_markup_is_adopted_with_only_marker_strips() {
    let (count, set_count) = create_signal(7);
    let app = {
        let count = count.clone();
        move || -> VNode {
            let count = count.clone();
            el("div")
                .attr("id", "app")
                .class("shell")
                .child(el("h1").child("Counter"))
                .child(
                    el("p")
                        .child("value: ")
                        .child(dyn_text(move || count.get().to_string())),
                )
                .into()
        }
    };

    let html = render_to_string(app.clone());
    let stamps = stamp_count(&html);
    assert_eq!(stamps, 3, "div, h1, p");

    let doc = parse_document(&html).unwrap();
    let mutations_before = doc.mutation_count();
    let created_before = doc.created_count();
    let _handle = hydrate(app, &doc, doc.root());

    assert_eq!(doc.created_count(), created_before, "nothing built fresh");
    assert_eq!(
        doc.mutation_count() - mutations_before,
        stamps,
        "marker strips are the only writes"
    );
    assert_eq!(doc.inner_html(doc.root()), strip_stamps(&html));

    // The adopted tree is live: a write flows into the claimed text node.
    let div = doc.children(doc.root())[0];
    let p = doc.children(div)[1];
    let label = *doc.children(p).last().unwrap();
    assert_eq!(doc.text(label).as_deref(), Some("7"));
    let created = doc.created_count();
    set_count.set(8);
    assert_eq!(doc.text(label).as_deref(), Some("8"));
    assert_eq!(doc.created_count(), created);
}

#[test]
fn fragment_children_hydrate_under_positional_addresses() {
    fn app() -> VNode {
        fragment([
            el("header").child("top").into(),
            el("main").child("middle").into(),
            el("footer").child("bottom").into(),
        ])
    }

    let html = render_to_string(app);
    let doc = parse_document(&html).unwrap();
    let before = doc.mutation_count();
    let _handle = hydrate(app, &doc, doc.root());
    assert_eq!(doc.mutation_count() - before, 3);
    assert_eq!(
        doc.inner_html(doc.root()),
        "<header>top</header><main>middle</main><footer>bottom</footer>"
    );
}

#[test]
fn separator_comments_are_tolerated_and_left_in_place() {
    let (n, set_n) = create_signal(1);
    let app = {
        let n = n.clone();
        move || -> VNode {
            let n = n.clone();
            el("p")
                .child("a")
                .child(dyn_text(move || n.get().to_string()))
                .into()
        }
    };

    let html = render_to_string(app.clone());
    assert!(html.contains("<!---->"), "adjacent text runs are separated");

    let doc = parse_document(&html).unwrap();
    let _handle = hydrate(app, &doc, doc.root());

    let p = doc.children(doc.root())[0];
    let kids = doc.children(p);
    assert_eq!(kids.len(), 3);
    assert!(doc.is_comment(kids[1]), "separator survives hydration");

    set_n.set(2);
    let kids_after = doc.children(p);
    assert_eq!(kids_after, kids, "update rewrites text in place");
    assert_eq!(doc.text(kids[2]).as_deref(), Some("2"));
}

#[test]
fn dynamic_regions_hydrate_their_first_pass() {
    let (tab, set_tab) = create_signal(0);
    let app = {
        let tab = tab.clone();
        move || -> VNode {
            let tab = tab.clone();
            dynamic(move || {
                if tab.get() == 0 {
                    el("p").child("first").into()
                } else {
                    el("span").child("second").into()
                }
            })
        }
    };

    let html = render_to_string(app.clone());
    let doc = parse_document(&html).unwrap();
    let before = doc.mutation_count();
    let _handle = hydrate(app, &doc, doc.root());
    // Container plus the rendered <p> are claimed.
    assert_eq!(doc.mutation_count() - before, 2);

    let container = doc.children(doc.root())[0];
    assert_eq!(doc.inner_html(container), "<p>first</p>");

    set_tab.set(1);
    assert_eq!(doc.inner_html(container), "<span>second</span>");
}

#[test]
#[traced_test]
fn a_mismatched_subtree_degrades_to_fresh_creation() {
    fn server() -> VNode {
        el("div")
            .child(el("span").child("old"))
            .child(el("p").child("kept"))
            .into()
    }
    fn client() -> VNode {
        el("div")
            .child(el("em").child("new"))
            .child(el("p").child("kept"))
            .into()
    }

    let doc = parse_document(&render_to_string(server)).unwrap();
    let _handle = hydrate(client, &doc, doc.root());

    assert!(logs_contain("hydration miss"));
    assert_eq!(
        doc.inner_html(doc.root()),
        "<div><em>new</em><p>kept</p></div>"
    );
}

#[test]
#[traced_test]
fn a_panicking_hydration_falls_back_to_a_fresh_mount() {
    let tripped = Rc::new(Cell::new(false));
    let app = {
        let tripped = Rc::clone(&tripped);
        move || -> VNode {
            if !tripped.replace(true) {
                panic!("first render trips");
            }
            el("div").child("recovered").into()
        }
    };

    let doc = parse_document("<div data-rill=\"0\">server</div>").unwrap();
    let _handle = hydrate(app, &doc, doc.root());

    assert!(logs_contain("hydration panicked"));
    assert_eq!(doc.inner_html(doc.root()), "<div>recovered</div>");
}

#[test]
fn suspense_containers_claim_but_contents_render_fresh() {
    fn app() -> VNode {
        suspense(
            rill_tree::component(|| {
                let user = create_resource("user", || async { String::from("Ada") });
                el("p")
                    .child(dyn_text(move || user.get().unwrap_or_default()))
                    .into()
            }),
            text("loading..."),
        )
    }

    // The server settled the resource; its markup carries the content.
    let html = render_to_string_async(app);
    assert!(html.contains("Ada"));

    let doc = parse_document(&html).unwrap();
    let handle = hydrate(app, &doc, doc.root());
    let container = doc.children(doc.root())[0];

    // The client cache is empty, so the boundary is pending again and
    // shows the fallback until its resource is driven.
    assert_eq!(doc.inner_html(container), "loading...");
    assert_eq!(handle.pending_count(), 1);

    handle.settle();
    assert_eq!(doc.inner_html(container), "<p>Ada</p>");
    assert_eq!(handle.pending_count(), 0);
}

fn nth_child(doc: &Document, parent: NodeId, index: usize) -> NodeId {
    doc.children(parent)[index]
}

#[test]
fn hydrated_trees_swap_regions_without_touching_siblings() {
    let (route, set_route) = create_signal(String::from("/"));
    let app = {
        let route = route.clone();
        move || -> VNode {
            let route = route.clone();
            el("div")
                .child(el("nav").child("menu"))
                .child(dynamic(move || {
                    if route.get() == "/" {
                        el("h2").child("home").into()
                    } else {
                        el("h2").child("about").into()
                    }
                }))
                .into()
        }
    };

    let doc = parse_document(&render_to_string(app.clone())).unwrap();
    let _handle = hydrate(app, &doc, doc.root());

    let div = nth_child(&doc, doc.root(), 0);
    let nav = nth_child(&doc, div, 0);
    let nav_text = nth_child(&doc, nav, 0);

    set_route.set(String::from("/about"));
    // The nav subtree was not rebuilt by the region swap.
    assert_eq!(nth_child(&doc, div, 0), nav);
    assert_eq!(nth_child(&doc, nav, 0), nav_text);
    let region = nth_child(&doc, div, 1);
    assert_eq!(doc.inner_html(region), "<h2>about</h2>");
}
