//! Routing end to end: client swaps, param capture, server rendering,
//! and hydration of a routed page.

use rill_dom::{Document, hydrate, mount, parse_document};
use rill_router::{configure_router, current_path, link, navigate, route, route_prefix, use_params};
use rill_ssr::render_to_string;
use rill_tree::{Event, VNode, el, text};
use tracing_test::traced_test;

#[test]
fn navigation_swaps_the_matched_region() {
    configure_router("/");
    let doc = Document::new();
    let _handle = mount(
        || {
            el("div")
                .child(route("/", || el("h1").child(text("home")).into()))
                .child(route("/about", || el("h1").child(text("about")).into()))
                .into()
        },
        &doc,
        doc.root(),
    );

    let div = doc.children(doc.root())[0];
    let home_region = doc.children(div)[0];
    let about_region = doc.children(div)[1];
    assert_eq!(doc.inner_html(home_region), "<h1>home</h1>");
    assert_eq!(doc.inner_html(about_region), "");

    navigate("/about");
    assert_eq!(doc.inner_html(home_region), "");
    assert_eq!(doc.inner_html(about_region), "<h1>about</h1>");
}

#[test]
fn params_reach_the_matched_body() {
    configure_router("/users/42");
    let doc = Document::new();
    let _handle = mount(
        || {
            route("/users/:id", || {
                let params = use_params();
                let id = params.get("id").unwrap_or("?");
                el("p").child(text(format!("user {id}"))).into()
            })
        },
        &doc,
        doc.root(),
    );

    let region = doc.children(doc.root())[0];
    assert_eq!(doc.inner_html(region), "<p>user 42</p>");

    navigate("/users/7");
    assert_eq!(doc.inner_html(region), "<p>user 7</p>");

    navigate("/teams/7");
    assert_eq!(doc.inner_html(region), "");
}

#[test]
fn layout_routes_nest_exact_children() {
    configure_router("/docs/intro");
    let doc = Document::new();
    let _handle = mount(
        || {
            route_prefix("/docs", || {
                el("section")
                    .child(el("aside").child(text("sidebar")))
                    .child(route("/docs/intro", || {
                        el("article").child(text("intro")).into()
                    }))
                    .child(route("/docs/setup", || {
                        el("article").child(text("setup")).into()
                    }))
                    .into()
            })
        },
        &doc,
        doc.root(),
    );

    let outer = doc.children(doc.root())[0];
    assert_eq!(
        doc.inner_html(outer),
        "<section><aside>sidebar</aside>\
         <div style=\"display:contents\"><article>intro</article></div>\
         <div style=\"display:contents\"></div></section>"
    );

    navigate("/docs/setup");
    assert_eq!(
        doc.inner_html(outer),
        "<section><aside>sidebar</aside>\
         <div style=\"display:contents\"></div>\
         <div style=\"display:contents\"><article>setup</article></div></section>"
    );

    navigate("/elsewhere");
    assert_eq!(doc.inner_html(outer), "");
}

#[test]
#[traced_test]
fn navigation_logs_the_normalized_path() {
    configure_router("/");
    let doc = Document::new();
    let _handle = mount(
        || route("/about", || el("p").child(text("about")).into()),
        &doc,
        doc.root(),
    );

    navigate("/about/");

    assert_eq!(current_path(), "/about");
    assert!(logs_contain("navigate"));
    assert!(logs_contain("/about"));
}

#[test]
fn link_clicks_navigate_without_leaving() {
    configure_router("/");
    let doc = Document::new();
    let _handle = mount(
        || {
            el("div")
                .child(link("/about", [text("go")]))
                .child(route("/about", || el("p").child(text("about")).into()))
                .into()
        },
        &doc,
        doc.root(),
    );

    let div = doc.children(doc.root())[0];
    let anchor = doc.children(div)[0];
    let region = doc.children(div)[1];
    assert_eq!(doc.attribute(anchor, "href").as_deref(), Some("/about"));
    assert_eq!(doc.inner_html(region), "");

    doc.dispatch(anchor, &Event::new("click"));
    assert_eq!(current_path(), "/about");
    assert_eq!(doc.inner_html(region), "<p>about</p>");
}

fn two_page_app() -> VNode {
    el("main")
        .child(route("/", || el("h1").child(text("home")).into()))
        .child(route("/about", || el("h1").child(text("about")).into()))
        .into()
}

#[test]
fn the_server_renders_the_configured_path() {
    configure_router("/about");
    let html = render_to_string(two_page_app);
    assert_eq!(
        html,
        "<main data-rill=\"0\">\
         <div data-rill=\"0.0\" style=\"display:contents\"></div>\
         <div data-rill=\"0.1\" style=\"display:contents\">\
         <h1 data-rill=\"0.1.0\">about</h1></div></main>"
    );
}

#[test]
fn routed_markup_hydrates_and_keeps_routing() {
    configure_router("/about");
    let html = render_to_string(two_page_app);
    let doc = parse_document(&html).unwrap();

    let created = doc.created_count();
    let _handle = hydrate(two_page_app, &doc, doc.root());
    assert_eq!(doc.created_count(), created, "the routed page is claimed whole");

    navigate("/");
    let main = doc.children(doc.root())[0];
    let home_region = doc.children(main)[0];
    let about_region = doc.children(main)[1];
    assert_eq!(doc.inner_html(home_region), "<h1>home</h1>");
    assert_eq!(doc.inner_html(about_region), "");
}
