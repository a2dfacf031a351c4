//! Route regions and navigation-aware links.
//!
//! A route is a [`dynamic`] region whose closure re-matches the current
//! path on every navigation. On a match the body's output fills the
//! region, wrapped in a scope providing the captured params; on a miss
//! the region renders nothing. Because the region is an ordinary dynamic
//! container, server rendering, hydration, and client swaps all come
//! from the shared executors; routing adds no reconciliation of its own.

use std::rc::Rc;

use rill_tree::{Context, VNode, component, create_context, dynamic, el, provide, use_context};
use tracing::debug;

use crate::location::{current_path, navigate};
use crate::matching::{RouteParams, match_route};

thread_local! {
    static PARAMS: Context<RouteParams> = create_context(RouteParams::default());
}

fn params_context() -> Context<RouteParams> {
    PARAMS.with(Context::clone)
}

/// The captured params of the nearest enclosing matched route, or an
/// empty set outside any.
#[must_use]
pub fn use_params() -> Rc<RouteParams> {
    use_context(&params_context())
}

/// A region showing `body` exactly while the current path matches
/// `pattern` segment for segment, with `:name` captures.
#[must_use]
pub fn route(pattern: impl Into<String>, body: impl Fn() -> VNode + 'static) -> VNode {
    matched_region(pattern.into(), body, true)
}

/// A region showing `body` while the current path starts with
/// `pattern`. Layout routes use this and nest exact routes inside.
#[must_use]
pub fn route_prefix(pattern: impl Into<String>, body: impl Fn() -> VNode + 'static) -> VNode {
    matched_region(pattern.into(), body, false)
}

fn matched_region(pattern: String, body: impl Fn() -> VNode + 'static, exact: bool) -> VNode {
    let body = Rc::new(body);
    dynamic(move || match match_route(&pattern, &current_path(), exact) {
        Some(params) => {
            debug!(pattern = %pattern, "route matched");
            let body = Rc::clone(&body);
            provide(&params_context(), params, component(move || body()))
        }
        None => VNode::Empty,
    })
}

/// An anchor that navigates the location signal on click instead of
/// leaving the document.
#[must_use]
pub fn link(to: impl Into<String>, children: impl IntoIterator<Item = VNode>) -> VNode {
    let to = to.into();
    let href = to.clone();
    el("a")
        .attr("href", href)
        .on("click", move |_| navigate(&to))
        .children(children)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_tree::{AttrValue, PropValue, text};

    #[test]
    fn params_default_to_empty_outside_any_route() {
        assert!(use_params().is_empty());
    }

    #[test]
    fn routes_are_dynamic_regions() {
        let node = route("/about", || text("about"));
        assert!(matches!(node, VNode::Dynamic(_)));
    }

    #[test]
    fn links_carry_href_and_a_click_handler() {
        let node = link("/docs", [text("docs")]);
        let VNode::Element(element) = node else {
            panic!("expected an anchor element");
        };
        assert_eq!(element.tag, "a");
        assert!(matches!(
            &element.props[0],
            (key, PropValue::Attr(AttrValue::Text(value)))
                if key == "href" && value == "/docs"
        ));
        assert!(matches!(
            &element.props[1],
            (key, PropValue::Handler(_)) if key == "onclick"
        ));
        assert_eq!(element.children.len(), 1);
    }
}
