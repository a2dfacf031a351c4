//! Pattern matching over path segments.
//!
//! Patterns are slash-separated literals with `:name` placeholders.
//! Matching is segment-wise: a literal must equal its path segment, a
//! placeholder captures it. Exact matches require equal segment counts;
//! prefix matches let the path extend past the pattern, which is what
//! layout routes use.

use crate::location::normalize;

/// Captured `:name` segments of a successful match, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    entries: Vec<(String, String)>,
}

impl RouteParams {
    /// The captured value for `name`, if the pattern had that placeholder.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterate captures in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Match `pattern` against `path`, returning captures on success.
///
/// Both sides are normalized first, so trailing slashes never change the
/// outcome. The root pattern `/` matches exactly the root path when
/// `exact`, and every path when not.
#[must_use]
pub fn match_route(pattern: &str, path: &str, exact: bool) -> Option<RouteParams> {
    let pattern = normalize(pattern);
    let path = normalize(path);
    let pattern_segments = segments(&pattern);
    let path_segments = segments(&path);

    if exact && pattern_segments.len() != path_segments.len() {
        return None;
    }
    if pattern_segments.len() > path_segments.len() {
        return None;
    }

    let mut params = RouteParams::default();
    for (pattern_segment, path_segment) in pattern_segments.iter().zip(&path_segments) {
        if let Some(name) = pattern_segment.strip_prefix(':') {
            params
                .entries
                .push((name.to_owned(), (*path_segment).to_owned()));
        } else if pattern_segment != path_segment {
            return None;
        }
    }
    Some(params)
}
