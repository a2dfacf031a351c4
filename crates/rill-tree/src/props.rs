//! Prop values: the closed set of things an element property can be.
//!
//! A prop is resolved once, at descriptor construction, into one of four
//! kinds: a static attribute value, a dynamic attribute bound through an
//! effect, an event handler, or a style map. Renderers match on the kind
//! and never re-inspect the underlying value.

use std::fmt;
use std::rc::Rc;

/// A synthetic UI event delivered to listeners.
///
/// The in-memory document carries just enough payload for the runtime's
/// purposes: the event name and an optional string value (the analogue of
/// an input's current text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub value: Option<String>,
}

impl Event {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    /// An event carrying a value payload, e.g. an `input` event.
    #[must_use]
    pub fn with_value(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }
}

/// Shared listener closure. Renderers wrap invocation in an implicit
/// batch so multi-signal handlers flush once.
pub type EventHandler = Rc<dyn Fn(&Event)>;

/// A resolved attribute value.
///
/// `Bool(true)` is a presence-only attribute (`<input disabled>`),
/// `Bool(false)` and `Null` both mean "not present" (and remove an
/// existing attribute when produced by a dynamic binding).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
    Text(String),
    Bool(bool),
    Null,
}

impl AttrValue {
    /// Whether this value renders as an attribute at all.
    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, AttrValue::Null | AttrValue::Bool(false))
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_owned())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<u32> for AttrValue {
    fn from(value: u32) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<usize> for AttrValue {
    fn from(value: usize) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl<T> From<Option<T>> for AttrValue
where
    T: Into<AttrValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(AttrValue::Null, Into::into)
    }
}

/// Ordered `property: value` pairs applied to an element's inline style.
///
/// Applied key-by-key on the live document and serialized `k:v` joined
/// with `;` on the server, preserving insertion order on both targets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleMap {
    entries: Vec<(String, String)>,
}

impl StyleMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a property, keeping the position of a replaced one.
    #[must_use]
    pub fn set(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        let property = property.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(p, _)| *p == property) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((property, value)),
        }
        self
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(p, v)| (p.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for StyleMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (property, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{property}:{value}")?;
        }
        Ok(())
    }
}

/// The closed set of prop kinds.
#[derive(Clone)]
pub enum PropValue {
    /// Set once at node creation.
    Attr(AttrValue),
    /// Re-evaluated inside an effect; the attribute stays live.
    DynAttr(Rc<dyn Fn() -> AttrValue>),
    /// Listener for the event named by the prop key (`onClick` → `click`).
    Handler(EventHandler),
    /// Inline style map.
    Style(StyleMap),
}

impl fmt::Debug for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Attr(value) => f.debug_tuple("Attr").field(value).finish(),
            PropValue::DynAttr(_) => f.write_str("DynAttr(..)"),
            PropValue::Handler(_) => f.write_str("Handler(..)"),
            PropValue::Style(map) => f.debug_tuple("Style").field(map).finish(),
        }
    }
}

/// Normalize a prop key to its attribute name: `className` is an alias
/// for `class`.
#[must_use]
pub fn normalize_prop_key(key: &str) -> &str {
    if key == "className" { "class" } else { key }
}

/// The event name bound by a handler prop key: `onClick` → `click`,
/// `oninput` → `input`. `None` when the key does not follow the `on*`
/// convention.
#[must_use]
pub fn handler_event_name(key: &str) -> Option<String> {
    let rest = key.strip_prefix("on")?;
    if rest.is_empty() {
        return None;
    }
    Some(rest.to_ascii_lowercase())
}
