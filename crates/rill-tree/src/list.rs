//! Keyed list descriptors.
//!
//! [`each`] and [`each_by`] build a [`VNode::List`]: a tracked snapshot
//! function producing `(key, render thunk)` pairs in item order. The
//! consuming reconciler re-runs whenever signals read by the items getter
//! (or the key extractor) change, reuses rendered subtrees by key, and
//! disposes the leftovers.
//!
//! Keys follow the "identity is truth" policy: a reused key keeps the
//! previously rendered subtree even if the item's value changed. Item
//! renderers that need live updates inside a kept node express them with
//! reactive bindings, not by relying on re-render.

use std::fmt;
use std::rc::Rc;

use crate::vnode::{ListEntry, ListNode, VNode};

/// Identity of a list item.
///
/// Duplicate keys are legal: the reconciler keeps an ordered bucket per
/// key and reuses first-in-first-out, so `[1, 1] -> [1]` drops exactly
/// one subtree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListKey {
    Int(i64),
    Str(Rc<str>),
}

impl fmt::Display for ListKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListKey::Int(value) => write!(f, "{value}"),
            ListKey::Str(value) => write!(f, "{value}"),
        }
    }
}

macro_rules! int_keys {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ListKey {
            fn from(value: $ty) -> Self {
                ListKey::Int(value as i64)
            }
        })*
    };
}

int_keys!(i8, i16, i32, i64, u8, u16, u32, usize);

impl From<&str> for ListKey {
    fn from(value: &str) -> Self {
        ListKey::Str(Rc::from(value))
    }
}

impl From<String> for ListKey {
    fn from(value: String) -> Self {
        ListKey::Str(Rc::from(value))
    }
}

impl From<Rc<str>> for ListKey {
    fn from(value: Rc<str>) -> Self {
        ListKey::Str(value)
    }
}

impl From<char> for ListKey {
    fn from(value: char) -> Self {
        ListKey::Str(Rc::from(value.to_string()))
    }
}

/// Keyed list of `items()` with an explicit key extractor.
///
/// `items` is read inside the reconciler's effect, so signals it reads
/// drive re-reconciliation. Each item is rendered by `render` when its
/// key has no reusable subtree.
#[must_use]
pub fn each_by<T, I>(
    items: impl Fn() -> I + 'static,
    render: impl Fn(&T) -> VNode + 'static,
    key: impl Fn(&T) -> ListKey + 'static,
) -> VNode
where
    T: 'static,
    I: IntoIterator<Item = T>,
{
    let render = Rc::new(render);
    let snapshot: Rc<dyn Fn() -> Vec<ListEntry>> = Rc::new(move || {
        items()
            .into_iter()
            .map(|item| {
                let key = key(&item);
                let item = Rc::new(item);
                let render = Rc::clone(&render);
                ListEntry {
                    key,
                    render: Rc::new(move || render(&item)),
                }
            })
            .collect()
    });
    VNode::List(Rc::new(ListNode { snapshot }))
}

/// Keyed list of `items()`, keyed by the item values themselves.
#[must_use]
pub fn each<T, I>(
    items: impl Fn() -> I + 'static,
    render: impl Fn(&T) -> VNode + 'static,
) -> VNode
where
    T: Clone + Into<ListKey> + 'static,
    I: IntoIterator<Item = T>,
{
    each_by(items, render, |item| item.clone().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vnode::text;
    use rill_reactive::{create_effect, create_signal};
    use std::cell::Cell;

    fn snapshot_of(node: &VNode) -> Vec<ListEntry> {
        let VNode::List(list) = node else {
            panic!("expected list node");
        };
        (list.snapshot)()
    }

    #[test]
    fn snapshot_preserves_item_order_and_keys() {
        let node = each(|| vec![3, 1, 2], |n| text(n.to_string()));
        let entries = snapshot_of(&node);
        let keys: Vec<_> = entries.iter().map(|e| e.key.clone()).collect();
        assert_eq!(
            keys,
            vec![ListKey::Int(3), ListKey::Int(1), ListKey::Int(2)]
        );
    }

    #[test]
    fn duplicate_keys_stay_duplicated() {
        let node = each(|| vec!["a", "a", "b"], |s| text(*s));
        let entries = snapshot_of(&node);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].key, entries[1].key);
        assert_ne!(entries[0].key, entries[2].key);
    }

    #[test]
    fn explicit_key_extractor_is_used() {
        #[derive(Clone)]
        struct Row {
            id: u32,
            label: &'static str,
        }
        let rows = vec![
            Row { id: 10, label: "x" },
            Row { id: 20, label: "y" },
        ];
        let node = each_by(
            move || rows.clone(),
            |row| text(row.label),
            |row| ListKey::from(row.id),
        );
        let entries = snapshot_of(&node);
        assert_eq!(entries[0].key, ListKey::Int(10));
        assert_eq!(entries[1].key, ListKey::Int(20));
    }

    #[test]
    fn render_thunks_produce_the_item_subtree() {
        let node = each(|| vec![String::from("hello")], |s| text(s.clone()));
        let entries = snapshot_of(&node);
        let rendered = (entries[0].render)();
        assert!(matches!(rendered, VNode::Text(ref t) if &**t == "hello"));
    }

    #[test]
    fn snapshot_reads_are_tracked() {
        let (items, set_items) = create_signal(vec![1, 2]);
        let node = each(move || items.get(), |n| text(n.to_string()));
        let VNode::List(list) = node else {
            panic!("expected list node");
        };
        let lengths = Rc::new(Cell::new(0usize));
        let lengths_in = Rc::clone(&lengths);
        let snapshot = Rc::clone(&list.snapshot);
        let _effect = create_effect(move || {
            lengths_in.set(snapshot().len());
        });
        assert_eq!(lengths.get(), 2);
        set_items.set(vec![1, 2, 3]);
        assert_eq!(lengths.get(), 3);
    }
}
