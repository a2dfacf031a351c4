//! Keyed list regions.
//!
//! A list is a `display:contents` container plus one effect. Each run
//! takes a fresh snapshot of the items, reuses rendered subtrees from a
//! key-indexed pool, renders subtrees for keys it has never seen, and
//! converges the container's children on the snapshot order. Identity is
//! the key: a reused subtree keeps its nodes and its live subscriptions,
//! however far it moved. Duplicate keys share a bucket and are reused
//! first-come, first-served.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use rill_reactive::create_effect;
use rill_tree::{Frame, ListKey, ListNode, with_frame};
use smallvec::SmallVec;
use tracing::debug;

use crate::document::{Document, NodeId};
use crate::reconcile::{Cursor, reconcile_children};
use crate::render::{child_index, claim_or_create, execute_into};

/// Nodes produced by one list item; nearly always exactly one.
type NodeGroup = SmallVec<[NodeId; 1]>;

type Pool = HashMap<ListKey, VecDeque<NodeGroup>, ahash::RandomState>;

pub(crate) fn execute_list(
    doc: &Document,
    list: &ListNode,
    frame: &Rc<Frame>,
    claim: Option<&Cursor>,
) -> NodeId {
    let (container, claimed) = claim_or_create(doc, "div", frame, claim);
    doc.merge_style(container, "display", "contents");

    let snapshot = Rc::clone(&list.snapshot);
    let weak = doc.downgrade();
    let frame = Rc::clone(frame);
    let buckets: RefCell<Pool> = RefCell::new(Pool::default());
    let hydrate_first = Cell::new(claimed);
    let effect = create_effect(move || {
        let entries = with_frame(Rc::clone(&frame), &*snapshot);
        let Some(doc) = weak.upgrade() else { return };
        let cursor = hydrate_first.replace(false).then(|| Cursor::hydrate(container));

        let mut pool = buckets.take();
        let mut next = Pool::default();
        let mut desired = Vec::new();
        let mut reused = 0usize;
        let mut rendered = 0usize;
        for (i, entry) in entries.iter().enumerate() {
            let group = match pool.get_mut(&entry.key).and_then(VecDeque::pop_front) {
                Some(group) => {
                    reused += 1;
                    group
                }
                None => {
                    rendered += 1;
                    let item_frame = Rc::new(frame.child(child_index(i)));
                    let produced = with_frame(Rc::clone(&item_frame), &*entry.render);
                    let mut nodes = Vec::new();
                    execute_into(&doc, &produced, &item_frame, cursor.as_ref(), &mut nodes);
                    NodeGroup::from_vec(nodes)
                }
            };
            desired.extend(group.iter().copied());
            next.entry(entry.key.clone()).or_default().push_back(group);
        }

        let mut dropped = 0usize;
        for groups in pool.into_values() {
            for group in groups {
                dropped += 1;
                for node in group {
                    doc.dispose(node);
                }
            }
        }
        reconcile_children(&doc, container, &desired);
        debug!(
            items = entries.len(),
            reused, rendered, dropped, "list reconciled"
        );
        buckets.replace(next);
    });
    doc.add_cleanup(container, move || drop(effect));
    container
}
