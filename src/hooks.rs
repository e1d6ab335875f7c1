//! Extension hooks for ordered or eviction-aware variants.
//!
//! The table calls these at fixed points and never looks at what the hooks do
//! with them. A variant keeps its own per-entry data keyed by [`NodeId`]
//! (for example in a `slotmap::SecondaryMap`); the node factories are where
//! that data gets created.
//!
//! Call points:
//! - `new_node` / `new_tree_node`: right after a new entry is allocated into a
//!   chain or a tree bucket, before any other hook sees it.
//! - `on_access`: after a successful `get`, `get_mut`, or an update of an
//!   existing key (`insert`, `replace`, `replace_if`).
//! - `on_insertion`: after every insertion of a new key, once size accounting
//!   and any resize are done. Returning `Some(id)` asks the table to remove
//!   that entry; the removal then goes through `on_removal` like any other.
//! - `on_removal`: after an entry has been unlinked from its chain or tree and
//!   dropped from the arena, whatever the cause. `clear` reports every entry.
//!
//! Chain/tree conversions keep the same `NodeId`, so they are not reported.

use crate::node::NodeId;

pub trait EntryHooks<K> {
    fn new_node(&mut self, _id: NodeId, _key: &K) {}

    fn new_tree_node(&mut self, id: NodeId, key: &K) {
        self.new_node(id, key)
    }

    fn on_access(&mut self, _id: NodeId) {}

    /// `evict` is false for bulk loads that must not discard entries.
    fn on_insertion(&mut self, _evict: bool) -> Option<NodeId> {
        None
    }

    fn on_removal(&mut self, _id: NodeId) {}
}

/// The default strategy: every hook is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl<K> EntryHooks<K> for NoHooks {}
