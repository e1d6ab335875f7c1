//! Bucket nodes and the arena that owns them.
//!
//! Every entry lives in one `SlotMap` slot and is addressed by a generational
//! [`NodeId`]. Links between nodes (chain `next`, tree `parent`/`left`/`right`,
//! auxiliary `prev`) are plain ids, so the cyclic tree/chain graph carries no
//! ownership: the arena owns every node, the bucket array owns the heads.

use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable identity of one stored entry.
    ///
    /// A `NodeId` stays valid while its entry is in the table, across resizes
    /// and chain/tree conversions. After removal it never resolves again, even
    /// if the slot is reused.
    pub struct NodeId;
}

pub(crate) type Arena<K, V> = SlotMap<NodeId, Node<K, V>>;

/// Representation of a non-empty bucket.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BucketForm {
    Chain,
    Tree,
}

/// Tree-only links. Meaningless while the node sits in a chain bucket.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct TreeLinks {
    pub(crate) parent: Option<NodeId>,
    pub(crate) left: Option<NodeId>,
    pub(crate) right: Option<NodeId>,
    /// Back edge of the auxiliary chain; `next` on the node is the forward edge.
    pub(crate) prev: Option<NodeId>,
    pub(crate) red: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct Node<K, V> {
    pub(crate) hash: u32,
    /// Insertion sequence number; breaks ties between equal-hash keys that
    /// have no declared ordering.
    pub(crate) seq: u64,
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) next: Option<NodeId>,
    pub(crate) form: BucketForm,
    pub(crate) tree: TreeLinks,
}

impl<K, V> Node<K, V> {
    pub(crate) fn new(hash: u32, seq: u64, key: K, value: V, form: BucketForm) -> Self {
        Self {
            hash,
            seq,
            key,
            value,
            next: None,
            form,
            tree: TreeLinks::default(),
        }
    }

    #[inline]
    pub(crate) fn is_tree(&self) -> bool {
        self.form == BucketForm::Tree
    }

    /// Drop tree links and mark the node as a plain chain entry.
    pub(crate) fn make_chain(&mut self) {
        self.form = BucketForm::Chain;
        self.tree = TreeLinks::default();
    }
}

/// Fold a 64-bit hash into 32 bits, then fold the upper half into the lower
/// half so that small tables still see the high bits.
#[inline]
pub(crate) fn spread(h: u64) -> u32 {
    let h = (h ^ (h >> 32)) as u32;
    h ^ (h >> 16)
}

/// Bucket index of `hash` in a table of `capacity` buckets.
#[inline]
pub(crate) fn index_for(hash: u32, capacity: usize) -> usize {
    (hash as usize) & (capacity - 1)
}
