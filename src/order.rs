//! Ordering of keys that share a hash inside a tree bucket.
//!
//! The ordering is a table-level type parameter. [`Unordered`] falls back to
//! insertion sequence and has lookups search both sides of an equal-hash
//! node. [`Ordered`] uses `K: Ord` for placement and, through the `Borrow`
//! contract, `Q: Ord` to steer lookups by a borrowed form.

use core::borrow::Borrow;
use core::cmp::Ordering;

use crate::tree::KeyOrder;

/// How a table places equal-hash keys in a tree bucket.
pub trait BucketOrder<K>: Clone + Default {
    /// The comparison used on insertion and treeify, if any.
    fn key_order(&self) -> Option<KeyOrder<K>>;
}

/// How a lookup by `&Q` steers at an equal-hash node holding `key`.
pub trait LookupOrder<K, Q: ?Sized> {
    fn steer(&self, q: &Q, key: &K) -> Option<Ordering>;
}

/// No declared ordering: ties break by insertion sequence.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unordered;

/// Keys sharing a hash are ordered by `K: Ord`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ordered;

impl<K> BucketOrder<K> for Unordered {
    fn key_order(&self) -> Option<KeyOrder<K>> {
        None
    }
}

impl<K, Q: ?Sized> LookupOrder<K, Q> for Unordered {
    #[inline]
    fn steer(&self, _q: &Q, _key: &K) -> Option<Ordering> {
        None
    }
}

impl<K: Ord> BucketOrder<K> for Ordered {
    fn key_order(&self) -> Option<KeyOrder<K>> {
        Some(Ord::cmp as KeyOrder<K>)
    }
}

impl<K, Q> LookupOrder<K, Q> for Ordered
where
    K: Borrow<Q>,
    Q: ?Sized + Ord,
{
    #[inline]
    fn steer(&self, q: &Q, key: &K) -> Option<Ordering> {
        Some(q.cmp(key.borrow()))
    }
}
