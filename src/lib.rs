//! adaptive-hashtable: a single-threaded hash table whose crowded buckets
//! turn from chains into red-black trees, and back again when they thin out.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: keep worst-case bucket lookups logarithmic under heavy hash
//!   collisions while ordinary buckets stay as cheap singly-linked chains.
//! - Layers:
//!   - node: one arena (`SlotMap`) owns every entry; links between entries
//!     are generational `NodeId`s, never references.
//!   - tree: red-black bucket trees over arena ids, ordered by hash, then
//!     by a declared key ordering, then by insertion sequence. Each tree
//!     also threads its nodes on a prev/next chain with the root first.
//!   - resize: power-of-two growth and the lo/hi split of chains and trees.
//!   - hooks: an `EntryHooks` strategy that ordered or eviction-aware
//!     variants plug into; `NoHooks` by default.
//!   - order: `Unordered` or `Ordered`, the table-level choice of how
//!     equal-hash keys are placed and how lookups steer past them.
//!   - HashTable<K, V, S, H, O>: the public facade tying it together.
//!
//! Constraints
//! - Single-threaded; no interior mutability.
//! - Capacity is a power of two, at most `MAXIMUM_CAPACITY`.
//! - A chain that reaches `TREEIFY_THRESHOLD` entries becomes a tree once
//!   the table has at least `MIN_TREEIFY_CAPACITY` buckets; before that the
//!   table grows instead.
//! - On resize, a tree half with `UNTREEIFY_THRESHOLD` entries or fewer
//!   reverts to a chain. Removal alone never demotes a tree.
//!
//! Hasher and rehashing invariants
//! - Each entry stores its folded 32-bit hash; `K: Hash` runs once per
//!   insertion or lookup and never during a resize.
//! - A `NodeId` stays bound to its key across resizes and conversions, so
//!   hooks can keep side tables keyed by it.
//!
//! Notes and non-goals
//! - No concurrent access, no serialization, no live iterators: `keys`,
//!   `values` and `entries` return owned snapshots.
//! - In an `Unordered` table, lookups search both sides of an equal-hash
//!   node. An `Ordered` table steers by `Q: Ord`, which the `Borrow`
//!   contract keeps consistent with `K: Ord`.
//! - There is no dedicated null key. An absent key is modelled as
//!   `Option<K>`, and `None` is hashed by `S` like any other value instead
//!   of being pinned to hash 0; only its bucket index differs.
//! - `clear` empties the bucket array in place and keeps its capacity.
//! - `check_invariants` walks the whole table and is meant for tests.

mod config;
mod error;
pub mod hash_table;
mod hash_table_proptest;
mod hooks;
mod node;
mod order;
mod resize;
mod tree;

// Public surface
pub use config::{
    TableConfig, DEFAULT_INITIAL_CAPACITY, DEFAULT_LOAD_FACTOR, MAXIMUM_CAPACITY,
    MIN_TREEIFY_CAPACITY, TREEIFY_THRESHOLD, UNTREEIFY_THRESHOLD,
};
pub use error::{ConfigError, InvariantViolation};
pub use hash_table::HashTable;
pub use hooks::{EntryHooks, NoHooks};
pub use node::{BucketForm, NodeId};
pub use order::{BucketOrder, LookupOrder, Ordered, Unordered};
pub use tree::KeyOrder;
