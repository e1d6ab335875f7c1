//! HashTable: the facade over the bucket array, the node arena and the hooks.

use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::mem;

use hashbrown::hash_map::DefaultHashBuilder;

use crate::config::{
    table_size_for, TableConfig, MAXIMUM_CAPACITY, MIN_TREEIFY_CAPACITY, TREEIFY_THRESHOLD,
};
use crate::error::{ConfigError, InvariantViolation};
use crate::hooks::{EntryHooks, NoHooks};
use crate::node::{index_for, spread, Arena, BucketForm, Node, NodeId};
use crate::order::{BucketOrder, LookupOrder, Ordered, Unordered};
use crate::resize::{self, Growth};
use crate::tree::{self, TreeSlot};

/// Result of the shared insertion path.
enum Put<V> {
    Inserted,
    Replaced(V),
    /// Key present and left untouched; the offered value was dropped.
    Kept,
}

/// A hash table whose long buckets turn into red-black trees.
///
/// Buckets start as chains. A chain that reaches 8 entries becomes a tree
/// once the table has at least 64 buckets (smaller tables grow instead), and
/// a tree half with 6 or fewer entries turns back into a chain when the
/// table doubles.
///
/// Keys sharing a hash are placed by `O`: insertion sequence for
/// [`Unordered`], `K: Ord` for [`Ordered`] (see
/// [`with_key_order`](Self::with_key_order)). An ordered table also steers
/// lookups by the borrowed form, so a colliding bucket is searched in
/// logarithmic time.
#[derive(Clone)]
pub struct HashTable<K, V, S = DefaultHashBuilder, H = NoHooks, O = Unordered> {
    hasher: S,
    hooks: H,
    order: O,
    nodes: Arena<K, V>,
    table: Vec<Option<NodeId>>,
    threshold: usize,
    config: TableConfig,
    next_seq: u64,
}

impl<K, V> HashTable<K, V> {
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::from_parts(
            TableConfig::new().initial_capacity(capacity),
            Default::default(),
            NoHooks,
        )
    }

    pub fn with_capacity_and_load_factor(
        capacity: usize,
        load_factor: f32,
    ) -> Result<Self, ConfigError> {
        Self::with_config_and_hasher(
            TableConfig::new()
                .initial_capacity(capacity)
                .load_factor(load_factor),
            Default::default(),
        )
    }
}

impl<K, V> Default for HashTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> HashTable<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::from_parts(TableConfig::default(), hasher, NoHooks)
    }

    pub fn with_config_and_hasher(config: TableConfig, hasher: S) -> Result<Self, ConfigError> {
        Self::with_config_hasher_and_hooks(config, hasher, NoHooks)
    }
}

impl<K, V, S, H> HashTable<K, V, S, H> {
    /// Build a table that reports to `hooks`. Fails only on a bad load factor.
    pub fn with_config_hasher_and_hooks(
        config: TableConfig,
        hasher: S,
        hooks: H,
    ) -> Result<Self, ConfigError> {
        let config = config.validate().map_err(|e| {
            log::debug!("rejected table configuration: {e}");
            e
        })?;
        Ok(Self::from_parts(config, hasher, hooks))
    }

    /// Declare `Ord` as the tie-breaker for keys sharing a hash. Existing tree
    /// buckets are rebuilt under the new ordering.
    pub fn with_key_order(self) -> HashTable<K, V, S, H, Ordered>
    where
        K: Ord,
    {
        let mut t = HashTable {
            hasher: self.hasher,
            hooks: self.hooks,
            order: Ordered,
            nodes: self.nodes,
            table: self.table,
            threshold: self.threshold,
            config: self.config,
            next_seq: self.next_seq,
        };
        let order = <Ordered as BucketOrder<K>>::key_order(&t.order);
        for i in 0..t.table.len() {
            let Some(head) = t.table[i] else {
                continue;
            };
            if t.nodes[head].is_tree() {
                tree::untreeify(&mut t.nodes, head);
                tree::treeify(&mut t.nodes, &mut t.table, head, order);
            }
        }
        t
    }
}

impl<K, V, S, H, O: Default> HashTable<K, V, S, H, O> {
    fn from_parts(config: TableConfig, hasher: S, hooks: H) -> Self {
        Self {
            hasher,
            hooks,
            order: O::default(),
            nodes: Arena::with_key(),
            table: Vec::new(),
            threshold: 0,
            config,
            next_seq: 0,
        }
    }
}

impl<K, V, S, H, O> HashTable<K, V, S, H, O> {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of buckets, or the number the first insertion will allocate.
    pub fn capacity(&self) -> usize {
        if self.table.is_empty() {
            self.config.first_capacity()
        } else {
            self.table.len()
        }
    }

    pub fn load_factor(&self) -> f32 {
        self.config.get_load_factor()
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    /// Key and value of a live entry.
    pub fn entry_of(&self, id: NodeId) -> Option<(&K, &V)> {
        self.nodes.get(id).map(|n| (&n.key, &n.value))
    }

    /// Representation of bucket `index`, `None` if empty or out of range.
    pub fn bucket_form(&self, index: usize) -> Option<BucketForm> {
        let head = (*self.table.get(index)?)?;
        Some(self.nodes[head].form)
    }

    /// Keys of bucket `index` in chain order (root first for trees).
    pub fn bucket_keys(&self, index: usize) -> Vec<&K> {
        let mut out = Vec::new();
        let mut cur = self.table.get(index).copied().flatten();
        while let Some(id) = cur {
            let n = &self.nodes[id];
            out.push(&n.key);
            cur = n.next;
        }
        out
    }

    /// Apply `f` to every node in bucket-array order.
    fn traverse<'a, T>(&'a self, mut f: impl FnMut(&'a Node<K, V>) -> T) -> Vec<T> {
        let mut out = Vec::with_capacity(self.len());
        for head in &self.table {
            let mut cur = *head;
            while let Some(id) = cur {
                let n = &self.nodes[id];
                out.push(f(n));
                cur = n.next;
            }
        }
        out
    }

    /// Owned copy of every key, in bucket-array order.
    pub fn keys(&self) -> Vec<K>
    where
        K: Clone,
    {
        self.traverse(|n| n.key.clone())
    }

    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.traverse(|n| n.value.clone())
    }

    pub fn entries(&self) -> Vec<(K, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.traverse(|n| (n.key.clone(), n.value.clone()))
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.nodes.values().any(|n| n.value == *value)
    }

    /// Walk every bucket and check placement, form, tree shape, colors,
    /// auxiliary chains and size accounting.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let capacity = self.table.len();
        if capacity != 0 && (!capacity.is_power_of_two() || capacity > MAXIMUM_CAPACITY) {
            return Err(InvariantViolation::Capacity { capacity });
        }
        let mut counted = 0;
        for (bucket, head) in self.table.iter().enumerate() {
            let Some(head) = *head else {
                continue;
            };
            if self.nodes[head].is_tree() {
                counted += tree::check_bucket(&self.nodes, &self.table, bucket)?;
                continue;
            }
            let mut cur = Some(head);
            while let Some(id) = cur {
                let n = &self.nodes[id];
                if n.is_tree() {
                    return Err(InvariantViolation::MixedForm { bucket });
                }
                if index_for(n.hash, capacity) != bucket {
                    return Err(InvariantViolation::Misplaced { bucket });
                }
                counted += 1;
                if counted > self.nodes.len() {
                    break;
                }
                cur = n.next;
            }
        }
        if counted != self.nodes.len() {
            return Err(InvariantViolation::SizeMismatch {
                counted,
                size: self.nodes.len(),
            });
        }
        Ok(())
    }
}

impl<K, V, S, H, O> HashTable<K, V, S, H, O>
where
    H: EntryHooks<K>,
{
    /// Remove every entry, reporting each to `on_removal`.
    ///
    /// The bucket array is kept at its current capacity with every slot
    /// emptied, rather than dropped, so refilling a cleared table does not
    /// regrow it from the initial capacity.
    pub fn clear(&mut self) {
        self.table.fill(None);
        for (id, _node) in self.nodes.drain() {
            self.hooks.on_removal(id);
        }
    }

    /// Remove the entry behind `id`, wherever it lives.
    pub fn remove_node(&mut self, id: NodeId) -> Option<(K, V)> {
        let node = self.nodes.get(id)?;
        let (hash, next, is_tree) = (node.hash, node.next, node.is_tree());
        if is_tree {
            tree::remove(&mut self.nodes, &mut self.table, id);
        } else {
            let index = index_for(hash, self.table.len());
            if self.table[index] == Some(id) {
                self.table[index] = next;
            } else {
                let mut cur = self.table[index];
                while let Some(c) = cur {
                    if self.nodes[c].next == Some(id) {
                        self.nodes[c].next = next;
                        break;
                    }
                    cur = self.nodes[c].next;
                }
            }
        }
        let node = self.nodes.remove(id)?;
        self.hooks.on_removal(id);
        Some((node.key, node.value))
    }
}

impl<K, V, S, H, O> HashTable<K, V, S, H, O>
where
    K: Eq + Hash,
    S: BuildHasher,
    H: EntryHooks<K>,
    O: BucketOrder<K>,
{
    fn make_hash<Q>(&self, q: &Q) -> u32
    where
        Q: ?Sized + Hash,
    {
        spread(self.hasher.hash_one(q))
    }

    fn find_node<Q>(&self, q: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: LookupOrder<K, Q>,
    {
        if self.table.is_empty() {
            return None;
        }
        let hash = self.make_hash(q);
        let first = self.table[index_for(hash, self.table.len())]?;
        let matches = |k: &K| {
            let k: &Q = k.borrow();
            core::ptr::eq(k, q) || k == q
        };
        let n = &self.nodes[first];
        if n.hash == hash && matches(&n.key) {
            return Some(first);
        }
        if n.is_tree() {
            let steer = |k: &K| self.order.steer(q, k);
            return tree::find(&self.nodes, first, hash, &matches, &steer);
        }
        let mut cur = n.next;
        while let Some(id) = cur {
            let n = &self.nodes[id];
            if n.hash == hash && matches(&n.key) {
                return Some(id);
            }
            cur = n.next;
        }
        None
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: LookupOrder<K, Q>,
    {
        self.find_node(q).is_some()
    }

    /// Look up without reporting an access.
    pub fn peek<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: LookupOrder<K, Q>,
    {
        self.find_node(q).map(|id| &self.nodes[id].value)
    }

    /// Look up and report the access to the hooks.
    pub fn get<Q>(&mut self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: LookupOrder<K, Q>,
    {
        let id = self.find_node(q)?;
        self.hooks.on_access(id);
        Some(&self.nodes[id].value)
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: LookupOrder<K, Q>,
    {
        let id = self.find_node(q)?;
        self.hooks.on_access(id);
        Some(&mut self.nodes[id].value)
    }

    /// Id of the entry for `q`, without reporting an access.
    pub fn find<Q>(&self, q: &Q) -> Option<NodeId>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: LookupOrder<K, Q>,
    {
        self.find_node(q)
    }

    /// Insert or overwrite. Returns the previous value for an existing key.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.put_val(key, value, false, true) {
            Put::Replaced(old) => Some(old),
            Put::Inserted | Put::Kept => None,
        }
    }

    /// Insert only if `key` is absent. Returns whether an entry was added.
    pub fn insert_if_absent(&mut self, key: K, value: V) -> bool {
        matches!(self.put_val(key, value, true, true), Put::Inserted)
    }

    /// Overwrite the value of an existing key; absent keys are not inserted.
    pub fn replace<Q>(&mut self, q: &Q, value: V) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: LookupOrder<K, Q>,
    {
        let id = self.find_node(q)?;
        let old = mem::replace(&mut self.nodes[id].value, value);
        self.hooks.on_access(id);
        Some(old)
    }

    /// Overwrite only if the current value equals `expected`.
    pub fn replace_if<Q>(&mut self, q: &Q, expected: &V, value: V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: LookupOrder<K, Q>,
        V: PartialEq,
    {
        match self.find_node(q) {
            Some(id) if self.nodes[id].value == *expected => {
                self.nodes[id].value = value;
                self.hooks.on_access(id);
                true
            }
            _ => false,
        }
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: LookupOrder<K, Q>,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: LookupOrder<K, Q>,
    {
        let id = self.find_node(q)?;
        self.remove_node(id)
    }

    /// Remove only if the current value equals `expected`.
    pub fn remove_if<Q>(&mut self, q: &Q, expected: &V) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        O: LookupOrder<K, Q>,
        V: PartialEq,
    {
        match self.find_node(q) {
            Some(id) if self.nodes[id].value == *expected => self.remove_node(id).is_some(),
            _ => false,
        }
    }

    /// Make room for `additional` more entries without intermediate resizes.
    pub fn reserve(&mut self, additional: usize) {
        let wanted = self.len().saturating_add(additional);
        if self.table.is_empty() {
            let buckets = (wanted as f64 / self.load_factor() as f64) + 1.0;
            let buckets = if buckets < MAXIMUM_CAPACITY as f64 {
                buckets as usize
            } else {
                MAXIMUM_CAPACITY
            };
            if table_size_for(buckets) > self.config.first_capacity() {
                self.config = self.config.initial_capacity(buckets);
            }
            return;
        }
        while wanted > self.threshold && self.table.len() < MAXIMUM_CAPACITY {
            self.resize();
        }
    }

    fn put_val(&mut self, key: K, value: V, only_if_absent: bool, evict: bool) -> Put<V> {
        if self.table.is_empty() {
            self.resize();
        }
        let hash = self.make_hash(&key);
        let i = index_for(hash, self.table.len());
        let existing = match self.table[i] {
            None => {
                let id = self.alloc(hash, key, value, BucketForm::Chain);
                self.table[i] = Some(id);
                None
            }
            Some(first) if self.nodes[first].is_tree() => {
                let order = self.order.key_order();
                match tree::search(&self.nodes, first, hash, &key, order, self.next_seq) {
                    TreeSlot::Occupied(e) => Some((e, value)),
                    TreeSlot::Vacant { parent, left } => {
                        let id = self.alloc(hash, key, value, BucketForm::Tree);
                        tree::attach(&mut self.nodes, &mut self.table, first, parent, left, id);
                        None
                    }
                }
            }
            Some(first) => {
                let mut p = first;
                let mut len = 1;
                loop {
                    let n = &self.nodes[p];
                    if n.hash == hash && n.key == key {
                        break Some((p, value));
                    }
                    let next = n.next;
                    match next {
                        Some(nx) => {
                            p = nx;
                            len += 1;
                        }
                        None => {
                            let id = self.alloc(hash, key, value, BucketForm::Chain);
                            self.nodes[p].next = Some(id);
                            if len + 1 >= TREEIFY_THRESHOLD {
                                self.treeify_bin(hash);
                            }
                            break None;
                        }
                    }
                }
            }
        };

        if let Some((e, value)) = existing {
            let result = if only_if_absent {
                Put::Kept
            } else {
                Put::Replaced(mem::replace(&mut self.nodes[e].value, value))
            };
            self.hooks.on_access(e);
            return result;
        }

        if self.nodes.len() > self.threshold {
            self.resize();
        }
        if let Some(victim) = self.hooks.on_insertion(evict) {
            self.remove_node(victim);
        }
        Put::Inserted
    }

    fn alloc(&mut self, hash: u32, key: K, value: V, form: BucketForm) -> NodeId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let id = self.nodes.insert(Node::new(hash, seq, key, value, form));
        let key = &self.nodes[id].key;
        match form {
            BucketForm::Chain => self.hooks.new_node(id, key),
            BucketForm::Tree => self.hooks.new_tree_node(id, key),
        }
        id
    }

    /// A chain at `hash` just reached the treeify threshold.
    fn treeify_bin(&mut self, hash: u32) {
        if self.table.len() < MIN_TREEIFY_CAPACITY {
            self.resize();
            return;
        }
        let index = index_for(hash, self.table.len());
        if let Some(head) = self.table[index] {
            log::trace!("treeify: bucket {index}");
            tree::treeify(&mut self.nodes, &mut self.table, head, self.order.key_order());
        }
    }

    fn resize(&mut self) {
        let old_capacity = self.table.len();
        match resize::next_growth(old_capacity, &self.config) {
            Growth::Capped => {
                log::debug!("capacity capped at {old_capacity} buckets; growth disabled");
                self.threshold = usize::MAX;
            }
            Growth::To {
                capacity,
                threshold,
            } => {
                log::trace!("resize: {old_capacity} -> {capacity} buckets, threshold {threshold}");
                let old = mem::take(&mut self.table);
                let order = self.order.key_order();
                self.table = resize::split_all(&mut self.nodes, old, capacity, order);
                self.threshold = threshold;
            }
        }
    }

    fn extend_with<I>(&mut self, iter: I, evict: bool)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let iter = iter.into_iter();
        self.reserve(iter.size_hint().0);
        for (k, v) in iter {
            self.put_val(k, v, false, evict);
        }
    }
}

impl<K, V, S, H, O> Extend<(K, V)> for HashTable<K, V, S, H, O>
where
    K: Eq + Hash,
    S: BuildHasher,
    H: EntryHooks<K>,
    O: BucketOrder<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.extend_with(iter, true);
    }
}

impl<K, V, S, H, O> FromIterator<(K, V)> for HashTable<K, V, S, H, O>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
    H: EntryHooks<K> + Default,
    O: BucketOrder<K>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::from_parts(TableConfig::default(), S::default(), H::default());
        table.extend_with(iter, false);
        table
    }
}

impl<K, V, S, H, O> fmt::Debug for HashTable<K, V, S, H, O>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.traverse(|n| (&n.key, &n.value)))
            .finish()
    }
}
