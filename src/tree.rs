//! Red-black tree buckets.
//!
//! A tree bucket is a red-black tree over arena nodes, ordered by hash, then
//! by the table's declared key ordering (if any), then by insertion sequence.
//! On top of the tree, `next`/`tree.prev` thread the same nodes into a
//! doubly-linked chain. The chain is what snapshots, splits and conversions
//! walk; the tree is what lookups descend. The bucket head in the table is
//! always the tree root, and the root is always first in the chain.
//!
//! Insertion and deletion follow CLR, with rotations returning the possibly
//! new root instead of storing it anywhere.

use core::cmp::Ordering::{self, Equal, Greater, Less};

use crate::config::UNTREEIFY_THRESHOLD;
use crate::error::InvariantViolation;
use crate::node::{index_for, Arena, BucketForm, NodeId};

/// Declared ordering capability for keys sharing a hash.
pub type KeyOrder<K> = fn(&K, &K) -> Ordering;

/// Where a key belongs in a tree bucket.
pub(crate) enum TreeSlot {
    Occupied(NodeId),
    Vacant { parent: NodeId, left: bool },
}

#[inline]
fn parent_of<K, V>(nodes: &Arena<K, V>, x: NodeId) -> Option<NodeId> {
    nodes[x].tree.parent
}

#[inline]
fn left_of<K, V>(nodes: &Arena<K, V>, x: NodeId) -> Option<NodeId> {
    nodes[x].tree.left
}

#[inline]
fn right_of<K, V>(nodes: &Arena<K, V>, x: NodeId) -> Option<NodeId> {
    nodes[x].tree.right
}

#[inline]
fn is_red<K, V>(nodes: &Arena<K, V>, x: Option<NodeId>) -> bool {
    x.map_or(false, |x| nodes[x].tree.red)
}

#[inline]
fn set_red<K, V>(nodes: &mut Arena<K, V>, x: NodeId, red: bool) {
    nodes[x].tree.red = red;
}

/// Point whichever child slot of `parent` held `old` at `new`.
#[inline]
fn replace_child<K, V>(nodes: &mut Arena<K, V>, parent: NodeId, old: NodeId, new: Option<NodeId>) {
    let links = &mut nodes[parent].tree;
    if links.left == Some(old) {
        links.left = new;
    } else if links.right == Some(old) {
        links.right = new;
    }
}

pub(crate) fn root_of<K, V>(nodes: &Arena<K, V>, x: NodeId) -> NodeId {
    let mut r = x;
    while let Some(p) = parent_of(nodes, r) {
        r = p;
    }
    r
}

/// Order for equal-hash keys with no declared ordering: older entries first.
#[inline]
pub(crate) fn tie_break(a_seq: u64, b_seq: u64) -> Ordering {
    if a_seq <= b_seq {
        Less
    } else {
        Greater
    }
}

fn rotate_left<K, V>(nodes: &mut Arena<K, V>, mut root: NodeId, p: NodeId) -> NodeId {
    let Some(r) = right_of(nodes, p) else {
        return root;
    };
    let rl = left_of(nodes, r);
    nodes[p].tree.right = rl;
    if let Some(rl) = rl {
        nodes[rl].tree.parent = Some(p);
    }
    let pp = parent_of(nodes, p);
    nodes[r].tree.parent = pp;
    match pp {
        None => {
            root = r;
            set_red(nodes, r, false);
        }
        Some(pp) => replace_child(nodes, pp, p, Some(r)),
    }
    nodes[r].tree.left = Some(p);
    nodes[p].tree.parent = Some(r);
    root
}

fn rotate_right<K, V>(nodes: &mut Arena<K, V>, mut root: NodeId, p: NodeId) -> NodeId {
    let Some(l) = left_of(nodes, p) else {
        return root;
    };
    let lr = right_of(nodes, l);
    nodes[p].tree.left = lr;
    if let Some(lr) = lr {
        nodes[lr].tree.parent = Some(p);
    }
    let pp = parent_of(nodes, p);
    nodes[l].tree.parent = pp;
    match pp {
        None => {
            root = l;
            set_red(nodes, l, false);
        }
        Some(pp) => replace_child(nodes, pp, p, Some(l)),
    }
    nodes[l].tree.right = Some(p);
    nodes[p].tree.parent = Some(l);
    root
}

/// Restore red-black rules after linking `x` as a leaf. Returns the root.
pub(crate) fn balance_insertion<K, V>(
    nodes: &mut Arena<K, V>,
    mut root: NodeId,
    mut x: NodeId,
) -> NodeId {
    set_red(nodes, x, true);
    loop {
        let Some(xp) = parent_of(nodes, x) else {
            set_red(nodes, x, false);
            return x;
        };
        if !nodes[xp].tree.red {
            return root;
        }
        let Some(xpp) = parent_of(nodes, xp) else {
            return root;
        };
        if left_of(nodes, xpp) == Some(xp) {
            let uncle = right_of(nodes, xpp);
            if let Some(u) = uncle.filter(|&u| nodes[u].tree.red) {
                set_red(nodes, u, false);
                set_red(nodes, xp, false);
                set_red(nodes, xpp, true);
                x = xpp;
            } else {
                let (mut p, mut pp) = (Some(xp), Some(xpp));
                if right_of(nodes, xp) == Some(x) {
                    x = xp;
                    root = rotate_left(nodes, root, x);
                    p = parent_of(nodes, x);
                    pp = p.and_then(|p| parent_of(nodes, p));
                }
                if let Some(p) = p {
                    set_red(nodes, p, false);
                    if let Some(pp) = pp {
                        set_red(nodes, pp, true);
                        root = rotate_right(nodes, root, pp);
                    }
                }
            }
        } else {
            let uncle = left_of(nodes, xpp);
            if let Some(u) = uncle.filter(|&u| nodes[u].tree.red) {
                set_red(nodes, u, false);
                set_red(nodes, xp, false);
                set_red(nodes, xpp, true);
                x = xpp;
            } else {
                let (mut p, mut pp) = (Some(xp), Some(xpp));
                if left_of(nodes, xp) == Some(x) {
                    x = xp;
                    root = rotate_right(nodes, root, x);
                    p = parent_of(nodes, x);
                    pp = p.and_then(|p| parent_of(nodes, p));
                }
                if let Some(p) = p {
                    set_red(nodes, p, false);
                    if let Some(pp) = pp {
                        set_red(nodes, pp, true);
                        root = rotate_left(nodes, root, pp);
                    }
                }
            }
        }
    }
}

/// Restore red-black rules after removing a black node; `x` is the node that
/// took its place (or the node itself, still attached, when it was a leaf).
fn balance_deletion<K, V>(nodes: &mut Arena<K, V>, mut root: NodeId, x: NodeId) -> NodeId {
    let mut x = Some(x);
    loop {
        let Some(cur) = x else {
            return root;
        };
        if cur == root {
            return root;
        }
        let Some(xp0) = parent_of(nodes, cur) else {
            set_red(nodes, cur, false);
            return cur;
        };
        if nodes[cur].tree.red {
            set_red(nodes, cur, false);
            return root;
        }
        let mut xp = Some(xp0);
        if left_of(nodes, xp0) == Some(cur) {
            let mut xpr = right_of(nodes, xp0);
            if let Some(s) = xpr.filter(|&s| nodes[s].tree.red) {
                set_red(nodes, s, false);
                set_red(nodes, xp0, true);
                root = rotate_left(nodes, root, xp0);
                xp = parent_of(nodes, cur);
                xpr = xp.and_then(|p| right_of(nodes, p));
            }
            match xpr {
                None => x = xp,
                Some(s) => {
                    let (sl, sr) = (left_of(nodes, s), right_of(nodes, s));
                    if !is_red(nodes, sr) && !is_red(nodes, sl) {
                        set_red(nodes, s, true);
                        x = xp;
                    } else {
                        let mut xpr = Some(s);
                        if !is_red(nodes, sr) {
                            if let Some(sl) = sl {
                                set_red(nodes, sl, false);
                            }
                            set_red(nodes, s, true);
                            root = rotate_right(nodes, root, s);
                            xp = parent_of(nodes, cur);
                            xpr = xp.and_then(|p| right_of(nodes, p));
                        }
                        if let Some(s) = xpr {
                            let parent_red = is_red(nodes, xp);
                            set_red(nodes, s, parent_red);
                            if let Some(sr) = right_of(nodes, s) {
                                set_red(nodes, sr, false);
                            }
                        }
                        if let Some(p) = xp {
                            set_red(nodes, p, false);
                            root = rotate_left(nodes, root, p);
                        }
                        x = Some(root);
                    }
                }
            }
        } else {
            let mut xpl = left_of(nodes, xp0);
            if let Some(s) = xpl.filter(|&s| nodes[s].tree.red) {
                set_red(nodes, s, false);
                set_red(nodes, xp0, true);
                root = rotate_right(nodes, root, xp0);
                xp = parent_of(nodes, cur);
                xpl = xp.and_then(|p| left_of(nodes, p));
            }
            match xpl {
                None => x = xp,
                Some(s) => {
                    let (sl, sr) = (left_of(nodes, s), right_of(nodes, s));
                    if !is_red(nodes, sl) && !is_red(nodes, sr) {
                        set_red(nodes, s, true);
                        x = xp;
                    } else {
                        let mut xpl = Some(s);
                        if !is_red(nodes, sl) {
                            if let Some(sr) = sr {
                                set_red(nodes, sr, false);
                            }
                            set_red(nodes, s, true);
                            root = rotate_left(nodes, root, s);
                            xp = parent_of(nodes, cur);
                            xpl = xp.and_then(|p| left_of(nodes, p));
                        }
                        if let Some(s) = xpl {
                            let parent_red = is_red(nodes, xp);
                            set_red(nodes, s, parent_red);
                            if let Some(sl) = left_of(nodes, s) {
                                set_red(nodes, sl, false);
                            }
                        }
                        if let Some(p) = xp {
                            set_red(nodes, p, false);
                            root = rotate_right(nodes, root, p);
                        }
                        x = Some(root);
                    }
                }
            }
        }
    }
}

/// Make `root` the bucket head and the first node of the auxiliary chain.
pub(crate) fn move_root_to_front<K, V>(
    nodes: &mut Arena<K, V>,
    table: &mut [Option<NodeId>],
    root: NodeId,
) {
    let index = index_for(nodes[root].hash, table.len());
    let first = table[index];
    if first != Some(root) {
        table[index] = Some(root);
        let rp = nodes[root].tree.prev;
        let rn = nodes[root].next;
        if let Some(rn) = rn {
            nodes[rn].tree.prev = rp;
        }
        if let Some(rp) = rp {
            nodes[rp].next = rn;
        }
        if let Some(first) = first {
            nodes[first].tree.prev = Some(root);
        }
        nodes[root].next = first;
        nodes[root].tree.prev = None;
    }
    // Full structural check of the bucket; only the crate's own tests pay for it.
    #[cfg(test)]
    assert!(check_subtree(nodes, root, index, table.len(), &mut 0).is_ok());
}

/// Descend from `start` looking for a node with `hash` whose key satisfies
/// `matches`. `steer` compares the lookup key with a node key when an ordering is
/// available; without one, both subtrees of an equal-hash node are searched.
pub(crate) fn find<K, V, M, D>(
    nodes: &Arena<K, V>,
    start: NodeId,
    hash: u32,
    matches: &M,
    steer: &D,
) -> Option<NodeId>
where
    M: Fn(&K) -> bool,
    D: Fn(&K) -> Option<Ordering>,
{
    let mut p = Some(start);
    while let Some(cur) = p {
        let n = &nodes[cur];
        let (pl, pr) = (n.tree.left, n.tree.right);
        if n.hash > hash {
            p = pl;
        } else if n.hash < hash {
            p = pr;
        } else if matches(&n.key) {
            return Some(cur);
        } else if pl.is_none() {
            p = pr;
        } else if pr.is_none() {
            p = pl;
        } else if let Some(dir) = steer(&n.key).filter(|d| *d != Equal) {
            p = if dir == Less { pl } else { pr };
        } else if let Some(q) = pr.and_then(|r| find(nodes, r, hash, matches, steer)) {
            return Some(q);
        } else {
            p = pl;
        }
    }
    None
}

/// Locate `key` in the tree rooted at `root`, or the leaf position a new node
/// with sequence number `seq` would take.
pub(crate) fn search<K: Eq, V>(
    nodes: &Arena<K, V>,
    root: NodeId,
    hash: u32,
    key: &K,
    order: Option<KeyOrder<K>>,
    seq: u64,
) -> TreeSlot {
    let matches = |k: &K| k == key;
    let steer = |k: &K| order.map(|cmp| cmp(key, k));
    let mut searched = false;
    let mut p = root;
    loop {
        let n = &nodes[p];
        let dir = if n.hash > hash {
            Less
        } else if n.hash < hash {
            Greater
        } else if n.key == *key {
            return TreeSlot::Occupied(p);
        } else {
            match steer(&n.key) {
                Some(d) if d != Equal => d,
                _ => {
                    if !searched {
                        searched = true;
                        for child in [n.tree.left, n.tree.right].into_iter().flatten() {
                            if let Some(q) = find(nodes, child, hash, &matches, &steer) {
                                return TreeSlot::Occupied(q);
                            }
                        }
                    }
                    tie_break(seq, n.seq)
                }
            }
        };
        let next = if dir == Greater { n.tree.right } else { n.tree.left };
        match next {
            Some(c) => p = c,
            None => {
                return TreeSlot::Vacant {
                    parent: p,
                    left: dir != Greater,
                }
            }
        }
    }
}

/// Link the fresh tree node `x` under `parent`, splice it into the auxiliary
/// chain right after its parent, rebalance and re-seat the root.
pub(crate) fn attach<K, V>(
    nodes: &mut Arena<K, V>,
    table: &mut [Option<NodeId>],
    root: NodeId,
    parent: NodeId,
    left: bool,
    x: NodeId,
) {
    let xpn = nodes[parent].next;
    if left {
        nodes[parent].tree.left = Some(x);
    } else {
        nodes[parent].tree.right = Some(x);
    }
    nodes[parent].next = Some(x);
    {
        let n = &mut nodes[x];
        n.tree.parent = Some(parent);
        n.tree.prev = Some(parent);
        n.next = xpn;
    }
    if let Some(xpn) = xpn {
        nodes[xpn].tree.prev = Some(x);
    }
    let root = balance_insertion(nodes, root, x);
    move_root_to_front(nodes, table, root);
}

/// Build a tree from the chain starting at `head`. Chain order is kept as
/// auxiliary order, except that the root is moved to the front.
pub(crate) fn treeify<K, V>(
    nodes: &mut Arena<K, V>,
    table: &mut [Option<NodeId>],
    head: NodeId,
    order: Option<KeyOrder<K>>,
) {
    let mut root: Option<NodeId> = None;
    let mut prev: Option<NodeId> = None;
    let mut cur = Some(head);
    while let Some(x) = cur {
        cur = nodes[x].next;
        {
            let n = &mut nodes[x];
            n.form = BucketForm::Tree;
            n.tree.left = None;
            n.tree.right = None;
            n.tree.prev = prev;
        }
        prev = Some(x);
        let Some(r) = root else {
            nodes[x].tree.parent = None;
            set_red(nodes, x, false);
            root = Some(x);
            continue;
        };
        let (h, seq) = (nodes[x].hash, nodes[x].seq);
        let mut p = r;
        loop {
            let pn = &nodes[p];
            let dir = if pn.hash > h {
                Less
            } else if pn.hash < h {
                Greater
            } else {
                match order.map(|cmp| cmp(&nodes[x].key, &pn.key)) {
                    Some(d) if d != Equal => d,
                    _ => tie_break(seq, pn.seq),
                }
            };
            let next = if dir == Greater { pn.tree.right } else { pn.tree.left };
            match next {
                Some(c) => p = c,
                None => {
                    nodes[x].tree.parent = Some(p);
                    if dir == Greater {
                        nodes[p].tree.right = Some(x);
                    } else {
                        nodes[p].tree.left = Some(x);
                    }
                    root = Some(balance_insertion(nodes, r, x));
                    break;
                }
            }
        }
    }
    if let Some(r) = root {
        move_root_to_front(nodes, table, r);
    }
}

/// Turn the auxiliary chain starting at `head` back into plain chain nodes.
pub(crate) fn untreeify<K, V>(nodes: &mut Arena<K, V>, head: NodeId) {
    let mut cur = Some(head);
    while let Some(x) = cur {
        cur = nodes[x].next;
        nodes[x].make_chain();
    }
}

/// Unlink `p` from its tree bucket. Two-child nodes first trade tree
/// positions with their in-order successor, so every surviving `NodeId`
/// keeps its key. The tree is never demoted here; only a split does that.
pub(crate) fn remove<K, V>(nodes: &mut Arena<K, V>, table: &mut [Option<NodeId>], p: NodeId) {
    let index = index_for(nodes[p].hash, table.len());
    let succ = nodes[p].next;
    let pred = nodes[p].tree.prev;
    match pred {
        None => table[index] = succ,
        Some(pred) => nodes[pred].next = succ,
    }
    if let Some(succ) = succ {
        nodes[succ].tree.prev = pred;
    }
    let Some(first) = table[index] else {
        return;
    };
    let mut root = root_of(nodes, first);

    let (pl, pr) = (left_of(nodes, p), right_of(nodes, p));
    let replacement = match (pl, pr) {
        (Some(pl), Some(pr)) => {
            let mut s = pr;
            while let Some(sl) = left_of(nodes, s) {
                s = sl;
            }
            let c = nodes[s].tree.red;
            nodes[s].tree.red = nodes[p].tree.red;
            nodes[p].tree.red = c;
            let sr = right_of(nodes, s);
            let pp = parent_of(nodes, p);
            if s == pr {
                nodes[p].tree.parent = Some(s);
                nodes[s].tree.right = Some(p);
            } else {
                let sp = parent_of(nodes, s);
                nodes[p].tree.parent = sp;
                if let Some(sp) = sp {
                    replace_child(nodes, sp, s, Some(p));
                }
                nodes[s].tree.right = Some(pr);
                nodes[pr].tree.parent = Some(s);
            }
            nodes[p].tree.left = None;
            nodes[p].tree.right = sr;
            if let Some(sr) = sr {
                nodes[sr].tree.parent = Some(p);
            }
            nodes[s].tree.left = Some(pl);
            nodes[pl].tree.parent = Some(s);
            nodes[s].tree.parent = pp;
            match pp {
                None => root = s,
                Some(pp) => replace_child(nodes, pp, p, Some(s)),
            }
            sr.unwrap_or(p)
        }
        (Some(pl), None) => pl,
        (None, Some(pr)) => pr,
        (None, None) => p,
    };

    if replacement != p {
        let pp = parent_of(nodes, p);
        nodes[replacement].tree.parent = pp;
        match pp {
            None => root = replacement,
            Some(pp) => replace_child(nodes, pp, p, Some(replacement)),
        }
        let links = &mut nodes[p].tree;
        links.left = None;
        links.right = None;
        links.parent = None;
    }

    let r = if nodes[p].tree.red {
        root
    } else {
        balance_deletion(nodes, root, replacement)
    };

    if replacement == p {
        if let Some(pp) = nodes[p].tree.parent.take() {
            replace_child(nodes, pp, p, None);
        }
    }
    set_red(nodes, r, false);
    move_root_to_front(nodes, table, r);
}

/// Split the tree bucket starting at `head` into `table[index]` and
/// `table[index + bit]`. A half with at most `UNTREEIFY_THRESHOLD` nodes
/// becomes a chain; a larger half is rebuilt as a tree unless it received
/// every node, in which case the old tree is still valid.
pub(crate) fn split<K, V>(
    nodes: &mut Arena<K, V>,
    table: &mut [Option<NodeId>],
    head: NodeId,
    index: usize,
    bit: usize,
    order: Option<KeyOrder<K>>,
) {
    let (mut lo_head, mut lo_tail) = (None, None);
    let (mut hi_head, mut hi_tail) = (None, None);
    let (mut lc, mut hc) = (0usize, 0usize);
    let mut cur = Some(head);
    while let Some(e) = cur {
        cur = nodes[e].next;
        nodes[e].next = None;
        let (half_head, half_tail, count) = if (nodes[e].hash as usize) & bit == 0 {
            (&mut lo_head, &mut lo_tail, &mut lc)
        } else {
            (&mut hi_head, &mut hi_tail, &mut hc)
        };
        nodes[e].tree.prev = *half_tail;
        match *half_tail {
            None => *half_head = Some(e),
            Some(t) => nodes[t].next = Some(e),
        }
        *half_tail = Some(e);
        *count += 1;
    }

    for (half, count, other, slot) in [
        (lo_head, lc, hi_head, index),
        (hi_head, hc, lo_head, index + bit),
    ] {
        let Some(half) = half else {
            continue;
        };
        table[slot] = Some(half);
        if count <= UNTREEIFY_THRESHOLD {
            log::trace!("split: bucket {slot} reverts to a chain of {count}");
            untreeify(nodes, half);
        } else if other.is_some() {
            treeify(nodes, table, half, order);
        }
    }
}

/// Verify every structural rule of the tree bucket at `bucket`. Returns the
/// number of nodes in the bucket.
pub(crate) fn check_bucket<K, V>(
    nodes: &Arena<K, V>,
    table: &[Option<NodeId>],
    bucket: usize,
) -> Result<usize, InvariantViolation> {
    let Some(root) = table[bucket] else {
        return Ok(0);
    };
    let r = &nodes[root];
    if r.tree.parent.is_some() {
        return Err(InvariantViolation::HeadNotRoot { bucket });
    }
    if r.tree.red {
        return Err(InvariantViolation::RedRoot { bucket });
    }
    let mut tree_count = 0;
    check_subtree(nodes, root, bucket, table.len(), &mut tree_count)?;

    let mut chain_count = 0;
    let mut prev = None;
    let mut cur = Some(root);
    while let Some(c) = cur {
        let n = &nodes[c];
        if !n.is_tree() {
            return Err(InvariantViolation::MixedForm { bucket });
        }
        if n.tree.prev != prev {
            return Err(InvariantViolation::AuxChain { bucket });
        }
        chain_count += 1;
        if chain_count > tree_count {
            return Err(InvariantViolation::AuxChain { bucket });
        }
        prev = Some(c);
        cur = n.next;
    }
    if chain_count != tree_count {
        return Err(InvariantViolation::AuxChain { bucket });
    }
    Ok(tree_count)
}

/// Returns the black height of the subtree at `t`.
fn check_subtree<K, V>(
    nodes: &Arena<K, V>,
    t: NodeId,
    bucket: usize,
    capacity: usize,
    count: &mut usize,
) -> Result<usize, InvariantViolation> {
    *count += 1;
    if *count > nodes.len() {
        return Err(InvariantViolation::BrokenParentLink { bucket });
    }
    let n = &nodes[t];
    if !n.is_tree() {
        return Err(InvariantViolation::MixedForm { bucket });
    }
    if index_for(n.hash, capacity) != bucket {
        return Err(InvariantViolation::Misplaced { bucket });
    }
    if let Some(tp) = n.tree.parent {
        if left_of(nodes, tp) != Some(t) && right_of(nodes, tp) != Some(t) {
            return Err(InvariantViolation::BrokenParentLink { bucket });
        }
    }
    let mut heights = [1usize; 2];
    for (side, child) in [n.tree.left, n.tree.right].into_iter().enumerate() {
        let Some(c) = child else {
            continue;
        };
        let cn = &nodes[c];
        if cn.tree.parent != Some(t) {
            return Err(InvariantViolation::BrokenParentLink { bucket });
        }
        if (side == 0 && cn.hash > n.hash) || (side == 1 && cn.hash < n.hash) {
            return Err(InvariantViolation::HashOrder { bucket });
        }
        if n.tree.red && cn.tree.red {
            return Err(InvariantViolation::RedRed { bucket });
        }
        heights[side] = check_subtree(nodes, c, bucket, capacity, count)?;
    }
    if heights[0] != heights[1] {
        return Err(InvariantViolation::BlackHeight { bucket });
    }
    Ok(heights[0] + usize::from(!n.tree.red))
}
