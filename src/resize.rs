//! Capacity growth and bucket splitting.
//!
//! Capacities are powers of two, so doubling moves an entry either nowhere
//! ("low", same index) or exactly `old_capacity` buckets up ("high"),
//! depending on one bit of its stored hash. No hash is ever recomputed.

use crate::config::{threshold_for, TableConfig, MAXIMUM_CAPACITY};
use crate::node::{index_for, Arena, NodeId};
use crate::tree::{self, KeyOrder};

/// Outcome of asking for the next table size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Growth {
    /// Allocate `capacity` buckets and resize again past `threshold` entries.
    To { capacity: usize, threshold: usize },
    /// Already at `MAXIMUM_CAPACITY`; keep the table as is.
    Capped,
}

/// Next size for a table currently holding `old_capacity` buckets
/// (0 when nothing has been allocated yet).
pub(crate) fn next_growth(old_capacity: usize, config: &TableConfig) -> Growth {
    let capacity = if old_capacity == 0 {
        config.first_capacity()
    } else if old_capacity >= MAXIMUM_CAPACITY {
        return Growth::Capped;
    } else {
        old_capacity << 1
    };
    Growth::To {
        capacity,
        threshold: threshold_for(capacity, config.get_load_factor()),
    }
}

/// Move every bucket of `old` into a fresh table of `capacity` buckets.
pub(crate) fn split_all<K, V>(
    nodes: &mut Arena<K, V>,
    old: Vec<Option<NodeId>>,
    capacity: usize,
    order: Option<KeyOrder<K>>,
) -> Vec<Option<NodeId>> {
    let bit = old.len();
    let mut table = vec![None; capacity];
    for (j, head) in old.into_iter().enumerate() {
        let Some(e) = head else {
            continue;
        };
        if nodes[e].is_tree() {
            tree::split(nodes, &mut table, e, j, bit, order);
        } else if nodes[e].next.is_none() {
            table[index_for(nodes[e].hash, capacity)] = Some(e);
        } else {
            split_chain(nodes, &mut table, e, j, bit);
        }
    }
    table
}

/// Stable partition of the chain at `head` into `index` and `index + bit`.
fn split_chain<K, V>(
    nodes: &mut Arena<K, V>,
    table: &mut [Option<NodeId>],
    head: NodeId,
    index: usize,
    bit: usize,
) {
    let (mut lo_head, mut lo_tail) = (None, None);
    let (mut hi_head, mut hi_tail) = (None, None);
    let mut cur = Some(head);
    while let Some(e) = cur {
        cur = nodes[e].next;
        let (half_head, half_tail) = if (nodes[e].hash as usize) & bit == 0 {
            (&mut lo_head, &mut lo_tail)
        } else {
            (&mut hi_head, &mut hi_tail)
        };
        match *half_tail {
            None => *half_head = Some(e),
            Some(tail) => nodes[tail].next = Some(e),
        }
        *half_tail = Some(e);
    }
    if let Some(tail) = lo_tail {
        nodes[tail].next = None;
        table[index] = lo_head;
    }
    if let Some(tail) = hi_tail {
        nodes[tail].next = None;
        table[index + bit] = hi_head;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{BucketForm, Node};

    #[test]
    fn first_growth_uses_configured_capacity() {
        let config = TableConfig::new();
        assert_eq!(
            next_growth(0, &config),
            Growth::To {
                capacity: 16,
                threshold: 12
            }
        );
        let config = TableConfig::new().initial_capacity(64).load_factor(0.5);
        assert_eq!(
            next_growth(0, &config),
            Growth::To {
                capacity: 64,
                threshold: 32
            }
        );
    }

    #[test]
    fn growth_doubles_then_caps() {
        let config = TableConfig::new();
        assert_eq!(
            next_growth(16, &config),
            Growth::To {
                capacity: 32,
                threshold: 24
            }
        );
        assert_eq!(
            next_growth(MAXIMUM_CAPACITY / 2, &config),
            Growth::To {
                capacity: MAXIMUM_CAPACITY,
                threshold: usize::MAX
            }
        );
        assert_eq!(next_growth(MAXIMUM_CAPACITY, &config), Growth::Capped);
    }

    /// Invariant: a chain split keeps relative order in both halves and puts
    /// every entry at `hash & (capacity - 1)`.
    #[test]
    fn chain_split_is_stable() {
        let mut nodes: Arena<u32, ()> = Arena::with_key();
        let hashes = [1u32, 5, 9, 13, 17, 21];
        let mut old = vec![None; 4];
        let mut prev: Option<NodeId> = None;
        for (seq, &h) in hashes.iter().enumerate() {
            let id = nodes.insert(Node::new(h, seq as u64, h, (), BucketForm::Chain));
            match prev {
                None => old[1] = Some(id),
                Some(p) => nodes[p].next = Some(id),
            }
            prev = Some(id);
        }
        let table = split_all(&mut nodes, old, 8, None);
        let walk = |head: Option<NodeId>| {
            let mut out = Vec::new();
            let mut cur = head;
            while let Some(c) = cur {
                out.push(nodes[c].hash);
                cur = nodes[c].next;
            }
            out
        };
        assert_eq!(walk(table[1]), vec![1, 9, 17]);
        assert_eq!(walk(table[5]), vec![5, 13, 21]);
        assert!(table.iter().enumerate().all(|(i, h)| h.is_none() || i == 1 || i == 5));
    }
}
