//! Error types: construction-time configuration errors and the failures
//! reported by the structural invariant checker.

use thiserror::Error;

/// Rejected table configuration.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    /// The load factor must be positive and finite.
    #[error("illegal load factor: {0}")]
    InvalidLoadFactor(f32),
}

/// A broken structural rule found by `HashTable::check_invariants`.
///
/// Every variant names the bucket index where the problem was found.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("bucket {bucket}: entry stored under the wrong index")]
    Misplaced { bucket: usize },
    #[error("bucket {bucket}: chain and tree nodes mixed in one bucket")]
    MixedForm { bucket: usize },
    #[error("bucket {bucket}: bucket head is not the tree root")]
    HeadNotRoot { bucket: usize },
    #[error("bucket {bucket}: tree root is red")]
    RedRoot { bucket: usize },
    #[error("bucket {bucket}: parent/child links disagree")]
    BrokenParentLink { bucket: usize },
    #[error("bucket {bucket}: left/right children out of hash order")]
    HashOrder { bucket: usize },
    #[error("bucket {bucket}: red node has a red child")]
    RedRed { bucket: usize },
    #[error("bucket {bucket}: unequal black height")]
    BlackHeight { bucket: usize },
    #[error("bucket {bucket}: prev/next chain inconsistent with tree membership")]
    AuxChain { bucket: usize },
    #[error("table holds {counted} reachable entries but reports {size}")]
    SizeMismatch { counted: usize, size: usize },
    #[error("capacity {capacity} is not a power of two within bounds")]
    Capacity { capacity: usize },
}
