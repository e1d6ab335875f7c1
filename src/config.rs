//! Table sizing constants and construction parameters.

use crate::error::ConfigError;

/// Largest bucket array the table will allocate.
pub const MAXIMUM_CAPACITY: usize = 1 << 30;

/// Bucket count used when no initial capacity was requested.
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;

/// Chain length at which a bucket becomes a tree.
pub const TREEIFY_THRESHOLD: usize = 8;

/// A split half with at most this many nodes reverts to a chain.
pub const UNTREEIFY_THRESHOLD: usize = 6;

/// Below this capacity a long chain grows the table instead of treeifying.
pub const MIN_TREEIFY_CAPACITY: usize = 64;

/// Construction parameters for a [`HashTable`](crate::HashTable).
///
/// `initial_capacity` of `None` means "allocate the default 16 buckets on
/// first insertion". A requested capacity is rounded up to a power of two and
/// clamped to [`MAXIMUM_CAPACITY`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableConfig {
    initial_capacity: Option<usize>,
    load_factor: f32,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: None,
            load_factor: DEFAULT_LOAD_FACTOR,
        }
    }
}

impl TableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity.min(MAXIMUM_CAPACITY));
        self
    }

    pub fn load_factor(mut self, load_factor: f32) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Check the load factor; capacity needs no check since it is clamped.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if !(self.load_factor > 0.0) || !self.load_factor.is_finite() {
            return Err(ConfigError::InvalidLoadFactor(self.load_factor));
        }
        Ok(self)
    }

    pub fn get_load_factor(&self) -> f32 {
        self.load_factor
    }

    /// Bucket count of the first allocation.
    pub(crate) fn first_capacity(&self) -> usize {
        self.initial_capacity
            .map(table_size_for)
            .unwrap_or(DEFAULT_INITIAL_CAPACITY)
    }
}

/// Smallest power of two `>= cap`, at least 1 and at most [`MAXIMUM_CAPACITY`].
pub(crate) fn table_size_for(cap: usize) -> usize {
    cap.clamp(1, MAXIMUM_CAPACITY).next_power_of_two()
}

/// `floor(capacity * load_factor)`, saturating when it cannot be represented.
pub(crate) fn threshold_for(capacity: usize, load_factor: f32) -> usize {
    let ft = capacity as f64 * load_factor as f64;
    if capacity < MAXIMUM_CAPACITY && ft < MAXIMUM_CAPACITY as f64 {
        ft as usize
    } else {
        usize::MAX
    }
}
