//! Configuration for the buffer pool.

/// Size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems, so a frame maps onto exactly one
/// aligned block for direct I/O.
pub const PAGE_SIZE: usize = 4096;

/// Construction parameters for a single [`BufferPoolManager`] instance.
///
/// A standalone pool is the special case `num_instances = 1,
/// instance_index = 0`. When `m` instances cooperate, instance `k` only ever
/// allocates page ids with `id % m == k`, so a router can find the owner of
/// any page id without talking to the other instances.
///
/// [`BufferPoolManager`]: crate::buffer::BufferPoolManager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolConfig {
    /// Number of frames owned by this instance.
    pub pool_size: usize,
    /// Total number of cooperating instances.
    pub num_instances: u32,
    /// This instance's position in `0..num_instances`.
    pub instance_index: u32,
}

impl BufferPoolConfig {
    /// Configuration for a standalone pool.
    pub fn new(pool_size: usize) -> Self {
        Self::sharded(pool_size, 1, 0)
    }

    /// Configuration for instance `instance_index` of `num_instances`.
    pub fn sharded(pool_size: usize, num_instances: u32, instance_index: u32) -> Self {
        Self {
            pool_size,
            num_instances,
            instance_index,
        }
    }

    /// Check the configuration.
    ///
    /// # Panics
    /// Panics on a zero-sized pool, zero instances, or an instance index out
    /// of range. These are deployment mistakes, not runtime conditions.
    pub fn validate(&self) {
        assert!(self.pool_size > 0, "pool_size must be > 0");
        assert!(self.num_instances > 0, "num_instances must be > 0");
        assert!(
            self.instance_index < self.num_instances,
            "instance_index {} out of range for {} instances",
            self.instance_index,
            self.num_instances
        );
    }
}
