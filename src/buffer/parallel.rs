//! Several buffer pool instances behind one page-id router.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::buffer::frame::FrameHandle;
use crate::buffer::{BufferPoolManager, PageReadGuard, PageWriteGuard, StatsSnapshot};
use crate::common::{BufferPoolConfig, Error, PageId, Result};
use crate::storage::DiskIo;

/// `m` independent [`BufferPoolManager`]s sharing one disk.
///
/// Instance `k` owns exactly the page ids with `id % m == k`, so every
/// id-addressed call goes straight to `page_id.shard(m)` and instances never
/// coordinate. Each instance keeps its own lock, which is the point: threads
/// working on different shards do not contend.
///
/// ```
/// use std::sync::Arc;
/// use pagepool::{MemoryDisk, ParallelBufferPool};
///
/// let pool = ParallelBufferPool::new(3, 4, Arc::new(MemoryDisk::new()));
/// let (page_id, _handle) = pool.new_page().unwrap();
/// assert!(pool.instance_for(page_id).contains_page(page_id));
/// pool.unpin_page(page_id, false);
/// ```
pub struct ParallelBufferPool {
    instances: Vec<BufferPoolManager>,
    /// Instance tried first by the next `new_page`.
    next_instance: AtomicUsize,
}

impl ParallelBufferPool {
    /// Create `num_instances` pools of `pool_size` frames each.
    ///
    /// # Panics
    /// Panics if `num_instances` or `pool_size` is 0.
    pub fn new(num_instances: u32, pool_size: usize, disk: Arc<dyn DiskIo>) -> Self {
        assert!(num_instances > 0, "num_instances must be > 0");

        let instances = (0..num_instances)
            .map(|index| {
                let config = BufferPoolConfig::sharded(pool_size, num_instances, index);
                BufferPoolManager::with_config(config, Arc::clone(&disk))
            })
            .collect();

        debug!(num_instances, pool_size, "parallel buffer pool created");
        Self {
            instances,
            next_instance: AtomicUsize::new(0),
        }
    }

    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    /// Total frames across all instances.
    pub fn pool_size(&self) -> usize {
        self.instances.iter().map(|bpm| bpm.pool_size()).sum()
    }

    /// The instance responsible for `page_id`.
    pub fn instance_for(&self, page_id: PageId) -> &BufferPoolManager {
        let shard = page_id.shard(self.instances.len() as u32);
        &self.instances[shard as usize]
    }

    pub fn instances(&self) -> &[BufferPoolManager] {
        &self.instances
    }

    pub fn fetch_page(&self, page_id: PageId) -> Result<FrameHandle<'_>> {
        self.instance_for(page_id).fetch_page(page_id)
    }

    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        self.instance_for(page_id).fetch_page_read(page_id)
    }

    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        self.instance_for(page_id).fetch_page_write(page_id)
    }

    /// Create a page in the first instance with a frame to spare.
    ///
    /// Instances are tried in order starting from a rotating index, so
    /// consecutive calls spread new pages across shards.
    ///
    /// # Errors
    /// An instance with no free frame or no ids left is skipped. If every
    /// instance is skipped, the last one's error is returned (`PoolExhausted`
    /// or `PageIdsExhausted`). Any other error is returned as soon as it occurs.
    pub fn new_page(&self) -> Result<(PageId, FrameHandle<'_>)> {
        let n = self.instances.len();
        let start = self.next_instance.fetch_add(1, Ordering::Relaxed) % n;

        let mut last = Error::PoolExhausted;
        for offset in 0..n {
            let index = (start + offset) % n;
            match self.instances[index].new_page() {
                Err(e @ (Error::PoolExhausted | Error::PageIdsExhausted)) => {
                    trace!(instance = index, error = %e, "instance skipped for new page");
                    last = e;
                }
                result => return result,
            }
        }
        Err(last)
    }

    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        self.instance_for(page_id).unpin_page(page_id, is_dirty)
    }

    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        self.instance_for(page_id).delete_page(page_id)
    }

    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        self.instance_for(page_id).flush_page(page_id)
    }

    pub fn flush_all_pages(&self) -> Result<()> {
        self.instances.iter().try_for_each(|bpm| bpm.flush_all_pages())
    }

    /// Sum of every instance's counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.instances
            .iter()
            .map(|bpm| bpm.stats().snapshot())
            .fold(StatsSnapshot::default(), |acc, s| acc + s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryDisk;

    fn pool(num_instances: u32, pool_size: usize) -> (ParallelBufferPool, Arc<MemoryDisk>) {
        let disk = Arc::new(MemoryDisk::new());
        (ParallelBufferPool::new(num_instances, pool_size, disk.clone()), disk)
    }

    #[test]
    fn test_new_page_rotates_instances() {
        let (pool, _disk) = pool(3, 2);
        let ids: Vec<u32> = (0..3).map(|_| pool.new_page().unwrap().0 .0).collect();
        assert_eq!(ids, vec![0, 1, 2]);

        for &id in &ids {
            let pid = PageId::new(id);
            assert_eq!(pool.instance_for(pid).instance_index(), id % 3);
            assert_eq!(pool.instance_for(pid).pin_count(pid), Some(1));
        }
    }

    #[test]
    fn test_new_page_falls_through_exhausted_instances() {
        let (pool, _disk) = pool(2, 1);
        let (a, _) = pool.new_page().unwrap();
        let (b, _) = pool.new_page().unwrap();
        assert_ne!(a.shard(2), b.shard(2));

        assert!(matches!(pool.new_page(), Err(Error::PoolExhausted)));

        // Free a frame in shard of `a`; the next call must find it even if
        // the rotation starts at the other instance.
        pool.unpin_page(a, false);
        let (c, _) = pool.new_page().unwrap();
        assert_eq!(c.shard(2), a.shard(2));
        assert_eq!(pool.stats().evictions, 1);
    }

    #[test]
    fn test_new_page_skips_instance_out_of_ids() {
        let (pool, _disk) = pool(2, 2);
        pool.instances()[0].exhaust_page_ids();

        let (a, _) = pool.new_page().unwrap();
        let (b, _) = pool.new_page().unwrap();
        assert_eq!((a.0, b.0), (1, 3));
        assert_eq!(pool.instances()[0].free_frame_count(), 2);
        assert!(matches!(pool.new_page(), Err(Error::PoolExhausted)));

        pool.unpin_page(a, false);
        pool.instances()[1].exhaust_page_ids();
        assert!(matches!(pool.new_page(), Err(Error::PageIdsExhausted)));
        assert_eq!(pool.stats().pages_allocated, 2);
    }

    #[test]
    fn test_ids_are_disjoint_across_instances() {
        let (pool, _disk) = pool(4, 8);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..32 {
            let (pid, _) = pool.new_page().unwrap();
            assert!(seen.insert(pid));
        }
        for bpm in pool.instances() {
            assert_eq!(bpm.page_count(), 8);
        }
    }

    #[test]
    fn test_routed_operations_share_disk() {
        let (pool, disk) = pool(2, 1);
        let mut guard = pool.fetch_page_write(PageId::new(5)).unwrap();
        guard.as_mut_slice()[0] = 9;
        drop(guard);

        assert!(pool.flush_page(PageId::new(5)).unwrap());
        assert_eq!(disk.page(PageId::new(5)).unwrap()[0], 9);

        assert!(pool.delete_page(PageId::new(5)).unwrap());
        assert!(!pool.instance_for(PageId::new(5)).contains_page(PageId::new(5)));

        let guard = pool.fetch_page_read(PageId::new(5)).unwrap();
        assert_eq!(guard.as_slice()[0], 9);
        drop(guard);

        pool.flush_all_pages().unwrap();
        assert_eq!(pool.pool_size(), 2);
    }
}
