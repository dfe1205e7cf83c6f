//! Buffer Pool Manager - the core page caching layer.
//!
//! The [`BufferPoolManager`] provides:
//! - Page caching between disk and memory
//! - Pin-based reference counting
//! - Dirty page write-back before a frame is reused
//! - Stride-based page id allocation for sharded deployments

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::buffer::frame::{Frame, FrameHandle, FrameMeta};
use crate::buffer::page_allocator::PageIdAllocator;
use crate::buffer::replacer::{LruReplacer, Replacer};
use crate::buffer::{BufferPoolStats, PageReadGuard, PageWriteGuard};
use crate::common::{BufferPoolConfig, Error, FrameId, PageId, Result};
use crate::storage::DiskIo;

/// Manages a fixed pool of frames caching pages of a larger disk.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                    BufferPoolManager                        │
/// │  ┌──────────────── Mutex<PoolState> ──────────────────┐     │
/// │  │ page_table      meta: Vec<FrameMeta>   free_list   │     │
/// │  │ PageId → Fid    page/pin/dirty         VecDeque    │     │
/// │  └────────────────────────────────────────────────────┘     │
/// │  ┌──────────────────────────────┐  ┌──────────────┐         │
/// │  │ frames: Vec<Frame>           │  │  replacer    │         │
/// │  │ [RwLock<Page>] [..] [..]     │  │ LruReplacer  │         │
/// │  └──────────────────────────────┘  └──────────────┘         │
/// │  ┌──────────────┐  ┌──────────────┐                         │
/// │  │  allocator   │  │ disk: DiskIo │                         │
/// │  └──────────────┘  └──────────────┘                         │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Locking
/// Every public operation runs under the single `state` mutex, including the
/// disk I/O it triggers. The one exception is flushing a pinned dirty page,
/// which writes with an extra pin held and the mutex released. Page bytes live
/// outside it, behind one latch per frame, so pinned holders work on their
/// pages without the pool lock.
///
/// Lock order: the pool only takes a frame latch while holding `state` if the
/// frame's pin count is zero. Holders of a latch on a pinned page may call back
/// into the pool freely.
///
/// # Usage
/// ```
/// use pagepool::{BufferPoolManager, MemoryDisk};
///
/// let bpm = BufferPoolManager::new(4, MemoryDisk::new());
///
/// let (page_id, handle) = bpm.new_page().unwrap();
/// handle.write().as_mut_slice()[0] = 0xAB;
/// bpm.unpin_page(page_id, true);
///
/// let handle = bpm.fetch_page(page_id).unwrap();
/// assert_eq!(handle.read().as_slice()[0], 0xAB);
/// bpm.unpin_page(page_id, false);
/// ```
pub struct BufferPoolManager {
    /// Fixed pool of frames allocated at startup.
    frames: Vec<Frame>,

    /// Bookkeeping guarded by the pool lock.
    state: Mutex<PoolState>,

    /// Eviction policy over frames with pin count zero.
    replacer: Box<dyn Replacer>,

    /// Issues page ids from this instance's shard.
    allocator: PageIdAllocator,

    disk: Arc<dyn DiskIo>,

    stats: BufferPoolStats,

    config: BufferPoolConfig,
}

struct PoolState {
    meta: Vec<FrameMeta>,
    page_table: HashMap<PageId, FrameId>,
    free_list: VecDeque<FrameId>,
}

impl BufferPoolManager {
    /// Create a standalone buffer pool of `pool_size` frames.
    ///
    /// # Panics
    /// Panics if `pool_size` is 0.
    pub fn new(pool_size: usize, disk: impl DiskIo + 'static) -> Self {
        Self::with_config(BufferPoolConfig::new(pool_size), Arc::new(disk))
    }

    /// Create one instance of a (possibly sharded) pool with an LRU replacer.
    ///
    /// # Panics
    /// Panics if the configuration is invalid, see [`BufferPoolConfig::validate`].
    pub fn with_config(config: BufferPoolConfig, disk: Arc<dyn DiskIo>) -> Self {
        let replacer = Box::new(LruReplacer::new(config.pool_size));
        Self::with_replacer(config, disk, replacer)
    }

    /// Create an instance with a caller-supplied eviction policy.
    pub fn with_replacer(
        config: BufferPoolConfig,
        disk: Arc<dyn DiskIo>,
        replacer: Box<dyn Replacer>,
    ) -> Self {
        config.validate();

        let pool_size = config.pool_size;
        let frames = (0..pool_size).map(|_| Frame::new()).collect();

        // Initially, every frame is free, handed out in index order.
        let state = PoolState {
            meta: vec![FrameMeta::EMPTY; pool_size],
            page_table: HashMap::with_capacity(pool_size),
            free_list: (0..pool_size).map(FrameId::new).collect(),
        };

        debug!(
            pool_size,
            num_instances = config.num_instances,
            instance_index = config.instance_index,
            "buffer pool created"
        );

        Self {
            frames,
            state: Mutex::new(state),
            replacer,
            allocator: PageIdAllocator::new(config.num_instances, config.instance_index),
            disk,
            stats: BufferPoolStats::new(),
            config,
        }
    }

    // ========================================================================
    // Public API: pin and unpin
    // ========================================================================

    /// Pin `page_id`, reading it from disk if it is not resident.
    ///
    /// # Errors
    /// - `Error::PoolExhausted` if the page is absent and every frame is pinned
    /// - `Error::InvalidPageId` for the sentinel or an id of another shard
    /// - I/O errors from writing back a victim or reading the page
    pub fn fetch_page(&self, page_id: PageId) -> Result<FrameHandle<'_>> {
        if !self.allocator.owns(page_id) {
            return Err(Error::InvalidPageId(page_id));
        }

        let mut state = self.state.lock();
        let frame_id = self.pin_page(&mut state, page_id)?;
        Ok(self.handle(frame_id, page_id))
    }

    /// Allocate a fresh page id and pin a zeroed frame for it.
    ///
    /// No id is consumed if no frame can be obtained.
    ///
    /// # Errors
    /// - `Error::PoolExhausted` if every frame is pinned
    /// - `Error::PageIdsExhausted` if this instance ran out of ids
    /// - I/O errors from writing back a victim
    pub fn new_page(&self) -> Result<(PageId, FrameHandle<'_>)> {
        let mut state = self.state.lock();
        let frame_id = self.acquire_frame(&mut state)?;

        let page_id = match self.allocator.allocate() {
            Ok(page_id) => page_id,
            Err(e) => {
                state.free_list.push_front(frame_id);
                return Err(e);
            }
        };

        self.frames[frame_id.0].page_mut().reset();
        state.meta[frame_id.0].install(page_id);
        state.page_table.insert(page_id, frame_id);
        self.stats.record_allocation();

        debug!(%page_id, %frame_id, "new page");
        Ok((page_id, self.handle(frame_id, page_id)))
    }

    /// Release one pin on `page_id`, OR-ing `is_dirty` into its dirty flag.
    ///
    /// Returns whether the page now has no pins. A page that is not resident
    /// has nothing to unpin and reports `true`.
    pub fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> bool {
        let mut state = self.state.lock();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return true;
        };

        let meta = &mut state.meta[frame_id.0];
        if meta.is_pinned() && meta.unpin() == 0 {
            self.replacer.record_unpin(frame_id);
        }
        meta.is_dirty |= is_dirty;

        trace!(%page_id, pin_count = meta.pin_count, is_dirty, "unpin");
        meta.pin_count == 0
    }

    // ========================================================================
    // Public API: delete and flush
    // ========================================================================

    /// Drop `page_id` from the pool and free its frame.
    ///
    /// Returns `true` when the page is no longer resident afterwards (including
    /// when it never was) and `false` when it stays because it is pinned; a
    /// pinned page is left completely untouched.
    ///
    /// # Errors
    /// I/O errors from writing back a dirty page. The page stays resident.
    pub fn delete_page(&self, page_id: PageId) -> Result<bool> {
        let mut state = self.state.lock();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(true);
        };

        let meta = state.meta[frame_id.0];
        if meta.is_pinned() {
            debug!(%page_id, pin_count = meta.pin_count, "delete refused, page pinned");
            return Ok(false);
        }

        if meta.is_dirty {
            self.write_back(frame_id, page_id)?;
            state.meta[frame_id.0].is_dirty = false;
        }

        self.replacer.record_pin(frame_id);
        state.page_table.remove(&page_id);
        state.meta[frame_id.0].reset();
        self.frames[frame_id.0].page_mut().reset();
        self.allocator.deallocate(page_id);
        state.free_list.push_back(frame_id);
        self.stats.record_deletion();

        debug!(%page_id, %frame_id, "page deleted");
        Ok(true)
    }

    /// Write `page_id` to disk if it is dirty.
    ///
    /// Returns `false` if the page is not resident. Pin count and residency
    /// are unchanged. Flushing a dirty page waits for its read latch, so the
    /// caller must not hold that page's write latch.
    ///
    /// # Errors
    /// I/O errors from the disk write. The page stays dirty.
    pub fn flush_page(&self, page_id: PageId) -> Result<bool> {
        let mut state = self.state.lock();
        let Some(&frame_id) = state.page_table.get(&page_id) else {
            return Ok(false);
        };

        let meta = state.meta[frame_id.0];
        if !meta.is_dirty {
            return Ok(true);
        }

        if !meta.is_pinned() {
            self.write_back(frame_id, page_id)?;
            state.meta[frame_id.0].is_dirty = false;
            return Ok(true);
        }

        // A holder may sit on the latch. Keep the page resident with a pin of
        // our own and wait for the latch outside the pool lock.
        state.meta[frame_id.0].pin();
        drop(state);

        let page = self.frames[frame_id.0].page();
        let written = self.disk.write_page(page_id, page.as_slice());

        let mut state = self.state.lock();
        drop(page);
        if written.is_ok() {
            state.meta[frame_id.0].is_dirty = false;
            self.stats.record_write();
        }
        if state.meta[frame_id.0].unpin() == 0 {
            self.replacer.record_unpin(frame_id);
        }

        trace!(%page_id, "flushed pinned page");
        written.map(|()| true)
    }

    /// Flush every resident page.
    ///
    /// # Errors
    /// Stops at the first I/O error.
    pub fn flush_all_pages(&self) -> Result<()> {
        let resident: Vec<PageId> = self.state.lock().page_table.keys().copied().collect();

        for page_id in resident {
            // A page evicted in between was already written back.
            self.flush_page(page_id)?;
        }

        debug!(instance = self.config.instance_index, "flushed all pages");
        Ok(())
    }

    // ========================================================================
    // Public API: guarded access
    // ========================================================================

    /// Fetch a page and hold its read latch until the guard drops.
    pub fn fetch_page_read(&self, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let handle = self.fetch_page(page_id)?;
        Ok(PageReadGuard::new(self, handle))
    }

    /// Fetch a page and hold its write latch until the guard drops.
    ///
    /// The page is reported dirty when the guard drops.
    pub fn fetch_page_write(&self, page_id: PageId) -> Result<PageWriteGuard<'_>> {
        let handle = self.fetch_page(page_id)?;
        Ok(PageWriteGuard::new(self, handle))
    }

    /// [`new_page`](Self::new_page), returning a write guard.
    pub fn new_page_guarded(&self) -> Result<PageWriteGuard<'_>> {
        let (_, handle) = self.new_page()?;
        Ok(PageWriteGuard::new(self, handle))
    }

    // ========================================================================
    // Public API: stats and info
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    /// Number of frames in the pool.
    pub fn pool_size(&self) -> usize {
        self.config.pool_size
    }

    pub fn num_instances(&self) -> u32 {
        self.config.num_instances
    }

    pub fn instance_index(&self) -> u32 {
        self.config.instance_index
    }

    /// Pin count of a resident page, or `None` if it is not resident.
    pub fn pin_count(&self, page_id: PageId) -> Option<u32> {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|fid| state.meta[fid.0].pin_count)
    }

    /// Dirty flag of a resident page, or `None` if it is not resident.
    pub fn is_dirty(&self, page_id: PageId) -> Option<bool> {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .map(|fid| state.meta[fid.0].is_dirty)
    }

    pub fn contains_page(&self, page_id: PageId) -> bool {
        self.state.lock().page_table.contains_key(&page_id)
    }

    /// Number of resident pages.
    pub fn page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    /// Number of frames the replacer may currently evict.
    pub fn evictable_count(&self) -> usize {
        self.replacer.size()
    }

    // ========================================================================
    // Internal
    // ========================================================================

    fn handle(&self, frame_id: FrameId, page_id: PageId) -> FrameHandle<'_> {
        FrameHandle::new(&self.frames[frame_id.0], frame_id, page_id)
    }

    /// Pin a resident page, or load it into a fresh frame.
    fn pin_page(&self, state: &mut PoolState, page_id: PageId) -> Result<FrameId> {
        if let Some(&frame_id) = state.page_table.get(&page_id) {
            if state.meta[frame_id.0].pin() == 1 {
                self.replacer.record_pin(frame_id);
            }
            self.stats.record_hit();
            trace!(%page_id, %frame_id, "page hit");
            return Ok(frame_id);
        }

        self.stats.record_miss();
        let frame_id = self.acquire_frame(state)?;

        let read = {
            let mut page = self.frames[frame_id.0].page_mut();
            self.disk.read_page(page_id, page.as_mut_slice())
        };
        if let Err(e) = read {
            state.free_list.push_front(frame_id);
            return Err(e);
        }
        self.stats.record_read();

        state.meta[frame_id.0].install(page_id);
        state.page_table.insert(page_id, frame_id);

        debug!(%page_id, %frame_id, "page miss, loaded from disk");
        Ok(frame_id)
    }

    /// Obtain an empty frame: free list first, then a replacer victim.
    ///
    /// A dirty victim is written back before its frame is handed out. The
    /// returned frame has empty metadata and is in neither the free list nor
    /// the replacer.
    fn acquire_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            debug_assert!(
                state.meta[frame_id.0].is_free(),
                "{} on free list holds a page",
                frame_id
            );
            return Ok(frame_id);
        }

        let frame_id = self.replacer.victim().ok_or(Error::PoolExhausted)?;
        let victim = state.meta[frame_id.0];
        debug_assert!(!victim.is_pinned(), "replacer returned pinned {}", frame_id);

        if victim.is_dirty {
            if let Err(e) = self.write_back(frame_id, victim.page_id) {
                warn!(page_id = %victim.page_id, %frame_id, error = %e, "write-back of victim failed");
                self.replacer.record_unpin(frame_id);
                return Err(e);
            }
        }

        state.page_table.remove(&victim.page_id);
        state.meta[frame_id.0].reset();
        self.stats.record_eviction();

        debug!(page_id = %victim.page_id, %frame_id, dirty = victim.is_dirty, "evicted");
        Ok(frame_id)
    }

    /// Write a frame's bytes to disk. The caller clears the dirty flag.
    fn write_back(&self, frame_id: FrameId, page_id: PageId) -> Result<()> {
        let page = self.frames[frame_id.0].page();
        self.disk.write_page(page_id, page.as_slice())?;
        self.stats.record_write();
        trace!(%page_id, %frame_id, "wrote back");
        Ok(())
    }
}

#[cfg(test)]
impl BufferPoolManager {
    /// Make every further id allocation on this instance fail.
    pub(crate) fn exhaust_page_ids(&self) {
        self.allocator.exhaust();
    }

    /// Check the frame-partition invariants.
    fn assert_invariants(&self) {
        let state = self.state.lock();
        let mut seen = vec![false; self.pool_size()];

        for &fid in &state.free_list {
            assert!(state.meta[fid.0].is_free(), "{} on free list holds a page", fid);
            assert!(!std::mem::replace(&mut seen[fid.0], true));
        }
        for (&pid, &fid) in &state.page_table {
            assert_eq!(state.meta[fid.0].page_id, pid);
            assert!(!std::mem::replace(&mut seen[fid.0], true));
        }
        assert!(seen.iter().all(|&s| s), "frame neither free nor resident");

        let unpinned = state
            .page_table
            .values()
            .filter(|fid| !state.meta[fid.0].is_pinned())
            .count();
        assert_eq!(self.replacer.size(), unpinned);
    }
}
