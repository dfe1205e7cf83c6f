//! RAII guards for page access.
//!
//! - [`PageReadGuard`] - Shared read latch (multiple allowed)
//! - [`PageWriteGuard`] - Exclusive write latch, reports the page dirty
//!
//! Both guards pin the page for as long as they live. On drop they release
//! the latch first and unpin second, so the frame is never evictable while a
//! latch on it is still held.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::frame::FrameHandle;
use crate::buffer::BufferPoolManager;
use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

/// Guard for read-only page access.
///
/// # Example
/// ```
/// use pagepool::{BufferPoolManager, MemoryDisk};
///
/// let bpm = BufferPoolManager::new(2, MemoryDisk::new());
/// let page_id = bpm.new_page_guarded().unwrap().page_id();
///
/// let guard = bpm.fetch_page_read(page_id).unwrap();
/// assert_eq!(guard.as_slice()[0], 0);
/// ```
pub struct PageReadGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    /// `None` once released.
    lock: Option<RwLockReadGuard<'a, Page>>,
}

impl<'a> PageReadGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, handle: FrameHandle<'a>) -> Self {
        Self {
            bpm,
            frame_id: handle.frame_id(),
            page_id: handle.page_id(),
            lock: Some(handle.read()),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Release the latch and the pin now. Calling it again does nothing.
    pub fn drop_guard(&mut self) {
        if let Some(lock) = self.lock.take() {
            drop(lock);
            self.bpm.unpin_page(self.page_id, false);
        }
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    fn deref(&self) -> &Page {
        self.lock
            .as_deref()
            .expect("page guard used after drop_guard")
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.drop_guard();
    }
}

/// Guard for exclusive write access to a page.
///
/// The page is reported dirty when the guard is released, whether or not the
/// bytes were actually touched.
pub struct PageWriteGuard<'a> {
    bpm: &'a BufferPoolManager,
    frame_id: FrameId,
    page_id: PageId,
    lock: Option<RwLockWriteGuard<'a, Page>>,
}

impl<'a> PageWriteGuard<'a> {
    pub(crate) fn new(bpm: &'a BufferPoolManager, handle: FrameHandle<'a>) -> Self {
        Self {
            bpm,
            frame_id: handle.frame_id(),
            page_id: handle.page_id(),
            lock: Some(handle.write()),
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    #[inline]
    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    /// Release the latch and the pin now, marking the page dirty.
    pub fn drop_guard(&mut self) {
        if let Some(lock) = self.lock.take() {
            drop(lock);
            self.bpm.unpin_page(self.page_id, true);
        }
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    fn deref(&self) -> &Page {
        self.lock
            .as_deref()
            .expect("page guard used after drop_guard")
    }
}

impl DerefMut for PageWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut Page {
        self.lock
            .as_deref_mut()
            .expect("page guard used after drop_guard")
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        self.drop_guard();
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::MemoryDisk;
    use crate::BufferPoolManager;

    #[test]
    fn test_drop_guard_is_idempotent() {
        let bpm = BufferPoolManager::new(4, MemoryDisk::new());
        let mut guard = bpm.new_page_guarded().unwrap();
        let pid = guard.page_id();

        // Pin twice: the guard's pin plus a second fetch.
        bpm.fetch_page(pid).unwrap();
        assert_eq!(bpm.pin_count(pid), Some(2));

        guard.drop_guard();
        assert_eq!(bpm.pin_count(pid), Some(1));
        guard.drop_guard();
        assert_eq!(bpm.pin_count(pid), Some(1));
        drop(guard);
        assert_eq!(bpm.pin_count(pid), Some(1));
    }

    #[test]
    fn test_read_guard_leaves_page_clean() {
        let bpm = BufferPoolManager::new(4, MemoryDisk::new());
        let pid = bpm.new_page_guarded().unwrap().page_id();
        bpm.flush_page(pid).unwrap();

        drop(bpm.fetch_page_read(pid).unwrap());
        assert_eq!(bpm.is_dirty(pid), Some(false));

        drop(bpm.fetch_page_write(pid).unwrap());
        assert_eq!(bpm.is_dirty(pid), Some(true));
    }

    #[test]
    #[should_panic(expected = "used after drop_guard")]
    fn test_deref_after_release_panics() {
        let bpm = BufferPoolManager::new(1, MemoryDisk::new());
        let mut guard = bpm.new_page_guarded().unwrap();
        guard.drop_guard();
        let _ = guard.as_slice()[0];
    }
}
