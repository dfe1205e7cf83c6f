//! Frame - a slot in the buffer pool.
//!
//! A frame is split in two:
//! - [`Frame`] holds the page bytes behind a latch, so pinned holders can read
//!   and write them without touching the pool lock.
//! - [`FrameMeta`] holds the bookkeeping (which page, pin count, dirty flag)
//!   and lives inside the pool's locked state. Only the pool mutates it.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::{FrameId, PageId};
use crate::storage::page::Page;

/// The byte payload of one buffer pool slot.
pub struct Frame {
    page: RwLock<Page>,
}

impl Frame {
    /// Create a new zeroed frame.
    pub fn new() -> Self {
        Self {
            page: RwLock::new(Page::new()),
        }
    }

    /// Acquire the read latch on the page bytes.
    #[inline]
    pub fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    /// Acquire the write latch on the page bytes.
    #[inline]
    pub fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

/// A pinned page, as returned by `fetch_page` and `new_page`.
///
/// The handle does not unpin on drop: every successful fetch or new must be
/// matched by one `unpin_page`. Release any latch taken through the handle
/// before unpinning; once the pin count reaches zero the pool may latch the
/// frame to evict it.
#[derive(Clone, Copy)]
pub struct FrameHandle<'a> {
    frame: &'a Frame,
    frame_id: FrameId,
    page_id: PageId,
}

impl<'a> FrameHandle<'a> {
    pub(crate) fn new(frame: &'a Frame, frame_id: FrameId, page_id: PageId) -> Self {
        Self {
            frame,
            frame_id,
            page_id,
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

    /// Shared access to the page bytes.
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'a, Page> {
        self.frame.page()
    }

    /// Exclusive access to the page bytes. Report the change with
    /// `unpin_page(page_id, true)`.
    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'a, Page> {
        self.frame.page_mut()
    }
}

/// Bookkeeping for one frame.
///
/// States, as seen by the pool:
/// ```text
///   Free ──install──▶ Pinned(1) ──pin──▶ Pinned(n+1)
///    ▲                   │ ▲
///    │ reset        unpin│ │pin
///    │                   ▼ │
///    └────────────── Unpinned ──victim──▶ (reinstalled for another page)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FrameMeta {
    pub page_id: PageId,
    pub pin_count: u32,
    pub is_dirty: bool,
}

impl FrameMeta {
    pub const EMPTY: FrameMeta = FrameMeta {
        page_id: PageId::INVALID,
        pin_count: 0,
        is_dirty: false,
    };

    /// Whether the frame holds no page.
    #[inline]
    pub fn is_free(&self) -> bool {
        !self.page_id.is_valid()
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count > 0
    }

    /// Take a frame for `page_id` with a single holder.
    pub fn install(&mut self, page_id: PageId) {
        *self = FrameMeta {
            page_id,
            pin_count: 1,
            is_dirty: false,
        };
    }

    /// Add a holder. Returns the new pin count.
    #[inline]
    pub fn pin(&mut self) -> u32 {
        self.pin_count += 1;
        self.pin_count
    }

    /// Drop a holder. Returns the new pin count; stays at zero if unpinned.
    #[inline]
    pub fn unpin(&mut self) -> u32 {
        self.pin_count = self.pin_count.saturating_sub(1);
        self.pin_count
    }

    /// Return the frame to the empty state.
    pub fn reset(&mut self) {
        *self = Self::EMPTY;
    }
}

impl Default for FrameMeta {
    fn default() -> Self {
        Self::EMPTY
    }
}
