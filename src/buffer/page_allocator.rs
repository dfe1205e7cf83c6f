//! Stride-based page id allocation for sharded pools.

use std::sync::atomic::{AtomicU32, Ordering};

use tracing::trace;

use crate::common::{Error, PageId, Result};

/// Hands out page ids `index, index + stride, index + 2*stride, ...`.
///
/// With `stride = m` instances each seeded with its own `index`, the id sets
/// are disjoint and an id's owner is always `id % m`. The counter is a
/// compare-and-swap loop, so allocation is safe without the pool lock.
#[derive(Debug)]
pub struct PageIdAllocator {
    next: AtomicU32,
    stride: u32,
    index: u32,
}

impl PageIdAllocator {
    /// # Panics
    /// Panics if `stride` is 0 or `index >= stride`.
    pub fn new(stride: u32, index: u32) -> Self {
        assert!(stride > 0, "stride must be > 0");
        assert!(index < stride, "index {} out of range for stride {}", index, stride);
        Self {
            next: AtomicU32::new(index),
            stride,
            index,
        }
    }

    /// Allocate the next page id.
    ///
    /// # Errors
    /// `Error::PageIdsExhausted` once the next id would reach the sentinel.
    pub fn allocate(&self) -> Result<PageId> {
        let stride = self.stride;
        let id = self
            .next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                if next == PageId::INVALID.0 {
                    None
                } else {
                    Some(next.checked_add(stride).unwrap_or(PageId::INVALID.0))
                }
            })
            .map_err(|_| Error::PageIdsExhausted)?;

        let page_id = PageId::new(id);
        assert!(
            self.owns(page_id),
            "allocated {} does not map back to instance {}",
            page_id,
            self.index
        );
        Ok(page_id)
    }

    /// Release a page id. Ids are never reused, so this only records the event.
    pub fn deallocate(&self, page_id: PageId) {
        trace!(%page_id, "page id released");
    }

    #[cfg(test)]
    pub(crate) fn exhaust(&self) {
        self.next.store(PageId::INVALID.0, Ordering::Release);
    }

    /// Whether `page_id` belongs to this allocator's id space.
    #[inline]
    pub fn owns(&self, page_id: PageId) -> bool {
        page_id.is_valid() && page_id.shard(self.stride) == self.index
    }
}
