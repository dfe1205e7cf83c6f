//! Eviction policy implementations (replacers).
//!
//! A replacer only knows about frames whose pin count is zero. The buffer pool
//! tells it when a frame becomes evictable ([`Replacer::record_unpin`]) or
//! stops being evictable ([`Replacer::record_pin`]), and asks it for a
//! [`Replacer::victim`] when the free list is empty.
//!
//! Currently implements:
//! - [`LruReplacer`] - Least recently unpinned first

mod lru;

pub use lru::LruReplacer;

use crate::common::FrameId;

/// Capability contract for an eviction policy.
///
/// Every method is internally synchronized and finishes in bounded time.
pub trait Replacer: Send + Sync {
    /// Make `frame_id` an eviction candidate at the most-recent end.
    ///
    /// No-op if the frame is already tracked or the replacer is full.
    fn record_unpin(&self, frame_id: FrameId);

    /// Withdraw `frame_id` from candidacy. No-op if it is not tracked.
    fn record_pin(&self, frame_id: FrameId);

    /// Remove and return the oldest candidate, or `None` if there is none.
    fn victim(&self) -> Option<FrameId>;

    /// Number of candidates currently tracked.
    fn size(&self) -> usize;
}
