//! Logical page identifiers.

use std::fmt;

/// Identifies a page in the on-disk page space.
///
/// A page id is stable: it names the data, not the frame that happens to hold
/// it. `u32` gives 2^32 - 1 usable ids, with `u32::MAX` reserved as the
/// sentinel for "no page".
///
/// # Example
/// ```
/// use pagepool::PageId;
///
/// let page_id = PageId::new(42);
/// assert!(page_id.is_valid());
/// assert_eq!(page_id.shard(4), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub u32);

impl PageId {
    /// Sentinel stored in frames that hold no page.
    pub const INVALID: PageId = PageId(u32::MAX);

    #[inline]
    pub fn new(id: u32) -> Self {
        PageId(id)
    }

    /// Check if this page ID is a real page (not the sentinel).
    #[inline]
    pub fn is_valid(&self) -> bool {
        *self != Self::INVALID
    }

    /// Index of the pool instance that owns this page among `num_instances`.
    ///
    /// # Panics
    /// Panics if `num_instances` is 0.
    #[inline]
    pub fn shard(&self, num_instances: u32) -> u32 {
        self.0 % num_instances
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "Page(INVALID)")
        } else {
            write!(f, "Page({})", self.0)
        }
    }
}
