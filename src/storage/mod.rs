//! Storage layer - disk I/O and the page buffer.
//!
//! - [`DiskIo`] - What the buffer pool needs from a disk
//! - [`DiskManager`] - Single-file implementation
//! - [`MemoryDisk`] - In-memory implementation
//! - [`page`] - The raw page buffer

mod disk_manager;
mod memory_disk;
pub mod page;

pub use disk_manager::DiskManager;
pub use memory_disk::MemoryDisk;

use crate::common::{PageId, Result};

/// Page-granular, synchronous disk access.
///
/// Both calls transfer exactly `PAGE_SIZE` bytes. A write is durable when it
/// returns. Reading a page that was never written yields zeros, so sparse id
/// spaces (as produced by sharded allocation) are legal.
///
/// Implementations synchronize internally: the trait takes `&self` so one disk
/// can be shared by every instance of a parallel pool.
pub trait DiskIo: Send + Sync {
    /// Fill `buf` with the contents of `page_id`.
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()>;

    /// Persist `buf` as the contents of `page_id`.
    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<()>;
}
