//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache between callers and disk. It owns a
//! fixed set of frames, each holding at most one page.
//!
//! # Components
//! - [`BufferPoolManager`] - One pool instance
//! - [`ParallelBufferPool`] - Several instances sharded by page id
//! - [`Frame`] / [`FrameHandle`] - A slot and a pinned view of it
//! - [`PageReadGuard`] / [`PageWriteGuard`] - RAII guards that unpin on drop
//! - [`PageIdAllocator`] - Stride-based page id allocation
//! - [`BufferPoolStats`] - Performance statistics
//! - [`replacer`] - Eviction policy implementations

mod buffer_pool_manager;
mod frame;
mod page_allocator;
mod page_guard;
mod parallel;
pub mod replacer;
mod stats;

pub use buffer_pool_manager::BufferPoolManager;
pub use frame::{Frame, FrameHandle};
pub use page_allocator::PageIdAllocator;
pub use page_guard::{PageReadGuard, PageWriteGuard};
pub use parallel::ParallelBufferPool;
pub use stats::{BufferPoolStats, StatsSnapshot};
