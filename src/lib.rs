//! pagepool - a buffer pool manager with LRU replacement and page-id sharding.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         pagepool                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │       ParallelBufferPool (buffer/)  [optional router]    │   │
//! │  │            page_id % m  ──▶  instance k                  │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              BufferPoolManager (buffer/)                 │   │
//! │  │   page table + free list + frames + PageIdAllocator      │   │
//! │  │   ┌─────────────────────────────────────────────────┐   │   │
//! │  │   │        Replacer: LruReplacer (unpin order)       │   │   │
//! │  │   └─────────────────────────────────────────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │        DiskIo: DiskManager | MemoryDisk, Page            │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, FrameId, Error, config)
//! - [`buffer`] - Buffer pool management and eviction policies
//! - [`storage`] - Disk I/O and the page buffer
//!
//! # Quick Start
//! ```no_run
//! use pagepool::{BufferPoolManager, DiskManager};
//!
//! let dm = DiskManager::open_or_create("my_database.db").unwrap();
//! let bpm = BufferPoolManager::new(64, dm);
//!
//! let mut guard = bpm.new_page_guarded().unwrap();
//! guard.as_mut_slice()[0] = 0xAB;
//! drop(guard);
//!
//! bpm.flush_all_pages().unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod storage;

pub use common::config::PAGE_SIZE;
pub use common::{BufferPoolConfig, Error, FrameId, PageId, Result};

pub use buffer::replacer::{LruReplacer, Replacer};
pub use buffer::{
    BufferPoolManager, BufferPoolStats, Frame, FrameHandle, PageReadGuard, PageWriteGuard,
    ParallelBufferPool, StatsSnapshot,
};
pub use storage::page::Page;
pub use storage::{DiskIo, DiskManager, MemoryDisk};
