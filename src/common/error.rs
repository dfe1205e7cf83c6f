//! Error types for the buffer pool.

use thiserror::Error;

use crate::common::PageId;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All recoverable errors surfaced by the buffer pool.
///
/// None of these are fatal: callers decide whether to retry, unpin something,
/// or give up. Misconfiguration (bad shard index, zero-sized pool) panics
/// instead, since it can never succeed at runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from the disk collaborator.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No free frame and no eviction candidate: every frame is pinned.
    #[error("buffer pool exhausted: all frames are pinned")]
    PoolExhausted,

    /// The allocator has run out of page ids for this instance.
    #[error("page id space exhausted")]
    PageIdsExhausted,

    /// The sentinel, or an id that belongs to another pool instance.
    #[error("invalid page id: {0}")]
    InvalidPageId(PageId),
}
