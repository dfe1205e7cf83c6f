//! The raw page buffer.
//!
//! A [`Page`] is opaque to the buffer pool: it only moves the bytes between
//! disk and memory and never interprets them.

#[allow(clippy::module_inception)]
mod page;

pub use page::Page;
