//! In-memory disk, used by tests and embedders that want no file.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::common::config::PAGE_SIZE;
use crate::common::{PageId, Result};
use crate::storage::DiskIo;

/// A [`DiskIo`] that keeps pages in a hash map.
///
/// Counts every transfer so callers can check when the pool actually went to
/// disk.
#[derive(Default)]
pub struct MemoryDisk {
    pages: Mutex<HashMap<PageId, Box<[u8]>>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryDisk {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the last bytes written for `page_id`, if it was ever written.
    pub fn page(&self, page_id: PageId) -> Option<Vec<u8>> {
        self.pages.lock().get(&page_id).map(|bytes| bytes.to_vec())
    }

    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

fn check_len(len: usize) -> Result<()> {
    if len != PAGE_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("buffer of {} bytes, expected {}", len, PAGE_SIZE),
        )
        .into());
    }
    Ok(())
}

impl DiskIo for MemoryDisk {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        check_len(buf.len())?;
        self.reads.fetch_add(1, Ordering::Relaxed);

        match self.pages.lock().get(&page_id) {
            Some(bytes) => buf.copy_from_slice(bytes),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<()> {
        check_len(buf.len())?;
        self.writes.fetch_add(1, Ordering::Relaxed);

        self.pages.lock().insert(page_id, buf.into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;

    #[test]
    fn test_memory_disk_round_trip_and_counters() {
        let disk = MemoryDisk::new();
        assert!(disk.page(PageId::new(3)).is_none());

        let mut out = vec![0xFFu8; PAGE_SIZE];
        disk.read_page(PageId::new(3), &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));

        disk.write_page(PageId::new(3), &vec![7u8; PAGE_SIZE]).unwrap();
        disk.read_page(PageId::new(3), &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 7));

        assert_eq!(disk.read_count(), 2);
        assert_eq!(disk.write_count(), 1);
        assert_eq!(disk.page(PageId::new(3)).unwrap()[0], 7);
    }

    #[test]
    fn test_wrong_sized_buffers_are_rejected() {
        let disk = MemoryDisk::new();

        let err = disk.write_page(PageId::new(1), &[1u8; 100]).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::InvalidInput));
        assert!(disk.page(PageId::new(1)).is_none());

        disk.write_page(PageId::new(1), &vec![2u8; PAGE_SIZE]).unwrap();
        let mut short = vec![0u8; PAGE_SIZE - 1];
        assert!(disk.read_page(PageId::new(1), &mut short).is_err());
        assert!(short.iter().all(|&b| b == 0));

        assert_eq!(disk.read_count(), 0);
        assert_eq!(disk.write_count(), 1);
    }
}
