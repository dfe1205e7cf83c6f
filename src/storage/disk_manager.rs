//! Disk Manager - file-backed page storage.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use parking_lot::Mutex;
use tracing::trace;

use crate::common::config::PAGE_SIZE;
use crate::common::{PageId, Result};
use crate::storage::DiskIo;

/// Stores every page of a database in a single file.
///
/// # File Layout
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// │ (4KB)   │ (4KB)   │ (4KB)   │         │ (4KB)   │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0      4096     8192    ...    N×4096
/// ```
///
/// Writing page N past the current end extends the file; pages in between
/// that were never written read back as zeros.
///
/// # Durability
/// Every write is followed by `fsync()`.
pub struct DiskManager {
    inner: Mutex<DiskFile>,
}

struct DiskFile {
    file: File,
    /// Number of page slots covered by the file.
    page_count: u32,
}

impl DiskManager {
    /// Create a new database file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self::from_parts(file, 0))
    }

    /// Open an existing database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;
        let page_count = (file.metadata()?.len() / PAGE_SIZE as u64) as u32;

        Ok(Self::from_parts(file, page_count))
    }

    /// Open an existing database file, or create if it doesn't exist.
    pub fn open_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::open(path)
        } else {
            Self::create(path)
        }
    }

    fn from_parts(file: File, page_count: u32) -> Self {
        Self {
            inner: Mutex::new(DiskFile { file, page_count }),
        }
    }

    /// Number of page slots the file covers (highest written page + 1).
    pub fn page_count(&self) -> u32 {
        self.inner.lock().page_count
    }

    /// Total size of the database file in bytes.
    pub fn file_size(&self) -> u64 {
        (self.page_count() as u64) * (PAGE_SIZE as u64)
    }

    #[inline]
    fn offset(page_id: PageId) -> u64 {
        (page_id.0 as u64) * (PAGE_SIZE as u64)
    }
}

impl DiskIo for DiskManager {
    fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        let mut inner = self.inner.lock();

        if page_id.0 >= inner.page_count {
            trace!(%page_id, "read past end of file, returning zeros");
            buf.fill(0);
            return Ok(());
        }

        inner.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        inner.file.read_exact(buf)?;
        Ok(())
    }

    fn write_page(&self, page_id: PageId, buf: &[u8]) -> Result<()> {
        debug_assert_eq!(buf.len(), PAGE_SIZE);
        let mut inner = self.inner.lock();

        inner.file.seek(SeekFrom::Start(Self::offset(page_id)))?;
        inner.file.write_all(buf)?;
        inner.file.sync_all()?;

        inner.page_count = inner.page_count.max(page_id.0 + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn page_with(byte: u8) -> Vec<u8> {
        vec![byte; PAGE_SIZE]
    }

    #[test]
    fn test_create_new_database() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db")).unwrap();
        assert_eq!(dm.page_count(), 0);
        assert_eq!(dm.file_size(), 0);
    }

    #[test]
    fn test_create_existing_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        DiskManager::create(&path).unwrap();
        assert!(DiskManager::create(&path).is_err());
    }

    #[test]
    fn test_open_nonexistent_fails() {
        let dir = tempdir().unwrap();
        assert!(DiskManager::open(dir.path().join("nonexistent.db")).is_err());
    }

    #[test]
    fn test_write_and_read_page() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db")).unwrap();

        let mut page = page_with(0);
        page[0] = 0xAB;
        page[4095] = 0xEF;
        dm.write_page(PageId::new(0), &page).unwrap();

        let mut out = page_with(0xFF);
        dm.read_page(PageId::new(0), &mut out).unwrap();
        assert_eq!(out, page);
    }

    #[test]
    fn test_read_unwritten_page_is_zeroed() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db")).unwrap();

        let mut out = page_with(0xFF);
        dm.read_page(PageId::new(12), &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sparse_writes_leave_zeroed_holes() {
        let dir = tempdir().unwrap();
        let dm = DiskManager::create(dir.path().join("test.db")).unwrap();

        dm.write_page(PageId::new(5), &page_with(0x55)).unwrap();
        assert_eq!(dm.page_count(), 6);
        assert_eq!(dm.file_size(), 6 * PAGE_SIZE as u64);

        let mut hole = page_with(0xFF);
        dm.read_page(PageId::new(2), &mut hole).unwrap();
        assert!(hole.iter().all(|&b| b == 0));

        let mut out = page_with(0);
        dm.read_page(PageId::new(5), &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0x55));
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let dm = DiskManager::create(&path).unwrap();
            dm.write_page(PageId::new(1), &page_with(0x42)).unwrap();
        }

        {
            let dm = DiskManager::open_or_create(&path).unwrap();
            assert_eq!(dm.page_count(), 2);

            let mut out = page_with(0);
            dm.read_page(PageId::new(1), &mut out).unwrap();
            assert_eq!(out[0], 0x42);
        }
    }
}
