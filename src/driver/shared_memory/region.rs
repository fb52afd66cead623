// Sat Feb 21 2026 - Alex

use crate::driver::DriverError;
use memmap2::Mmap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Read-only view of the memory file the peer streams into.
pub struct SharedRegion {
    mmap: Mmap,
    path: PathBuf,
}

impl SharedRegion {
    /// Open the region, creating or growing the backing file to `size` bytes.
    pub fn open<P: AsRef<Path>>(path: P, size: usize) -> Result<Self, DriverError> {
        let path = path.as_ref();
        if size == 0 {
            return Err(DriverError::SharedMemory("no ranges to map".to_string()));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| DriverError::SharedMemory(format!("{}: {}", path.display(), e)))?;
        if (file.metadata()?.len() as usize) < size {
            file.set_len(size as u64)?;
        }

        // The peer is the only writer; this side never writes through the mapping.
        let mmap = unsafe { memmap2::MmapOptions::new().len(size).map(&file) }
            .map_err(|e| DriverError::SharedMemory(format!("{}: {}", path.display(), e)))?;

        Ok(Self {
            mmap,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> usize {
        self.mmap.len()
    }

    pub fn read(&self, offset: usize, length: usize) -> Option<Vec<u8>> {
        self.mmap.get(offset..offset.checked_add(length)?).map(|s| s.to_vec())
    }

    pub fn has_content(&self) -> bool {
        self.mmap.iter().any(|&b| b != 0)
    }

    /// Check for non-zero content, retrying `retries` more times `interval` apart.
    pub fn wait_for_content(&self, retries: u32, interval: Duration) -> bool {
        for attempt in 0..=retries {
            if self.has_content() {
                return true;
            }
            if attempt < retries {
                thread::sleep(interval);
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_open_creates_zeroed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region");
        let region = SharedRegion::open(&path, 64).unwrap();
        assert_eq!(region.size(), 64);
        assert!(!region.has_content());
        assert!(!region.wait_for_content(2, Duration::from_millis(1)));
        assert_eq!(fs::metadata(&path).unwrap().len(), 64);
    }

    #[test]
    fn test_reads_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region");
        fs::write(&path, [0u8, 1, 2, 3, 4, 5, 6, 7]).unwrap();

        let region = SharedRegion::open(&path, 8).unwrap();
        assert!(region.has_content());
        assert_eq!(region.read(2, 3), Some(vec![2, 3, 4]));
        assert_eq!(region.read(6, 4), None);
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SharedRegion::open(dir.path().join("region"), 0).is_err());
    }
}
