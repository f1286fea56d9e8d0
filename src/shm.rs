//! Low-level memory-mapped segment files

use crate::error::{MmvError, Result};
use rustix::fd::OwnedFd;
use rustix::fs::{fstat, ftruncate, open, Mode, OFlags};
use rustix::mm::{mmap, munmap, MapFlags, ProtFlags};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;
use tracing::debug;

/// Handle to a mapped segment file
pub struct MmvShm {
    fd: OwnedFd,
    addr: NonNull<u8>,
    size: usize,
    path: PathBuf,
    is_writable: bool,
}

// SAFETY: MmvShm can be safely shared between threads.
// Readers only read through it; the single writer coordinates through the
// generation counters.
unsafe impl Send for MmvShm {}
unsafe impl Sync for MmvShm {}

unsafe fn map(fd: &OwnedFd, size: usize, prot: ProtFlags) -> Result<NonNull<u8>> {
    // An empty file cannot be mapped; it decodes as a truncated header
    if size == 0 {
        return Ok(NonNull::dangling());
    }
    let addr = mmap(std::ptr::null_mut(), size, prot, MapFlags::SHARED, fd, 0)
        .map_err(|e| MmvError::Mmap(e.into()))?;
    NonNull::new(addr.cast::<u8>()).ok_or_else(|| {
        MmvError::Mmap(std::io::Error::new(
            std::io::ErrorKind::Other,
            "mmap returned null",
        ))
    })
}

impl MmvShm {
    /// Create (or replace) a segment file of `size` zeroed bytes and map it
    /// read-write
    ///
    /// # Arguments
    /// * `path` - Location of the segment file; missing parent directories are created
    /// * `size` - Size in bytes
    pub fn create(path: impl AsRef<Path>, size: usize) -> Result<Self> {
        let path = path.as_ref();
        let create_err = |source: std::io::Error| MmvError::Create {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(create_err)?;
        }

        let fd = open(
            path,
            OFlags::CREATE | OFlags::TRUNC | OFlags::RDWR | OFlags::CLOEXEC,
            Mode::RUSR | Mode::WUSR | Mode::RGRP | Mode::ROTH,
        )
        .map_err(|e| create_err(e.into()))?;

        ftruncate(&fd, size as u64).map_err(|e| MmvError::Truncate(e.into()))?;

        let addr = unsafe { map(&fd, size, ProtFlags::READ | ProtFlags::WRITE)? };
        debug!(path = %path.display(), size, "Created segment file");

        Ok(Self {
            fd,
            addr,
            size,
            path: path.to_path_buf(),
            is_writable: true,
        })
    }

    /// Map an existing segment file read-only
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let open_err = |source: std::io::Error| MmvError::Open {
            path: path.to_path_buf(),
            source,
        };

        let fd = open(path, OFlags::RDONLY | OFlags::CLOEXEC, Mode::empty())
            .map_err(|e| open_err(e.into()))?;

        // Get size from file
        let stat = fstat(&fd).map_err(|e| open_err(e.into()))?;
        let size = stat.st_size as usize;

        let addr = unsafe { map(&fd, size, ProtFlags::READ)? };
        debug!(path = %path.display(), size, "Mapped segment file");

        Ok(Self {
            fd,
            addr,
            size,
            path: path.to_path_buf(),
            is_writable: false,
        })
    }

    /// Current size of the file behind the mapping
    pub fn file_size(&self) -> Result<usize> {
        let stat = fstat(&self.fd).map_err(|e| MmvError::Open {
            path: self.path.clone(),
            source: e.into(),
        })?;
        Ok(stat.st_size as usize)
    }

    /// Get raw pointer to the mapping
    #[inline(always)]
    pub fn as_ptr(&self) -> *const u8 {
        self.addr.as_ptr()
    }

    /// The mapped bytes.
    ///
    /// The writer may change them at any time; consistency is established
    /// by sampling the generation counters around the read.
    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.addr.as_ptr(), self.size) }
    }

    /// Mutable view of a read-write mapping
    #[inline]
    pub fn as_bytes_mut(&mut self) -> Option<&mut [u8]> {
        if !self.is_writable {
            return None;
        }
        Some(unsafe { std::slice::from_raw_parts_mut(self.addr.as_ptr(), self.size) })
    }

    /// Get size of the mapping
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Get the path of the segment file
    #[inline(always)]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if this handle was mapped for writing
    #[inline(always)]
    pub fn is_writable(&self) -> bool {
        self.is_writable
    }
}

impl Drop for MmvShm {
    fn drop(&mut self) {
        if self.size > 0 {
            unsafe {
                let _ = munmap(self.addr.as_ptr().cast(), self.size);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mmv").join("test");
        let size = 4096;

        // Create
        let mut shm1 = MmvShm::create(&path, size).unwrap();
        assert!(shm1.is_writable());
        assert_eq!(shm1.size(), size);

        // Write some data
        shm1.as_bytes_mut().unwrap()[0] = 42;

        // Open from another "process"
        let shm2 = MmvShm::open(&path).unwrap();
        assert!(!shm2.is_writable());
        assert_eq!(shm2.size(), size);

        // Read the data
        assert_eq!(shm2.as_bytes()[0], 42);
        assert_eq!(shm2.file_size().unwrap(), size);
    }

    #[test]
    fn test_open_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty");
        std::fs::write(&path, b"").unwrap();

        let mut shm = MmvShm::open(&path).unwrap();
        assert!(shm.as_bytes().is_empty());
        assert!(shm.as_bytes_mut().is_none());
    }

    #[test]
    fn test_open_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = MmvShm::open(dir.path().join("nope")).err().unwrap();
        assert!(matches!(err, MmvError::Open { .. }));
    }
}
