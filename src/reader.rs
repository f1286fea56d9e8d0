//! Consistent snapshots of a live segment
//!
//! A snapshot samples the generation pair, decodes, and samples again. The
//! decoded model is kept only when both samples are equal and consistent;
//! otherwise the segment is re-mapped if the writer resized it and the read
//! is retried under the configured [`RetryPolicy`](crate::config::RetryPolicy).

use crate::config::ReaderConfig;
use crate::decoder::{decode, Segment};
use crate::error::{MmvError, Result};
use crate::generation::{load_generation, Generation};
use crate::layout::HEADER_LEN;
use crate::shm::MmvShm;
use std::path::Path;
use std::sync::atomic::{fence, Ordering};
use tracing::{debug, warn};

/// Read-only consumer of a segment file
pub struct SegmentReader {
    shm: MmvShm,
    config: ReaderConfig,
}

impl SegmentReader {
    /// Map the segment at `path`
    pub fn open(path: impl AsRef<Path>, config: ReaderConfig) -> Result<Self> {
        let shm = MmvShm::open(path)?;
        Ok(Self { shm, config })
    }

    pub fn path(&self) -> &Path {
        self.shm.path()
    }

    /// The mapped bytes, without any consistency guarantee
    pub fn bytes(&self) -> &[u8] {
        self.shm.as_bytes()
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    fn generation(&self) -> Option<Generation> {
        if self.shm.size() < HEADER_LEN {
            return None;
        }
        // SAFETY: the mapping holds a full header and starts page-aligned
        Some(unsafe { load_generation(self.shm.as_ptr()) })
    }

    /// Decode one consistent snapshot of the segment
    pub fn snapshot(&mut self) -> Result<Segment> {
        let policy = self.config.retry;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match self.try_snapshot() {
                Ok(segment) => return Ok(segment),
                Err(e) if e.is_transient() => e,
                Err(e) => return Err(e),
            };

            if attempt >= policy.max_attempts.max(1) {
                warn!(path = %self.path().display(), attempt, error = %err, "Giving up on torn segment");
                return Err(err);
            }

            let delay = policy.delay(attempt);
            debug!(attempt, ?delay, error = %err, "Segment torn, retrying");
            std::thread::sleep(delay);
            self.remap_if_resized()?;
        }
    }

    fn try_snapshot(&self) -> Result<Segment> {
        let before = match self.generation() {
            Some(g) => g,
            // Too short for a header; let the decoder say so
            None => return decode(self.shm.as_bytes(), self.config.decode),
        };
        if !before.is_consistent() {
            return Err(MmvError::TornGeneration {
                g1: before.g1,
                g2: before.g2,
            });
        }

        let segment = decode(self.shm.as_bytes(), self.config.decode)?;

        // Keep the payload reads above from sinking past the second sample
        fence(Ordering::Acquire);
        let after = self.generation().unwrap_or_default();
        if after != before {
            return Err(MmvError::TornGeneration {
                g1: after.g1,
                g2: after.g2,
            });
        }
        Ok(segment)
    }

    /// Re-map when the writer grew or shrank the file
    fn remap_if_resized(&mut self) -> Result<()> {
        let size = self.shm.file_size()?;
        if size != self.shm.size() {
            debug!(old = self.shm.size(), new = size, "Segment resized, remapping");
            self.shm = MmvShm::open(self.shm.path())?;
        }
        Ok(())
    }
}
