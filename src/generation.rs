//! Generation counters - torn-write detection for Single Writer Multiple Readers
//!
//! The header carries two counters, `g1` and `g2`. The writer bumps `g1`
//! before touching the segment and copies it into `g2` when done, so a
//! segment is consistent exactly when both are equal. Readers never block:
//! they sample the pair around a decode and discard the result if the
//! pair moved or was unequal.

use crate::layout;
use std::sync::atomic::{AtomicU64, Ordering};

/// A sampled pair of generation counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Generation {
    pub g1: u64,
    pub g2: u64,
}

impl Generation {
    /// No write was in progress when the pair was sampled
    #[inline(always)]
    pub fn is_consistent(&self) -> bool {
        self.g1 == self.g2
    }
}

#[inline(always)]
unsafe fn counter<'a>(base: *const u8, pos: usize) -> &'a AtomicU64 {
    &*(base.add(pos) as *const AtomicU64)
}

/// Sample both counters of the header at `base`
///
/// # Safety
/// `base` must point to at least [`HEADER_LEN`](crate::layout::HEADER_LEN) readable bytes, aligned to 8
/// bytes (a mapping start always is).
#[inline]
pub unsafe fn load_generation(base: *const u8) -> Generation {
    // g1 first: a reader that sees g1 == g2 here and again after decoding
    // saw no writer bump in between.
    let g1 = counter(base, layout::header::G1).load(Ordering::Acquire);
    let g2 = counter(base, layout::header::G2).load(Ordering::Acquire);
    Generation { g1, g2 }
}

/// Writer-side generation operations
pub struct GenerationWriter {
    header: *mut u8,
}

// SAFETY: GenerationWriter only used by the single writer
unsafe impl Send for GenerationWriter {}

impl GenerationWriter {
    /// Create a writer for the header at `header`
    ///
    /// # Safety
    /// - `header` must point to [`HEADER_LEN`](crate::layout::HEADER_LEN) writable bytes aligned to 8
    /// - Only one GenerationWriter should exist per segment
    pub unsafe fn from_raw(header: *mut u8) -> Self {
        debug_assert!(header as usize % 8 == 0);
        Self { header }
    }

    /// Current counters as seen by the writer
    #[inline]
    pub fn current(&self) -> Generation {
        unsafe { load_generation(self.header) }
    }

    /// Mark the segment as being modified
    ///
    /// Sets `g1 = g2 + 1`; readers sampling from now on see a torn pair.
    #[inline]
    pub fn begin(&self) -> u64 {
        let (g1, g2) = unsafe {
            (
                counter(self.header, layout::header::G1),
                counter(self.header, layout::header::G2),
            )
        };
        let next = g2.load(Ordering::Relaxed).wrapping_add(1);
        g1.store(next, Ordering::Release);
        // Keep segment writes from moving above the g1 bump
        std::sync::atomic::fence(Ordering::Release);
        next
    }

    /// Mark the modification complete by publishing `g2 = g1`
    #[inline]
    pub fn end(&self) {
        let (g1, g2) = unsafe {
            (
                counter(self.header, layout::header::G1),
                counter(self.header, layout::header::G2),
            )
        };
        std::sync::atomic::fence(Ordering::Release);
        g2.store(g1.load(Ordering::Relaxed), Ordering::Release);
    }

    /// Run `f` bracketed by [`begin`](Self::begin) and [`end`](Self::end)
    #[inline]
    pub fn update<R>(&self, f: impl FnOnce() -> R) -> R {
        self.begin();
        let result = f();
        self.end();
        result
    }
}
