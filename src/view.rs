//! Bounds-checked access to segment bytes
//!
//! Every offset read out of a segment is untrusted. Decoders turn offsets
//! into bytes only through [`SegmentView::read_at`], which checks the whole
//! `offset..offset + size` range against the mapped length first.

use byteorder::{ByteOrder, NativeEndian};

/// A requested range that does not lie within the segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutOfBounds {
    pub offset: u64,
    pub size: usize,
    pub len: usize,
}

/// Read-only view of a segment of known length
#[derive(Debug, Clone, Copy)]
pub struct SegmentView<'a> {
    bytes: &'a [u8],
}

impl<'a> SegmentView<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// Length of the segment in bytes
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrow `size` bytes starting at `offset`
    #[inline]
    pub fn read_at(&self, offset: u64, size: usize) -> Result<&'a [u8], OutOfBounds> {
        let oob = OutOfBounds {
            offset,
            size,
            len: self.bytes.len(),
        };
        let start = usize::try_from(offset).map_err(|_| oob)?;
        let end = start.checked_add(size).ok_or(oob)?;
        self.bytes.get(start..end).ok_or(oob)
    }

    /// Borrow element `index` of an array of `size`-byte records at `base`
    #[inline]
    pub fn record_at(&self, base: u64, index: usize, size: usize) -> Result<Record<'a>, OutOfBounds> {
        let offset = (index as u64)
            .checked_mul(size as u64)
            .and_then(|rel| rel.checked_add(base))
            .ok_or(OutOfBounds {
                offset: base,
                size,
                len: self.bytes.len(),
            })?;
        self.read_at(offset, size).map(|bytes| Record { offset, bytes })
    }

    /// Whether an array of `count` records of `size` bytes fits at `base`
    pub fn contains_array(&self, base: u64, count: usize, size: usize) -> bool {
        match count.checked_mul(size) {
            Some(total) => self.read_at(base, total).is_ok(),
            None => false,
        }
    }
}

/// A fixed-size record already checked to lie within the segment
///
/// Field reads index into a slice of exactly the record's length, so a
/// field position outside the record is a programming error, not bad input.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    offset: u64,
    bytes: &'a [u8],
}

impl<'a> Record<'a> {
    /// Segment offset of the record
    #[inline(always)]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline(always)]
    pub fn bytes(&self, pos: usize, len: usize) -> &'a [u8] {
        &self.bytes[pos..pos + len]
    }

    #[inline(always)]
    pub fn u32(&self, pos: usize) -> u32 {
        NativeEndian::read_u32(&self.bytes[pos..pos + 4])
    }

    #[inline(always)]
    pub fn i32(&self, pos: usize) -> i32 {
        NativeEndian::read_i32(&self.bytes[pos..pos + 4])
    }

    #[inline(always)]
    pub fn u64(&self, pos: usize) -> u64 {
        NativeEndian::read_u64(&self.bytes[pos..pos + 8])
    }

    #[inline(always)]
    pub fn i64(&self, pos: usize) -> i64 {
        NativeEndian::read_i64(&self.bytes[pos..pos + 8])
    }

    #[inline(always)]
    pub fn f32(&self, pos: usize) -> f32 {
        NativeEndian::read_f32(&self.bytes[pos..pos + 4])
    }

    #[inline(always)]
    pub fn f64(&self, pos: usize) -> f64 {
        NativeEndian::read_f64(&self.bytes[pos..pos + 8])
    }

    /// NUL-terminated text stored inline in `cap` bytes at `pos`
    pub fn text(&self, pos: usize, cap: usize) -> String {
        c_text(self.bytes(pos, cap))
    }
}

/// Text up to the first NUL, never more than `buf.len() - 1` bytes
pub fn c_text(buf: &[u8]) -> String {
    let cap = buf.len().saturating_sub(1);
    let buf = &buf[..cap];
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
