//! Table of contents: section kinds, element counts and offsets

use crate::error::{MmvError, Result};
use crate::header::Header;
use crate::layout::{self, TocKind, HEADER_LEN, TOC_LEN};
use crate::view::SegmentView;
use byteorder::{ByteOrder, NativeEndian};

/// One validated TOC entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocEntry {
    /// Position in the table
    pub index: usize,
    /// Segment offset of the entry itself
    pub offset: u64,
    pub kind: TocKind,
    /// Number of elements in the section
    pub count: usize,
    /// Segment offset of the first element
    pub data_offset: u64,
}

/// Decode and validate every TOC entry declared by `header`.
///
/// The table is rejected as a whole on the first unknown kind, duplicate
/// kind or negative count: no section is decoded from a table that could
/// not be fully understood.
pub fn decode_toc(view: &SegmentView<'_>, header: &Header) -> Result<Vec<TocEntry>> {
    let count = header.toc_count as usize;
    if !view.contains_array(HEADER_LEN as u64, count, TOC_LEN) {
        return Err(MmvError::TruncatedToc {
            count: header.toc_count,
        });
    }

    let mut seen: Vec<TocKind> = Vec::with_capacity(TocKind::ALL.len());
    let mut entries = Vec::with_capacity(count);

    for index in 0..count {
        let rec = view
            .record_at(HEADER_LEN as u64, index, TOC_LEN)
            .map_err(|_| MmvError::TruncatedToc {
                count: header.toc_count,
            })?;

        let raw = rec.i32(layout::toc::KIND);
        let kind = TocKind::from_raw(raw).ok_or(MmvError::UnknownTocKind { index, raw })?;
        if seen.contains(&kind) {
            return Err(MmvError::DuplicateTocKind { index, kind });
        }
        seen.push(kind);

        let elements = rec.i32(layout::toc::COUNT);
        if elements < 0 {
            return Err(MmvError::InvalidCount {
                index,
                kind,
                count: elements,
            });
        }

        entries.push(TocEntry {
            index,
            offset: rec.offset(),
            kind,
            count: elements as usize,
            data_offset: rec.u64(layout::toc::OFFSET),
        });
    }

    Ok(entries)
}

/// Encode a TOC entry into `buf`
pub fn encode_entry(kind: TocKind, count: usize, data_offset: u64, buf: &mut [u8]) {
    NativeEndian::write_i32(&mut buf[layout::toc::KIND..], kind.raw());
    NativeEndian::write_i32(&mut buf[layout::toc::COUNT..], count as i32);
    NativeEndian::write_u64(&mut buf[layout::toc::OFFSET..], data_offset);
}
