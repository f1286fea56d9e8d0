//! String pool: fixed-capacity NUL-terminated text records
//!
//! Text longer than the record capacity is truncated by the format, never
//! rejected: writers keep `STRING_MAX - 1` bytes plus the terminator and
//! readers never look past the record.

use crate::error::{MmvError, Result};
use crate::layout::{TocKind, STRING_LEN, STRING_MAX};
use crate::view::{c_text, SegmentView};

/// One decoded string record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringRecord {
    /// Segment offset of the record
    pub offset: u64,
    pub text: String,
}

impl StringRecord {
    /// Decode string `index` of the section at `base`
    pub fn decode(view: &SegmentView<'_>, base: u64, index: usize) -> Result<Self> {
        let rec = view
            .record_at(base, index, STRING_LEN)
            .map_err(|_| MmvError::TruncatedSection {
                kind: TocKind::Strings,
                index,
            })?;
        Ok(Self {
            offset: rec.offset(),
            text: rec.text(0, STRING_MAX),
        })
    }
}

/// Resolve an optional text offset held by record `index` of a `from` section.
///
/// Offset zero means no text.
pub fn resolve_text(
    view: &SegmentView<'_>,
    offset: u64,
    from: TocKind,
    index: usize,
    field: &'static str,
) -> Result<Option<String>> {
    if offset == 0 {
        return Ok(None);
    }
    read_string(view, offset, from, index, field).map(Some)
}

/// Read the string record at `offset`, which must lie within the segment
pub fn read_string(
    view: &SegmentView<'_>,
    offset: u64,
    from: TocKind,
    index: usize,
    field: &'static str,
) -> Result<String> {
    let bytes = view
        .read_at(offset, STRING_LEN)
        .map_err(|_| MmvError::DanglingReference {
            from,
            index,
            field,
            offset,
        })?;
    Ok(c_text(bytes))
}

/// Copy `text` into a fixed-capacity field, truncating and NUL-padding
pub fn encode_text(text: &str, field: &mut [u8]) {
    let cap = field.len().saturating_sub(1);
    let src = text.as_bytes();
    let n = src.len().min(cap);
    field[..n].copy_from_slice(&src[..n]);
    field[n..].fill(0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_text_truncated() {
        let long = "x".repeat(STRING_MAX * 2);
        let mut buf = vec![0xAAu8; STRING_LEN];
        encode_text(&long, &mut buf);

        assert_eq!(buf[STRING_MAX - 1], 0);
        let rec = StringRecord::decode(&SegmentView::new(&buf), 0, 0).unwrap();
        assert_eq!(rec.text.len(), STRING_MAX - 1);
        assert!(rec.text.bytes().all(|b| b == b'x'));
    }

    #[test]
    fn test_short_text_padded() {
        let mut buf = vec![0xAAu8; STRING_LEN];
        encode_text("hello", &mut buf);
        assert!(buf[5..].iter().all(|&b| b == 0));
        assert_eq!(c_text(&buf), "hello");
    }

    #[test]
    fn test_unterminated_record_stays_in_bounds() {
        let buf = vec![b'y'; STRING_LEN];
        let rec = StringRecord::decode(&SegmentView::new(&buf), 0, 0).unwrap();
        assert_eq!(rec.text.len(), STRING_MAX - 1);
    }

    #[test]
    fn test_resolve_text() {
        let mut buf = vec![0u8; STRING_LEN * 2];
        encode_text("help", &mut buf[STRING_LEN..]);
        let view = SegmentView::new(&buf);

        assert_eq!(resolve_text(&view, 0, TocKind::Metrics, 0, "helptext").unwrap(), None);
        assert_eq!(
            resolve_text(&view, STRING_LEN as u64, TocKind::Metrics, 0, "helptext").unwrap(),
            Some("help".to_string())
        );

        let err = resolve_text(&view, STRING_LEN as u64 + 1, TocKind::Metrics, 4, "helptext")
            .unwrap_err();
        assert!(matches!(
            err,
            MmvError::DanglingReference {
                from: TocKind::Metrics,
                index: 4,
                field: "helptext",
                ..
            }
        ));
    }

    #[test]
    fn test_truncated_section() {
        let buf = vec![0u8; STRING_LEN + 10];
        let err = StringRecord::decode(&SegmentView::new(&buf), 0, 1).unwrap_err();
        assert!(matches!(
            err,
            MmvError::TruncatedSection {
                kind: TocKind::Strings,
                index: 1
            }
        ));
    }
}
