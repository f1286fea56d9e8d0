//! Segment header: format identification and generation counters

use crate::error::{MmvError, Result};
use crate::generation::Generation;
use crate::layout::{self, Flags, CLUSTER_MAX, HEADER_LEN, MMV_MAGIC, MMV_VERSION};
use crate::view::SegmentView;
use byteorder::{ByteOrder, NativeEndian};

/// Decoded segment header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: i32,
    pub generation: Generation,
    /// Number of TOC entries following the header
    pub toc_count: u32,
    pub flags: Flags,
    /// Publishing process id
    pub process: i32,
    pub cluster: u32,
}

impl Header {
    /// Validate and decode the header at the start of `view`.
    ///
    /// Checks run in a fixed order so that a segment with a bad magic is
    /// never inspected further.
    pub fn decode(view: &SegmentView<'_>) -> Result<Self> {
        let rec = view
            .record_at(0, 0, HEADER_LEN)
            .map_err(|_| MmvError::TruncatedHeader { len: view.len() })?;

        let mut magic = [0u8; 4];
        magic.copy_from_slice(rec.bytes(layout::header::MAGIC, 4));
        if magic[..3] != MMV_MAGIC[..3] {
            return Err(MmvError::BadMagic { got: magic });
        }

        let version = rec.i32(layout::header::VERSION);
        if version != MMV_VERSION {
            return Err(MmvError::UnsupportedVersion { got: version });
        }

        let generation = Generation {
            g1: rec.u64(layout::header::G1),
            g2: rec.u64(layout::header::G2),
        };
        if !generation.is_consistent() {
            return Err(MmvError::TornGeneration {
                g1: generation.g1,
                g2: generation.g2,
            });
        }

        let tocs = rec.i32(layout::header::TOCS);
        if tocs < 2 {
            return Err(MmvError::TocCountTooSmall { count: tocs });
        }

        let cluster = rec.u32(layout::header::CLUSTER);
        if cluster > CLUSTER_MAX {
            return Err(MmvError::InvalidCluster { cluster });
        }

        Ok(Self {
            version,
            generation,
            toc_count: tocs as u32,
            flags: Flags::from_bits_retain(rec.u32(layout::header::FLAGS)),
            process: rec.i32(layout::header::PROCESS),
            cluster,
        })
    }

    /// Encode into the first [`HEADER_LEN`] bytes of `buf`
    pub fn encode(&self, buf: &mut [u8]) {
        let buf = &mut buf[..HEADER_LEN];
        buf[layout::header::MAGIC..layout::header::MAGIC + 4].copy_from_slice(&MMV_MAGIC);
        NativeEndian::write_i32(&mut buf[layout::header::VERSION..], self.version);
        NativeEndian::write_u64(&mut buf[layout::header::G1..], self.generation.g1);
        NativeEndian::write_u64(&mut buf[layout::header::G2..], self.generation.g2);
        NativeEndian::write_i32(&mut buf[layout::header::TOCS..], self.toc_count as i32);
        NativeEndian::write_u32(&mut buf[layout::header::FLAGS..], self.flags.bits());
        NativeEndian::write_i32(&mut buf[layout::header::PROCESS..], self.process);
        NativeEndian::write_u32(&mut buf[layout::header::CLUSTER..], self.cluster);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Header {
        Header {
            version: MMV_VERSION,
            generation: Generation { g1: 7, g2: 7 },
            toc_count: 2,
            flags: Flags::PROCESS,
            process: 4242,
            cluster: 321,
        }
    }

    fn encoded(header: &Header) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN];
        header.encode(&mut buf);
        buf
    }

    #[test]
    fn test_decode_valid() {
        let buf = encoded(&sample());
        let header = Header::decode(&SegmentView::new(&buf)).unwrap();
        assert_eq!(header, sample());
    }

    #[test]
    fn test_truncated() {
        let buf = encoded(&sample());
        let err = Header::decode(&SegmentView::new(&buf[..HEADER_LEN - 1])).unwrap_err();
        assert!(matches!(err, MmvError::TruncatedHeader { len } if len == HEADER_LEN - 1));
    }

    #[test]
    fn test_bad_magic() {
        let mut buf = encoded(&sample());
        buf[2] = b'X';
        let err = Header::decode(&SegmentView::new(&buf)).unwrap_err();
        assert!(matches!(err, MmvError::BadMagic { got } if &got[..3] == b"MMX"));
    }

    #[test]
    fn test_magic_checked_before_generation() {
        let mut header = sample();
        header.generation.g2 = 3;
        let mut buf = encoded(&header);
        buf[0] = b'X';
        let err = Header::decode(&SegmentView::new(&buf)).unwrap_err();
        assert!(matches!(err, MmvError::BadMagic { .. }));
    }

    #[test]
    fn test_unsupported_version() {
        let mut header = sample();
        header.version = 2;
        let err = Header::decode(&SegmentView::new(&encoded(&header))).unwrap_err();
        assert!(matches!(err, MmvError::UnsupportedVersion { got: 2 }));
    }

    #[test]
    fn test_torn_generation() {
        let mut header = sample();
        header.generation = Generation { g1: 8, g2: 7 };
        let err = Header::decode(&SegmentView::new(&encoded(&header))).unwrap_err();
        assert!(matches!(err, MmvError::TornGeneration { g1: 8, g2: 7 }));
    }

    #[test]
    fn test_toc_count_too_small() {
        let mut header = sample();
        header.toc_count = 1;
        let err = Header::decode(&SegmentView::new(&encoded(&header))).unwrap_err();
        assert!(matches!(err, MmvError::TocCountTooSmall { count: 1 }));
    }

    #[test]
    fn test_invalid_cluster() {
        let mut header = sample();
        header.cluster = CLUSTER_MAX + 1;
        let err = Header::decode(&SegmentView::new(&encoded(&header))).unwrap_err();
        assert!(matches!(err, MmvError::InvalidCluster { .. }));
    }

    #[test]
    fn test_unknown_flags_preserved() {
        let mut header = sample();
        header.flags = Flags::from_bits_retain(0x81);
        let decoded = Header::decode(&SegmentView::new(&encoded(&header))).unwrap();
        assert_eq!(decoded.flags.bits(), 0x81);
        assert_eq!(decoded.flags.unknown_bits(), 0x80);
    }
}
