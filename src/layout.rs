//! On-disk layout of an MMV segment
//!
//! Every structure is a fixed-size record at a byte offset from the start
//! of the segment. Integers are native-endian: the writer and the readers
//! of a segment always share one host.

use bitflags::bitflags;
use std::fmt;

/// Magic tag at the start of every segment
pub const MMV_MAGIC: [u8; 4] = *b"MMV\0";
/// The only format version this crate reads and writes
pub const MMV_VERSION: i32 = 1;

/// Size of the segment header
pub const HEADER_LEN: usize = 40;
/// Size of one TOC entry
pub const TOC_LEN: usize = 16;
/// Size of one instance domain record
pub const INDOM_LEN: usize = 32;
/// Size of one instance record
pub const INSTANCE_LEN: usize = 80;
/// Size of one metric descriptor record
pub const METRIC_LEN: usize = 104;
/// Size of one value record
pub const VALUE_LEN: usize = 32;
/// Size of one string record
pub const STRING_LEN: usize = 256;

/// Capacity of inline names (metric names, instance external names)
pub const NAME_MAX: usize = 64;
/// Capacity of a string pool payload
pub const STRING_MAX: usize = STRING_LEN;

/// Header field positions
pub(crate) mod header {
    pub const MAGIC: usize = 0;
    pub const VERSION: usize = 4;
    pub const G1: usize = 8;
    pub const G2: usize = 16;
    pub const TOCS: usize = 24;
    pub const FLAGS: usize = 28;
    pub const PROCESS: usize = 32;
    pub const CLUSTER: usize = 36;
}

/// TOC entry field positions
pub(crate) mod toc {
    pub const KIND: usize = 0;
    pub const COUNT: usize = 4;
    pub const OFFSET: usize = 8;
}

/// Indom record field positions
pub(crate) mod indom {
    pub const SERIAL: usize = 0;
    pub const COUNT: usize = 4;
    pub const INSTANCES: usize = 8;
    pub const SHORTTEXT: usize = 16;
    pub const HELPTEXT: usize = 24;
}

/// Instance record field positions
pub(crate) mod instance {
    pub const INDOM: usize = 0;
    pub const PADDING: usize = 8;
    pub const INTERNAL: usize = 12;
    pub const EXTERNAL: usize = 16;
}

/// Metric record field positions
pub(crate) mod metric {
    pub const NAME: usize = 0;
    pub const ITEM: usize = 64;
    pub const TYPE: usize = 68;
    pub const SEMANTICS: usize = 72;
    pub const UNITS: usize = 76;
    pub const INDOM: usize = 80;
    pub const PADDING: usize = 84;
    pub const SHORTTEXT: usize = 88;
    pub const HELPTEXT: usize = 96;
}

/// Value record field positions
pub(crate) mod value {
    pub const PAYLOAD: usize = 0;
    pub const EXTRA: usize = 8;
    pub const METRIC: usize = 16;
    pub const INSTANCE: usize = 24;
}

/// Indom serial meaning "no instance domain"
pub const INDOM_NULL: u32 = 0xFFFF_FFFF;

/// Largest cluster id (12 bits of a metric id)
pub const CLUSTER_MAX: u32 = (1 << 12) - 1;

/// Section kinds listed in the table of contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TocKind {
    Indoms,
    Instances,
    Metrics,
    Values,
    Strings,
}

impl TocKind {
    /// All kinds in their conventional layout order
    pub const ALL: [TocKind; 5] = [
        TocKind::Indoms,
        TocKind::Instances,
        TocKind::Metrics,
        TocKind::Values,
        TocKind::Strings,
    ];

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(TocKind::Indoms),
            2 => Some(TocKind::Instances),
            3 => Some(TocKind::Metrics),
            4 => Some(TocKind::Values),
            5 => Some(TocKind::Strings),
            _ => None,
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            TocKind::Indoms => 1,
            TocKind::Instances => 2,
            TocKind::Metrics => 3,
            TocKind::Values => 4,
            TocKind::Strings => 5,
        }
    }

    /// Size of one element of this section
    pub fn record_len(self) -> usize {
        match self {
            TocKind::Indoms => INDOM_LEN,
            TocKind::Instances => INSTANCE_LEN,
            TocKind::Metrics => METRIC_LEN,
            TocKind::Values => VALUE_LEN,
            TocKind::Strings => STRING_LEN,
        }
    }
}

impl fmt::Display for TocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TocKind::Indoms => "indoms",
            TocKind::Instances => "instances",
            TocKind::Metrics => "metrics",
            TocKind::Values => "values",
            TocKind::Strings => "strings",
        })
    }
}

/// Declared type of a metric's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricType {
    I32,
    U32,
    I64,
    U64,
    Float,
    Double,
    String,
    /// Microsecond timer; see [`crate::value::Payload::Elapsed`]
    Elapsed,
}

impl MetricType {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(MetricType::I32),
            1 => Some(MetricType::U32),
            2 => Some(MetricType::I64),
            3 => Some(MetricType::U64),
            4 => Some(MetricType::Float),
            5 => Some(MetricType::Double),
            6 => Some(MetricType::String),
            9 => Some(MetricType::Elapsed),
            _ => None,
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            MetricType::I32 => 0,
            MetricType::U32 => 1,
            MetricType::I64 => 2,
            MetricType::U64 => 3,
            MetricType::Float => 4,
            MetricType::Double => 5,
            MetricType::String => 6,
            MetricType::Elapsed => 9,
        }
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MetricType::I32 => "32-bit int",
            MetricType::U32 => "32-bit unsigned int",
            MetricType::I64 => "64-bit int",
            MetricType::U64 => "64-bit unsigned int",
            MetricType::Float => "float",
            MetricType::Double => "double",
            MetricType::String => "string",
            MetricType::Elapsed => "elapsed",
        })
    }
}

/// How successive samples of a metric relate to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Semantics {
    /// Monotonically non-decreasing
    Counter,
    /// Point-in-time
    Instant,
    /// Enumerated state
    Discrete,
    /// Tag this crate does not recognize, kept as found
    Unknown(i32),
}

impl Semantics {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => Semantics::Counter,
            3 => Semantics::Instant,
            4 => Semantics::Discrete,
            other => Semantics::Unknown(other),
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            Semantics::Counter => 1,
            Semantics::Instant => 3,
            Semantics::Discrete => 4,
            Semantics::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for Semantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Semantics::Counter => "counter",
            Semantics::Instant => "instant",
            Semantics::Discrete => "discrete",
            Semantics::Unknown(_) => "?",
        })
    }
}

bitflags! {
    /// Header flags. Unrecognized bits are retained.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Flags: u32 {
        const NOPREFIX = 0x1;
        const PROCESS = 0x2;
        const SENTINEL = 0x4;
    }
}

impl Flags {
    /// Bits outside the known flag set
    pub fn unknown_bits(self) -> u32 {
        self.bits() & !Flags::all().bits()
    }
}

impl fmt::Display for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }

        let mut parts = Vec::new();
        if self.contains(Flags::NOPREFIX) {
            parts.push("noprefix".to_string());
        }
        if self.contains(Flags::PROCESS) {
            parts.push("process".to_string());
        }
        if self.contains(Flags::SENTINEL) {
            parts.push("sentinel".to_string());
        }
        let unknown = self.unknown_bits();
        if unknown != 0 {
            parts.push(format!("unknown={:x}", unknown));
        }
        f.write_str(&parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toc_kind_raw() {
        for kind in TocKind::ALL {
            assert_eq!(TocKind::from_raw(kind.raw()), Some(kind));
        }
        assert_eq!(TocKind::from_raw(0), None);
        assert_eq!(TocKind::from_raw(6), None);
    }

    #[test]
    fn test_metric_type_gap() {
        // 7 and 8 are unused tags
        assert_eq!(MetricType::from_raw(7), None);
        assert_eq!(MetricType::from_raw(8), None);
        assert_eq!(MetricType::from_raw(9), Some(MetricType::Elapsed));
    }

    #[test]
    fn test_flags_display() {
        assert_eq!(Flags::empty().to_string(), "none");
        assert_eq!(
            (Flags::NOPREFIX | Flags::PROCESS).to_string(),
            "noprefix, process"
        );

        let odd = Flags::from_bits_retain(0x4 | 0x30);
        assert_eq!(odd.unknown_bits(), 0x30);
        assert_eq!(odd.to_string(), "sentinel, unknown=30");
    }
}
