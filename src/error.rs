//! Error types for MMV segments

use crate::layout::{MetricType, TocKind};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for MMV operations
pub type Result<T> = std::result::Result<T, MmvError>;

/// Errors that can occur while mapping, decoding or writing a segment
#[derive(Debug, Error)]
pub enum MmvError {
    /// Failed to open a segment file
    #[error("Failed to open segment '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to create a segment file
    #[error("Failed to create segment '{}': {source}", path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to map memory
    #[error("Failed to map memory: {0}")]
    Mmap(#[source] io::Error),

    /// Failed to size the segment file
    #[error("Failed to set segment size: {0}")]
    Truncate(#[source] io::Error),

    /// Buffer smaller than a header
    #[error("Bad file size: too small for a header ({len} bytes)")]
    TruncatedHeader { len: usize },

    /// Magic tag is not "MMV"
    #[error("Bad magic: {}", String::from_utf8_lossy(&got[..3]))]
    BadMagic { got: [u8; 4] },

    /// Format version other than the supported one
    #[error("Version {got} not supported")]
    UnsupportedVersion { got: i32 },

    /// Writer was mid-update when the header was sampled
    #[error("Mismatched generation numbers ({g1}/{g2})")]
    TornGeneration { g1: u64, g2: u64 },

    /// Header declares fewer than two TOC entries
    #[error("Bad tocs: invalid table of contents count ({count})")]
    TocCountTooSmall { count: i32 },

    /// Cluster id does not fit the cluster field of a metric id
    #[error("Bad cluster: {cluster} is not a valid cluster ID")]
    InvalidCluster { cluster: u32 },

    /// Buffer too small for the declared TOC entries
    #[error("Bad file size: too small for {count} TOC entries")]
    TruncatedToc { count: u32 },

    /// TOC entry with an unrecognized section kind
    #[error("Unrecognised TOC[{index}] type: 0x{raw:x}")]
    UnknownTocKind { index: usize, raw: i32 },

    /// Second TOC entry for a section kind
    #[error("Duplicate TOC[{index}] entry for {kind} section")]
    DuplicateTocKind { index: usize, kind: TocKind },

    /// TOC entry with a negative element count
    #[error("Bad count for TOC[{index}] {kind} section: {count}")]
    InvalidCount {
        index: usize,
        kind: TocKind,
        count: i32,
    },

    /// Record extends past the end of the segment
    #[error("Bad file size: too small for {kind}[{index}]")]
    TruncatedSection { kind: TocKind, index: usize },

    /// Offset field resolves outside the segment
    #[error("Bad file size: {from}[{index}] {field} offset {offset} out of bounds")]
    DanglingReference {
        from: TocKind,
        index: usize,
        field: &'static str,
        offset: u64,
    },

    /// Metric type tag that no value payload can be decoded as
    #[error("Unknown type {raw} for metric item {metric_item}")]
    TypeMismatch { metric_item: u32, raw: i32 },

    /// ELAPSED value whose correction is not negative
    #[error("Bad ELAPSED 'extra' value {extra} for value[{index}] of metric item {metric_item}")]
    InvalidElapsedEncoding {
        index: usize,
        metric_item: u32,
        extra: i64,
    },

    /// Value instance belongs to a different indom than its metric
    #[error("value[{index}] of metric item {metric_item}: instance indom {got} does not match metric indom {expected}")]
    InstanceDomainMismatch {
        index: usize,
        metric_item: u32,
        expected: u32,
        got: u32,
    },

    /// Value of a metric without an indom that names an instance anyway
    #[error("value[{index}] of metric item {metric_item}: instance offset {offset} set but metric has no instance domain")]
    UnexpectedInstance {
        index: usize,
        metric_item: u32,
        offset: u64,
    },

    /// Indom serial that reads back as "no instance domain"
    #[error("Invalid instance domain serial {0}")]
    InvalidIndomSerial(u32),

    /// Second indom with a serial already added
    #[error("Duplicate instance domain serial {0}")]
    DuplicateIndom(u32),

    /// Internal instance id repeated within one indom
    #[error("Duplicate instance {internal} in instance domain {serial}")]
    DuplicateInstance { serial: u32, internal: i32 },

    /// Builder reference to an indom serial that was never added
    #[error("Unknown instance domain serial {0}")]
    UnknownIndom(u32),

    /// Builder reference to an instance missing from its indom
    #[error("Unknown instance {internal} in instance domain {serial}")]
    UnknownInstance { serial: u32, internal: i32 },

    /// Builder reference to a metric that was never added
    #[error("Unknown metric index {0}")]
    UnknownMetric(usize),

    /// Payload does not match the metric's declared type
    #[error("Payload of type {got} does not match metric type {expected}")]
    PayloadTypeMismatch {
        expected: MetricType,
        got: MetricType,
    },

    /// Writer update for a value slot that does not exist
    #[error("Value index {index} out of range ({count} values)")]
    ValueIndexOutOfRange { index: usize, count: usize },
}

impl MmvError {
    /// Whether a fresh read of the same segment may succeed.
    ///
    /// Only a torn generation is expected to clear up on its own.
    pub fn is_transient(&self) -> bool {
        matches!(self, MmvError::TornGeneration { .. })
    }

    /// Whether the error concerns one record rather than the segment
    /// structure, so a lenient decode may skip past it.
    pub(crate) fn is_per_record(&self) -> bool {
        matches!(
            self,
            MmvError::DanglingReference { .. }
                | MmvError::TypeMismatch { .. }
                | MmvError::InvalidElapsedEncoding { .. }
                | MmvError::InstanceDomainMismatch { .. }
                | MmvError::UnexpectedInstance { .. }
        )
    }
}
