//! mmv_memory - Lock-free memory-mapped metric segments
//!
//! An instrumented application publishes its metrics into a segment file
//! that monitoring agents map and read concurrently, with no sockets, locks
//! or collector process on the critical path.
//!
//! # Architecture
//!
//! - **Single Writer (application)**: lays out the segment and updates values
//!   in place, bracketing each update with the header's generation counters
//! - **Multiple Readers (agents)**: map the segment read-only and decode it
//!   through bounds-checked offsets, discarding snapshots taken mid-update
//!
//! # Layout
//!
//! ```text
//! header | toc | indoms | instances | metrics | values | strings
//! ```
//!
//! Every cross-reference is a byte offset from the start of the segment.

pub mod error;
pub mod layout;
pub mod view;
pub mod units;
pub mod generation;
pub mod header;
pub mod toc;
pub mod strings;
pub mod indom;
pub mod metric;
pub mod value;
pub mod decoder;
pub mod dump;
pub mod shm;
pub mod config;
pub mod reader;
pub mod writer;

pub use error::{MmvError, Result};
pub use config::{default_segment_path, ReaderConfig, RetryPolicy};
pub use decoder::{decode, DecodeOptions, DecodePolicy, DecodeState, Decoder, Segment};
pub use layout::{Flags, MetricType, Semantics, TocKind};
pub use reader::SegmentReader;
pub use units::Units;
pub use value::{Clock, Payload};
pub use writer::{IndomSpec, MetricSpec, SegmentBuilder, SegmentWriter};
