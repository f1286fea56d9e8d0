//! Single-pass segment decoder
//!
//! Decoding walks forward through a fixed sequence of states:
//!
//! ```text
//! Unopened -> HeaderValidated -> TocValidated -> SectionsDecoded -> Complete
//!     \              \                 \                \
//!      +--------------+-----------------+----------------+--> Rejected
//! ```
//!
//! No state is re-entered. Header and TOC problems always reject the whole
//! segment; what happens on a bad record is governed by [`DecodePolicy`].

use crate::error::{MmvError, Result};
use crate::header::Header;
use crate::indom::{Indom, Instance};
use crate::layout::TocKind;
use crate::metric::Metric;
use crate::strings::StringRecord;
use crate::toc::{decode_toc, TocEntry};
use crate::value::{Clock, Value};
use crate::view::SegmentView;
use tracing::{debug, warn};

/// What to do with a record that fails to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodePolicy {
    /// Reject the segment on the first bad record
    #[default]
    FailFast,
    /// Skip a bad record and keep going. A truncated section is abandoned
    /// from the failing record on. Skipped errors are kept in
    /// [`Segment::skipped`].
    SkipInvalid,
}

/// Decode options
#[derive(Debug, Clone, Copy, Default)]
pub struct DecodeOptions {
    pub policy: DecodePolicy,
    /// Time source for projecting ELAPSED values
    pub clock: Clock,
}

/// Decoder progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    Unopened,
    HeaderValidated,
    TocValidated,
    SectionsDecoded,
    Complete,
    Rejected,
}

/// A decoded, cross-referenced segment
#[derive(Debug, Default)]
pub struct Segment {
    /// Header, once validated
    pub header: Option<Header>,
    /// Table of contents in segment order
    pub toc: Vec<TocEntry>,
    pub indoms: Vec<Indom>,
    pub instances: Vec<Instance>,
    pub metrics: Vec<Metric>,
    pub values: Vec<Value>,
    pub strings: Vec<StringRecord>,
    /// Records left out under [`DecodePolicy::SkipInvalid`]
    pub skipped: Vec<MmvError>,
    /// Number of TOC entries whose section decoding was started, in TOC
    /// order. A section that failed part way counts as reached and keeps the
    /// records decoded before the failure.
    pub sections_reached: usize,
}

impl Segment {
    /// Look up a metric descriptor by name
    pub fn metric(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Look up an instance domain by serial
    pub fn indom(&self, serial: u32) -> Option<&Indom> {
        self.indoms.iter().find(|d| d.serial == serial)
    }

    /// Instances belonging to the indom with `serial`
    pub fn instances_of(&self, serial: u32) -> impl Iterator<Item = &Instance> {
        self.instances
            .iter()
            .filter(move |i| i.indom_serial == serial)
    }

    /// Values of the metric called `name`, in segment order
    pub fn values_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        self.values.iter().filter(move |v| v.metric_name == name)
    }

    /// The value of `name` for the instance whose external name is `instance`,
    /// or the single value of a metric without instances when `instance` is
    /// `None`
    pub fn value(&self, name: &str, instance: Option<&str>) -> Option<&Value> {
        self.values.iter().find(|v| {
            v.metric_name == name && v.instance.as_ref().map(|i| i.external.as_str()) == instance
        })
    }

    /// The TOC entry for a section kind, if the segment has one
    pub fn section(&self, kind: TocKind) -> Option<&TocEntry> {
        self.toc.iter().find(|e| e.kind == kind)
    }

    /// TOC entries whose sections were decoded, fully or in part
    pub fn decoded_toc(&self) -> &[TocEntry] {
        &self.toc[..self.sections_reached.min(self.toc.len())]
    }
}

/// Forward-only decoder over a byte buffer of known length
pub struct Decoder<'a> {
    view: SegmentView<'a>,
    options: DecodeOptions,
    state: DecodeState,
    segment: Segment,
}

impl<'a> Decoder<'a> {
    pub fn new(bytes: &'a [u8], options: DecodeOptions) -> Self {
        Self {
            view: SegmentView::new(bytes),
            options,
            state: DecodeState::Unopened,
            segment: Segment::default(),
        }
    }

    #[inline]
    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// What has been decoded so far, complete or not
    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    pub fn into_segment(self) -> Segment {
        self.segment
    }

    /// Advance by one state.
    ///
    /// Returns the new state. Once `Complete` or `Rejected`, further calls
    /// leave the state unchanged.
    pub fn step(&mut self) -> Result<DecodeState> {
        let result = match self.state {
            DecodeState::Unopened => self.validate_header(),
            DecodeState::HeaderValidated => self.validate_toc(),
            DecodeState::TocValidated => self.decode_sections(),
            DecodeState::SectionsDecoded => Ok(DecodeState::Complete),
            DecodeState::Complete | DecodeState::Rejected => Ok(self.state),
        };

        match result {
            Ok(next) => {
                self.state = next;
                Ok(next)
            }
            Err(e) => {
                self.state = DecodeState::Rejected;
                Err(e)
            }
        }
    }

    /// Step until `Complete` or the first fatal error
    pub fn run(&mut self) -> Result<DecodeState> {
        while !matches!(self.state, DecodeState::Complete | DecodeState::Rejected) {
            self.step()?;
        }
        Ok(self.state)
    }

    fn validate_header(&mut self) -> Result<DecodeState> {
        let header = Header::decode(&self.view)?;
        debug!(
            generation = header.generation.g1,
            tocs = header.toc_count,
            cluster = header.cluster,
            process = header.process,
            "Header validated"
        );
        self.segment.header = Some(header);
        Ok(DecodeState::HeaderValidated)
    }

    fn validate_toc(&mut self) -> Result<DecodeState> {
        let header = match &self.segment.header {
            Some(h) => *h,
            None => return Err(MmvError::TruncatedHeader { len: self.view.len() }),
        };
        self.segment.toc = decode_toc(&self.view, &header)?;
        debug!(entries = self.segment.toc.len(), "TOC validated");
        Ok(DecodeState::TocValidated)
    }

    fn decode_sections(&mut self) -> Result<DecodeState> {
        let now = self.options.clock.now_micros();
        let toc = self.segment.toc.clone();

        for (position, entry) in toc.iter().enumerate() {
            debug!(
                toc = entry.index,
                kind = %entry.kind,
                count = entry.count,
                offset = entry.data_offset,
                "Decoding section"
            );
            self.segment.sections_reached = position + 1;
            let view = self.view;
            let base = entry.data_offset;
            match entry.kind {
                TocKind::Indoms => {
                    self.collect(entry, |s| &mut s.indoms, |i| Indom::decode(&view, base, i))?
                }
                TocKind::Instances => {
                    self.collect(entry, |s| &mut s.instances, |i| Instance::decode(&view, base, i))?
                }
                TocKind::Metrics => {
                    self.collect(entry, |s| &mut s.metrics, |i| Metric::decode(&view, base, i))?
                }
                TocKind::Values => self.collect(
                    entry,
                    |s| &mut s.values,
                    |i| Value::decode(&view, base, i, now),
                )?,
                TocKind::Strings => self.collect(
                    entry,
                    |s| &mut s.strings,
                    |i| StringRecord::decode(&view, base, i),
                )?,
            }
        }

        Ok(DecodeState::SectionsDecoded)
    }

    /// Decode the records of one section into the list `target` selects.
    /// Records decoded before a fatal error stay in the segment.
    fn collect<T>(
        &mut self,
        entry: &TocEntry,
        target: fn(&mut Segment) -> &mut Vec<T>,
        mut decode_one: impl FnMut(usize) -> Result<T>,
    ) -> Result<()> {
        // Never trust the count for preallocation beyond what could fit
        let fits = self.view.len() / entry.kind.record_len();
        target(&mut self.segment).reserve(entry.count.min(fits));

        for index in 0..entry.count {
            match decode_one(index) {
                Ok(record) => target(&mut self.segment).push(record),
                Err(e) if self.options.policy == DecodePolicy::SkipInvalid => {
                    let truncated = matches!(e, MmvError::TruncatedSection { .. });
                    if !truncated && !e.is_per_record() {
                        return Err(e);
                    }
                    warn!(toc = entry.index, kind = %entry.kind, index, error = %e, "Skipping record");
                    self.segment.skipped.push(e);
                    if truncated {
                        break;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }
}

/// Decode a complete segment from `bytes`
pub fn decode(bytes: &[u8], options: DecodeOptions) -> Result<Segment> {
    let mut decoder = Decoder::new(bytes, options);
    decoder.run()?;
    Ok(decoder.into_segment())
}
