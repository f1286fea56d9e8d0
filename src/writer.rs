//! Segment layout and the writer side of the generation protocol
//!
//! [`SegmentBuilder`] lays out a complete segment image in memory:
//!
//! ```text
//! header | toc | indoms | instances | metrics | values | strings
//! ```
//!
//! [`SegmentWriter`] publishes an image into a mapped file and applies
//! in-place value updates, bracketing every mutation with the generation
//! counters.

use crate::error::{MmvError, Result};
use crate::generation::{Generation, GenerationWriter};
use crate::header::Header;
use crate::indom::{encode_indom, encode_instance};
use crate::layout::{
    self, Flags, MetricType, Semantics, TocKind, CLUSTER_MAX, HEADER_LEN, INDOM_LEN, INDOM_NULL,
    INSTANCE_LEN, METRIC_LEN, MMV_VERSION, STRING_LEN, TOC_LEN, VALUE_LEN,
};
use crate::metric::{encode_metric, MetricFields};
use crate::shm::MmvShm;
use crate::strings::encode_text;
use crate::toc::encode_entry;
use crate::units::Units;
use crate::value::{encode_value, Payload};
use std::io;
use std::path::Path;
use std::ptr::NonNull;
use tracing::{debug, info};

/// An instance domain to lay out
#[derive(Debug, Clone)]
pub struct IndomSpec {
    pub serial: u32,
    /// `(internal id, external name)` pairs
    pub instances: Vec<(i32, String)>,
    pub short_help: Option<String>,
    pub long_help: Option<String>,
}

impl IndomSpec {
    pub fn new<I, S>(serial: u32, instances: I) -> Self
    where
        I: IntoIterator<Item = (i32, S)>,
        S: Into<String>,
    {
        Self {
            serial,
            instances: instances
                .into_iter()
                .map(|(id, name)| (id, name.into()))
                .collect(),
            short_help: None,
            long_help: None,
        }
    }

    pub fn short_help(mut self, text: impl Into<String>) -> Self {
        self.short_help = Some(text.into());
        self
    }

    pub fn long_help(mut self, text: impl Into<String>) -> Self {
        self.long_help = Some(text.into());
        self
    }
}

/// A metric to lay out
#[derive(Debug, Clone)]
pub struct MetricSpec {
    pub name: String,
    pub item: u32,
    pub metric_type: MetricType,
    pub semantics: Semantics,
    pub units: Units,
    pub indom: Option<u32>,
    pub short_help: Option<String>,
    pub long_help: Option<String>,
}

impl MetricSpec {
    pub fn new(name: impl Into<String>, item: u32, metric_type: MetricType, semantics: Semantics) -> Self {
        Self {
            name: name.into(),
            item,
            metric_type,
            semantics,
            units: Units::NONE,
            indom: None,
            short_help: None,
            long_help: None,
        }
    }

    pub fn units(mut self, units: Units) -> Self {
        self.units = units;
        self
    }

    /// Vary the metric over the instance domain with `serial`
    pub fn indom(mut self, serial: u32) -> Self {
        self.indom = Some(serial);
        self
    }

    pub fn short_help(mut self, text: impl Into<String>) -> Self {
        self.short_help = Some(text.into());
        self
    }

    pub fn long_help(mut self, text: impl Into<String>) -> Self {
        self.long_help = Some(text.into());
        self
    }
}

/// Handle to a metric added to a [`SegmentBuilder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricHandle(usize);

#[derive(Debug, Clone)]
struct ValueSpec {
    metric: usize,
    instance: Option<i32>,
    payload: Payload,
}

/// Where a value lives in a laid-out segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueSlot {
    /// Segment offset of the value record
    pub offset: u64,
    pub metric_type: MetricType,
    /// Segment offset of the string record, zero for non-string values
    pub string_offset: u64,
}

/// A laid-out segment
#[derive(Debug, Clone)]
pub struct SegmentImage {
    pub bytes: Vec<u8>,
    /// One slot per value, in the order values were added
    pub values: Vec<ValueSlot>,
}

/// Assembles a segment image from indoms, metrics and values
#[derive(Debug, Clone)]
pub struct SegmentBuilder {
    cluster: u32,
    process: i32,
    flags: Flags,
    generation: u64,
    indoms: Vec<IndomSpec>,
    metrics: Vec<MetricSpec>,
    values: Vec<ValueSpec>,
}

impl SegmentBuilder {
    pub fn new(cluster: u32) -> Self {
        Self {
            cluster,
            process: 0,
            flags: Flags::empty(),
            generation: 1,
            indoms: Vec::new(),
            metrics: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Publishing process id, recorded with [`Flags::PROCESS`]
    pub fn process(&mut self, pid: i32) -> &mut Self {
        self.process = pid;
        self.flags |= Flags::PROCESS;
        self
    }

    pub fn flags(&mut self, flags: Flags) -> &mut Self {
        self.flags |= flags;
        self
    }

    /// Generation written to both counters of the image
    pub fn generation(&mut self, generation: u64) -> &mut Self {
        self.generation = generation;
        self
    }

    pub fn add_indom(&mut self, spec: IndomSpec) -> Result<()> {
        // Either serial would decode as a metric without an indom
        if spec.serial == 0 || spec.serial == INDOM_NULL {
            return Err(MmvError::InvalidIndomSerial(spec.serial));
        }
        if self.find_indom(spec.serial).is_some() {
            return Err(MmvError::DuplicateIndom(spec.serial));
        }
        for (i, &(internal, _)) in spec.instances.iter().enumerate() {
            if spec.instances[..i].iter().any(|&(seen, _)| seen == internal) {
                return Err(MmvError::DuplicateInstance {
                    serial: spec.serial,
                    internal,
                });
            }
        }
        self.indoms.push(spec);
        Ok(())
    }

    pub fn add_metric(&mut self, spec: MetricSpec) -> Result<MetricHandle> {
        if let Some(serial) = spec.indom {
            if self.find_indom(serial).is_none() {
                return Err(MmvError::UnknownIndom(serial));
            }
        }
        self.metrics.push(spec);
        Ok(MetricHandle(self.metrics.len() - 1))
    }

    /// Add a value of `metric`, for instance `instance` (internal id) when
    /// the metric has an instance domain. Returns the value's index.
    pub fn add_value(
        &mut self,
        metric: MetricHandle,
        instance: Option<i32>,
        payload: Payload,
    ) -> Result<usize> {
        let spec = self
            .metrics
            .get(metric.0)
            .ok_or(MmvError::UnknownMetric(metric.0))?;

        if payload.metric_type() != spec.metric_type {
            return Err(MmvError::PayloadTypeMismatch {
                expected: spec.metric_type,
                got: payload.metric_type(),
            });
        }

        match (spec.indom, instance) {
            (Some(serial), Some(internal)) => {
                let known = self
                    .find_indom(serial)
                    .map(|d| d.instances.iter().any(|(id, _)| *id == internal))
                    .unwrap_or(false);
                if !known {
                    return Err(MmvError::UnknownInstance { serial, internal });
                }
            }
            (Some(serial), None) => {
                return Err(MmvError::UnknownInstance {
                    serial,
                    internal: -1,
                })
            }
            (None, Some(internal)) => {
                return Err(MmvError::UnknownInstance {
                    serial: INDOM_NULL,
                    internal,
                })
            }
            (None, None) => {}
        }

        self.values.push(ValueSpec {
            metric: metric.0,
            instance,
            payload,
        });
        Ok(self.values.len() - 1)
    }

    fn find_indom(&self, serial: u32) -> Option<&IndomSpec> {
        self.indoms.iter().find(|d| d.serial == serial)
    }

    /// Lay out the segment
    pub fn build(&self) -> Result<SegmentImage> {
        if self.cluster > CLUSTER_MAX {
            return Err(MmvError::InvalidCluster {
                cluster: self.cluster,
            });
        }

        // String pool: help texts first, then string values
        let mut pool: Vec<&str> = Vec::new();
        let indom_texts: Vec<_> = self
            .indoms
            .iter()
            .map(|d| {
                (
                    intern(&mut pool, d.short_help.as_deref()),
                    intern(&mut pool, d.long_help.as_deref()),
                )
            })
            .collect();
        let metric_texts: Vec<_> = self
            .metrics
            .iter()
            .map(|m| {
                (
                    intern(&mut pool, m.short_help.as_deref()),
                    intern(&mut pool, m.long_help.as_deref()),
                )
            })
            .collect();
        let value_texts: Vec<_> = self
            .values
            .iter()
            .map(|v| match &v.payload {
                Payload::String(s) => intern(&mut pool, Some(s.as_str())),
                _ => None,
            })
            .collect();

        let instance_count: usize = self.indoms.iter().map(|d| d.instances.len()).sum();

        let sections: Vec<(TocKind, usize)> = [
            (TocKind::Indoms, self.indoms.len()),
            (TocKind::Instances, instance_count),
            (TocKind::Metrics, self.metrics.len()),
            (TocKind::Values, self.values.len()),
            (TocKind::Strings, pool.len()),
        ]
        .into_iter()
        .filter(|&(kind, count)| count > 0 || matches!(kind, TocKind::Metrics | TocKind::Values))
        .collect();

        let mut cursor = (HEADER_LEN + sections.len() * TOC_LEN) as u64;
        let mut section_offset = |kind: TocKind| -> u64 {
            let count = sections
                .iter()
                .find(|(k, _)| *k == kind)
                .map(|&(_, c)| c)
                .unwrap_or(0);
            let at = cursor;
            cursor += (count * kind.record_len()) as u64;
            at
        };
        let indoms_at = section_offset(TocKind::Indoms);
        let instances_at = section_offset(TocKind::Instances);
        let metrics_at = section_offset(TocKind::Metrics);
        let values_at = section_offset(TocKind::Values);
        let strings_at = section_offset(TocKind::Strings);
        let total = cursor as usize;

        let string_at = |slot: Option<usize>| -> u64 {
            slot.map(|i| strings_at + (i * STRING_LEN) as u64)
                .unwrap_or(0)
        };

        let mut buf = vec![0u8; total];

        Header {
            version: MMV_VERSION,
            generation: Generation {
                g1: self.generation,
                g2: self.generation,
            },
            toc_count: sections.len() as u32,
            flags: self.flags,
            process: self.process,
            cluster: self.cluster,
        }
        .encode(&mut buf);

        for (i, &(kind, count)) in sections.iter().enumerate() {
            let data_offset = match kind {
                TocKind::Indoms => indoms_at,
                TocKind::Instances => instances_at,
                TocKind::Metrics => metrics_at,
                TocKind::Values => values_at,
                TocKind::Strings => strings_at,
            };
            let at = HEADER_LEN + i * TOC_LEN;
            encode_entry(kind, count, data_offset, &mut buf[at..at + TOC_LEN]);
        }

        // Indoms and their instances, each indom's instances contiguous
        let mut instance_offsets: Vec<(u32, i32, u64)> = Vec::with_capacity(instance_count);
        let mut next_instance = 0usize;
        for (i, indom) in self.indoms.iter().enumerate() {
            let indom_offset = indoms_at + (i * INDOM_LEN) as u64;
            let first = instances_at + (next_instance * INSTANCE_LEN) as u64;
            let (short, long) = indom_texts[i];
            let at = indom_offset as usize;
            encode_indom(
                indom.serial,
                indom.instances.len() as u32,
                if indom.instances.is_empty() { 0 } else { first },
                string_at(short),
                string_at(long),
                &mut buf[at..at + INDOM_LEN],
            );

            for (internal, external) in &indom.instances {
                let offset = instances_at + (next_instance * INSTANCE_LEN) as u64;
                let at = offset as usize;
                encode_instance(indom_offset, *internal, external, &mut buf[at..at + INSTANCE_LEN]);
                instance_offsets.push((indom.serial, *internal, offset));
                next_instance += 1;
            }
        }

        for (i, metric) in self.metrics.iter().enumerate() {
            let (short, long) = metric_texts[i];
            let at = metrics_at as usize + i * METRIC_LEN;
            encode_metric(
                &MetricFields {
                    name: &metric.name,
                    item: metric.item,
                    metric_type: metric.metric_type,
                    semantics: metric.semantics,
                    units: metric.units,
                    indom: metric.indom,
                    short_text: string_at(short),
                    help_text: string_at(long),
                },
                &mut buf[at..at + METRIC_LEN],
            );
        }

        let mut slots = Vec::with_capacity(self.values.len());
        for (i, value) in self.values.iter().enumerate() {
            let metric = &self.metrics[value.metric];
            let metric_offset = metrics_at + (value.metric * METRIC_LEN) as u64;
            let instance_offset = match (metric.indom, value.instance) {
                (Some(serial), Some(internal)) => instance_offsets
                    .iter()
                    .find(|&&(s, id, _)| s == serial && id == internal)
                    .map(|&(_, _, offset)| offset)
                    .ok_or(MmvError::UnknownInstance { serial, internal })?,
                _ => 0,
            };
            let string_offset = string_at(value_texts[i]);
            let offset = values_at + (i * VALUE_LEN) as u64;
            let at = offset as usize;
            encode_value(
                metric_offset,
                instance_offset,
                &value.payload,
                string_offset,
                &mut buf[at..at + VALUE_LEN],
            );
            slots.push(ValueSlot {
                offset,
                metric_type: metric.metric_type,
                string_offset,
            });
        }

        for (i, text) in pool.iter().enumerate() {
            let at = strings_at as usize + i * STRING_LEN;
            encode_text(text, &mut buf[at..at + STRING_LEN]);
        }

        debug!(
            size = total,
            tocs = sections.len(),
            metrics = self.metrics.len(),
            values = self.values.len(),
            strings = pool.len(),
            "Laid out segment"
        );

        Ok(SegmentImage {
            bytes: buf,
            values: slots,
        })
    }
}

/// Append `text` to the string pool, returning its slot
fn intern<'a>(pool: &mut Vec<&'a str>, text: Option<&'a str>) -> Option<usize> {
    text.map(|t| {
        pool.push(t);
        pool.len() - 1
    })
}

/// Single writer of a mapped segment file
pub struct SegmentWriter {
    shm: MmvShm,
    /// Start of the writable mapping owned by `shm`
    base: NonNull<u8>,
    generation: GenerationWriter,
    slots: Vec<ValueSlot>,
}

// SAFETY: SegmentWriter owns its mapping and is the only writer of it
unsafe impl Send for SegmentWriter {}

impl SegmentWriter {
    /// Create the segment file at `path` and publish `builder`'s layout
    pub fn create(path: impl AsRef<Path>, builder: &SegmentBuilder) -> Result<Self> {
        let image = builder.build()?;
        let mut shm = MmvShm::create(path, image.bytes.len())?;
        let base = shm
            .as_bytes_mut()
            .and_then(|bytes| NonNull::new(bytes.as_mut_ptr()))
            .ok_or_else(|| {
                MmvError::Mmap(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "segment mapped read-only",
                ))
            })?;

        // SAFETY: the mapping starts page-aligned and spans at least a header
        let generation = unsafe { GenerationWriter::from_raw(base.as_ptr()) };
        let mut writer = Self {
            shm,
            base,
            generation,
            slots: image.values.clone(),
        };
        writer.publish(&image);

        info!(
            path = %writer.shm.path().display(),
            size = writer.shm.size(),
            values = writer.slots.len(),
            "Published segment"
        );
        Ok(writer)
    }

    /// Copy a full image into the mapping under one generation bump.
    ///
    /// The image must have the mapping's size.
    fn publish(&mut self, image: &SegmentImage) {
        let (bytes, generation) = self.parts();
        let src = &image.bytes;
        generation.update(|| {
            // Everything but the counters themselves
            bytes[..layout::header::G1].copy_from_slice(&src[..layout::header::G1]);
            bytes[layout::header::TOCS..].copy_from_slice(&src[layout::header::TOCS..]);
        });
    }

    /// Replace the payload of value `index` in place
    pub fn set_value(&mut self, index: usize, payload: &Payload) -> Result<()> {
        let slot = *self
            .slots
            .get(index)
            .ok_or(MmvError::ValueIndexOutOfRange {
                index,
                count: self.slots.len(),
            })?;
        if payload.metric_type() != slot.metric_type {
            return Err(MmvError::PayloadTypeMismatch {
                expected: slot.metric_type,
                got: payload.metric_type(),
            });
        }

        let (bytes, generation) = self.parts();
        generation.update(|| {
            if let Payload::String(text) = payload {
                let at = slot.string_offset as usize;
                encode_text(text, &mut bytes[at..at + STRING_LEN]);
            }
            let at = slot.offset as usize;
            payload.encode(slot.string_offset, &mut bytes[at..at + VALUE_LEN]);
        });
        Ok(())
    }

    /// Run `f` over the raw mapping as one generation-bracketed update
    pub fn update_raw<R>(&mut self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        let (bytes, generation) = self.parts();
        generation.update(|| f(bytes))
    }

    /// The mapping as bytes, alongside the counters that guard it
    fn parts(&mut self) -> (&mut [u8], &GenerationWriter) {
        // SAFETY: `base` is the start of the writable mapping `shm` keeps
        // alive for `shm.size()` bytes, and `&mut self` excludes any other
        // slice over it
        let bytes = unsafe { std::slice::from_raw_parts_mut(self.base.as_ptr(), self.shm.size()) };
        (bytes, &self.generation)
    }

    /// Begin a multi-step update; readers see a torn segment until
    /// [`end_update`](Self::end_update)
    pub fn begin_update(&self) -> u64 {
        self.generation.begin()
    }

    pub fn end_update(&self) {
        self.generation.end()
    }

    pub fn generation(&self) -> Generation {
        self.generation.current()
    }

    pub fn path(&self) -> &Path {
        self.shm.path()
    }

    /// Value slots in the order values were added
    pub fn slots(&self) -> &[ValueSlot] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{decode, DecodeOptions};

    #[test]
    fn test_minimal_layout() {
        let mut b = SegmentBuilder::new(1);
        let m = b
            .add_metric(MetricSpec::new("one", 1, MetricType::I32, Semantics::Instant))
            .unwrap();
        b.add_value(m, None, Payload::I32(1)).unwrap();

        let image = b.build().unwrap();
        // header + metrics/values TOC + one metric + one value
        assert_eq!(
            image.bytes.len(),
            HEADER_LEN + 2 * TOC_LEN + METRIC_LEN + VALUE_LEN
        );
        assert_eq!(image.values[0].offset, (HEADER_LEN + 2 * TOC_LEN + METRIC_LEN) as u64);
    }

    #[test]
    fn test_empty_segment_has_two_tocs() {
        let image = SegmentBuilder::new(1).build().unwrap();
        let segment = decode(&image.bytes, DecodeOptions::default()).unwrap();
        assert_eq!(segment.toc.len(), 2);
        assert!(segment.values.is_empty());
    }

    #[test]
    fn test_builder_rejects_bad_references() {
        let mut b = SegmentBuilder::new(1);
        assert!(matches!(
            b.add_metric(MetricSpec::new("m", 1, MetricType::I32, Semantics::Instant).indom(4)),
            Err(MmvError::UnknownIndom(4))
        ));

        b.add_indom(IndomSpec::new(4, [(1, "a")])).unwrap();
        let m = b
            .add_metric(MetricSpec::new("m", 1, MetricType::I32, Semantics::Instant).indom(4))
            .unwrap();
        assert!(matches!(
            b.add_value(m, Some(2), Payload::I32(0)),
            Err(MmvError::UnknownInstance {
                serial: 4,
                internal: 2
            })
        ));
        assert!(matches!(
            b.add_value(m, None, Payload::I32(0)),
            Err(MmvError::UnknownInstance { .. })
        ));
        assert!(matches!(
            b.add_value(m, Some(1), Payload::U32(0)),
            Err(MmvError::PayloadTypeMismatch { .. })
        ));
        assert!(b.add_value(m, Some(1), Payload::I32(0)).is_ok());
    }

    #[test]
    fn test_builder_rejects_bad_indoms() {
        let mut b = SegmentBuilder::new(1);
        assert!(matches!(
            b.add_indom(IndomSpec::new(0, [(1, "a")])),
            Err(MmvError::InvalidIndomSerial(0))
        ));
        assert!(matches!(
            b.add_indom(IndomSpec::new(INDOM_NULL, [(1, "a")])),
            Err(MmvError::InvalidIndomSerial(INDOM_NULL))
        ));
        assert!(matches!(
            b.add_indom(IndomSpec::new(2, [(1, "a"), (3, "c"), (1, "b")])),
            Err(MmvError::DuplicateInstance {
                serial: 2,
                internal: 1
            })
        ));

        b.add_indom(IndomSpec::new(2, [(1, "a")])).unwrap();
        assert!(matches!(
            b.add_indom(IndomSpec::new(2, [(5, "e")])),
            Err(MmvError::DuplicateIndom(2))
        ));

        let image = b.build().unwrap();
        let segment = decode(&image.bytes, DecodeOptions::default()).unwrap();
        assert_eq!(segment.indoms.len(), 1);
        assert_eq!(segment.instances.len(), 1);
    }

    #[test]
    fn test_builder_rejects_oversized_cluster() {
        assert!(SegmentBuilder::new(CLUSTER_MAX).build().is_ok());
        assert!(matches!(
            SegmentBuilder::new(CLUSTER_MAX + 1).build(),
            Err(MmvError::InvalidCluster { cluster }) if cluster == CLUSTER_MAX + 1
        ));
    }

    #[test]
    fn test_writer_publish_and_update() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mmv").join("app");

        let mut b = SegmentBuilder::new(3);
        b.process(1234);
        let hits = b
            .add_metric(MetricSpec::new("hits", 1, MetricType::U64, Semantics::Counter))
            .unwrap();
        let state = b
            .add_metric(MetricSpec::new("state", 2, MetricType::String, Semantics::Discrete))
            .unwrap();
        b.add_value(hits, None, Payload::U64(0)).unwrap();
        b.add_value(state, None, Payload::String("starting".into()))
            .unwrap();

        let mut writer = SegmentWriter::create(&path, &b).unwrap();
        let published = writer.generation();
        assert!(published.is_consistent());

        writer.set_value(0, &Payload::U64(99)).unwrap();
        writer
            .set_value(1, &Payload::String("running".into()))
            .unwrap();
        assert_eq!(writer.generation().g1, published.g1 + 2);

        let bytes = std::fs::read(&path).unwrap();
        let segment = decode(&bytes, DecodeOptions::default()).unwrap();
        assert_eq!(segment.header.unwrap().process, 1234);
        assert_eq!(segment.value("hits", None).unwrap().payload, Payload::U64(99));
        assert_eq!(
            segment.value("state", None).unwrap().payload,
            Payload::String("running".into())
        );

        assert!(matches!(
            writer.set_value(0, &Payload::I32(1)),
            Err(MmvError::PayloadTypeMismatch { .. })
        ));
        assert!(matches!(
            writer.set_value(5, &Payload::U64(1)),
            Err(MmvError::ValueIndexOutOfRange { index: 5, count: 2 })
        ));
    }

    #[test]
    fn test_open_update_is_torn() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torn");

        let writer = SegmentWriter::create(&path, &SegmentBuilder::new(1)).unwrap();
        writer.begin_update();

        let bytes = std::fs::read(&path).unwrap();
        let err = decode(&bytes, DecodeOptions::default()).unwrap_err();
        assert!(err.is_transient());

        writer.end_update();
        let bytes = std::fs::read(&path).unwrap();
        assert!(decode(&bytes, DecodeOptions::default()).is_ok());
    }

    #[test]
    fn test_update_raw_spans_mapping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw");

        let mut b = SegmentBuilder::new(1);
        let m = b
            .add_metric(MetricSpec::new("m", 1, MetricType::I32, Semantics::Instant))
            .unwrap();
        b.add_value(m, None, Payload::I32(1)).unwrap();
        let image = b.build().unwrap();

        let mut writer = SegmentWriter::create(&path, &b).unwrap();
        let before = writer.generation();
        let at = image.values[0].offset as usize;
        let len = writer.update_raw(|bytes| {
            Payload::I32(-5).encode(0, &mut bytes[at..at + VALUE_LEN]);
            bytes.len()
        });
        assert_eq!(len, image.bytes.len());
        assert_eq!(writer.generation().g1, before.g1 + 2);

        let bytes = std::fs::read(&path).unwrap();
        let segment = decode(&bytes, DecodeOptions::default()).unwrap();
        assert_eq!(segment.value("m", None).unwrap().payload, Payload::I32(-5));
    }
}
