//! Instance domains and their instances

use crate::error::{MmvError, Result};
use crate::layout::{self, TocKind, INDOM_LEN, INSTANCE_LEN, NAME_MAX};
use crate::strings::{encode_text, resolve_text};
use crate::view::{Record, SegmentView};
use byteorder::{ByteOrder, NativeEndian};

/// A decoded instance domain record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indom {
    /// Segment offset of the record
    pub offset: u64,
    pub serial: u32,
    /// Number of instances in the domain
    pub count: u32,
    /// Segment offset of the first instance
    pub instances_offset: u64,
    pub short_text: Option<String>,
    pub help_text: Option<String>,
}

impl Indom {
    /// Decode indom `index` of the section at `base`
    pub fn decode(view: &SegmentView<'_>, base: u64, index: usize) -> Result<Self> {
        let rec = view
            .record_at(base, index, INDOM_LEN)
            .map_err(|_| MmvError::TruncatedSection {
                kind: TocKind::Indoms,
                index,
            })?;

        let count = rec.u32(layout::indom::COUNT);
        let instances_offset = rec.u64(layout::indom::INSTANCES);
        if count > 0 && !view.contains_array(instances_offset, count as usize, INSTANCE_LEN) {
            return Err(MmvError::DanglingReference {
                from: TocKind::Indoms,
                index,
                field: "instances",
                offset: instances_offset,
            });
        }

        Ok(Self {
            offset: rec.offset(),
            serial: rec.u32(layout::indom::SERIAL),
            count,
            instances_offset,
            short_text: resolve_text(
                view,
                rec.u64(layout::indom::SHORTTEXT),
                TocKind::Indoms,
                index,
                "shorttext",
            )?,
            help_text: resolve_text(
                view,
                rec.u64(layout::indom::HELPTEXT),
                TocKind::Indoms,
                index,
                "helptext",
            )?,
        })
    }
}

/// A decoded instance record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    /// Segment offset of the record
    pub offset: u64,
    /// Id unique within the owning indom
    pub internal: i32,
    /// Display name
    pub external: String,
    /// Segment offset of the owning indom record
    pub indom_offset: u64,
    /// Serial of the owning indom, read through `indom_offset`
    pub indom_serial: u32,
}

impl Instance {
    /// Decode instance `index` of the section at `base`
    pub fn decode(view: &SegmentView<'_>, base: u64, index: usize) -> Result<Self> {
        let rec = view
            .record_at(base, index, INSTANCE_LEN)
            .map_err(|_| MmvError::TruncatedSection {
                kind: TocKind::Instances,
                index,
            })?;
        Self::from_record(view, rec, TocKind::Instances, index)
    }

    /// Decode an instance record reached from record `index` of a `from`
    /// section, resolving its owning indom.
    pub(crate) fn from_record(
        view: &SegmentView<'_>,
        rec: Record<'_>,
        from: TocKind,
        index: usize,
    ) -> Result<Self> {
        let indom_offset = rec.u64(layout::instance::INDOM);
        let indom = view
            .record_at(indom_offset, 0, INDOM_LEN)
            .map_err(|_| MmvError::DanglingReference {
                from,
                index,
                field: "indom",
                offset: indom_offset,
            })?;

        Ok(Self {
            offset: rec.offset(),
            internal: rec.i32(layout::instance::INTERNAL),
            external: rec.text(layout::instance::EXTERNAL, NAME_MAX),
            indom_offset,
            indom_serial: indom.u32(layout::indom::SERIAL),
        })
    }
}

/// Encode an indom record into `buf`
pub fn encode_indom(
    serial: u32,
    count: u32,
    instances_offset: u64,
    short_text: u64,
    help_text: u64,
    buf: &mut [u8],
) {
    NativeEndian::write_u32(&mut buf[layout::indom::SERIAL..], serial);
    NativeEndian::write_u32(&mut buf[layout::indom::COUNT..], count);
    NativeEndian::write_u64(&mut buf[layout::indom::INSTANCES..], instances_offset);
    NativeEndian::write_u64(&mut buf[layout::indom::SHORTTEXT..], short_text);
    NativeEndian::write_u64(&mut buf[layout::indom::HELPTEXT..], help_text);
}

/// Encode an instance record into `buf`
pub fn encode_instance(indom_offset: u64, internal: i32, external: &str, buf: &mut [u8]) {
    NativeEndian::write_u64(&mut buf[layout::instance::INDOM..], indom_offset);
    NativeEndian::write_u32(&mut buf[layout::instance::PADDING..], 0);
    NativeEndian::write_i32(&mut buf[layout::instance::INTERNAL..], internal);
    encode_text(
        external,
        &mut buf[layout::instance::EXTERNAL..layout::instance::EXTERNAL + NAME_MAX],
    );
}
