//! Metric descriptors

use crate::error::{MmvError, Result};
use crate::layout::{self, MetricType, Semantics, TocKind, INDOM_NULL, METRIC_LEN, NAME_MAX};
use crate::strings::{encode_text, resolve_text};
use crate::units::Units;
use crate::view::{Record, SegmentView};
use byteorder::{ByteOrder, NativeEndian};

/// A decoded metric descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    /// Segment offset of the record
    pub offset: u64,
    pub name: String,
    /// Item id, unique within the segment's cluster
    pub item: u32,
    /// Declared type, `None` for a tag this crate does not know
    pub metric_type: Option<MetricType>,
    /// Type tag as stored
    pub raw_type: i32,
    pub semantics: Semantics,
    pub units: Units,
    /// Serial of the instance domain, `None` for single-valued metrics
    pub indom: Option<u32>,
    pub padding: u32,
    pub short_text: Option<String>,
    pub help_text: Option<String>,
}

impl Metric {
    /// Decode metric `index` of the section at `base`, with its help texts
    pub fn decode(view: &SegmentView<'_>, base: u64, index: usize) -> Result<Self> {
        let rec = view
            .record_at(base, index, METRIC_LEN)
            .map_err(|_| MmvError::TruncatedSection {
                kind: TocKind::Metrics,
                index,
            })?;

        let mut metric = Self::from_record(rec);
        metric.short_text = resolve_text(
            view,
            rec.u64(layout::metric::SHORTTEXT),
            TocKind::Metrics,
            index,
            "shorttext",
        )?;
        metric.help_text = resolve_text(
            view,
            rec.u64(layout::metric::HELPTEXT),
            TocKind::Metrics,
            index,
            "helptext",
        )?;
        Ok(metric)
    }

    /// Decode the fixed fields of a metric record; help texts are left unset.
    ///
    /// An unknown type tag is kept: only values of such a metric fail.
    pub(crate) fn from_record(rec: Record<'_>) -> Self {
        let raw_type = rec.i32(layout::metric::TYPE);

        let indom = match rec.u32(layout::metric::INDOM) {
            0 | INDOM_NULL => None,
            serial => Some(serial),
        };

        Self {
            offset: rec.offset(),
            name: rec.text(layout::metric::NAME, NAME_MAX),
            item: rec.u32(layout::metric::ITEM),
            metric_type: MetricType::from_raw(raw_type),
            raw_type,
            semantics: Semantics::from_raw(rec.i32(layout::metric::SEMANTICS)),
            units: Units::from_raw(rec.u32(layout::metric::UNITS)),
            indom,
            padding: rec.u32(layout::metric::PADDING),
            short_text: None,
            help_text: None,
        }
    }

    /// The declared type, or `TypeMismatch` for an unknown tag
    pub fn checked_type(&self) -> Result<MetricType> {
        self.metric_type.ok_or(MmvError::TypeMismatch {
            metric_item: self.item,
            raw: self.raw_type,
        })
    }
}

/// Fields of a metric record as laid out by a writer
#[derive(Debug, Clone, Copy)]
pub struct MetricFields<'a> {
    pub name: &'a str,
    pub item: u32,
    pub metric_type: MetricType,
    pub semantics: Semantics,
    pub units: Units,
    pub indom: Option<u32>,
    pub short_text: u64,
    pub help_text: u64,
}

/// Encode a metric record into `buf`
pub fn encode_metric(fields: &MetricFields<'_>, buf: &mut [u8]) {
    encode_text(
        fields.name,
        &mut buf[layout::metric::NAME..layout::metric::NAME + NAME_MAX],
    );
    NativeEndian::write_u32(&mut buf[layout::metric::ITEM..], fields.item);
    NativeEndian::write_i32(&mut buf[layout::metric::TYPE..], fields.metric_type.raw());
    NativeEndian::write_i32(&mut buf[layout::metric::SEMANTICS..], fields.semantics.raw());
    NativeEndian::write_u32(&mut buf[layout::metric::UNITS..], fields.units.raw());
    NativeEndian::write_u32(
        &mut buf[layout::metric::INDOM..],
        fields.indom.unwrap_or(INDOM_NULL),
    );
    NativeEndian::write_u32(&mut buf[layout::metric::PADDING..], 0);
    NativeEndian::write_u64(&mut buf[layout::metric::SHORTTEXT..], fields.short_text);
    NativeEndian::write_u64(&mut buf[layout::metric::HELPTEXT..], fields.help_text);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(name: &str) -> MetricFields<'_> {
        MetricFields {
            name,
            item: 12,
            metric_type: MetricType::U64,
            semantics: Semantics::Counter,
            units: Units::count(),
            indom: None,
            short_text: 0,
            help_text: 0,
        }
    }

    #[test]
    fn test_decode_metric() {
        let mut buf = vec![0u8; METRIC_LEN];
        encode_metric(&fields("requests.total"), &mut buf);

        let metric = Metric::decode(&SegmentView::new(&buf), 0, 0).unwrap();
        assert_eq!(metric.name, "requests.total");
        assert_eq!(metric.item, 12);
        assert_eq!(metric.metric_type, Some(MetricType::U64));
        assert_eq!(metric.raw_type, 3);
        assert_eq!(metric.semantics, Semantics::Counter);
        assert_eq!(metric.units, Units::count());
        assert_eq!(metric.indom, None);
    }

    #[test]
    fn test_indom_sentinels() {
        let mut buf = vec![0u8; METRIC_LEN];
        let mut f = fields("m");
        f.indom = Some(3);
        encode_metric(&f, &mut buf);
        let view = SegmentView::new(&buf);
        assert_eq!(Metric::decode(&view, 0, 0).unwrap().indom, Some(3));

        NativeEndian::write_u32(&mut buf[layout::metric::INDOM..], 0);
        let view = SegmentView::new(&buf);
        assert_eq!(Metric::decode(&view, 0, 0).unwrap().indom, None);
    }

    #[test]
    fn test_long_name_truncated() {
        let mut buf = vec![0u8; METRIC_LEN];
        let long = "n".repeat(100);
        encode_metric(&fields(&long), &mut buf);
        let metric = Metric::decode(&SegmentView::new(&buf), 0, 0).unwrap();
        assert_eq!(metric.name.len(), NAME_MAX - 1);
    }

    #[test]
    fn test_unknown_type_kept() {
        let mut buf = vec![0u8; METRIC_LEN];
        encode_metric(&fields("m"), &mut buf);
        NativeEndian::write_i32(&mut buf[layout::metric::TYPE..], 7);
        let metric = Metric::decode(&SegmentView::new(&buf), 0, 0).unwrap();
        assert_eq!(metric.metric_type, None);
        assert_eq!(metric.raw_type, 7);
        assert_eq!(metric.name, "m");
        assert!(matches!(
            metric.checked_type(),
            Err(MmvError::TypeMismatch { metric_item: 12, raw: 7 })
        ));
    }

    #[test]
    fn test_unknown_semantics_kept() {
        let mut buf = vec![0u8; METRIC_LEN];
        encode_metric(&fields("m"), &mut buf);
        NativeEndian::write_i32(&mut buf[layout::metric::SEMANTICS..], 42);
        let metric = Metric::decode(&SegmentView::new(&buf), 0, 0).unwrap();
        assert_eq!(metric.semantics, Semantics::Unknown(42));
    }

    #[test]
    fn test_truncated() {
        let buf = vec![0u8; METRIC_LEN * 2 - 1];
        let err = Metric::decode(&SegmentView::new(&buf), 0, 1).unwrap_err();
        assert!(matches!(
            err,
            MmvError::TruncatedSection {
                kind: TocKind::Metrics,
                index: 1
            }
        ));
    }
}
