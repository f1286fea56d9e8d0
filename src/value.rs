//! Value records and their typed payloads

use crate::error::{MmvError, Result};
use crate::indom::Instance;
use crate::layout::{self, MetricType, TocKind, INSTANCE_LEN, METRIC_LEN, VALUE_LEN};
use crate::metric::Metric;
use crate::strings::read_string;
use crate::view::{Record, SegmentView};
use byteorder::{ByteOrder, NativeEndian};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A value payload, tagged by the metric type it was decoded as
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    Float(f32),
    Double(f64),
    String(String),
    /// Accumulated microseconds plus the running correction.
    ///
    /// A negative `extra` is minus the wall-clock time (in microseconds
    /// since the epoch) at which the running interval started.
    Elapsed { value: i64, extra: i64 },
}

impl Payload {
    pub fn metric_type(&self) -> MetricType {
        match self {
            Payload::I32(_) => MetricType::I32,
            Payload::U32(_) => MetricType::U32,
            Payload::I64(_) => MetricType::I64,
            Payload::U64(_) => MetricType::U64,
            Payload::Float(_) => MetricType::Float,
            Payload::Double(_) => MetricType::Double,
            Payload::String(_) => MetricType::String,
            Payload::Elapsed { .. } => MetricType::Elapsed,
        }
    }

    /// Write the fixed-width part of the payload into a value record.
    ///
    /// String text lives in the string pool; only the pool offset is
    /// written here, as `extra`.
    pub(crate) fn encode(&self, string_offset: u64, buf: &mut [u8]) {
        let slot = &mut buf[layout::value::PAYLOAD..layout::value::PAYLOAD + 8];
        slot.fill(0);
        let mut extra = 0i64;
        match self {
            Payload::I32(v) => NativeEndian::write_i32(slot, *v),
            Payload::U32(v) => NativeEndian::write_u32(slot, *v),
            Payload::I64(v) => NativeEndian::write_i64(slot, *v),
            Payload::U64(v) => NativeEndian::write_u64(slot, *v),
            Payload::Float(v) => NativeEndian::write_f32(slot, *v),
            Payload::Double(v) => NativeEndian::write_f64(slot, *v),
            Payload::String(_) => extra = string_offset as i64,
            Payload::Elapsed { value, extra: e } => {
                NativeEndian::write_i64(slot, *value);
                extra = *e;
            }
        }
        NativeEndian::write_i64(&mut buf[layout::value::EXTRA..], extra);
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::I32(v) => write!(f, "{}", v),
            Payload::U32(v) => write!(f, "{}", v),
            Payload::I64(v) => write!(f, "{}", v),
            Payload::U64(v) => write!(f, "{}", v),
            Payload::Float(v) => write!(f, "{:.6}", v),
            Payload::Double(v) => write!(f, "{:.6}", v),
            Payload::String(s) => write!(f, "\"{}\"", s),
            Payload::Elapsed { value, .. } => write!(f, "{}", value),
        }
    }
}

/// Source of "now" for projecting running ELAPSED timers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Clock {
    /// Wall-clock time at decode
    #[default]
    System,
    /// A fixed time in microseconds since the epoch
    Fixed(i64),
}

impl Clock {
    /// Current time in microseconds since the epoch
    pub fn now_micros(&self) -> i64 {
        match self {
            Clock::System => SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_micros() as i64)
                .unwrap_or(0),
            Clock::Fixed(micros) => *micros,
        }
    }
}

/// Identity of the instance a value belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRef {
    /// Segment offset of the instance record
    pub offset: u64,
    pub internal: i32,
    pub external: String,
    pub indom_serial: u32,
}

/// A decoded value record with its metric and instance resolved
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    /// Segment offset of the record
    pub offset: u64,
    /// Segment offset of the metric record
    pub metric_offset: u64,
    pub metric_item: u32,
    pub metric_name: String,
    /// Present exactly when the metric has an instance domain
    pub instance: Option<InstanceRef>,
    pub payload: Payload,
    /// For ELAPSED values, the timer projected to the decode time
    pub elapsed: Option<i64>,
}

impl Value {
    /// Decode value `index` of the section at `base`.
    ///
    /// `now` is the decode time in microseconds, used for ELAPSED values.
    pub fn decode(view: &SegmentView<'_>, base: u64, index: usize, now: i64) -> Result<Self> {
        let rec = view
            .record_at(base, index, VALUE_LEN)
            .map_err(|_| MmvError::TruncatedSection {
                kind: TocKind::Values,
                index,
            })?;

        let dangling = |field: &'static str, offset: u64| MmvError::DanglingReference {
            from: TocKind::Values,
            index,
            field,
            offset,
        };

        let metric_offset = rec.u64(layout::value::METRIC);
        let metric_rec = view
            .record_at(metric_offset, 0, METRIC_LEN)
            .map_err(|_| dangling("metric", metric_offset))?;
        let metric = Metric::from_record(metric_rec);
        let metric_type = metric.checked_type()?;

        let instance = match metric.indom {
            Some(serial) => {
                let instance_offset = rec.u64(layout::value::INSTANCE);
                if instance_offset == 0 {
                    return Err(dangling("instance", instance_offset));
                }
                let instance_rec = view
                    .record_at(instance_offset, 0, INSTANCE_LEN)
                    .map_err(|_| dangling("instance", instance_offset))?;
                let instance = Instance::from_record(view, instance_rec, TocKind::Values, index)?;
                if instance.indom_serial != serial {
                    return Err(MmvError::InstanceDomainMismatch {
                        index,
                        metric_item: metric.item,
                        expected: serial,
                        got: instance.indom_serial,
                    });
                }
                Some(InstanceRef {
                    offset: instance.offset,
                    internal: instance.internal,
                    external: instance.external,
                    indom_serial: instance.indom_serial,
                })
            }
            None => {
                let instance_offset = rec.u64(layout::value::INSTANCE);
                if instance_offset != 0 {
                    return Err(MmvError::UnexpectedInstance {
                        index,
                        metric_item: metric.item,
                        offset: instance_offset,
                    });
                }
                None
            }
        };

        let (payload, elapsed) = decode_payload(view, &rec, metric_type, metric.item, index, now)?;

        Ok(Self {
            offset: rec.offset(),
            metric_offset,
            metric_item: metric.item,
            metric_name: metric.name,
            instance,
            payload,
            elapsed,
        })
    }
}

fn decode_payload(
    view: &SegmentView<'_>,
    rec: &Record<'_>,
    metric_type: MetricType,
    metric_item: u32,
    index: usize,
    now: i64,
) -> Result<(Payload, Option<i64>)> {
    let at = layout::value::PAYLOAD;
    let extra = rec.i64(layout::value::EXTRA);

    let payload = match metric_type {
        MetricType::I32 => Payload::I32(rec.i32(at)),
        MetricType::U32 => Payload::U32(rec.u32(at)),
        MetricType::I64 => Payload::I64(rec.i64(at)),
        MetricType::U64 => Payload::U64(rec.u64(at)),
        MetricType::Float => Payload::Float(rec.f32(at)),
        MetricType::Double => Payload::Double(rec.f64(at)),
        MetricType::String => {
            let offset = extra as u64;
            if offset == 0 {
                return Err(MmvError::DanglingReference {
                    from: TocKind::Values,
                    index,
                    field: "extra",
                    offset,
                });
            }
            Payload::String(read_string(view, offset, TocKind::Values, index, "extra")?)
        }
        MetricType::Elapsed => {
            if extra >= 0 {
                return Err(MmvError::InvalidElapsedEncoding {
                    index,
                    metric_item,
                    extra,
                });
            }
            let value = rec.i64(at);
            let projected = value.wrapping_add(now.wrapping_add(extra));
            return Ok((Payload::Elapsed { value, extra }, Some(projected)));
        }
    };

    Ok((payload, None))
}

/// Encode a value record into `buf`
pub fn encode_value(
    metric_offset: u64,
    instance_offset: u64,
    payload: &Payload,
    string_offset: u64,
    buf: &mut [u8],
) {
    payload.encode(string_offset, buf);
    NativeEndian::write_u64(&mut buf[layout::value::METRIC..], metric_offset);
    NativeEndian::write_u64(&mut buf[layout::value::INSTANCE..], instance_offset);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Semantics, STRING_LEN};
    use crate::metric::{encode_metric, MetricFields};
    use crate::strings::encode_text;
    use crate::units::Units;

    // metric at 0, value at 104, string at 136
    fn segment(metric_type: MetricType, payload: &Payload) -> Vec<u8> {
        let mut buf = vec![0u8; METRIC_LEN + VALUE_LEN + STRING_LEN];
        encode_metric(
            &MetricFields {
                name: "m",
                item: 4,
                metric_type,
                semantics: Semantics::Instant,
                units: Units::NONE,
                indom: None,
                short_text: 0,
                help_text: 0,
            },
            &mut buf,
        );
        let string_offset = (METRIC_LEN + VALUE_LEN) as u64;
        if let Payload::String(s) = payload {
            encode_text(s, &mut buf[string_offset as usize..]);
        }
        encode_value(0, 0, payload, string_offset, &mut buf[METRIC_LEN..]);
        buf
    }

    fn decode(buf: &[u8], now: i64) -> Result<Value> {
        Value::decode(&SegmentView::new(buf), METRIC_LEN as u64, 0, now)
    }

    #[test]
    fn test_numeric_payloads() {
        let cases = [
            (MetricType::I32, Payload::I32(-7)),
            (MetricType::U64, Payload::U64(u64::MAX)),
            (MetricType::Double, Payload::Double(2.5)),
        ];
        for (metric_type, payload) in cases {
            let value = decode(&segment(metric_type, &payload), 0).unwrap();
            assert_eq!(value.payload, payload);
            assert_eq!(value.metric_item, 4);
            assert_eq!(value.instance, None);
            assert_eq!(value.elapsed, None);
        }
    }

    #[test]
    fn test_string_payload() {
        let payload = Payload::String("running".to_string());
        let value = decode(&segment(MetricType::String, &payload), 0).unwrap();
        assert_eq!(value.payload, payload);
    }

    #[test]
    fn test_string_offset_out_of_bounds() {
        let payload = Payload::String("running".to_string());
        let mut buf = segment(MetricType::String, &payload);
        NativeEndian::write_i64(&mut buf[METRIC_LEN + layout::value::EXTRA..], 1 << 30);
        let err = decode(&buf, 0).unwrap_err();
        assert!(matches!(
            err,
            MmvError::DanglingReference {
                field: "extra",
                ..
            }
        ));
    }

    #[test]
    fn test_elapsed_projection() {
        let payload = Payload::Elapsed {
            value: 1_000,
            extra: -5_000_000,
        };
        let value = decode(&segment(MetricType::Elapsed, &payload), 10_000_000).unwrap();
        assert_eq!(value.payload, payload);
        assert_eq!(value.elapsed, Some(1_000 + 5_000_000));
    }

    #[test]
    fn test_elapsed_non_negative_extra_rejected() {
        for extra in [0, 1] {
            let payload = Payload::Elapsed { value: 1_000, extra };
            let err = decode(&segment(MetricType::Elapsed, &payload), 10_000_000).unwrap_err();
            assert!(matches!(
                err,
                MmvError::InvalidElapsedEncoding { metric_item: 4, .. }
            ));
        }
    }

    #[test]
    fn test_dangling_metric() {
        let mut buf = segment(MetricType::I32, &Payload::I32(1));
        NativeEndian::write_u64(&mut buf[METRIC_LEN + layout::value::METRIC..], 1 << 20);
        let err = decode(&buf, 0).unwrap_err();
        assert!(matches!(
            err,
            MmvError::DanglingReference {
                from: TocKind::Values,
                field: "metric",
                ..
            }
        ));
    }

    #[test]
    fn test_clock() {
        assert_eq!(Clock::Fixed(42).now_micros(), 42);
        assert!(Clock::System.now_micros() > 0);
    }
}
