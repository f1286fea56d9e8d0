//! A writer and readers sharing one segment file

use mmv_memory::layout::STRING_MAX;
use mmv_memory::{
    MetricSpec, MetricType, MmvError, Payload, ReaderConfig, RetryPolicy, SegmentBuilder,
    SegmentReader, SegmentWriter, Semantics,
};
use std::time::Duration;

fn builder() -> SegmentBuilder {
    let mut b = SegmentBuilder::new(5);
    let count = b
        .add_metric(MetricSpec::new("requests", 1, MetricType::U64, Semantics::Counter))
        .unwrap();
    let status = b
        .add_metric(MetricSpec::new("status", 2, MetricType::String, Semantics::Discrete))
        .unwrap();
    b.add_value(count, None, Payload::U64(0)).unwrap();
    b.add_value(status, None, Payload::String("idle".into())).unwrap();
    b
}

fn fast_retry() -> ReaderConfig {
    ReaderConfig {
        retry: RetryPolicy {
            max_attempts: 100_000,
            backoff: Duration::from_micros(1),
            max_backoff: Duration::from_micros(50),
        },
        ..ReaderConfig::default()
    }
}

#[test]
fn test_reader_sees_updates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mmv").join("app");
    let mut writer = SegmentWriter::create(&path, &builder()).unwrap();

    let mut reader = SegmentReader::open(&path, ReaderConfig::default()).unwrap();
    let before = reader.snapshot().unwrap();
    assert_eq!(before.value("requests", None).unwrap().payload, Payload::U64(0));

    writer.set_value(0, &Payload::U64(99)).unwrap();
    writer
        .set_value(1, &Payload::String("serving".into()))
        .unwrap();

    let after = reader.snapshot().unwrap();
    assert_eq!(after.value("requests", None).unwrap().payload, Payload::U64(99));
    assert_eq!(
        after.value("status", None).unwrap().payload,
        Payload::String("serving".into())
    );
    assert!(after.header.unwrap().generation.g1 > before.header.unwrap().generation.g1);
}

#[test]
fn test_writer_rejects_wrong_payload() {
    let dir = tempfile::tempdir().unwrap();
    let mut writer = SegmentWriter::create(dir.path().join("seg"), &builder()).unwrap();

    assert!(matches!(
        writer.set_value(0, &Payload::I32(1)),
        Err(MmvError::PayloadTypeMismatch { .. })
    ));
    assert!(matches!(
        writer.set_value(2, &Payload::U64(1)),
        Err(MmvError::ValueIndexOutOfRange { index: 2, count: 2 })
    ));
}

#[test]
fn test_torn_then_settled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seg");
    let writer = SegmentWriter::create(&path, &builder()).unwrap();

    writer.begin_update();
    let mut reader = SegmentReader::open(
        &path,
        ReaderConfig {
            retry: RetryPolicy::none(),
            ..ReaderConfig::default()
        },
    )
    .unwrap();
    assert!(matches!(
        reader.snapshot(),
        Err(MmvError::TornGeneration { .. })
    ));

    writer.end_update();
    assert!(reader.snapshot().is_ok());
}

#[test]
fn test_concurrent_snapshots_are_consistent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seg");
    let mut writer = SegmentWriter::create(&path, &builder()).unwrap();

    let handle = std::thread::spawn(move || {
        for i in 1..=5_000u64 {
            writer.set_value(0, &Payload::U64(i)).unwrap();
            writer
                .set_value(1, &Payload::String(format!("tick {}", i)))
                .unwrap();
        }
    });

    let mut reader = SegmentReader::open(&path, fast_retry()).unwrap();
    let mut last = 0u64;
    for _ in 0..500 {
        let segment = reader.snapshot().unwrap();
        let count = match segment.value("requests", None).unwrap().payload {
            Payload::U64(n) => n,
            ref other => panic!("unexpected {:?}", other),
        };
        assert!(count >= last, "counter went backwards: {} < {}", count, last);
        last = count;

        match &segment.value("status", None).unwrap().payload {
            Payload::String(s) => {
                assert!(s.len() < STRING_MAX);
                assert!(s == "idle" || s.starts_with("tick "), "torn status {:?}", s);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
    handle.join().unwrap();
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = SegmentReader::open(dir.path().join("absent"), ReaderConfig::default())
        .err()
        .unwrap();
    assert!(matches!(err, MmvError::Open { .. }));
}
