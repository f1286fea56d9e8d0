//! Demonstration writer
//!
//! Publishes one metric of every type, including a per-CPU metric, then
//! optionally keeps updating them so a concurrent `mmv dump` has something
//! to race against.

use console::style;
use mmv_memory::{
    IndomSpec, MetricSpec, MetricType, Payload, Result, SegmentBuilder, SegmentWriter, Semantics,
    Units,
};
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing::info;

const CLUSTER: u32 = 321;
const CPU_INDOM: u32 = 1;

fn now_micros() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0)
}

pub fn run(path: &Path, seconds: u64) -> Result<()> {
    let mut b = SegmentBuilder::new(CLUSTER);
    b.process(std::process::id() as i32);

    b.add_indom(
        IndomSpec::new(CPU_INDOM, [(0, "cpu0"), (1, "cpu1")])
            .short_help("CPUs")
            .long_help("One instance per logical processor"),
    )?;

    let cpu = b.add_metric(
        MetricSpec::new("cpu.busy", 1, MetricType::U64, Semantics::Counter)
            .units(Units::time(2))
            .indom(CPU_INDOM)
            .short_help("Busy time per CPU"),
    )?;
    let threads = b.add_metric(MetricSpec::new("threads", 2, MetricType::I32, Semantics::Instant))?;
    let queue = b.add_metric(
        MetricSpec::new("queue.depth", 3, MetricType::U32, Semantics::Instant)
            .units(Units::count()),
    )?;
    let bytes = b.add_metric(
        MetricSpec::new("bytes.sent", 4, MetricType::I64, Semantics::Counter)
            .units(Units::space(0)),
    )?;
    let load = b.add_metric(MetricSpec::new("load", 5, MetricType::Float, Semantics::Instant))?;
    let ratio = b.add_metric(MetricSpec::new("hit.ratio", 6, MetricType::Double, Semantics::Instant))?;
    let state = b.add_metric(
        MetricSpec::new("state", 7, MetricType::String, Semantics::Discrete)
            .short_help("Lifecycle state"),
    )?;
    let uptime = b.add_metric(
        MetricSpec::new("uptime", 8, MetricType::Elapsed, Semantics::Counter)
            .units(Units::time(1)),
    )?;

    let started = now_micros();
    let cpu0 = b.add_value(cpu, Some(0), Payload::U64(0))?;
    let cpu1 = b.add_value(cpu, Some(1), Payload::U64(0))?;
    b.add_value(threads, None, Payload::I32(4))?;
    let depth = b.add_value(queue, None, Payload::U32(0))?;
    let sent = b.add_value(bytes, None, Payload::I64(0))?;
    b.add_value(load, None, Payload::Float(0.5))?;
    b.add_value(ratio, None, Payload::Double(0.0))?;
    let lifecycle = b.add_value(state, None, Payload::String("starting".into()))?;
    b.add_value(
        uptime,
        None,
        Payload::Elapsed {
            value: 0,
            extra: -started,
        },
    )?;

    let mut writer = SegmentWriter::create(path, &b)?;
    println!(
        "{} {}",
        style("Published segment").green().bold(),
        writer.path().display()
    );

    if seconds == 0 {
        return Ok(());
    }

    writer.set_value(lifecycle, &Payload::String("running".into()))?;
    let deadline = Instant::now() + Duration::from_secs(seconds);
    let mut tick = 0u64;
    while Instant::now() < deadline {
        tick += 1;
        writer.set_value(cpu0, &Payload::U64(tick * 7))?;
        writer.set_value(cpu1, &Payload::U64(tick * 3))?;
        writer.set_value(depth, &Payload::U32((tick % 17) as u32))?;
        writer.set_value(sent, &Payload::I64((tick * 1500) as i64))?;
        std::thread::sleep(Duration::from_millis(10));
    }
    writer.set_value(lifecycle, &Payload::String("stopped".into()))?;

    info!(ticks = tick, generation = writer.generation().g1, "Sample writer finished");
    Ok(())
}
