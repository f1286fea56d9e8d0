//! Human-readable rendering of a decoded segment
//!
//! The layout follows the classic `mmvdump` output: a header block, then
//! one block per TOC entry in table order.

use crate::decoder::Segment;
use crate::header::Header;
use crate::layout::TocKind;
use crate::toc::TocEntry;
use crate::value::Payload;
use std::io::{self, Write};
use std::path::Path;

/// Render the header block
pub fn write_header(out: &mut impl Write, path: &Path, header: &Header) -> io::Result<()> {
    writeln!(out, "MMV file   = {}", path.display())?;
    writeln!(out, "Version    = {}", header.version)?;
    writeln!(out, "Generated  = {}", header.generation.g1)?;
    writeln!(out, "TOC count  = {}", header.toc_count)?;
    writeln!(out, "Cluster    = {}", header.cluster)?;
    writeln!(out, "Process    = {}", header.process)?;
    writeln!(out, "Flags      = 0x{:x} ({})", header.flags.bits(), header.flags)
}

fn write_text(out: &mut impl Write, label: &str, text: &Option<String>) -> io::Result<()> {
    match text {
        Some(t) => writeln!(out, "       {}={}", label, t),
        None => writeln!(out, "       (no {})", label),
    }
}

/// Render the block for one TOC entry
pub fn write_section(out: &mut impl Write, segment: &Segment, entry: &TocEntry) -> io::Result<()> {
    writeln!(out)?;
    writeln!(
        out,
        "TOC[{}]: offset {}, {} offset {} ({} entries)",
        entry.index, entry.offset, entry.kind, entry.data_offset, entry.count
    )?;

    match entry.kind {
        TocKind::Indoms => {
            for indom in &segment.indoms {
                writeln!(
                    out,
                    "  [{}/{}] {} instances, starting at offset {}",
                    indom.serial, indom.offset, indom.count, indom.instances_offset
                )?;
                write_text(out, "shorttext", &indom.short_text)?;
                write_text(out, "helptext", &indom.help_text)?;
            }
        }
        TocKind::Instances => {
            for inst in &segment.instances {
                writeln!(
                    out,
                    "  [{}/{}] instance = [{} or \"{}\"]",
                    inst.indom_serial, inst.offset, inst.internal, inst.external
                )?;
            }
        }
        TocKind::Metrics => {
            for m in &segment.metrics {
                writeln!(out, "  [{}/{}] {}", m.item, m.offset, m.name)?;
                let type_name = m
                    .metric_type
                    .map_or_else(|| "?".to_string(), |t| t.to_string());
                writeln!(
                    out,
                    "       type={} (0x{:x}), sem={} (0x{:x}), pad=0x{:x}",
                    type_name,
                    m.raw_type,
                    m.semantics,
                    m.semantics.raw(),
                    m.padding
                )?;
                writeln!(out, "       units={}", m.units)?;
                match m.indom {
                    Some(serial) => writeln!(out, "       indom={}", serial)?,
                    None => writeln!(out, "       (no indom)")?,
                }
                write_text(out, "shorttext", &m.short_text)?;
                write_text(out, "helptext", &m.help_text)?;
            }
        }
        TocKind::Values => {
            for v in &segment.values {
                write!(out, "  [{}/{}] {}", v.metric_item, v.metric_offset, v.metric_name)?;
                if let Some(inst) = &v.instance {
                    write!(out, "[{} or \"{}\"]", inst.internal, inst.external)?;
                }
                match (&v.payload, v.elapsed) {
                    (Payload::Elapsed { value, extra }, Some(now)) => {
                        writeln!(out, " = {} (value={}/extra={})", now, value, extra)?
                    }
                    (payload, _) => writeln!(out, " = {}", payload)?,
                }
            }
        }
        TocKind::Strings => {
            for (i, s) in segment.strings.iter().enumerate() {
                writeln!(out, "  [{}/{}] {}", i + 1, s.offset, s.text)?;
            }
        }
    }
    Ok(())
}

/// Render everything decoded so far: the header, if validated, then each
/// section reached in TOC order. Sections never reached are left out.
pub fn write_segment(out: &mut impl Write, path: &Path, segment: &Segment) -> io::Result<()> {
    if let Some(header) = &segment.header {
        write_header(out, path, header)?;
    }
    for entry in segment.decoded_toc() {
        write_section(out, segment, entry)?;
    }
    Ok(())
}
