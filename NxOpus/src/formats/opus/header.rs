//! Header parsing
//!
//! Parsing runs in two steps: the dialect's outer header supplies the core
//! header location plus sample/loop metadata, then the core header supplies
//! everything else and points at the data chunk, whose magic is re-checked.

use byteorder::LittleEndian;

use super::dialect::{LoopRule, OuterLayout, SampleCount, spec_for};
use super::{
    CHANNELS_PER_LAYER, CORE_HEADER_MAGIC, DATA_CHUNK_HEADER_SIZE, DATA_CHUNK_MAGIC, Dialect,
    OuterMetadata, SUPPORTED_CHANNELS, StreamDescriptor,
};
use crate::error::{Error, Result};
use crate::source::{ByteSource, SourceExt};

/// Options affecting header parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Consult companion metadata files when a dialect uses one.
    pub side_files: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { side_files: true }
    }
}

/// Parse the headers of a source already identified as `dialect`.
///
/// For layered layouts (more than [`CHANNELS_PER_LAYER`] channels) the
/// returned descriptor covers the whole interleaved region and has a sample
/// rate of 0; the per-layer core headers are read during composition.
pub fn parse_header(
    source: &dyn ByteSource,
    dialect: Dialect,
    options: &ParseOptions,
) -> Result<StreamDescriptor> {
    let layout = &spec_for(dialect).layout;
    let header_offset = layout.header.locate(source)?;
    let meta = read_outer_metadata(source, dialect, layout, options)?;

    tracing::debug!(
        "{}: core header at {:#x}, outer samples={} loop={}..{}",
        dialect,
        header_offset,
        meta.num_samples,
        meta.loop_start,
        meta.loop_end
    );

    if let Some(field) = layout.channels {
        let declared = field.read_u32(source)?;
        let channels = u16::try_from(declared)
            .ok()
            .filter(|c| SUPPORTED_CHANNELS.contains(c))
            .ok_or(Error::UnsupportedLayout { dialect, channels: declared })?;

        if channels > CHANNELS_PER_LAYER {
            return layered_descriptor(source, dialect, header_offset, channels, meta);
        }
    }

    parse_core_header(source, dialect, header_offset, meta)
}

/// Parse a core header at `header_offset` and validate its data chunk.
pub fn parse_core_header(
    source: &dyn ByteSource,
    dialect: Dialect,
    header_offset: u64,
    meta: OuterMetadata,
) -> Result<StreamDescriptor> {
    if source.read_u32::<LittleEndian>(header_offset)? != CORE_HEADER_MAGIC {
        return Err(Error::malformed(
            dialect,
            format!("no core header magic at {header_offset:#x}"),
        ));
    }

    let channels = source.read_u8(header_offset + 0x09)?;
    if channels == 0 || u16::from(channels) > CHANNELS_PER_LAYER {
        return Err(Error::UnsupportedLayout { dialect, channels: u32::from(channels) });
    }
    let frame_size = source.read_u16::<LittleEndian>(header_offset + 0x0A)?;
    let sample_rate = source.read_u32::<LittleEndian>(header_offset + 0x0C)?;
    let data_rel = source.read_u32::<LittleEndian>(header_offset + 0x10)?;
    let pre_skip = source.read_u32::<LittleEndian>(header_offset + 0x1C)?;

    let data_offset = header_offset
        .checked_add(u64::from(data_rel))
        .ok_or_else(|| Error::malformed(dialect, "data chunk offset overflows"))?;
    if source.read_u32::<LittleEndian>(data_offset)? != DATA_CHUNK_MAGIC {
        return Err(Error::malformed(
            dialect,
            format!("no data chunk magic at {data_offset:#x}"),
        ));
    }
    let payload_size = u64::from(source.read_u32::<LittleEndian>(data_offset + 0x04)?);
    let payload_offset = data_offset + DATA_CHUNK_HEADER_SIZE;

    if payload_offset.saturating_add(payload_size) > source.len() {
        return Err(Error::malformed(
            dialect,
            format!(
                "payload {payload_offset:#x}+{payload_size:#x} runs past end of file ({:#x})",
                source.len()
            ),
        ));
    }

    let (loop_start, loop_end, loop_enabled) = validate_loops(dialect, &meta)?;

    Ok(StreamDescriptor {
        dialect,
        payload_offset,
        payload_size,
        sample_rate,
        num_samples: meta.num_samples,
        loop_start_sample: loop_start,
        loop_end_sample: loop_end,
        loop_enabled,
        channel_count: u16::from(channels),
        pre_skip_samples: pre_skip,
        frame_size,
    })
}

/// Descriptor for an interleaved multi-layer region starting at `origin`.
fn layered_descriptor(
    source: &dyn ByteSource,
    dialect: Dialect,
    origin: u64,
    channels: u16,
    meta: OuterMetadata,
) -> Result<StreamDescriptor> {
    if origin >= source.len() {
        return Err(Error::malformed(
            dialect,
            format!("layer data offset {origin:#x} is past end of file"),
        ));
    }
    let (loop_start, loop_end, loop_enabled) = validate_loops(dialect, &meta)?;

    Ok(StreamDescriptor {
        dialect,
        payload_offset: origin,
        payload_size: source.len() - origin,
        sample_rate: 0,
        num_samples: meta.num_samples,
        loop_start_sample: loop_start,
        loop_end_sample: loop_end,
        loop_enabled,
        channel_count: channels,
        pre_skip_samples: 0,
        frame_size: 0,
    })
}

fn validate_loops(dialect: Dialect, meta: &OuterMetadata) -> Result<(i32, i32, bool)> {
    if meta.num_samples < 0 {
        return Err(Error::malformed(
            dialect,
            format!("negative sample count {}", meta.num_samples),
        ));
    }
    if meta.loop_end <= 0 {
        return Ok((0, 0, false));
    }
    if meta.loop_start < 0 || meta.loop_start > meta.loop_end {
        return Err(Error::malformed(
            dialect,
            format!("loop {}..{} is inverted or negative", meta.loop_start, meta.loop_end),
        ));
    }
    Ok((meta.loop_start, meta.loop_end, true))
}

/// Read sample count and loop points from the outer header and, where the
/// dialect uses one, its companion file.
fn read_outer_metadata(
    source: &dyn ByteSource,
    dialect: Dialect,
    layout: &OuterLayout,
    options: &ParseOptions,
) -> Result<OuterMetadata> {
    let mut meta = OuterMetadata::default();

    if let (Some(ext), true) = (layout.side_file, options.side_files) {
        // companion handle is dropped at the end of this block
        if let Some(companion) = source.open_sibling(ext) {
            match read_companion(companion.as_ref(), layout) {
                Ok(side) => meta = side,
                Err(e) => tracing::warn!(
                    "Ignoring unreadable companion {}: {}",
                    companion.name(),
                    e
                ),
            }
        }
    }

    if let SampleCount::Field(field) = layout.num_samples {
        meta.num_samples = field.read_i32(source)?;
    }

    match layout.loops {
        LoopRule::Direct { start, end } => {
            meta.loop_start = start.read_i32(source)?;
            meta.loop_end = end.read_i32(source)?;
        }
        LoopRule::Ordered { start, end } => {
            meta.loop_start = start.read_i32(source)?;
            meta.loop_end = end.read_i32(source)?;
            if meta.loop_start > meta.loop_end {
                return Err(Error::malformed(
                    dialect,
                    format!("loop start {} after loop end {}", meta.loop_start, meta.loop_end),
                ));
            }
        }
        LoopRule::FlagByte { flag, start, end } => {
            if source.read_u8(flag)? != 0 {
                meta.loop_start = start.read_i32(source)?;
                meta.loop_end = end.read_i32(source)?;
            }
        }
        LoopRule::EndNonzero { start, end } => {
            let loop_end = end.read_i32(source)?;
            if loop_end != 0 {
                meta.loop_start = start.read_i32(source)?;
                meta.loop_end = loop_end;
            }
        }
        LoopRule::EndFromAdjust { start, adjust } => {
            // the stored value is the distance from the loop end to the last sample
            let adjust = adjust.read_i32(source)?;
            if adjust != 0 {
                meta.loop_start = start.read_i32(source)?;
                meta.loop_end = meta.num_samples.wrapping_sub(adjust);
            }
        }
        LoopRule::SideFile { .. } => {}
    }

    Ok(meta)
}

fn read_companion(companion: &dyn ByteSource, layout: &OuterLayout) -> std::io::Result<OuterMetadata> {
    let mut meta = OuterMetadata::default();
    if let SampleCount::SideFile { offset } = layout.num_samples {
        meta.num_samples = companion.read_i32::<LittleEndian>(offset)?;
    }
    if let LoopRule::SideFile { start, end } = layout.loops {
        meta.loop_start = companion.read_i32::<LittleEndian>(start)?;
        meta.loop_end = companion.read_i32::<LittleEndian>(end)?;
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    /// Core header at `at` with the data chunk right after it.
    fn core_bytes(at: usize, channels: u8, payload: usize) -> Vec<u8> {
        let mut data = vec![0u8; at + 0x20 + 8 + payload];
        data[at..at + 4].copy_from_slice(&CORE_HEADER_MAGIC.to_le_bytes());
        data[at + 0x09] = channels;
        data[at + 0x0C..at + 0x10].copy_from_slice(&48000u32.to_le_bytes());
        data[at + 0x10..at + 0x14].copy_from_slice(&0x20u32.to_le_bytes());
        data[at + 0x1C..at + 0x20].copy_from_slice(&312u32.to_le_bytes());
        let d = at + 0x20;
        data[d..d + 4].copy_from_slice(&DATA_CHUNK_MAGIC.to_le_bytes());
        data[d + 4..d + 8].copy_from_slice(&(payload as u32).to_le_bytes());
        data
    }

    #[test]
    fn test_core_header_fields() {
        let source = MemorySource::new("a.opus", core_bytes(0, 1, 16));
        let desc = parse_core_header(&source, Dialect::Standard, 0, OuterMetadata::default()).unwrap();
        assert_eq!(desc.payload_offset, 0x28);
        assert_eq!(desc.payload_size, 16);
        assert_eq!(desc.sample_rate, 48000);
        assert_eq!(desc.channel_count, 1);
        assert_eq!(desc.pre_skip_samples, 312);
        assert!(!desc.loop_enabled);
    }

    #[test]
    fn test_payload_past_end_is_malformed() {
        let mut data = core_bytes(0, 2, 16);
        data.truncate(data.len() - 1);
        let source = MemorySource::new("a.opus", data);
        let err = parse_core_header(&source, Dialect::Standard, 0, OuterMetadata::default()).unwrap_err();
        assert!(matches!(err, Error::MalformedContainer { .. }));
    }

    #[test]
    fn test_core_channel_limits() {
        for channels in [0u8, 3, 6] {
            let source = MemorySource::new("a.opus", core_bytes(0, channels, 0));
            let err = parse_core_header(&source, Dialect::Standard, 0, OuterMetadata::default()).unwrap_err();
            assert!(matches!(err, Error::UnsupportedLayout { .. }), "{channels}");
        }
    }

    #[test]
    fn test_loop_validation() {
        let ok = OuterMetadata { num_samples: 100, loop_start: 10, loop_end: 90 };
        assert_eq!(validate_loops(Dialect::Capcom, &ok).unwrap(), (10, 90, true));

        let disabled = OuterMetadata { num_samples: 100, loop_start: 10, loop_end: -1 };
        assert_eq!(validate_loops(Dialect::Capcom, &disabled).unwrap(), (0, 0, false));

        let inverted = OuterMetadata { num_samples: 100, loop_start: 95, loop_end: 90 };
        assert!(validate_loops(Dialect::Capcom, &inverted).is_err());

        let negative = OuterMetadata { num_samples: -5, loop_start: 0, loop_end: 0 };
        assert!(validate_loops(Dialect::Capcom, &negative).is_err());
    }
}
