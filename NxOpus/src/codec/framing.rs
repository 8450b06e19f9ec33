//! Reference backend for Switch Opus payloads
//!
//! The payload is a run of frames, each an 8-byte big-endian header (packet
//! size, then the encoder's final range value) followed by one raw Opus packet.
//! This backend indexes the packets and counts samples from their TOC bytes. It
//! does not decode audio; a real decoder can consume [`FramedPayload`] packet by
//! packet after [`CodecParams::opus_head`].

use std::io;

use byteorder::BigEndian;
use thiserror::Error;

use super::{CodecBackend, CodecParams};
use crate::error::BackendError;
use crate::formats::opus::ByteRange;
use crate::source::{ByteSource, SourceExt};

/// Size of the per-packet frame header.
pub const FRAME_HEADER_SIZE: u64 = 0x08;

/// Opus always counts samples at 48 kHz.
pub const OPUS_RATE: u32 = 48000;

/// Longest legal packet duration (120 ms).
const MAX_PACKET_SAMPLES: u32 = OPUS_RATE * 3 / 25;

/// Errors raised while walking a framed payload.
#[derive(Error, Debug)]
pub enum FramingError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("frame header at {offset:#x} is cut off by the end of the payload")]
    TruncatedHeader { offset: u64 },
    #[error("packet at {offset:#x} ({size} bytes) runs past the end of the payload")]
    PacketOverrun { offset: u64, size: u64 },
    #[error("invalid Opus packet at {offset:#x}")]
    InvalidPacket { offset: u64 },
}

/// Samples per channel (at 48 kHz) carried by one Opus packet, from its TOC
/// byte and, for code 3 packets, the frame count byte.
pub fn packet_samples(packet: &[u8]) -> Option<u32> {
    let toc = *packet.first()?;

    let per_frame = if toc & 0x80 != 0 {
        // CELT-only: 2.5, 5, 10, 20 ms
        (OPUS_RATE << ((toc >> 3) & 0x03)) / 400
    } else if toc & 0x60 == 0x60 {
        // hybrid: 10, 20 ms
        if toc & 0x08 != 0 { OPUS_RATE / 50 } else { OPUS_RATE / 100 }
    } else {
        // SILK-only: 10, 20, 40, 60 ms
        match (toc >> 3) & 0x03 {
            3 => OPUS_RATE * 60 / 1000,
            size => (OPUS_RATE << size) / 100,
        }
    };

    let frames = match toc & 0x03 {
        0 => 1,
        1 | 2 => 2,
        _ => u32::from(*packet.get(1)? & 0x3F),
    };
    if frames == 0 {
        return None;
    }

    let samples = per_frame * frames;
    (samples <= MAX_PACKET_SAMPLES).then_some(samples)
}

/// Packet index over one framed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramedPayload {
    pub params: CodecParams,
    /// Raw Opus packets, frame headers excluded.
    pub packets: Vec<ByteRange>,
    /// Samples per channel before pre-skip removal.
    pub total_samples: u64,
}

impl FramedPayload {
    /// Read packet `index` from the source the payload was indexed over.
    pub fn packet(&self, source: &dyn ByteSource, index: usize) -> io::Result<Vec<u8>> {
        let range = self.packets.get(index).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no packet {index}"))
        })?;
        source.read_vec(range.offset, range.size as usize)
    }
}

fn scan(source: &dyn ByteSource, range: ByteRange) -> Result<(Vec<ByteRange>, u64), FramingError> {
    let end = range.end().ok_or(FramingError::PacketOverrun {
        offset: range.offset,
        size: range.size,
    })?;
    let mut packets = Vec::new();
    let mut total = 0u64;
    let mut pos = range.offset;

    while pos < end {
        if end - pos < FRAME_HEADER_SIZE {
            return Err(FramingError::TruncatedHeader { offset: pos });
        }
        let size = u64::from(source.read_u32::<BigEndian>(pos)?);
        let start = pos + FRAME_HEADER_SIZE;
        if size == 0 {
            return Err(FramingError::InvalidPacket { offset: start });
        }
        if size > end - start {
            return Err(FramingError::PacketOverrun { offset: start, size });
        }

        let mut toc = [0u8; 2];
        let toc_len = size.min(2) as usize;
        source.read_at(start, &mut toc[..toc_len])?;
        let samples = packet_samples(&toc[..toc_len])
            .ok_or(FramingError::InvalidPacket { offset: start })?;

        total += u64::from(samples);
        packets.push(ByteRange::new(start, size));
        pos = start + size;
    }

    Ok((packets, total))
}

/// Backend that indexes framed Opus packets without decoding them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchOpusFraming;

impl CodecBackend for SwitchOpusFraming {
    type Handle = FramedPayload;

    fn open(&self, source: &dyn ByteSource, params: &CodecParams) -> Result<FramedPayload, BackendError> {
        let (packets, total_samples) = scan(source, params.byte_range)?;
        tracing::trace!(
            "Indexed {} packets ({} samples) at {:#x}",
            packets.len(),
            total_samples,
            params.byte_range.offset
        );
        Ok(FramedPayload { params: *params, packets, total_samples })
    }

    fn sample_count(&self, source: &dyn ByteSource, params: &CodecParams) -> Result<u64, BackendError> {
        Ok(scan(source, params.byte_range)?.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecProfile;
    use crate::source::MemorySource;

    fn framed(packets: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for packet in packets {
            out.extend_from_slice(&(packet.len() as u32).to_be_bytes());
            out.extend_from_slice(&0u32.to_be_bytes());
            out.extend_from_slice(packet);
        }
        out
    }

    fn params(size: u64) -> CodecParams {
        CodecParams {
            byte_range: ByteRange::new(0, size),
            sample_rate: 48000,
            channel_count: 2,
            pre_skip: 0,
            frame_size: 0,
            profile: CodecProfile::SwitchOpus,
        }
    }

    #[test]
    fn test_toc_durations() {
        assert_eq!(packet_samples(&[0xF8]), Some(960)); // CELT 20 ms
        assert_eq!(packet_samples(&[0xF9]), Some(1920)); // two frames
        assert_eq!(packet_samples(&[0xFB, 0x03]), Some(2880)); // code 3, three frames
        assert_eq!(packet_samples(&[0x78]), Some(960)); // hybrid 20 ms
        assert_eq!(packet_samples(&[0x60]), Some(480)); // hybrid 10 ms
        assert_eq!(packet_samples(&[0x00]), Some(480)); // SILK 10 ms
        assert_eq!(packet_samples(&[0x18]), Some(2880)); // SILK 60 ms
        assert_eq!(packet_samples(&[0x80]), Some(120)); // CELT 2.5 ms
    }

    #[test]
    fn test_invalid_toc() {
        assert_eq!(packet_samples(&[]), None);
        assert_eq!(packet_samples(&[0xFB]), None); // code 3 without count byte
        assert_eq!(packet_samples(&[0x1B, 0x03]), None); // 3 x 60 ms > 120 ms
        assert_eq!(packet_samples(&[0xFB, 0x00]), None); // code 3 with zero frames
    }

    #[test]
    fn test_index_and_count() {
        let data = framed(&[&[0xF8, 1, 2, 3], &[0xF9, 4], &[0xF8]]);
        let len = data.len() as u64;
        let source = MemorySource::new("payload.bin", data);
        let handle = SwitchOpusFraming.open(&source, &params(len)).unwrap();

        assert_eq!(handle.total_samples, 960 + 1920 + 960);
        assert_eq!(handle.packets.len(), 3);
        assert_eq!(handle.packets[1], ByteRange::new(20, 2));
        assert_eq!(handle.packet(&source, 0).unwrap(), vec![0xF8, 1, 2, 3]);
        assert_eq!(SwitchOpusFraming.sample_count(&source, &params(len)).unwrap(), 3840);
    }

    #[test]
    fn test_empty_payload_counts_zero() {
        let source = MemorySource::new("payload.bin", Vec::new());
        assert_eq!(SwitchOpusFraming.sample_count(&source, &params(0)).unwrap(), 0);
    }

    #[test]
    fn test_overrun_is_an_error() {
        let mut data = framed(&[&[0xF8, 1, 2, 3]]);
        data.truncate(data.len() - 1);
        let len = data.len() as u64;
        let source = MemorySource::new("payload.bin", data);
        assert!(SwitchOpusFraming.sample_count(&source, &params(len)).is_err());

        let source = MemorySource::new("payload.bin", vec![0, 0, 0]);
        assert!(SwitchOpusFraming.sample_count(&source, &params(3)).is_err());
    }

    #[test]
    fn test_zero_frame_packet_is_invalid() {
        let data = framed(&[&[0xF8, 1], &[0xFB, 0x00]]);
        let len = data.len() as u64;
        let source = MemorySource::new("payload.bin", data);
        let err = SwitchOpusFraming.open(&source, &params(len)).unwrap_err();
        let err = err.downcast_ref::<FramingError>().expect("framing error");
        assert!(matches!(err, FramingError::InvalidPacket { offset: 18 }));
    }
}
