//! Switch Opus descriptor types

use serde::{Deserialize, Serialize};

use super::Dialect;

/// A contiguous byte range within a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub offset: u64,
    pub size: u64,
}

impl ByteRange {
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    /// One past the last byte, or `None` on overflow.
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.size)
    }
}

/// Sample and loop metadata supplied by a dialect's outer header (or its
/// companion file) before the core header is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OuterMetadata {
    /// 0 when the outer header does not store it.
    pub num_samples: i32,
    pub loop_start: i32,
    /// Looping is enabled when this is positive.
    pub loop_end: i32,
}

/// Structural metadata for one stream, as read from the headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub dialect: Dialect,
    /// First payload byte, in the coordinates of the source the header was
    /// read from (a layer window for layered streams).
    pub payload_offset: u64,
    pub payload_size: u64,
    pub sample_rate: u32,
    /// 0 means unknown until the codec backend counts the payload.
    pub num_samples: i32,
    pub loop_start_sample: i32,
    pub loop_end_sample: i32,
    pub loop_enabled: bool,
    pub channel_count: u16,
    pub pre_skip_samples: u32,
    /// Packet size for CBR streams, 0 for VBR.
    pub frame_size: u16,
}

impl StreamDescriptor {
    pub fn payload(&self) -> ByteRange {
        ByteRange::new(self.payload_offset, self.payload_size)
    }

    /// True when the channel count needs more than one physical sub-stream.
    pub fn is_layered(&self) -> bool {
        self.channel_count > super::CHANNELS_PER_LAYER
    }

    /// Duration in seconds, if both sample count and rate are known.
    pub fn duration_secs(&self) -> Option<f64> {
        if self.sample_rate == 0 || self.num_samples <= 0 {
            return None;
        }
        Some(f64::from(self.num_samples) / f64::from(self.sample_rate))
    }
}
