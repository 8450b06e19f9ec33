//! Codec backend adapter
//!
//! The resolver never decodes audio. Once a stream's byte ranges are known it
//! hands each one to a [`CodecBackend`] together with the codec parameters read
//! from the headers, and gets back whatever handle the backend uses for
//! decoding. Backend errors are passed through untouched.

mod framing;

use serde::{Deserialize, Serialize};

pub use framing::{
    FRAME_HEADER_SIZE, FramedPayload, FramingError, OPUS_RATE, SwitchOpusFraming, packet_samples,
};

use crate::error::BackendError;
use crate::formats::opus::{ByteRange, StreamDescriptor};
use crate::source::ByteSource;

/// Bitstream flavor of the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecProfile {
    /// Opus packets each prefixed by an 8-byte big-endian frame header.
    SwitchOpus,
}

/// Everything a backend needs to decode one physical stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodecParams {
    pub byte_range: ByteRange,
    pub sample_rate: u32,
    pub channel_count: u16,
    pub pre_skip: u32,
    /// Packet size for CBR streams, 0 for VBR.
    pub frame_size: u16,
    pub profile: CodecProfile,
}

impl CodecParams {
    pub fn from_descriptor(descriptor: &StreamDescriptor) -> Self {
        Self {
            byte_range: descriptor.payload(),
            sample_rate: descriptor.sample_rate,
            channel_count: descriptor.channel_count,
            pre_skip: descriptor.pre_skip_samples,
            frame_size: descriptor.frame_size,
            profile: CodecProfile::SwitchOpus,
        }
    }

    /// Ogg Opus identification header (`OpusHead`) describing this stream,
    /// for decoders that expect one ahead of raw packets.
    pub fn opus_head(&self) -> Vec<u8> {
        let mut head = Vec::with_capacity(19);
        head.extend_from_slice(b"OpusHead");
        head.push(1); // version
        head.push(self.channel_count as u8);
        head.extend_from_slice(&u16::try_from(self.pre_skip).unwrap_or(u16::MAX).to_le_bytes());
        head.extend_from_slice(&self.sample_rate.to_le_bytes());
        head.extend_from_slice(&0i16.to_le_bytes()); // output gain
        head.push(0); // mapping family: mono/stereo only
        head
    }
}

/// A decoder the resolved stream is handed to.
pub trait CodecBackend {
    /// Decodable handle for one physical stream.
    type Handle;

    /// Prepare a decoder over `params.byte_range` of `source`.
    fn open(&self, source: &dyn ByteSource, params: &CodecParams) -> Result<Self::Handle, BackendError>;

    /// Total decoded samples per channel in the byte range, before pre-skip
    /// is removed.
    fn sample_count(&self, source: &dyn ByteSource, params: &CodecParams) -> Result<u64, BackendError>;
}
