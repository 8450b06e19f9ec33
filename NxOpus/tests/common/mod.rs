//! Synthetic container builders shared by the integration tests.

#![allow(dead_code)]

use nxopus::formats::opus::{CORE_HEADER_MAGIC, DATA_CHUNK_MAGIC, LAYER_CHUNK_SIZE};

/// Samples per channel carried by each packet from [`frames`].
pub const PACKET_SAMPLES: u32 = 960;

pub fn put_le32(data: &mut Vec<u8>, offset: usize, value: u32) {
    if data.len() < offset + 4 {
        data.resize(offset + 4, 0);
    }
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

pub fn put_be32(data: &mut Vec<u8>, offset: usize, value: u32) {
    if data.len() < offset + 4 {
        data.resize(offset + 4, 0);
    }
    data[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

/// `count` framed 20 ms CELT packets.
pub fn frames(count: usize) -> Vec<u8> {
    let mut out = Vec::new();
    for i in 0..count {
        let packet = [0xF8, i as u8, 0xAA, 0x55];
        out.extend_from_slice(&(packet.len() as u32).to_be_bytes());
        out.extend_from_slice(&0u32.to_be_bytes());
        out.extend_from_slice(&packet);
    }
    out
}

/// Core header plus data chunk.
#[derive(Debug, Clone)]
pub struct CoreStream {
    pub channels: u8,
    pub sample_rate: u32,
    pub pre_skip: u32,
    pub frame_size: u16,
    /// Data chunk offset relative to the core header.
    pub data_offset: u32,
    pub payload: Vec<u8>,
}

impl CoreStream {
    pub fn stereo(payload: Vec<u8>) -> Self {
        Self {
            channels: 2,
            sample_rate: 48000,
            pre_skip: 120,
            frame_size: 0,
            data_offset: 0x20,
            payload,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.data_offset as usize];
        put_le32(&mut out, 0x00, CORE_HEADER_MAGIC);
        out[0x09] = self.channels;
        out[0x0A..0x0C].copy_from_slice(&self.frame_size.to_le_bytes());
        put_le32(&mut out, 0x0C, self.sample_rate);
        put_le32(&mut out, 0x10, self.data_offset);
        put_le32(&mut out, 0x1C, self.pre_skip);
        out.resize(self.data_offset as usize, 0);

        out.extend_from_slice(&DATA_CHUNK_MAGIC.to_le_bytes());
        out.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Offset of the first payload byte relative to the core header.
    pub fn payload_offset(&self) -> u64 {
        u64::from(self.data_offset) + 8
    }
}

/// Place `core` at `at`, after whatever `prefix` already holds.
fn with_core(mut prefix: Vec<u8>, at: usize, core: &CoreStream) -> Vec<u8> {
    prefix.resize(at, 0);
    prefix.extend(core.build());
    prefix
}

pub fn standard(core: &CoreStream) -> Vec<u8> {
    core.build()
}

/// `.psi` companion carrying sample count and loop points.
pub fn psi(num_samples: i32, loop_start: i32, loop_end: i32) -> Vec<u8> {
    let mut out = vec![0u8; 0x90];
    put_le32(&mut out, 0x84, loop_start as u32);
    put_le32(&mut out, 0x88, loop_end as u32);
    put_le32(&mut out, 0x8C, num_samples as u32);
    out
}

pub fn nippon1(loop_start: i32, loop_end: i32, sentinel: u32, core: &CoreStream) -> Vec<u8> {
    let mut out = Vec::new();
    put_le32(&mut out, 0x00, loop_start as u32);
    put_be32(&mut out, 0x04, sentinel);
    put_le32(&mut out, 0x08, loop_end as u32);
    put_be32(&mut out, 0x0C, sentinel);
    with_core(out, 0x10, core)
}

pub fn capcom_prefix(num_samples: i32, channels: u32, loop_start: i32, loop_end: i32, header: u32) -> Vec<u8> {
    let mut out = Vec::new();
    put_le32(&mut out, 0x00, num_samples as u32);
    put_le32(&mut out, 0x04, channels);
    put_le32(&mut out, 0x08, loop_start as u32);
    put_le32(&mut out, 0x0C, loop_end as u32);
    put_le32(&mut out, 0x1C, header);
    out.resize(header as usize, 0);
    out
}

pub fn capcom(num_samples: i32, loop_start: i32, loop_end: i32, core: &CoreStream) -> Vec<u8> {
    let prefix = capcom_prefix(num_samples, u32::from(core.channels), loop_start, loop_end, 0x100);
    with_core(prefix, 0x100, core)
}

/// Pad every layer to the same whole number of chunks and interleave them.
pub fn interleave(layers: &[Vec<u8>]) -> Vec<u8> {
    let chunk = LAYER_CHUNK_SIZE as usize;
    let longest = layers.iter().map(Vec::len).max().unwrap_or(0);
    let padded_len = longest.div_ceil(chunk) * chunk;
    let padded: Vec<Vec<u8>> = layers
        .iter()
        .map(|layer| {
            let mut layer = layer.clone();
            layer.resize(padded_len, 0);
            layer
        })
        .collect();

    let mut out = Vec::with_capacity(padded_len * layers.len());
    for k in 0..padded_len / chunk {
        for layer in &padded {
            out.extend_from_slice(&layer[k * chunk..(k + 1) * chunk]);
        }
    }
    out
}

/// Six-channel Capcom file built from three stereo layers.
pub fn capcom_layered(num_samples: i32, loop_start: i32, loop_end: i32, layers: &[CoreStream]) -> Vec<u8> {
    let channels = layers.iter().map(|l| u32::from(l.channels)).sum();
    let mut out = capcom_prefix(num_samples, channels, loop_start, loop_end, 0x100);
    let built: Vec<Vec<u8>> = layers.iter().map(CoreStream::build).collect();
    out.extend(interleave(&built));
    out
}

pub fn procyon(num_samples: i32, looping: bool, loop_start: i32, loop_end: i32, core: &CoreStream) -> Vec<u8> {
    let mut out = Vec::new();
    put_be32(&mut out, 0x00, 0x73616466); // "sadf"
    put_be32(&mut out, 0x08, 0x6F707573); // "opus"
    put_le32(&mut out, 0x1C, 0x80);
    out[0x19] = u8::from(looping);
    put_le32(&mut out, 0x28, num_samples as u32);
    put_le32(&mut out, 0x2C, loop_start as u32);
    put_le32(&mut out, 0x30, loop_end as u32);
    with_core(out, 0x80, core)
}

pub fn shinen(loop_start: i32, loop_end: i32, core: &CoreStream) -> Vec<u8> {
    let mut out = Vec::new();
    put_le32(&mut out, 0x00, loop_start as u32);
    put_le32(&mut out, 0x04, loop_end as u32);
    with_core(out, 0x08, core)
}

pub fn nus3(num_samples: i32, loop_start: i32, loop_end: i32, core: &CoreStream) -> Vec<u8> {
    let mut out = Vec::new();
    put_be32(&mut out, 0x00, 0x4F505553); // "OPUS"
    put_be32(&mut out, 0x08, num_samples as u32);
    put_be32(&mut out, 0x14, loop_start as u32);
    put_be32(&mut out, 0x18, loop_end as u32);
    put_be32(&mut out, 0x20, 0x30);
    with_core(out, 0x30, core)
}

pub fn nlsd(num_samples: i32, loop_start: i32, adjust: i32, core: &CoreStream) -> Vec<u8> {
    let mut out = Vec::new();
    put_be32(&mut out, 0x00, 0x09000000);
    put_le32(&mut out, 0x0C, num_samples as u32);
    put_le32(&mut out, 0x10, loop_start as u32);
    put_le32(&mut out, 0x18, adjust as u32);
    with_core(out, 0x1C, core)
}
