//! Switch Opus containers
//!
//! Switch games ship Opus audio wrapped in a small Nintendo header (the "core
//! header") which vendors then wrap again in their own outer headers. The core
//! header is always little-endian:
//!
//! | Offset | Size | Field                                        |
//! |--------|------|----------------------------------------------|
//! | 0x00   | 4    | magic `0x80000001`                           |
//! | 0x09   | 1    | channel count                                |
//! | 0x0a   | 2    | packet size if CBR, 0 if VBR                 |
//! | 0x0c   | 4    | sample rate                                  |
//! | 0x10   | 4    | data chunk offset (relative to header start) |
//! | 0x1c   | 4    | pre-skip samples                             |
//!
//! The data chunk starts with magic `0x80000004` and a 32-bit payload size;
//! the payload (8-byte framed Opus packets) follows immediately.
//!
//! Outer dialects are listed in [`dialect::REGISTRY`] in detection order.
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

mod dialect;
mod header;
mod types;

pub use dialect::{
    Check, Dialect, DialectSpec, Endian, Field, HeaderAt, LoopRule, OuterLayout, REGISTRY,
    SampleCount, detect, detect_with, spec_for,
};
pub use header::{ParseOptions, parse_core_header, parse_header};
pub use types::{ByteRange, OuterMetadata, StreamDescriptor};

/// Core header magic (little-endian).
pub const CORE_HEADER_MAGIC: u32 = 0x80000001;

/// Data chunk magic (little-endian).
pub const DATA_CHUNK_MAGIC: u32 = 0x80000004;

/// Size of the data chunk header preceding the payload.
pub const DATA_CHUNK_HEADER_SIZE: u64 = 0x08;

/// Bytes per interleave chunk in layered (multi-stream) files.
pub const LAYER_CHUNK_SIZE: u64 = 0x28;

/// Channels carried by one physical sub-stream.
pub const CHANNELS_PER_LAYER: u16 = 2;

/// Channel counts the family is known to use. Anything above
/// [`CHANNELS_PER_LAYER`] is stored as interleaved stereo layers.
pub const SUPPORTED_CHANNELS: [u16; 3] = [1, 2, 6];

/// Extension of the companion metadata file read by the standard dialect.
pub const PSI_EXTENSION: &str = "psi";
