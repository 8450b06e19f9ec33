#![allow(non_snake_case)]
//! # NxOpus
//!
//! A pure-Rust library for resolving Nintendo Switch Opus audio containers.
//!
//! Games ship Switch Opus under several container dialects that wrap the same
//! core header. This crate identifies the dialect, parses the headers into a
//! normalized descriptor, rebuilds chunk-interleaved multi-layer streams, and
//! hands each physical stream to a codec backend. It does not decode audio.
//!
//! ## Supported Dialects
//!
//! - **Standard** - bare core header, loop data in an optional `.psi` file
//! - **Nippon1** - 16-byte loop prefix
//! - **Capcom** - 6-channel layered variant
//! - **Procyon** - `.nop` with `sadf` outer header
//! - **Shinen** - 8-byte loop prefix
//! - **Nus3** - big-endian `OPUS` wrapper
//! - **Nlsd** - `.nlsd` with loop-end adjustment
//!
//! ## Quick Start
//!
//! ```no_run
//! use nxopus::prelude::*;
//!
//! let source = FileSource::open("bgm_title.lopus")?;
//! let assembler = StreamAssembler::new(SwitchOpusFraming);
//! let resolution = assembler.resolve(&source)?;
//!
//! println!("{} ({} channels)", resolution.dialect, resolution.stream.channel_count());
//! if let Some((start, end)) = resolution.stream.loop_points() {
//!     println!("loops {start}..{end}");
//! }
//! # Ok::<(), nxopus::Error>(())
//! ```
//!
//! Files that no dialect claims return [`Error::NoMatch`], so the assembler
//! can sit in front of other format handlers.
//!
//! ## Feature Flags
//!
//! - `cli` - Enables the `nxopus` command-line binary

pub mod assembler;
pub mod codec;
pub mod config;
pub mod error;
pub mod formats;
pub mod source;
pub mod stream;
pub mod window;

// Re-exports for convenience
pub use error::{Error, Result};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::error::{Error, Result};

    pub use crate::assembler::{Resolution, Stage, StreamAssembler};
    pub use crate::codec::{CodecBackend, CodecParams, FramedPayload, SwitchOpusFraming};
    pub use crate::config::ResolverConfig;
    pub use crate::formats::opus::{Dialect, ParseOptions, StreamDescriptor, detect, parse_header};
    pub use crate::source::{ByteSource, FileSource, MemorySource};
    pub use crate::stream::{LeafStream, LogicalStream};
    pub use crate::window::{InterleavedWindow, WindowSpec};
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// CLI module (feature-gated)
#[cfg(feature = "cli")]
pub mod cli;
