//! Container format handlers
//!
//! Only the Switch Opus family lives here for now. Each family exposes a
//! detector, a header parser, and a stream descriptor type.

pub mod opus;

pub use opus::{Dialect, StreamDescriptor, detect, parse_header};
