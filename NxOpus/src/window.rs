//! Deinterleaving views over a byte source
//!
//! A layered file stores its sub-streams as fixed-size chunks in rotation:
//! chunk 0 belongs to layer 0, chunk 1 to layer 1, and so on, wrapping every
//! `stride` chunks. An [`InterleavedWindow`] presents one layer's chunks as a
//! contiguous stream so the ordinary header parser can run on it unchanged.

use std::io;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::source::{ByteSource, check_range};

/// Geometry of one layer's view. Plain data; the view itself is rebuilt on
/// demand with [`WindowSpec::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Physical offset of this layer's first chunk.
    pub base_offset: u64,
    /// Bytes per chunk.
    pub chunk_size: u64,
    /// Chunks per rotation group (equal to the layer count).
    pub stride: u64,
    pub layer_index: usize,
    pub layer_count: usize,
}

impl WindowSpec {
    /// Geometry for layer `layer_index` of `layer_count` chunk-interleaved
    /// layers starting at `origin`.
    pub fn for_layer(
        origin: u64,
        chunk_size: u64,
        layer_index: usize,
        layer_count: usize,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidWindow("chunk size is zero".to_string()));
        }
        if layer_count == 0 || layer_index >= layer_count {
            return Err(Error::InvalidWindow(format!(
                "layer {layer_index} out of range for {layer_count} layers"
            )));
        }
        let base_offset = (layer_index as u64)
            .checked_mul(chunk_size)
            .and_then(|skip| origin.checked_add(skip))
            .ok_or_else(|| Error::InvalidWindow(format!("origin {origin:#x} overflows")))?;
        if chunk_size.checked_mul(layer_count as u64).is_none() {
            return Err(Error::InvalidWindow("group size overflows".to_string()));
        }

        Ok(Self {
            base_offset,
            chunk_size,
            stride: layer_count as u64,
            layer_index,
            layer_count,
        })
    }

    fn group_size(&self) -> u64 {
        self.chunk_size * self.stride
    }

    /// Logical length of the view over a source of `source_len` bytes. A
    /// trailing partial chunk is included.
    pub fn logical_len(&self, source_len: u64) -> u64 {
        let Some(available) = source_len.checked_sub(self.base_offset) else {
            return 0;
        };
        let group = self.group_size();
        let full = available / group;
        let rest = available % group;
        full * self.chunk_size + rest.min(self.chunk_size)
    }

    /// Map a logical offset to its physical offset in the underlying source.
    pub fn physical_offset(&self, logical: u64) -> u64 {
        let chunk = logical / self.chunk_size;
        let within = logical % self.chunk_size;
        self.base_offset + chunk * self.group_size() + within
    }

    /// Build the view over `source`.
    pub fn open<'a>(&self, source: &'a dyn ByteSource) -> InterleavedWindow<'a> {
        InterleavedWindow {
            inner: source,
            spec: *self,
            len: self.logical_len(source.len()),
        }
    }
}

/// Read-only view presenting one layer of a chunk-interleaved file as if it
/// were a standalone file. Owns no bytes.
pub struct InterleavedWindow<'a> {
    inner: &'a dyn ByteSource,
    spec: WindowSpec,
    len: u64,
}

impl InterleavedWindow<'_> {
    pub fn spec(&self) -> &WindowSpec {
        &self.spec
    }
}

impl std::fmt::Debug for InterleavedWindow<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterleavedWindow")
            .field("source", &self.inner.name())
            .field("spec", &self.spec)
            .field("len", &self.len)
            .finish()
    }
}

impl ByteSource for InterleavedWindow<'_> {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        check_range(offset, buf.len(), self.len)?;

        let chunk_size = self.spec.chunk_size;
        let mut done = 0usize;
        while done < buf.len() {
            let logical = offset + done as u64;
            let left_in_chunk = chunk_size - logical % chunk_size;
            let take = left_in_chunk.min((buf.len() - done) as u64) as usize;
            self.inner
                .read_at(self.spec.physical_offset(logical), &mut buf[done..done + take])?;
            done += take;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySource, SourceExt};

    fn numbered(len: usize) -> MemorySource {
        MemorySource::new("layers.opus", (0..len).map(|i| i as u8).collect())
    }

    #[test]
    fn test_layer_sees_its_own_chunks() {
        let source = numbered(48);
        // 3 layers, 4-byte chunks, rotation groups of 12 bytes
        let spec = WindowSpec::for_layer(0, 4, 1, 3).unwrap();
        let window = spec.open(&source);

        assert_eq!(window.len(), 16);
        let bytes = window.read_vec(0, 16).unwrap();
        assert_eq!(
            bytes,
            vec![4, 5, 6, 7, 16, 17, 18, 19, 28, 29, 30, 31, 40, 41, 42, 43]
        );
    }

    #[test]
    fn test_read_spanning_chunk_boundary() {
        let source = numbered(48);
        let window = WindowSpec::for_layer(0, 4, 2, 3).unwrap().open(&source);
        assert_eq!(window.read_vec(2, 4).unwrap(), vec![10, 11, 20, 21]);
    }

    #[test]
    fn test_layers_cover_source_disjointly() {
        let source = numbered(60);
        let origin = 6;
        let mut seen = vec![0u8; 60];
        for layer in 0..3 {
            let window = WindowSpec::for_layer(origin, 5, layer, 3).unwrap().open(&source);
            for byte in window.read_vec(0, window.len() as usize).unwrap() {
                seen[byte as usize] += 1;
            }
        }
        assert!(seen[..6].iter().all(|&n| n == 0));
        assert!(seen[6..].iter().all(|&n| n == 1));
    }

    #[test]
    fn test_partial_tail_length() {
        let spec = WindowSpec::for_layer(0, 4, 0, 3).unwrap();
        // one full group (12) + 2 stray bytes of layer 0
        assert_eq!(spec.logical_len(14), 6);
        assert_eq!(spec.logical_len(0), 0);
        let spec = WindowSpec::for_layer(0, 4, 2, 3).unwrap();
        // base 8, only 6 bytes left: first chunk complete, nothing after
        assert_eq!(spec.logical_len(14), 4);
        assert_eq!(spec.logical_len(5), 0);
    }

    #[test]
    fn test_read_past_window_end_fails() {
        let source = numbered(24);
        let window = WindowSpec::for_layer(0, 4, 0, 3).unwrap().open(&source);
        assert_eq!(window.len(), 8);
        assert!(window.read_vec(6, 4).is_err());
    }

    #[test]
    fn test_invalid_geometry() {
        assert!(WindowSpec::for_layer(0, 0, 0, 1).is_err());
        assert!(WindowSpec::for_layer(0, 4, 3, 3).is_err());
        assert!(WindowSpec::for_layer(0, 4, 0, 0).is_err());
    }
}
