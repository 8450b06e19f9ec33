//! Random-access byte sources
//!
//! Every reader in this crate is offset-addressed: there is no shared cursor, so
//! one source can back several concurrent resolutions and any number of
//! [`InterleavedWindow`](crate::window::InterleavedWindow) views.
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use byteorder::ByteOrder;

/// Offset-addressed, read-only byte storage.
pub trait ByteSource: Send + Sync {
    /// Total length in bytes.
    fn len(&self) -> u64;

    /// Fill `buf` with the bytes starting at `offset`.
    ///
    /// Reads that would cross the end of the source fail with
    /// [`io::ErrorKind::UnexpectedEof`] and leave no partial result behind.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()>;

    /// File name used for extension matching.
    fn name(&self) -> &str;

    /// Open a same-basename companion file with a different extension.
    fn open_sibling(&self, _extension: &str) -> Option<Box<dyn ByteSource>> {
        None
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fixed-width field reads on top of [`ByteSource::read_at`].
pub trait SourceExt: ByteSource {
    fn read_u8(&self, offset: u64) -> io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_at(offset, &mut buf)?;
        Ok(buf[0])
    }

    fn read_u16<E: ByteOrder>(&self, offset: u64) -> io::Result<u16> {
        let mut buf = [0u8; 2];
        self.read_at(offset, &mut buf)?;
        Ok(E::read_u16(&buf))
    }

    fn read_u32<E: ByteOrder>(&self, offset: u64) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_at(offset, &mut buf)?;
        Ok(E::read_u32(&buf))
    }

    fn read_i32<E: ByteOrder>(&self, offset: u64) -> io::Result<i32> {
        let mut buf = [0u8; 4];
        self.read_at(offset, &mut buf)?;
        Ok(E::read_i32(&buf))
    }

    /// Lower-cased extension of [`ByteSource::name`], if any.
    fn extension(&self) -> Option<String> {
        Path::new(self.name())
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
    }

    /// Copy `len` bytes starting at `offset` into a new buffer.
    fn read_vec(&self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_at(offset, &mut buf)?;
        Ok(buf)
    }
}

impl<T: ByteSource + ?Sized> SourceExt for T {}

pub(crate) fn out_of_range(offset: u64, wanted: usize, len: u64) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("read of {wanted} bytes at {offset:#x} past end of source ({len:#x})"),
    )
}

/// Bounds check shared by the in-memory and windowed sources.
pub(crate) fn check_range(offset: u64, wanted: usize, len: u64) -> io::Result<()> {
    match offset.checked_add(wanted as u64) {
        Some(end) if end <= len => Ok(()),
        _ => Err(out_of_range(offset, wanted, len)),
    }
}

// ==================== In-memory ====================

/// A source backed by an owned byte buffer.
///
/// Companion files can be registered with [`MemorySource::with_sibling`] so
/// side-file lookups behave the same as on disk.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    data: Vec<u8>,
    siblings: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            siblings: HashMap::new(),
        }
    }

    /// Register a companion file reachable through [`ByteSource::open_sibling`].
    #[must_use]
    pub fn with_sibling(mut self, extension: &str, data: Vec<u8>) -> Self {
        self.siblings.insert(extension.to_lowercase(), data);
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

impl ByteSource for MemorySource {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        check_range(offset, buf.len(), self.len())?;
        let start = offset as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open_sibling(&self, extension: &str) -> Option<Box<dyn ByteSource>> {
        let data = self.siblings.get(&extension.to_lowercase())?;
        let name = Path::new(&self.name).with_extension(extension);
        Some(Box::new(MemorySource::new(
            name.to_string_lossy().into_owned(),
            data.clone(),
        )))
    }
}

// ==================== On disk ====================

/// A source reading directly from a file with positioned reads.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    name: String,
    file: File,
    len: u64,
}

impl FileSource {
    /// Open a file for random-access reading.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { path, name, file, len })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    #[cfg(unix)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        use std::os::unix::fs::FileExt;

        check_range(offset, buf.len(), self.len)?;
        self.file.read_exact_at(buf, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        use std::os::windows::fs::FileExt;

        check_range(offset, buf.len(), self.len)?;
        let mut done = 0;
        while done < buf.len() {
            let n = self.file.seek_read(&mut buf[done..], offset + done as u64)?;
            if n == 0 {
                return Err(out_of_range(offset, buf.len(), self.len));
            }
            done += n;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn open_sibling(&self, extension: &str) -> Option<Box<dyn ByteSource>> {
        let sibling = self.path.with_extension(extension);
        if !sibling.is_file() {
            return None;
        }
        match FileSource::open(&sibling) {
            Ok(source) => Some(Box::new(source)),
            Err(e) => {
                tracing::warn!("Could not open companion file {}: {}", sibling.display(), e);
                None
            }
        }
    }
}
