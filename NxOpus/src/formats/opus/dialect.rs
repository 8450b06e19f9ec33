//! Dialect registry and detection
//!
//! Each vendor dialect is described by a [`DialectSpec`]: the extensions it
//! ships with, the checks that identify it, and where its outer header keeps
//! the core header offset, sample count and loop points. [`REGISTRY`] lists the
//! dialects in detection order. Several dialects share the `.opus`/`.lopus`
//! extensions, so the order decides which one claims an ambiguous file:
//!
//! 1. `standard` - bare core header at 0x00 (checked first, cheapest match)
//! 2. `nippon1` - sentinel pair at 0x04/0x0c must be all-zero or all-ones
//! 3. `capcom` - core header behind the pointer at 0x1c
//! 4. `procyon` - unique `sadf`/`opus` tags and `.nop` extension
//! 5. `shinen` - core header at 0x08
//! 6. `nus3` - big-endian `OPUS` tag, `.lopus` only
//! 7. `nlsd` - codec tag 9 and `.nlsd` extension

use std::fmt;
use std::io;
use std::str::FromStr;

use byteorder::{BigEndian, LittleEndian};
use serde::{Deserialize, Serialize};

use super::CORE_HEADER_MAGIC;
use crate::error::Error;
use crate::source::{ByteSource, SourceExt};

/// Known container dialects of the Switch Opus family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Bare Nintendo header, optional `.psi` companion [Lego City Undercover, BlazBlue: Cross Tag Battle]
    Standard,
    /// Nippon Ichi loop prefix [Disgaea 5]
    Nippon1,
    /// Capcom header, 6-channel files as interleaved stereo layers [Ultra Street Fighter II, Resident Evil: Revelations]
    Capcom,
    /// Procyon Studio `sadf` [Xenoblade Chronicles 2]
    Procyon,
    /// Shin'en loop prefix [Fast RMX]
    Shinen,
    /// Bandai Namco NUS3 bank entry, big-endian outer header [Taiko no Tatsujin]
    Nus3,
    /// Nihon Falcom NLSD [Ys VIII]
    Nlsd,
}

impl Dialect {
    /// All dialects in default detection order.
    pub const ALL: [Dialect; 7] = [
        Dialect::Standard,
        Dialect::Nippon1,
        Dialect::Capcom,
        Dialect::Procyon,
        Dialect::Shinen,
        Dialect::Nus3,
        Dialect::Nlsd,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Dialect::Standard => "standard",
            Dialect::Nippon1 => "nippon1",
            Dialect::Capcom => "capcom",
            Dialect::Procyon => "procyon",
            Dialect::Shinen => "shinen",
            Dialect::Nus3 => "nus3",
            Dialect::Nlsd => "nlsd",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Dialect::Standard => "Nintendo Opus",
            Dialect::Nippon1 => "Nippon Ichi Opus",
            Dialect::Capcom => "Capcom Opus",
            Dialect::Procyon => "Procyon Studio SADF Opus",
            Dialect::Shinen => "Shin'en Opus",
            Dialect::Nus3 => "Bandai Namco NUS3 Opus",
            Dialect::Nlsd => "Nihon Falcom NLSD Opus",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Dialect::ALL
            .into_iter()
            .find(|d| d.id() == lower)
            .ok_or_else(|| Error::UnknownDialect(s.to_string()))
    }
}

// ==================== Field layout ====================

/// Byte order of a single header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// A 32-bit header field at a fixed absolute offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub offset: u64,
    pub endian: Endian,
}

impl Field {
    pub const fn le(offset: u64) -> Self {
        Self { offset, endian: Endian::Little }
    }

    pub const fn be(offset: u64) -> Self {
        Self { offset, endian: Endian::Big }
    }

    pub fn read_u32(&self, source: &dyn ByteSource) -> io::Result<u32> {
        match self.endian {
            Endian::Little => source.read_u32::<LittleEndian>(self.offset),
            Endian::Big => source.read_u32::<BigEndian>(self.offset),
        }
    }

    pub fn read_i32(&self, source: &dyn ByteSource) -> io::Result<i32> {
        match self.endian {
            Endian::Little => source.read_i32::<LittleEndian>(self.offset),
            Endian::Big => source.read_i32::<BigEndian>(self.offset),
        }
    }
}

/// One identification check. All checks of a dialect must pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    /// 32-bit value at a fixed offset.
    Magic { field: Field, value: u32 },
    /// Two big-endian words that are both zero or both all-ones.
    PairedSentinel { first: u64, second: u64 },
    /// Core header magic at the dialect's header location.
    CoreMagic,
}

/// Where the core header starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAt {
    Fixed(u64),
    /// Absolute offset stored in a 32-bit field.
    Pointer(Field),
}

impl HeaderAt {
    pub fn locate(&self, source: &dyn ByteSource) -> io::Result<u64> {
        match self {
            HeaderAt::Fixed(offset) => Ok(*offset),
            HeaderAt::Pointer(field) => field.read_u32(source).map(u64::from),
        }
    }
}

/// Where the total sample count comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleCount {
    /// Not stored; counted from the payload later.
    Unknown,
    Field(Field),
    /// Little-endian field in the companion file, 0 when it is absent.
    SideFile { offset: u64 },
}

/// How loop points are stored. Looping is enabled when the resulting loop end
/// is positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopRule {
    /// Start and end stored directly.
    Direct { start: Field, end: Field },
    /// Stored directly; a start past the end rejects the file.
    Ordered { start: Field, end: Field },
    /// Read only when the flag byte is nonzero.
    FlagByte { flag: u64, start: Field, end: Field },
    /// Read only when the end field is nonzero.
    EndNonzero { start: Field, end: Field },
    /// Loop end is `num_samples - adjust`, read only when `adjust` is nonzero.
    EndFromAdjust { start: Field, adjust: Field },
    /// Little-endian fields in the companion file, 0 when it is absent.
    SideFile { start: u64, end: u64 },
}

/// Outer header layout of a dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OuterLayout {
    pub header: HeaderAt,
    pub num_samples: SampleCount,
    pub loops: LoopRule,
    /// Outer channel field. Counts above two are stored as interleaved layers.
    pub channels: Option<Field>,
    /// Companion file extension consulted for side-file fields.
    pub side_file: Option<&'static str>,
}

/// A registered dialect.
#[derive(Debug, Clone, Copy)]
pub struct DialectSpec {
    pub dialect: Dialect,
    pub extensions: &'static [&'static str],
    pub checks: &'static [Check],
    pub layout: OuterLayout,
}

const OPUS_EXTENSIONS: &[&str] = &["opus", "lopus"];

/// Dialects in detection order. First match wins.
pub static REGISTRY: [DialectSpec; 7] = [
    DialectSpec {
        dialect: Dialect::Standard,
        extensions: OPUS_EXTENSIONS,
        checks: &[Check::CoreMagic],
        layout: OuterLayout {
            header: HeaderAt::Fixed(0x00),
            num_samples: SampleCount::SideFile { offset: 0x8C },
            loops: LoopRule::SideFile { start: 0x84, end: 0x88 },
            channels: None,
            side_file: Some(super::PSI_EXTENSION),
        },
    },
    DialectSpec {
        dialect: Dialect::Nippon1,
        extensions: OPUS_EXTENSIONS,
        checks: &[
            Check::PairedSentinel { first: 0x04, second: 0x0C },
            Check::CoreMagic,
        ],
        layout: OuterLayout {
            header: HeaderAt::Fixed(0x10),
            num_samples: SampleCount::Unknown,
            loops: LoopRule::Direct { start: Field::le(0x00), end: Field::le(0x08) },
            channels: None,
            side_file: None,
        },
    },
    DialectSpec {
        dialect: Dialect::Capcom,
        extensions: OPUS_EXTENSIONS,
        checks: &[Check::CoreMagic],
        layout: OuterLayout {
            header: HeaderAt::Pointer(Field::le(0x1C)),
            num_samples: SampleCount::Field(Field::le(0x00)),
            loops: LoopRule::Direct { start: Field::le(0x08), end: Field::le(0x0C) },
            channels: Some(Field::le(0x04)),
            side_file: None,
        },
    },
    DialectSpec {
        dialect: Dialect::Procyon,
        extensions: &["nop"],
        checks: &[
            Check::Magic { field: Field::be(0x00), value: 0x73616466 }, // "sadf"
            Check::Magic { field: Field::be(0x08), value: 0x6F707573 }, // "opus"
        ],
        layout: OuterLayout {
            header: HeaderAt::Pointer(Field::le(0x1C)),
            num_samples: SampleCount::Field(Field::le(0x28)),
            loops: LoopRule::FlagByte { flag: 0x19, start: Field::le(0x2C), end: Field::le(0x30) },
            channels: None,
            side_file: None,
        },
    },
    DialectSpec {
        dialect: Dialect::Shinen,
        extensions: OPUS_EXTENSIONS,
        checks: &[Check::Magic { field: Field::be(0x08), value: 0x01000080 }],
        layout: OuterLayout {
            header: HeaderAt::Fixed(0x08),
            num_samples: SampleCount::Unknown,
            loops: LoopRule::Ordered { start: Field::le(0x00), end: Field::le(0x04) },
            channels: None,
            side_file: None,
        },
    },
    DialectSpec {
        dialect: Dialect::Nus3,
        extensions: &["lopus"],
        checks: &[Check::Magic { field: Field::be(0x00), value: 0x4F505553 }], // "OPUS"
        layout: OuterLayout {
            header: HeaderAt::Pointer(Field::be(0x20)),
            num_samples: SampleCount::Field(Field::be(0x08)),
            loops: LoopRule::EndNonzero { start: Field::be(0x14), end: Field::be(0x18) },
            channels: None,
            side_file: None,
        },
    },
    DialectSpec {
        dialect: Dialect::Nlsd,
        extensions: &["nlsd"],
        // codec tag: 0x08 is DSP, 0x09 is Opus
        checks: &[Check::Magic { field: Field::be(0x00), value: 0x09000000 }],
        layout: OuterLayout {
            header: HeaderAt::Fixed(0x1C),
            num_samples: SampleCount::Field(Field::le(0x0C)),
            loops: LoopRule::EndFromAdjust { start: Field::le(0x10), adjust: Field::le(0x18) },
            channels: None,
            side_file: None,
        },
    },
];

/// Registry entry for a dialect.
pub fn spec_for(dialect: Dialect) -> &'static DialectSpec {
    // REGISTRY is laid out in enum declaration order
    &REGISTRY[dialect as usize]
}

impl DialectSpec {
    fn accepts_extension(&self, source: &dyn ByteSource) -> bool {
        source
            .extension()
            .is_some_and(|ext| self.extensions.contains(&ext.as_str()))
    }

    fn run_check(&self, check: &Check, source: &dyn ByteSource) -> io::Result<bool> {
        match check {
            Check::Magic { field, value } => Ok(field.read_u32(source)? == *value),
            Check::PairedSentinel { first, second } => {
                let a = source.read_u32::<BigEndian>(*first)?;
                let b = source.read_u32::<BigEndian>(*second)?;
                Ok((a == 0 && b == 0) || (a == u32::MAX && b == u32::MAX))
            }
            Check::CoreMagic => {
                let header = self.layout.header.locate(source)?;
                Ok(source.read_u32::<LittleEndian>(header)? == CORE_HEADER_MAGIC)
            }
        }
    }

    /// Whether this dialect claims the source. Read failures count as a miss.
    pub fn matches(&self, source: &dyn ByteSource) -> bool {
        if !self.accepts_extension(source) {
            return false;
        }
        for check in self.checks {
            match self.run_check(check, source) {
                Ok(true) => {}
                Ok(false) => return false,
                Err(e) => {
                    tracing::trace!("{} check {:?} could not read: {}", self.dialect, check, e);
                    return false;
                }
            }
        }
        true
    }
}

/// Detect the dialect of `source` using the default order.
pub fn detect(source: &dyn ByteSource) -> Option<Dialect> {
    detect_with(source, &Dialect::ALL)
}

/// Detect the dialect of `source`, trying dialects in the given order.
pub fn detect_with(source: &dyn ByteSource, order: &[Dialect]) -> Option<Dialect> {
    let found = order
        .iter()
        .map(|&dialect| spec_for(dialect))
        .find(|spec| spec.matches(source))
        .map(|spec| spec.dialect);

    match found {
        Some(dialect) => tracing::debug!("{} detected as {}", source.name(), dialect),
        None => tracing::debug!("{} matched no Opus dialect", source.name()),
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    #[test]
    fn test_registry_order_matches_all() {
        let order: Vec<_> = REGISTRY.iter().map(|s| s.dialect).collect();
        assert_eq!(order, Dialect::ALL.to_vec());
        for dialect in Dialect::ALL {
            assert_eq!(spec_for(dialect).dialect, dialect);
        }
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("NUS3".parse::<Dialect>().unwrap(), Dialect::Nus3);
        assert_eq!("capcom".parse::<Dialect>().unwrap(), Dialect::Capcom);
        assert!(matches!("ogg".parse::<Dialect>(), Err(Error::UnknownDialect(_))));
    }

    #[test]
    fn test_truncated_input_is_no_match() {
        for len in 0..0x20 {
            let source = MemorySource::new("short.lopus", vec![0u8; len]);
            assert_eq!(detect(&source), None, "len {len}");
        }
    }

    #[test]
    fn test_extension_gates_detection() {
        let mut data = vec![0u8; 0x40];
        data[..4].copy_from_slice(&CORE_HEADER_MAGIC.to_le_bytes());
        assert_eq!(detect(&MemorySource::new("a.OPUS", data.clone())), Some(Dialect::Standard));
        assert_eq!(detect(&MemorySource::new("a.wav", data)), None);
    }

    #[test]
    fn test_paired_sentinel_needs_both_fields() {
        let mut data = vec![0u8; 0x40];
        data[0x10..0x14].copy_from_slice(&CORE_HEADER_MAGIC.to_le_bytes());
        data[0x04..0x08].copy_from_slice(&[0xFF; 4]);
        let source = MemorySource::new("a.opus", data.clone());
        assert!(!spec_for(Dialect::Nippon1).matches(&source));

        data[0x0C..0x10].copy_from_slice(&[0xFF; 4]);
        let source = MemorySource::new("a.opus", data);
        assert!(spec_for(Dialect::Nippon1).matches(&source));
    }

    #[test]
    fn test_order_decides_between_competing_dialects() {
        // Bare core header with a zero pre-skip: the word at 0x1c doubles as
        // Capcom's header pointer, which points back at the core magic at 0.
        let mut data = vec![0u8; 0x40];
        data[..4].copy_from_slice(&CORE_HEADER_MAGIC.to_le_bytes());
        data[0x09] = 2;
        let source = MemorySource::new("a.opus", data);

        assert!(spec_for(Dialect::Standard).matches(&source));
        assert!(spec_for(Dialect::Capcom).matches(&source));
        assert_eq!(detect(&source), Some(Dialect::Standard));
        assert_eq!(detect_with(&source, &[Dialect::Capcom, Dialect::Standard]), Some(Dialect::Capcom));
        assert_eq!(detect_with(&source, &[Dialect::Shinen]), None);
    }
}
