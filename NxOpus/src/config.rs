//! Resolver configuration
//!
//! Loaded from a TOML file such as:
//!
//! ```toml
//! dialects = ["nus3", "capcom", "standard"]
//! side_files = false
//! strict_layers = true
//! ```
//!
//! Missing keys keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::formats::opus::{Dialect, ParseOptions};

fn default_dialects() -> Vec<Dialect> {
    Dialect::ALL.to_vec()
}

fn default_true() -> bool {
    true
}

/// Settings for [`StreamAssembler`](crate::assembler::StreamAssembler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Detection order. Dialects left out are never tried.
    #[serde(default = "default_dialects")]
    pub dialects: Vec<Dialect>,
    /// Read companion metadata files (`.psi`).
    #[serde(default = "default_true")]
    pub side_files: bool,
    /// Reject layered files whose layers disagree on sample rate or length.
    #[serde(default = "default_true")]
    pub strict_layers: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            dialects: default_dialects(),
            side_files: true,
            strict_layers: true,
        }
    }
}

impl ResolverConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Read a configuration file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!("Loaded resolver config from {}", path.as_ref().display());
        Self::from_toml_str(&text)
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions { side_files: self.side_files }
    }
}
