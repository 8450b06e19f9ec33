//! Error types for `NxOpus`

use thiserror::Error;

use crate::formats::opus::Dialect;

/// Opaque error produced by a codec backend.
pub type BackendError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error type for `NxOpus` operations.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum Error {
    // ==================== IO Errors ====================
    /// IO error from file operations or an out-of-range read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ==================== Detection Errors ====================
    /// No known dialect recognized the file. Try the next format handler.
    #[error("no Opus container dialect matched")]
    NoMatch,

    /// A dialect name in configuration or on the command line is not known.
    #[error("unknown dialect: {0}")]
    UnknownDialect(String),

    // ==================== Container Errors ====================
    /// The dialect matched but a structural check failed further in.
    #[error("malformed {dialect} container: {reason}")]
    MalformedContainer {
        /// The dialect that claimed the file.
        dialect: Dialect,
        /// What failed validation.
        reason: String,
    },

    /// The header declares a channel layout this family does not carry.
    #[error("unsupported {dialect} layout: {channels} channels")]
    UnsupportedLayout {
        /// The dialect that claimed the file.
        dialect: Dialect,
        /// The declared channel count.
        channels: u32,
    },

    // ==================== Layer Errors ====================
    /// A deinterleaved layer failed to resolve or disagreed with layer 0.
    #[error("layer {layer} failed to resolve: {reason}")]
    LayerResolutionFailure {
        /// Zero-based layer index.
        layer: usize,
        /// Why the layer was rejected.
        reason: String,
    },

    /// Window geometry cannot address any bytes.
    #[error("invalid window: {0}")]
    InvalidWindow(String),

    // ==================== Backend Errors ====================
    /// The codec backend rejected the byte range or parameters.
    #[error("codec backend error: {0}")]
    Backend(#[source] BackendError),

    // ==================== Configuration Errors ====================
    /// Resolver configuration could not be parsed.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// True for the "not this format" outcome, as opposed to a real failure.
    pub fn is_no_match(&self) -> bool {
        matches!(self, Error::NoMatch)
    }

    pub(crate) fn malformed(dialect: Dialect, reason: impl Into<String>) -> Self {
        Error::MalformedContainer { dialect, reason: reason.into() }
    }

    pub(crate) fn layer(layer: usize, reason: impl Into<String>) -> Self {
        Error::LayerResolutionFailure { layer, reason: reason.into() }
    }
}

/// A specialized Result type for `NxOpus` operations.
pub type Result<T> = std::result::Result<T, Error>;
