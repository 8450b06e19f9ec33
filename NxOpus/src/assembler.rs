//! Stream assembly
//!
//! [`StreamAssembler`] drives one file from raw bytes to decoder handles:
//!
//! | Stage        | Work                                                    |
//! |--------------|---------------------------------------------------------|
//! | `Detecting`  | Pick the first dialect in configured order that matches |
//! | `Parsing`    | Read outer and core headers into a descriptor           |
//! | `Composing`  | Split layered payloads into per-layer windows           |
//! | `Finalizing` | Fill deferred sample counts, open backend handles       |
//!
//! Any failure ends in `Failed` and the error is returned; nothing is
//! retried. Handles to the source and companion files are released before
//! [`StreamAssembler::resolve`] returns.
//!
//! SPDX-FileCopyrightText: 2025 `CyberDeco`
//!
//! SPDX-License-Identifier: MIT

use std::fmt;

use serde::Serialize;

use crate::codec::{CodecBackend, CodecParams};
use crate::config::ResolverConfig;
use crate::error::{Error, Result};
use crate::formats::opus::{Dialect, StreamDescriptor, detect_with, parse_header};
use crate::source::ByteSource;
use crate::stream::{LogicalStream, compose};

/// Resolution pipeline stage.
///
/// Every resolution visits `Detecting` and `Parsing`, `Composing` only for
/// layered files, then `Finalizing`, and ends in `Ready` or `Failed`. The
/// visited stages are returned by [`StreamAssembler::resolve_traced`]; the
/// stage before `Failed` is the one that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Detecting,
    Parsing,
    Composing,
    Finalizing,
    Ready,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Detecting => "detecting",
            Stage::Parsing => "parsing",
            Stage::Composing => "composing",
            Stage::Finalizing => "finalizing",
            Stage::Ready => "ready",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// A fully resolved file.
#[derive(Debug)]
pub struct Resolution<H> {
    pub dialect: Dialect,
    pub stream: LogicalStream,
    /// One backend handle per leaf, in [`LogicalStream::leaves`] order.
    pub handles: Vec<H>,
}

/// Resolves container files into logical streams bound to a codec backend.
#[derive(Debug, Clone)]
pub struct StreamAssembler<B> {
    backend: B,
    config: ResolverConfig,
}

impl<B: CodecBackend> StreamAssembler<B> {
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, ResolverConfig::default())
    }

    pub fn with_config(backend: B, config: ResolverConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Detect, parse, and compose without touching the backend.
    ///
    /// Sample counts the container leaves at 0 stay 0.
    pub fn probe(&self, source: &dyn ByteSource) -> Result<(Dialect, LogicalStream)> {
        let mut trail = Vec::new();
        let result = self.structure(source, &mut trail);
        finish(source, &mut trail, result.as_ref().err());
        result
    }

    /// Run the whole pipeline.
    ///
    /// Returns [`Error::NoMatch`] when no configured dialect claims the file,
    /// so callers can fall through to other format handlers.
    pub fn resolve(&self, source: &dyn ByteSource) -> Result<Resolution<B::Handle>> {
        self.resolve_traced(source).1
    }

    /// [`resolve`](Self::resolve), also returning the stages visited.
    pub fn resolve_traced(&self, source: &dyn ByteSource) -> (Vec<Stage>, Result<Resolution<B::Handle>>) {
        let mut trail = Vec::new();
        let result = self.run(source, &mut trail);
        finish(source, &mut trail, result.as_ref().err());
        if let Ok(resolution) = &result {
            tracing::debug!(
                "{}: {} with {} handle(s)",
                source.name(),
                resolution.dialect,
                resolution.handles.len()
            );
        }
        (trail, result)
    }

    fn run(&self, source: &dyn ByteSource, trail: &mut Vec<Stage>) -> Result<Resolution<B::Handle>> {
        let (dialect, mut stream) = self.structure(source, trail)?;

        enter(source, trail, Stage::Finalizing);
        let mut handles = Vec::new();
        self.finalize(source, &mut stream, &mut handles)?;

        Ok(Resolution { dialect, stream, handles })
    }

    fn structure(&self, source: &dyn ByteSource, trail: &mut Vec<Stage>) -> Result<(Dialect, LogicalStream)> {
        enter(source, trail, Stage::Detecting);
        let dialect = detect_with(source, &self.config.dialects).ok_or(Error::NoMatch)?;

        enter(source, trail, Stage::Parsing);
        let descriptor = parse_header(source, dialect, &self.config.parse_options())?;

        let stream = if descriptor.is_layered() {
            enter(source, trail, Stage::Composing);
            compose(source, &descriptor, self.config.strict_layers)?
        } else {
            LogicalStream::leaf(descriptor, None)
        };

        Ok((dialect, stream))
    }

    /// Fill unknown sample counts and open a handle per leaf, depth first.
    fn finalize(
        &self,
        source: &dyn ByteSource,
        stream: &mut LogicalStream,
        handles: &mut Vec<B::Handle>,
    ) -> Result<()> {
        match stream {
            LogicalStream::Leaf(leaf) => {
                let view = leaf.open(source);
                let params = CodecParams::from_descriptor(&leaf.descriptor);
                if leaf.descriptor.num_samples == 0 {
                    let counted = self
                        .backend
                        .sample_count(&view, &params)
                        .map_err(Error::Backend)?;
                    leaf.descriptor.num_samples = playable_samples(counted, &leaf.descriptor);
                    tracing::debug!(
                        "{}: counted {} samples from payload",
                        source.name(),
                        leaf.descriptor.num_samples
                    );
                }
                handles.push(self.backend.open(&view, &params).map_err(Error::Backend)?);
            }
            LogicalStream::Layered(layered) => {
                for layer in &mut layered.layers {
                    self.finalize(source, layer, handles)?;
                }
                let Some((first, rest)) = layered.layers.split_first() else {
                    return Ok(());
                };
                for (index, layer) in rest.iter().enumerate() {
                    crate::stream::check_agreement(
                        first.descriptor(),
                        layer.descriptor(),
                        index + 1,
                        self.config.strict_layers,
                    )?;
                }
                if layered.descriptor.num_samples == 0 {
                    layered.descriptor.num_samples = first.num_samples();
                }
            }
        }
        Ok(())
    }
}

fn enter(source: &dyn ByteSource, trail: &mut Vec<Stage>, stage: Stage) {
    tracing::debug!("{}: {}", source.name(), stage);
    trail.push(stage);
}

fn finish(source: &dyn ByteSource, trail: &mut Vec<Stage>, error: Option<&Error>) {
    match error {
        None => enter(source, trail, Stage::Ready),
        Some(e) => {
            let failed_in = trail.last().copied().unwrap_or(Stage::Detecting);
            tracing::debug!("{}: failed while {}: {}", source.name(), failed_in, e);
            trail.push(Stage::Failed);
        }
    }
}

/// Decoded length minus pre-skip, clamped to the descriptor's range.
fn playable_samples(counted: u64, descriptor: &StreamDescriptor) -> i32 {
    let playable = counted.saturating_sub(u64::from(descriptor.pre_skip_samples));
    i32::try_from(playable).unwrap_or(i32::MAX)
}
