//! Logical stream tree

use std::io;

use serde::{Deserialize, Serialize};

use crate::formats::opus::{ByteRange, StreamDescriptor};
use crate::source::ByteSource;
use crate::window::{InterleavedWindow, WindowSpec};

/// How the layers of a composed stream combine into one output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeRule {
    /// Layer 0 supplies channels 0-1, layer 1 channels 2-3, and so on.
    ConcatChannelPairs,
}

/// One decodable physical stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafStream {
    /// Offsets are relative to `window` when one is set.
    pub descriptor: StreamDescriptor,
    pub window: Option<WindowSpec>,
}

impl LeafStream {
    /// The byte source this leaf's offsets refer to.
    pub fn open<'a>(&self, source: &'a dyn ByteSource) -> LeafSource<'a> {
        match &self.window {
            Some(spec) => LeafSource::Window(spec.open(source)),
            None => LeafSource::Direct(source),
        }
    }
}

/// Several layers resolved from one interleaved region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayeredStream {
    /// Whole-stream view: the interleaved region, the total channel count, and
    /// timing copied from layer 0.
    pub descriptor: StreamDescriptor,
    pub merge: MergeRule,
    pub layers: Vec<LogicalStream>,
}

/// A resolved stream: either one physical stream, or an ordered list of
/// streams plus the rule that merges them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogicalStream {
    Leaf(LeafStream),
    Layered(LayeredStream),
}

impl LogicalStream {
    pub fn leaf(descriptor: StreamDescriptor, window: Option<WindowSpec>) -> Self {
        LogicalStream::Leaf(LeafStream { descriptor, window })
    }

    pub fn descriptor(&self) -> &StreamDescriptor {
        match self {
            LogicalStream::Leaf(leaf) => &leaf.descriptor,
            LogicalStream::Layered(layered) => &layered.descriptor,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.descriptor().sample_rate
    }

    pub fn num_samples(&self) -> i32 {
        self.descriptor().num_samples
    }

    pub fn channel_count(&self) -> u16 {
        self.descriptor().channel_count
    }

    pub fn loop_points(&self) -> Option<(i32, i32)> {
        let d = self.descriptor();
        d.loop_enabled.then_some((d.loop_start_sample, d.loop_end_sample))
    }

    pub fn is_layered(&self) -> bool {
        matches!(self, LogicalStream::Layered(_))
    }

    /// Physical streams in output channel order.
    pub fn leaves(&self) -> Vec<&LeafStream> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'s>(&'s self, out: &mut Vec<&'s LeafStream>) {
        match self {
            LogicalStream::Leaf(leaf) => out.push(leaf),
            LogicalStream::Layered(layered) => {
                for layer in &layered.layers {
                    layer.collect_leaves(out);
                }
            }
        }
    }

    /// Source view for leaf `index`, in [`leaves`](Self::leaves) order.
    pub fn open_leaf<'a>(&self, source: &'a dyn ByteSource, index: usize) -> Option<LeafSource<'a>> {
        self.leaves().get(index).map(|leaf| leaf.open(source))
    }

    /// Payload range of every leaf, with the window it is addressed through.
    pub fn byte_ranges(&self) -> Vec<(Option<WindowSpec>, ByteRange)> {
        self.leaves()
            .into_iter()
            .map(|leaf| (leaf.window, leaf.descriptor.payload()))
            .collect()
    }
}

/// Source view for one leaf: the file itself or a layer window over it.
pub enum LeafSource<'a> {
    Direct(&'a dyn ByteSource),
    Window(InterleavedWindow<'a>),
}

impl std::fmt::Debug for LeafSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LeafSource::Direct(source) => f.debug_tuple("Direct").field(&source.name()).finish(),
            LeafSource::Window(window) => f.debug_tuple("Window").field(window).finish(),
        }
    }
}

impl ByteSource for LeafSource<'_> {
    fn len(&self) -> u64 {
        match self {
            LeafSource::Direct(source) => source.len(),
            LeafSource::Window(window) => window.len(),
        }
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        match self {
            LeafSource::Direct(source) => source.read_at(offset, buf),
            LeafSource::Window(window) => window.read_at(offset, buf),
        }
    }

    fn name(&self) -> &str {
        match self {
            LeafSource::Direct(source) => source.name(),
            LeafSource::Window(window) => window.name(),
        }
    }
}
