//! Layered stream composition
//!
//! Files with more channels than one Opus stream carries store several stereo
//! streams chunk-interleaved. Each layer is reconstructed through an
//! [`InterleavedWindow`](crate::window::InterleavedWindow) and must hold a
//! complete core header of its own.

use super::logical::{LayeredStream, LogicalStream, MergeRule};
use crate::error::{Error, Result};
use crate::formats::opus::{
    CHANNELS_PER_LAYER, LAYER_CHUNK_SIZE, OuterMetadata, StreamDescriptor, parse_core_header,
};
use crate::source::ByteSource;
use crate::window::WindowSpec;

/// Build the logical stream for `descriptor`.
///
/// Descriptors within the per-layer channel limit become a single leaf bound
/// to `source`. Layered descriptors are split into `channels / 2` windows
/// starting at the descriptor's payload offset; any failing layer fails the
/// whole composition.
///
/// With `strict_layers`, layers that disagree with layer 0 on sample rate or
/// sample count are rejected. Otherwise layer 0 is trusted and the mismatch is
/// only logged.
pub fn compose(
    source: &dyn ByteSource,
    descriptor: &StreamDescriptor,
    strict_layers: bool,
) -> Result<LogicalStream> {
    if !descriptor.is_layered() {
        return Ok(LogicalStream::leaf(*descriptor, None));
    }

    let dialect = descriptor.dialect;
    if descriptor.channel_count % CHANNELS_PER_LAYER != 0 {
        return Err(Error::UnsupportedLayout {
            dialect,
            channels: u32::from(descriptor.channel_count),
        });
    }
    let layer_count = usize::from(descriptor.channel_count / CHANNELS_PER_LAYER);
    let meta = OuterMetadata {
        num_samples: descriptor.num_samples,
        loop_start: descriptor.loop_start_sample,
        loop_end: descriptor.loop_end_sample,
    };

    let mut layers: Vec<LogicalStream> = Vec::with_capacity(layer_count);
    for index in 0..layer_count {
        let spec = WindowSpec::for_layer(descriptor.payload_offset, LAYER_CHUNK_SIZE, index, layer_count)?;
        let window = spec.open(source);
        tracing::debug!("Resolving layer {}/{} ({:?})", index + 1, layer_count, spec);

        let layer = parse_core_header(&window, dialect, 0, meta)
            .map_err(|e| Error::layer(index, e.to_string()))?;

        if layer.channel_count != CHANNELS_PER_LAYER {
            return Err(Error::layer(
                index,
                format!("expected {CHANNELS_PER_LAYER} channels, found {}", layer.channel_count),
            ));
        }
        if let Some(first) = layers.first() {
            check_agreement(first.descriptor(), &layer, index, strict_layers)?;
        }

        layers.push(LogicalStream::leaf(layer, Some(spec)));
    }

    let first = *layers[0].descriptor();
    let summary = StreamDescriptor {
        sample_rate: first.sample_rate,
        num_samples: first.num_samples,
        loop_start_sample: first.loop_start_sample,
        loop_end_sample: first.loop_end_sample,
        loop_enabled: first.loop_enabled,
        pre_skip_samples: first.pre_skip_samples,
        frame_size: first.frame_size,
        channel_count: layers.iter().map(LogicalStream::channel_count).sum(),
        ..*descriptor
    };

    Ok(LogicalStream::Layered(LayeredStream {
        descriptor: summary,
        merge: MergeRule::ConcatChannelPairs,
        layers,
    }))
}

/// Compare a layer against layer 0.
pub(crate) fn check_agreement(
    first: &StreamDescriptor,
    layer: &StreamDescriptor,
    index: usize,
    strict: bool,
) -> Result<()> {
    let mismatch = if first.sample_rate != layer.sample_rate {
        Some(format!(
            "sample rate {} differs from layer 0 ({})",
            layer.sample_rate, first.sample_rate
        ))
    } else if first.num_samples != layer.num_samples {
        Some(format!(
            "sample count {} differs from layer 0 ({})",
            layer.num_samples, first.num_samples
        ))
    } else {
        None
    };

    match mismatch {
        Some(reason) if strict => Err(Error::layer(index, reason)),
        Some(reason) => {
            tracing::warn!("Layer {}: {}; using layer 0", index, reason);
            Ok(())
        }
        None => Ok(()),
    }
}
