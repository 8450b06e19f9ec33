//! CLI command for printing a resolved stream

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use crate::assembler::StreamAssembler;
use crate::codec::SwitchOpusFraming;
use crate::config::ResolverConfig;
use crate::formats::opus::{Dialect, StreamDescriptor};
use crate::source::FileSource;
use crate::stream::LogicalStream;

#[derive(Serialize)]
struct Report<'a> {
    file: String,
    dialect: Dialect,
    stream: &'a LogicalStream,
    /// Packet count per leaf
    packets: Vec<usize>,
}

pub fn execute(file: &Path, json: bool, config: &ResolverConfig) -> anyhow::Result<()> {
    let source = FileSource::open(file)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    let assembler = StreamAssembler::with_config(SwitchOpusFraming, config.clone());
    let resolution = assembler
        .resolve(&source)
        .with_context(|| format!("Failed to resolve {}", file.display()))?;

    let packets: Vec<usize> = resolution.handles.iter().map(|h| h.packets.len()).collect();

    if json {
        let report = Report {
            file: file.display().to_string(),
            dialect: resolution.dialect,
            stream: &resolution.stream,
            packets,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Opus File: {}", file.display());
    println!("---------------------------------");
    println!("Dialect:          {} ({})", resolution.dialect, resolution.dialect.description());
    print_descriptor(resolution.stream.descriptor());

    if let LogicalStream::Layered(layered) = &resolution.stream {
        println!("Layers:           {} ({:?})", layered.layers.len(), layered.merge);
        for (i, leaf) in resolution.stream.leaves().iter().enumerate() {
            let d = &leaf.descriptor;
            println!(
                "  [{i}] {} ch, {} Hz, payload {:#x}+{:#x}, pre-skip {}, {} packets",
                d.channel_count,
                d.sample_rate,
                d.payload_offset,
                d.payload_size,
                d.pre_skip_samples,
                packets.get(i).copied().unwrap_or_default()
            );
        }
    } else {
        println!("Packets:          {}", packets.first().copied().unwrap_or_default());
    }

    Ok(())
}

fn print_descriptor(d: &StreamDescriptor) {
    println!("Channels:         {}", d.channel_count);
    println!("Sample rate:      {} Hz", d.sample_rate);
    println!("Samples:          {}", d.num_samples);
    if let Some(duration) = d.duration_secs() {
        println!("Duration:         {duration:.2} seconds");
    }
    if d.loop_enabled {
        println!("Loop:             {}..{}", d.loop_start_sample, d.loop_end_sample);
    } else {
        println!("Loop:             none");
    }
    println!("Pre-skip:         {}", d.pre_skip_samples);
    if d.frame_size == 0 {
        println!("Frame size:       VBR");
    } else {
        println!("Frame size:       {} bytes", d.frame_size);
    }
    println!("Payload:          {:#x} ({} bytes)", d.payload_offset, d.payload_size);
}
