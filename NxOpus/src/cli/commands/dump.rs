//! CLI command for dumping physical streams

use std::path::Path;

use anyhow::Context;

use crate::assembler::StreamAssembler;
use crate::codec::{CodecParams, SwitchOpusFraming};
use crate::config::ResolverConfig;
use crate::source::{FileSource, SourceExt};

pub fn execute(file: &Path, output: &Path, config: &ResolverConfig) -> anyhow::Result<()> {
    let source = FileSource::open(file)
        .with_context(|| format!("Failed to open {}", file.display()))?;
    let assembler = StreamAssembler::with_config(SwitchOpusFraming, config.clone());
    let resolution = assembler
        .resolve(&source)
        .with_context(|| format!("Failed to resolve {}", file.display()))?;

    std::fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory: {}", output.display()))?;

    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "stream".to_string());

    for (i, leaf) in resolution.stream.leaves().into_iter().enumerate() {
        let view = leaf.open(&source);
        let payload = leaf.descriptor.payload();
        let bytes = view.read_vec(payload.offset, payload.size as usize)?;

        let data_path = output.join(format!("{stem}_layer{i}.bin"));
        std::fs::write(&data_path, &bytes)
            .with_context(|| format!("Failed to write {}", data_path.display()))?;

        let head_path = output.join(format!("{stem}_layer{i}.opushead"));
        let head = CodecParams::from_descriptor(&leaf.descriptor).opus_head();
        std::fs::write(&head_path, head)
            .with_context(|| format!("Failed to write {}", head_path.display()))?;

        println!("{} ({} bytes)", data_path.display(), bytes.len());
    }

    Ok(())
}
