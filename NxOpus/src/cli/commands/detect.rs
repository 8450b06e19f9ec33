//! CLI command for dialect detection

use std::path::PathBuf;

use anyhow::Context;

use crate::config::ResolverConfig;
use crate::formats::opus::detect_with;
use crate::source::FileSource;

pub fn execute(files: &[PathBuf], config: &ResolverConfig) -> anyhow::Result<()> {
    let mut matched = 0usize;

    for path in files {
        let source = FileSource::open(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        match detect_with(&source, &config.dialects) {
            Some(dialect) => {
                matched += 1;
                println!("{}: {} ({})", path.display(), dialect, dialect.description());
            }
            None => println!("{}: no match", path.display()),
        }
    }

    if files.len() > 1 {
        println!();
        println!("{matched}/{} files recognized", files.len());
    }

    Ok(())
}
