//! Command execution implementations

use super::Commands;
use super::{detect, dump, inspect};
use crate::config::ResolverConfig;

impl Commands {
    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if the underlying command fails.
    pub fn execute(&self, config: &ResolverConfig) -> anyhow::Result<()> {
        match self {
            Commands::Detect { files } => detect::execute(files, config),
            Commands::Inspect { file, json } => inspect::execute(file, *json, config),
            Commands::Dump { file, output } => dump::execute(file, output, config),
        }
    }
}
