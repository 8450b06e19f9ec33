use clap::Subcommand;
use std::path::PathBuf;

pub mod detect;
pub mod dump;
pub mod execute;
pub mod inspect;

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the container dialect of one or more files
    Detect {
        /// Files to check
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Resolve a file and print its stream layout
    Inspect {
        /// Source file
        file: PathBuf,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Write each physical stream's packet data and OpusHead to disk
    Dump {
        /// Source file
        file: PathBuf,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },
}
