//! Common CLI options shared across commands.
//!
//! Shared argument structures composed into command structs with
//! `#[command(flatten)]`.

use std::path::PathBuf;

use clap::Args;

use juncfilt_lib::validation::validate_file_exists;

/// Input/output options for commands that read a BAM and write a BAM.
#[derive(Debug, Clone, Args)]
pub struct BamIoOptions {
    /// Input BAM file
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,

    /// Output BAM file
    #[arg(short = 'o', long = "output", default_value = "filtered.bam")]
    pub output: PathBuf,
}

impl BamIoOptions {
    /// Validates that the input file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the input file does not exist.
    pub fn validate(&self) -> anyhow::Result<()> {
        validate_file_exists(&self.input, "Input BAM")?;
        Ok(())
    }
}

/// BGZF codec threading options.
///
/// These control compression/decompression workers only; record
/// processing is strictly sequential.
#[derive(Debug, Clone, Args)]
pub struct ThreadingOptions {
    /// Number of BGZF compression/decompression threads
    #[arg(short = 't', long = "threads", default_value = "1")]
    pub threads: usize,
}

impl ThreadingOptions {
    /// Worker count, never zero.
    #[must_use]
    pub fn num_threads(&self) -> usize {
        self.threads.max(1)
    }

    /// Single-threaded options, for tests.
    #[must_use]
    pub fn none() -> Self {
        Self { threads: 1 }
    }
}
