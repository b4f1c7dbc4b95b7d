//! Run counters and TSV metrics output.
//!
//! The pipeline reports what it saw and what it emitted; counters never
//! drive control flow. They are logged at the end of the run and can also
//! be written as a single-row TSV.

use std::path::Path;

use anyhow::{Context, Result};
use fgoxide::io::DelimFile;
use serde::Serialize;

/// A named, serializable block of metrics.
pub trait Metric: Serialize {
    /// Short name used in error messages.
    fn metric_name() -> &'static str;
}

/// Counters for one filtering run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterMetrics {
    /// Records read from the input
    pub records_in: u64,
    /// Records written to the primary output
    pub records_out: u64,
    /// Records written after having their operation sequence rewritten
    pub records_modified: u64,
    /// Records discarded (untrusted junctions, or fully clipped)
    pub records_discarded: u64,
}

impl Metric for FilterMetrics {
    fn metric_name() -> &'static str {
        "filter"
    }
}

/// Writes metrics rows to a TSV file.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_metrics<P: AsRef<Path>, T: Metric>(path: P, metrics: &[T]) -> Result<()> {
    let path_ref = path.as_ref();
    DelimFile::default().write_tsv(&path_ref, metrics).with_context(|| {
        format!("Failed to write {} metrics: {}", T::metric_name(), path_ref.display())
    })
}
