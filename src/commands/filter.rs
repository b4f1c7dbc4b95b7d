//! `Filter` command implementation.
//!
//! Filters spliced read alignments in a BAM file against a trusted splice
//! junction set. Unspliced reads pass through. A singly-spliced read (or
//! any spliced read in `complete` mode) is kept only when one of its
//! junctions is trusted. A multiply-spliced read has the segments spanning
//! untrusted junctions rewritten to the configured clip operation, and is
//! discarded entirely when none of its junctions is trusted.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Parser;
use log::info;
use noodles::sam::alignment::io::Write as AlignmentWrite;
use noodles::sam::alignment::record_buf::{Cigar as CigarBuf, RecordBuf};

use juncfilt_lib::bam_io::{create_bam_reader, create_bam_writer, create_optional_bam_writer};
use juncfilt_lib::cigar::Cigar;
use juncfilt_lib::errors::JuncfiltError;
use juncfilt_lib::header::add_pg_record;
use juncfilt_lib::index::{index_bam, IndexScheme};
use juncfilt_lib::junction::{reference_catalog, resolve_reference, JunctionIndex};
use juncfilt_lib::logging::{format_count, OperationTimer};
use juncfilt_lib::metrics::{write_metrics, FilterMetrics};
use juncfilt_lib::progress::ProgressTracker;
use juncfilt_lib::splice::{self, ClipMode, Verdict};
use juncfilt_lib::validation::{prepare_output_dir, validate_file_exists};

use super::command::Command;
use super::common::{BamIoOptions, ThreadingOptions};

/// Filters spliced alignments against a trusted junction set
#[derive(Parser, Debug)]
#[command(
    name = "filter",
    about = "Filter spliced alignments in a BAM file against a trusted junction set",
    long_about = r#"
Filters spliced read alignments in a BAM file according to whether the splice junctions they
imply are members of a trusted junction set. Junction matching is exact on reference
coordinates: a read's implied intron must match a trusted junction's boundaries exactly.

Unspliced reads are passed through unchanged. A read with a single splice junction is kept
only if that junction is trusted. A multiply-spliced read has the segments spanning untrusted
junctions rewritten per --clip-mode:

1. `hard` - rewrite segments around untrusted junctions to hard clips.
2. `soft` - rewrite segments around untrusted junctions to soft clips.
3. `complete` - no per-segment rewriting: keep the whole read if any of its junctions is
   trusted, discard it otherwise.

A multiply-spliced read whose junctions are all untrusted is discarded in every mode.

The trusted junction set is an intron-style BED file (0-based, half-open intervals spanning
each intron, as produced by `junctools convert -of bed6`).

After the run the output BAM is indexed (BAI by default, CSI with --use-csi); the input must
therefore be coordinate sorted.
"#
)]
pub struct Filter {
    /// Input/output BAM options
    #[command(flatten)]
    pub io: BamIoOptions,

    /// Trusted junction set (intron-style BED)
    #[arg(short = 'j', long = "junctions")]
    pub junctions: PathBuf,

    /// Clip mode: hard, soft, or complete
    #[arg(short = 'c', long = "clip-mode", default_value = "hard")]
    pub clip_mode: String,

    /// Also write modified reads and their originals to <output>.mod.bam
    /// and <output>.unmod.bam
    #[arg(short = 'm', long = "save-modified", default_value = "false")]
    pub save_modified: bool,

    /// Write a CSI index instead of BAI (for very long reference sequences)
    #[arg(long = "use-csi", default_value = "false")]
    pub use_csi: bool,

    /// Output file for run metrics (TSV)
    #[arg(long = "metrics")]
    pub metrics: Option<PathBuf>,

    /// Threading options for BGZF compression
    #[command(flatten)]
    pub threading: ThreadingOptions,
}

impl Command for Filter {
    fn execute(&self, command_line: &str) -> Result<()> {
        self.io.validate()?;
        validate_file_exists(&self.junctions, "Junction")?;
        let mode = self.parse_clip_mode()?;

        info!("Filter");
        info!("  Input: {}", self.io.input.display());
        info!("  Junctions: {}", self.junctions.display());
        info!("  Output: {}", self.io.output.display());
        info!("  Clip mode: {mode}");
        info!("  Save modified: {}", self.save_modified);
        info!("  Index: {}", if self.use_csi { "csi" } else { "bai" });

        let timer = OperationTimer::new("Filtering alignments");

        let threads = self.threading.num_threads();
        let (mut reader, header) = create_bam_reader(&self.io.input, threads)?;
        let refs = reference_catalog(&header);

        info!("Loading junctions from: {}", self.junctions.display());
        let index = JunctionIndex::from_bed_path(&self.junctions, &refs)?;
        info!("Found {} trusted junctions", format_count(index.len() as u64));

        prepare_output_dir(&self.io.output)?;
        let out_header =
            add_pg_record(header.clone(), crate::version::VERSION.as_str(), command_line)?;

        let mut writer = create_bam_writer(&self.io.output, &out_header, threads)?;
        info!("Saving filtered alignments to: {}", self.io.output.display());

        let mod_path = self.save_modified.then(|| suffixed_path(&self.io.output, ".mod.bam"));
        let unmod_path = self.save_modified.then(|| suffixed_path(&self.io.output, ".unmod.bam"));
        let mut mod_writer = create_optional_bam_writer(mod_path.as_ref(), &out_header, threads)?;
        let mut unmod_writer =
            create_optional_bam_writer(unmod_path.as_ref(), &out_header, threads)?;
        if let (Some(mod_path), Some(unmod_path)) = (&mod_path, &unmod_path) {
            info!("Saving modified reads to: {}", mod_path.display());
            info!("Saving unmodified originals to: {}", unmod_path.display());
        }

        let mut counts = FilterMetrics::default();
        let mut progress = ProgressTracker::new("Processed records").with_interval(1_000_000);

        for result in reader.record_bufs(&header) {
            let record = result?;
            counts.records_in += 1;
            progress.log_if_needed(1);

            let cigar = Cigar::from(record.cigar());
            if !splice::is_spliced(&cigar) {
                writer.write_alignment_record(&out_header, &record)?;
                counts.records_out += 1;
                continue;
            }

            let (ref_id, alignment_start) = placement(&record)?;
            resolve_reference(&refs, ref_id)?;

            match splice::evaluate(&cigar, ref_id, alignment_start, &index, mode) {
                Verdict::Keep => {
                    writer.write_alignment_record(&out_header, &record)?;
                    counts.records_out += 1;
                }
                Verdict::Discard => {}
                Verdict::Rewrite(rewritten) => {
                    let mut clipped = record.clone();
                    *clipped.cigar_mut() = CigarBuf::try_from(&rewritten)?;

                    writer.write_alignment_record(&out_header, &clipped)?;
                    if let Some(w) = mod_writer.as_mut() {
                        w.write_alignment_record(&out_header, &clipped)?;
                    }
                    if let Some(w) = unmod_writer.as_mut() {
                        w.write_alignment_record(&out_header, &record)?;
                    }
                    counts.records_out += 1;
                    counts.records_modified += 1;
                }
            }
        }
        progress.log_final();

        writer.into_inner().finish()?;
        if let Some(w) = mod_writer {
            w.into_inner().finish()?;
        }
        if let Some(w) = unmod_writer {
            w.into_inner().finish()?;
        }

        counts.records_discarded = counts.records_in - counts.records_out;
        info!(
            "Filtered out {} alignments. In: {}; Out: {} (Modified: {})",
            format_count(counts.records_discarded),
            format_count(counts.records_in),
            format_count(counts.records_out),
            format_count(counts.records_modified)
        );

        if let Some(metrics_path) = &self.metrics {
            write_metrics(metrics_path, &[counts])?;
            info!("Wrote metrics to: {}", metrics_path.display());
        }

        info!("Indexing filtered alignments ...");
        let scheme = if self.use_csi { IndexScheme::Csi } else { IndexScheme::Bai };
        let index_path = index_bam(&self.io.output, scheme)?;
        info!("Wrote index: {}", index_path.display());

        timer.log_completion(counts.records_in);
        Ok(())
    }
}

impl Filter {
    /// Parses the clip mode option.
    fn parse_clip_mode(&self) -> Result<ClipMode> {
        match self.clip_mode.as_str() {
            "hard" => Ok(ClipMode::Hard),
            "soft" => Ok(ClipMode::Soft),
            "complete" => Ok(ClipMode::Complete),
            other => {
                bail!("Invalid clip mode: {other}. Must be hard, soft, or complete");
            }
        }
    }
}

/// Reference id and 0-based alignment start of a spliced record.
///
/// A spliced record without a placement cannot be tested against the
/// junction set; that is a data-integrity violation, not a skippable
/// record.
fn placement(record: &RecordBuf) -> Result<(usize, u64)> {
    match (record.reference_sequence_id(), record.alignment_start()) {
        (Some(ref_id), Some(start)) => Ok((ref_id, (usize::from(start) - 1) as u64)),
        _ => {
            let name = record
                .name()
                .map_or_else(|| "<unnamed>".to_string(), ToString::to_string);
            Err(JuncfiltError::UnplacedSplicedRecord { name }.into())
        }
    }
}

/// Path of a side-channel output next to the primary output.
fn suffixed_path(output: &Path, suffix: &str) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}
