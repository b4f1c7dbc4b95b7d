#![deny(unsafe_code)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

//! # juncfilt - junction-aware BAM alignment filtering
//!
//! Classifies and rewrites read alignments according to whether the splice
//! junctions they imply are members of a trusted junction set.
//!
//! ## Modules
//!
//! - **[`cigar`]** - owned CIGAR model: operation alphabet, geometry, parsing
//! - **[`junction`]** - reference catalog, trusted junction set, exact lookup
//! - **[`splice`]** - spliced-read classification, containment check, clip engine
//! - **[`bam_io`]** - BAM reader/writer construction over BGZF
//! - **[`index`]** - post-run BAI/CSI index generation
//! - **[`header`]** - @PG provenance records
//! - **[`errors`]** - structured error types
//! - **[`validation`]** - input/output path checks
//! - **[`progress`]** / **[`logging`]** - run progress and summary logging
//! - **[`metrics`]** - run counters and TSV output
//!
//! ## Quick start
//!
//! ```no_run
//! use juncfilt_lib::bam_io::create_bam_reader;
//! use juncfilt_lib::cigar::Cigar;
//! use juncfilt_lib::junction::{reference_catalog, JunctionIndex};
//! use juncfilt_lib::splice;
//!
//! # fn main() -> anyhow::Result<()> {
//! let (mut reader, header) = create_bam_reader("input.bam", 1)?;
//! let refs = reference_catalog(&header);
//! let index = JunctionIndex::from_bed_path("trusted.bed", &refs)?;
//!
//! for record in reader.record_bufs(&header) {
//!     let record = record?;
//!     let cigar = Cigar::from(record.cigar());
//!     let _spliced = splice::is_spliced(&cigar);
//!     // route the record per its verdict ...
//! }
//! # Ok(())
//! # }
//! ```

pub mod bam_io;
pub mod cigar;
pub mod errors;
pub mod header;
pub mod index;
pub mod junction;
pub mod logging;
pub mod metrics;
pub mod progress;
pub mod splice;
pub mod validation;
