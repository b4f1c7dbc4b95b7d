//! Post-run BAM index generation.
//!
//! After the filtered BAM has been written, a binning index is built by
//! scanning the output once and recording each record's chunk of virtual
//! positions. Two on-disk formats are supported: BAI (the widely supported
//! default) and CSI (for very long reference sequences).

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use noodles::bam;
use noodles::bam::bai;
use noodles::core::Position;
use noodles::csi;
use noodles::csi::binning_index::index::reference_sequence::bin::Chunk;
use noodles::csi::binning_index::index::reference_sequence::index::{BinnedIndex, LinearIndex};
use noodles::csi::binning_index::Indexer;
use noodles::sam::alignment::Record as _;

/// CSI parameters matching the BAI binning scheme.
const CSI_MIN_SHIFT: u8 = 14;
const CSI_DEPTH: u8 = 5;

/// Which on-disk index format to produce after the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexScheme {
    /// BAI index (`<output>.bai`)
    Bai,
    /// CSI index (`<output>.csi`)
    Csi,
}

impl IndexScheme {
    /// The index path convention for a given BAM path.
    #[must_use]
    pub fn path_for(self, bam_path: &Path) -> PathBuf {
        let mut name = bam_path.as_os_str().to_owned();
        match self {
            IndexScheme::Bai => name.push(".bai"),
            IndexScheme::Csi => name.push(".csi"),
        }
        PathBuf::from(name)
    }
}

/// One indexable record: its alignment context (reference id, start, end,
/// mapped flag) if placed, and its chunk of BGZF virtual positions.
type IndexEntry = (Option<(usize, Position, Position, bool)>, Chunk);

/// Scans a coordinate-sorted BAM and collects one index entry per record.
fn collect_entries(path: &Path) -> Result<(usize, Vec<IndexEntry>)> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open BAM for indexing: {}", path.display()))?;
    let mut reader = bam::io::Reader::new(file);
    let header = reader
        .read_header()
        .with_context(|| format!("Failed to read header from: {}", path.display()))?;
    let reference_sequence_count = header.reference_sequences().len();

    let mut record = bam::Record::default();
    let mut entries = Vec::new();
    let mut start_position = reader.get_ref().virtual_position();

    while reader
        .read_record(&mut record)
        .with_context(|| format!("Failed to read record from: {}", path.display()))?
        != 0
    {
        let end_position = reader.get_ref().virtual_position();

        let alignment_context = match (
            record.reference_sequence_id().transpose()?,
            record.alignment_start().transpose()?,
            record.alignment_end().transpose()?,
        ) {
            (Some(id), Some(start), Some(end)) => {
                Some((id, start, end, !record.flags().is_unmapped()))
            }
            _ => None,
        };

        entries.push((alignment_context, Chunk::new(start_position, end_position)));
        start_position = end_position;
    }

    Ok((reference_sequence_count, entries))
}

/// Builds and writes the requested index for a coordinate-sorted BAM.
///
/// Returns the path of the written index file.
///
/// # Errors
/// Returns an error if the BAM cannot be scanned (e.g., it is not
/// coordinate sorted) or the index file cannot be written. The BAM itself
/// is complete at this point; an indexing failure does not invalidate it.
pub fn index_bam(path: &Path, scheme: IndexScheme) -> Result<PathBuf> {
    let (reference_sequence_count, entries) = collect_entries(path)?;
    let index_path = scheme.path_for(path);

    match scheme {
        IndexScheme::Bai => {
            let mut indexer = Indexer::<LinearIndex>::default();
            for (alignment_context, chunk) in entries {
                indexer
                    .add_record(alignment_context, chunk)
                    .with_context(|| format!("Failed to index: {}", path.display()))?;
            }
            let index = indexer.build(reference_sequence_count);

            let file = File::create(&index_path).with_context(|| {
                format!("Failed to create index file: {}", index_path.display())
            })?;
            let mut writer = bai::io::Writer::new(file);
            writer
                .write_index(&index)
                .with_context(|| format!("Failed to write index: {}", index_path.display()))?;
        }
        IndexScheme::Csi => {
            let mut indexer = Indexer::<BinnedIndex>::new(CSI_MIN_SHIFT, CSI_DEPTH);
            for (alignment_context, chunk) in entries {
                indexer
                    .add_record(alignment_context, chunk)
                    .with_context(|| format!("Failed to index: {}", path.display()))?;
            }
            let index = indexer.build(reference_sequence_count);

            let file = File::create(&index_path).with_context(|| {
                format!("Failed to create index file: {}", index_path.display())
            })?;
            let mut writer = csi::io::Writer::new(file);
            writer
                .write_index(&index)
                .with_context(|| format!("Failed to write index: {}", index_path.display()))?;
        }
    }

    Ok(index_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_path_convention() {
        let bam = Path::new("/tmp/out/filtered.bam");
        assert_eq!(IndexScheme::Bai.path_for(bam), PathBuf::from("/tmp/out/filtered.bam.bai"));
        assert_eq!(IndexScheme::Csi.path_for(bam), PathBuf::from("/tmp/out/filtered.bam.csi"));
    }

    #[test]
    fn test_index_empty_bam() {
        use crate::bam_io::create_bam_writer;
        use bstr::BString;
        use noodles::sam::header::record::value::map::{Map, ReferenceSequence};
        use noodles::sam::Header;
        use std::num::NonZeroUsize;
        use tempfile::TempDir;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.bam");

        let header = Header::builder()
            .add_reference_sequence(
                BString::from("chr1"),
                Map::<ReferenceSequence>::new(NonZeroUsize::new(1000).unwrap()),
            )
            .build();
        let writer = create_bam_writer(&path, &header, 1).unwrap();
        writer.into_inner().finish().unwrap();

        let bai = index_bam(&path, IndexScheme::Bai).unwrap();
        assert!(bai.exists());

        let csi = index_bam(&path, IndexScheme::Csi).unwrap();
        assert!(csi.exists());
    }

    #[test]
    fn test_index_missing_bam_is_an_error() {
        assert!(index_bam(Path::new("/no/such.bam"), IndexScheme::Bai).is_err());
    }
}
