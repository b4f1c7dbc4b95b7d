//! Trusted junction set and reference sequence catalog.
//!
//! The junction index is an exact-coordinate lookup built once from an
//! intron-style BED file before any record is processed, and read-only for
//! the rest of the run. Splice boundaries are exact in reference
//! coordinates, so lookup is by `(reference id, intron start, intron end)`
//! equality; there is no overlap or proximity matching.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ahash::{AHashMap, AHashSet};
use log::{debug, warn};
use noodles::sam::Header;

use crate::errors::{JuncfiltError, Result};

/// A reference sequence from the BAM header dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSeq {
    /// Position of the sequence in the header dictionary
    pub id: usize,
    /// Sequence name (e.g., "chr1")
    pub name: String,
    /// Sequence length in bases
    pub length: usize,
}

/// Builds the reference catalog from a SAM header, in dictionary order.
#[must_use]
pub fn reference_catalog(header: &Header) -> Vec<RefSeq> {
    header
        .reference_sequences()
        .iter()
        .enumerate()
        .map(|(id, (name, map))| RefSeq {
            id,
            name: name.to_string(),
            length: map.length().get(),
        })
        .collect()
}

/// Resolves a reference id against the catalog, failing the run on a miss.
///
/// An alignment naming a reference absent from the dictionary is a
/// data-integrity violation: coordinate arithmetic against it would be
/// meaningless, so this is an error rather than a skip.
pub fn resolve_reference(refs: &[RefSeq], ref_id: usize) -> Result<&RefSeq> {
    refs.get(ref_id).ok_or(JuncfiltError::UnknownReferenceId { ref_id, known: refs.len() })
}

/// An intron: a closed, 0-based interval on a reference sequence.
///
/// This is both the coordinate form a read's reference skip implies and the
/// key under which trusted junctions are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Junction {
    /// Reference id the interval lies on
    pub ref_id: usize,
    /// First skipped reference base (0-based, inclusive)
    pub start: u64,
    /// Last skipped reference base (0-based, inclusive)
    pub end: u64,
}

impl Junction {
    /// Creates a junction for the given closed interval.
    #[must_use]
    pub fn new(ref_id: usize, start: u64, end: u64) -> Self {
        Self { ref_id, start, end }
    }
}

/// Exact-match lookup over the trusted junction set.
///
/// Presence means trusted. Built in one pass, O(1) amortized lookup, and
/// never mutated after construction.
#[derive(Debug, Default)]
pub struct JunctionIndex {
    entries: AHashSet<Junction>,
}

impl JunctionIndex {
    /// Builds the index from an in-memory junction collection.
    #[must_use]
    pub fn from_junctions<I: IntoIterator<Item = Junction>>(junctions: I) -> Self {
        Self { entries: junctions.into_iter().collect() }
    }

    /// Loads the index from an intron-style BED file.
    ///
    /// The first three tab-separated columns are `chrom`, `start`, and
    /// `end` with BED's 0-based half-open convention; the stored interval
    /// is the closed `[start, end - 1]`. Header (`#`), `track`, and
    /// `browser` lines are skipped. Entries naming a contig absent from the
    /// reference catalog are skipped with a warning: they can never match
    /// an alignment in this BAM.
    pub fn from_bed_path<P: AsRef<Path>>(path: P, refs: &[RefSeq]) -> Result<Self> {
        let path_ref = path.as_ref();
        let display = path_ref.display().to_string();

        let by_name: AHashMap<&str, usize> =
            refs.iter().map(|r| (r.name.as_str(), r.id)).collect();

        let file = File::open(path_ref).map_err(|e| JuncfiltError::InvalidFileFormat {
            file_type: "Junction".to_string(),
            path: display.clone(),
            reason: e.to_string(),
        })?;

        let mut entries = AHashSet::new();
        let mut unknown_contigs = 0u64;

        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line_number = (i + 1) as u64;
            let malformed = |reason: String| JuncfiltError::JunctionRecord {
                path: display.clone(),
                line: line_number,
                reason,
            };

            let line = line.map_err(|e| malformed(e.to_string()))?;
            let line = line.trim_end();
            if line.is_empty()
                || line.starts_with('#')
                || line.starts_with("track")
                || line.starts_with("browser")
            {
                continue;
            }

            let mut fields = line.split('\t');
            let chrom = fields
                .next()
                .filter(|s| !s.is_empty())
                .ok_or_else(|| malformed("expected at least 3 columns".to_string()))?;
            let start: u64 = fields
                .next()
                .ok_or_else(|| malformed("expected at least 3 columns".to_string()))?
                .parse()
                .map_err(|_| malformed("start is not a non-negative integer".to_string()))?;
            let end: u64 = fields
                .next()
                .ok_or_else(|| malformed("expected at least 3 columns".to_string()))?
                .parse()
                .map_err(|_| malformed("end is not a non-negative integer".to_string()))?;

            if end <= start {
                return Err(malformed(format!("empty or inverted interval [{start}, {end})")));
            }

            match by_name.get(chrom) {
                Some(&ref_id) => {
                    entries.insert(Junction::new(ref_id, start, end - 1));
                }
                None => {
                    unknown_contigs += 1;
                    debug!("{display}:{line_number}: contig '{chrom}' not in the BAM header");
                }
            }
        }

        if unknown_contigs > 0 {
            warn!(
                "Skipped {unknown_contigs} junction(s) on contigs absent from the BAM header"
            );
        }

        Ok(Self { entries })
    }

    /// Whether the exact junction is trusted.
    #[must_use]
    pub fn contains(&self, junction: &Junction) -> bool {
        self.entries.contains(junction)
    }

    /// Number of trusted junctions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no junctions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn refs() -> Vec<RefSeq> {
        vec![
            RefSeq { id: 0, name: "chr1".to_string(), length: 100_000 },
            RefSeq { id: 1, name: "chr2".to_string(), length: 50_000 },
        ]
    }

    fn bed_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_closed_intervals_from_half_open_bed() {
        let bed = bed_file("chr1\t1050\t1250\tj1\t10\t+\nchr2\t500\t700\n");
        let index = JunctionIndex::from_bed_path(bed.path(), &refs()).unwrap();

        assert_eq!(index.len(), 2);
        assert!(index.contains(&Junction::new(0, 1050, 1249)));
        assert!(index.contains(&Junction::new(1, 500, 699)));
    }

    #[test]
    fn test_lookup_is_exact_not_overlap() {
        let bed = bed_file("chr1\t1050\t1250\n");
        let index = JunctionIndex::from_bed_path(bed.path(), &refs()).unwrap();

        // Off-by-one on either boundary, or the wrong reference, never matches.
        assert!(!index.contains(&Junction::new(0, 1049, 1249)));
        assert!(!index.contains(&Junction::new(0, 1050, 1250)));
        assert!(!index.contains(&Junction::new(0, 1051, 1248)));
        assert!(!index.contains(&Junction::new(1, 1050, 1249)));
    }

    #[test]
    fn test_skips_comments_and_track_lines() {
        let bed = bed_file("# a comment\ntrack name=junctions\nbrowser position chr1\n\nchr1\t10\t20\n");
        let index = JunctionIndex::from_bed_path(bed.path(), &refs()).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_unknown_contig_is_skipped_not_fatal() {
        let bed = bed_file("chrUn\t10\t20\nchr1\t10\t20\n");
        let index = JunctionIndex::from_bed_path(bed.path(), &refs()).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.contains(&Junction::new(0, 10, 19)));
    }

    #[rstest]
    #[case("chr1\t10\n", "3 columns")]
    #[case("chr1\tten\t20\n", "not a non-negative integer")]
    #[case("chr1\t10\tten\n", "not a non-negative integer")]
    #[case("chr1\t20\t20\n", "empty or inverted")]
    #[case("chr1\t30\t20\n", "empty or inverted")]
    fn test_malformed_records_are_fatal(#[case] contents: &str, #[case] reason: &str) {
        let bed = bed_file(contents);
        let err = JunctionIndex::from_bed_path(bed.path(), &refs()).unwrap_err();
        assert!(err.to_string().contains(reason), "unexpected error: {err}");
        assert!(err.to_string().contains(":1:"), "line number missing: {err}");
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = JunctionIndex::from_bed_path("/no/such/file.bed", &refs()).unwrap_err();
        assert!(err.to_string().contains("Junction"));
    }

    #[test]
    fn test_resolve_reference() {
        let refs = refs();
        assert_eq!(resolve_reference(&refs, 1).unwrap().name, "chr2");
        let err = resolve_reference(&refs, 2).unwrap_err();
        assert!(err.to_string().contains("unknown reference id 2"));
    }
}
